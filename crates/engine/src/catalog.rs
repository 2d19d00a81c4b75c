//! Plan tiers, feature flags and the quota catalog.
//!
//! The catalog is an immutable configuration structure built once at engine
//! startup. Stored `plans` rows are merged with it field by field: a column
//! present on the row wins, a missing column falls back to the tier defaults
//! listed here. A quota of `None` means unlimited.

use serde::{Deserialize, Serialize};

use crate::{EngineError, Plan};

/// The three subscription tiers the product ships with.
///
/// Stored plan rows are folded onto a tier by name; unknown names resolve to
/// [`PlanTier::Free`], the most restrictive tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanTier {
    #[default]
    #[serde(rename = "Gratuito")]
    Free,
    Pro,
    Premium,
}

impl PlanTier {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Free => "Gratuito",
            Self::Pro => "Pro",
            Self::Premium => "Premium",
        }
    }

    /// Folds a stored plan name onto a tier. Matching is case-insensitive;
    /// anything unknown degrades to `Free`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_uppercase().as_str() {
            "PRO" => Self::Pro,
            "PREMIUM" => Self::Premium,
            _ => Self::Free,
        }
    }

    /// Tiers ordered from most to least restrictive.
    pub const fn ascending() -> [PlanTier; 3] {
        [Self::Free, Self::Pro, Self::Premium]
    }
}

/// Closed set of gateable product features.
///
/// Feature names arriving from the outside world go through [`TryFrom`];
/// an unknown string is an error there, and the caller decides the policy
/// (the HTTP layer treats unknown names as Premium-gated).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    AdvancedDashboard,
    AdvancedCharts,
    PdfExport,
    ExcelExport,
    FinancialGoals,
    BankIntegration,
    AutoImport,
    AiCategorization,
    CustomReports,
    ApiIntegration,
    MultiUser,
    PrioritySupport,
    Support24x7,
    DedicatedManager,
}

impl Feature {
    pub const ALL: [Feature; 14] = [
        Self::AdvancedDashboard,
        Self::AdvancedCharts,
        Self::PdfExport,
        Self::ExcelExport,
        Self::FinancialGoals,
        Self::BankIntegration,
        Self::AutoImport,
        Self::AiCategorization,
        Self::CustomReports,
        Self::ApiIntegration,
        Self::MultiUser,
        Self::PrioritySupport,
        Self::Support24x7,
        Self::DedicatedManager,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AdvancedDashboard => "advancedDashboard",
            Self::AdvancedCharts => "advancedCharts",
            Self::PdfExport => "pdfExport",
            Self::ExcelExport => "excelExport",
            Self::FinancialGoals => "financialGoals",
            Self::BankIntegration => "bankIntegration",
            Self::AutoImport => "autoImport",
            Self::AiCategorization => "aiCategorization",
            Self::CustomReports => "customReports",
            Self::ApiIntegration => "apiIntegration",
            Self::MultiUser => "multiUser",
            Self::PrioritySupport => "prioritySupport",
            Self::Support24x7 => "support24x7",
            Self::DedicatedManager => "dedicatedManager",
        }
    }
}

impl TryFrom<&str> for Feature {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|feature| feature.as_str() == value)
            .ok_or_else(|| EngineError::Validation(format!("unknown feature: {value}")))
    }
}

/// Per-tier quota defaults and feature set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TierQuotas {
    /// Transactions per calendar month; `None` = unlimited.
    pub max_transactions: Option<u32>,
    pub max_categories: Option<u32>,
    pub max_accounts: Option<u32>,
    pub max_users: u32,
    pub features: Vec<Feature>,
}

impl TierQuotas {
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }
}

/// Immutable quota/feature configuration, one record per tier.
#[derive(Clone, Debug)]
pub struct PlanCatalog {
    free: TierQuotas,
    pro: TierQuotas,
    premium: TierQuotas,
}

impl PlanCatalog {
    pub fn new(free: TierQuotas, pro: TierQuotas, premium: TierQuotas) -> Self {
        Self { free, pro, premium }
    }

    pub fn quotas(&self, tier: PlanTier) -> &TierQuotas {
        match tier {
            PlanTier::Free => &self.free,
            PlanTier::Pro => &self.pro,
            PlanTier::Premium => &self.premium,
        }
    }

    /// The first tier, most restrictive first, that ships the feature.
    /// Features missing from every tier require Premium.
    pub fn required_tier(&self, feature: Feature) -> PlanTier {
        PlanTier::ascending()
            .into_iter()
            .find(|tier| self.quotas(*tier).has_feature(feature))
            .unwrap_or(PlanTier::Premium)
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        let pro_features = vec![
            Feature::AdvancedDashboard,
            Feature::AdvancedCharts,
            Feature::PdfExport,
            Feature::ExcelExport,
            Feature::FinancialGoals,
            Feature::PrioritySupport,
        ];
        Self {
            free: TierQuotas {
                max_transactions: Some(10),
                max_categories: Some(3),
                max_accounts: Some(1),
                max_users: 1,
                features: Vec::new(),
            },
            pro: TierQuotas {
                max_transactions: None,
                max_categories: None,
                max_accounts: None,
                max_users: 1,
                features: pro_features,
            },
            premium: TierQuotas {
                max_transactions: None,
                max_categories: None,
                max_accounts: None,
                max_users: 5,
                features: Feature::ALL.to_vec(),
            },
        }
    }
}

/// A plan row merged with its tier defaults: the complete quota picture the
/// limit evaluator works against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanLimits {
    pub name: String,
    pub tier: PlanTier,
    pub max_transactions: Option<u32>,
    pub max_categories: Option<u32>,
    pub max_accounts: Option<u32>,
    pub max_users: u32,
    pub features: Vec<Feature>,
}

impl PlanLimits {
    /// Field-by-field merge of a resolved plan with the catalog: the stored
    /// column wins when present, the tier default fills the gaps. Features
    /// always come from the catalog tier.
    pub fn resolve(catalog: &PlanCatalog, plan: &Plan) -> Self {
        let tier = PlanTier::from_name(&plan.name);
        let defaults = catalog.quotas(tier);

        Self {
            name: plan.name.clone(),
            tier,
            max_transactions: merge_quota(plan.max_transactions, defaults.max_transactions),
            max_categories: merge_quota(plan.max_categories, defaults.max_categories),
            max_accounts: merge_quota(plan.max_accounts, defaults.max_accounts),
            max_users: plan
                .max_users
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(defaults.max_users),
            features: defaults.features.clone(),
        }
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }
}

fn merge_quota(stored: Option<i32>, fallback: Option<u32>) -> Option<u32> {
    match stored {
        Some(value) => u32::try_from(value).ok(),
        None => fallback,
    }
}

/// Allow/deny decision with diagnostic counters, computed per request and
/// never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LimitCheck {
    pub allowed: bool,
    /// Usage at decision time. Absent when the quota is unlimited and no
    /// count was performed.
    pub current: Option<u64>,
    pub limit: Option<u32>,
    pub remaining: Option<i64>,
    pub plan_name: String,
    /// Month the transaction quota was evaluated against, e.g. `Ago/2026`.
    pub month_year: Option<String>,
    pub feature: Option<Feature>,
    pub required_plan: Option<PlanTier>,
}

impl LimitCheck {
    /// Unlimited quota: allowed without counting.
    pub fn unlimited(plan_name: impl Into<String>) -> Self {
        Self {
            allowed: true,
            current: None,
            limit: None,
            remaining: None,
            plan_name: plan_name.into(),
            month_year: None,
            feature: None,
            required_plan: None,
        }
    }

    /// Counted quota comparison: `allowed = current < limit`.
    pub fn counted(plan_name: impl Into<String>, current: u64, limit: u32) -> Self {
        Self {
            allowed: current < u64::from(limit),
            current: Some(current),
            limit: Some(limit),
            remaining: Some(i64::from(limit) - current as i64),
            plan_name: plan_name.into(),
            month_year: None,
            feature: None,
            required_plan: None,
        }
    }

    pub fn with_month_year(mut self, month_year: impl Into<String>) -> Self {
        self.month_year = Some(month_year.into());
        self
    }

    /// Feature gate decision.
    pub fn feature_access(
        plan_name: impl Into<String>,
        feature: Feature,
        allowed: bool,
        required_plan: PlanTier,
    ) -> Self {
        Self {
            allowed,
            current: None,
            limit: None,
            remaining: None,
            plan_name: plan_name.into(),
            month_year: None,
            feature: Some(feature),
            required_plan: Some(required_plan),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_plan_name_folds_to_free() {
        assert_eq!(PlanTier::from_name("Enterprise"), PlanTier::Free);
        assert_eq!(PlanTier::from_name("premium"), PlanTier::Premium);
        assert_eq!(PlanTier::from_name(" pro "), PlanTier::Pro);
    }

    #[test]
    fn unknown_feature_name_is_rejected() {
        assert!(Feature::try_from("teleportation").is_err());
        assert_eq!(
            Feature::try_from("pdfExport").ok(),
            Some(Feature::PdfExport)
        );
    }

    #[test]
    fn required_tier_scans_most_restrictive_first() {
        let catalog = PlanCatalog::default();
        assert_eq!(catalog.required_tier(Feature::PdfExport), PlanTier::Pro);
        assert_eq!(
            catalog.required_tier(Feature::BankIntegration),
            PlanTier::Premium
        );
    }

    #[test]
    fn stored_columns_win_over_tier_defaults() {
        let catalog = PlanCatalog::default();
        let mut plan = Plan::free();
        plan.max_transactions = Some(25);
        let limits = PlanLimits::resolve(&catalog, &plan);
        assert_eq!(limits.max_transactions, Some(25));
        // Columns the row leaves unset fall back to the tier.
        assert_eq!(limits.max_categories, Some(3));
        assert_eq!(limits.max_accounts, Some(1));
    }

    #[test]
    fn counted_check_compares_strictly() {
        let check = LimitCheck::counted("Gratuito", 9, 10);
        assert!(check.allowed);
        assert_eq!(check.remaining, Some(1));

        let check = LimitCheck::counted("Gratuito", 10, 10);
        assert!(!check.allowed);
        assert_eq!(check.remaining, Some(0));
    }
}
