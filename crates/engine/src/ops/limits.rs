//! Limit evaluator: plan-derived quotas vs time-windowed usage counts.
//!
//! Every check follows the same shape: resolve plan, merge limits, return
//! early (no count) when the quota is unlimited, otherwise count current
//! usage and compare. The read-only `can_*` entry points run against the
//! main connection; the `*_quota_check` internals also run on the
//! transaction a create operation opened, so admission and insert share one
//! store transaction.

use chrono::{NaiveDate, Utc};
use sea_orm::{ConnectionTrait, PaginatorTrait, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Feature, LimitCheck, Plan, PlanLimits, ResultEngine, accounts, categories,
    transactions,
    util::{month_bounds, month_label},
};

use super::Engine;

/// Complete usage picture for the limits endpoint: the resolved plan, one
/// check per quota, and the feature set of the tier.
#[derive(Clone, Debug)]
pub struct LimitsInfo {
    pub plan: Plan,
    pub transactions: LimitCheck,
    pub categories: LimitCheck,
    pub accounts: LimitCheck,
    pub features: Vec<Feature>,
}

impl Engine {
    /// Merges a resolved plan with the catalog tier defaults.
    pub fn plan_limits(&self, plan: &Plan) -> PlanLimits {
        PlanLimits::resolve(&self.catalog, plan)
    }

    /// May the user create one transaction dated `date` (today if absent)?
    ///
    /// The monthly quota is evaluated against the calendar month containing
    /// the target date, not the request's wall-clock month.
    pub async fn can_create_transaction(
        &self,
        user_id: Uuid,
        date: Option<NaiveDate>,
    ) -> ResultEngine<LimitCheck> {
        let plan = self.user_plan(user_id).await;
        let limits = self.plan_limits(&plan);
        let target = date.unwrap_or_else(|| Utc::now().date_naive());
        self.transaction_quota_check(&self.database, &limits, user_id, target, 1)
            .await
    }

    pub async fn can_create_category(&self, user_id: Uuid) -> ResultEngine<LimitCheck> {
        let plan = self.user_plan(user_id).await;
        let limits = self.plan_limits(&plan);
        self.category_quota_check(&self.database, &limits, user_id, 1)
            .await
    }

    pub async fn can_create_account(&self, user_id: Uuid) -> ResultEngine<LimitCheck> {
        let plan = self.user_plan(user_id).await;
        let limits = self.plan_limits(&plan);
        self.account_quota_check(&self.database, &limits, user_id, 1)
            .await
    }

    /// Feature-gate decision. On denial the check names the first tier that
    /// ships the feature so the client can render an upgrade prompt.
    pub async fn can_access_feature(&self, user_id: Uuid, feature: Feature) -> LimitCheck {
        let plan = self.user_plan(user_id).await;
        let limits = self.plan_limits(&plan);
        LimitCheck::feature_access(
            &plan.name,
            feature,
            limits.has_feature(feature),
            self.catalog.required_tier(feature),
        )
    }

    pub async fn user_limits_info(&self, user_id: Uuid) -> ResultEngine<LimitsInfo> {
        let plan = self.user_plan(user_id).await;
        let limits = self.plan_limits(&plan);
        let today = Utc::now().date_naive();

        let transactions = self
            .transaction_quota_check(&self.database, &limits, user_id, today, 1)
            .await?;
        let categories = self
            .category_quota_check(&self.database, &limits, user_id, 1)
            .await?;
        let accounts = self
            .account_quota_check(&self.database, &limits, user_id, 1)
            .await?;

        Ok(LimitsInfo {
            plan,
            transactions,
            categories,
            accounts,
            features: limits.features,
        })
    }

    /// Monthly transaction quota: counts rows dated inside the calendar
    /// month containing `target` and checks headroom for `requested` new
    /// rows. `requested = 1` reproduces the plain `current < limit` rule.
    pub(super) async fn transaction_quota_check<C: ConnectionTrait>(
        &self,
        conn: &C,
        limits: &PlanLimits,
        user_id: Uuid,
        target: NaiveDate,
        requested: u64,
    ) -> ResultEngine<LimitCheck> {
        let Some(limit) = limits.max_transactions else {
            return Ok(LimitCheck::unlimited(&limits.name));
        };

        let (first, last) = month_bounds(target);
        let current = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .filter(transactions::Column::Date.gte(first))
            .filter(transactions::Column::Date.lte(last))
            .count(conn)
            .await?;

        let mut check =
            LimitCheck::counted(&limits.name, current, limit).with_month_year(month_label(target));
        check.allowed = current + requested <= u64::from(limit);
        Ok(check)
    }

    pub(super) async fn category_quota_check<C: ConnectionTrait>(
        &self,
        conn: &C,
        limits: &PlanLimits,
        user_id: Uuid,
        requested: u64,
    ) -> ResultEngine<LimitCheck> {
        let Some(limit) = limits.max_categories else {
            return Ok(LimitCheck::unlimited(&limits.name));
        };

        let current = categories::Entity::find()
            .filter(categories::Column::UserId.eq(user_id))
            .count(conn)
            .await?;

        let mut check = LimitCheck::counted(&limits.name, current, limit);
        check.allowed = current + requested <= u64::from(limit);
        Ok(check)
    }

    pub(super) async fn account_quota_check<C: ConnectionTrait>(
        &self,
        conn: &C,
        limits: &PlanLimits,
        user_id: Uuid,
        requested: u64,
    ) -> ResultEngine<LimitCheck> {
        let Some(limit) = limits.max_accounts else {
            return Ok(LimitCheck::unlimited(&limits.name));
        };

        let current = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .count(conn)
            .await?;

        let mut check = LimitCheck::counted(&limits.name, current, limit);
        check.allowed = current + requested <= u64::from(limit);
        Ok(check)
    }
}

/// Turns a denied check into the typed error the HTTP layer renders as a
/// 403 + upgrade payload.
pub(super) fn deny_if_blocked(check: LimitCheck) -> ResultEngine<()> {
    if check.allowed {
        Ok(())
    } else {
        Err(EngineError::QuotaExceeded(Box::new(check)))
    }
}
