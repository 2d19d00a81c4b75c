//! Wire types shared by the server and its clients.
//!
//! Everything serializes in camelCase; calendar dates travel as plain
//! `YYYY-MM-DD` strings and money as integer cents.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

pub mod plan {
    use super::*;

    /// Public pricing listing entry.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PlanView {
        pub id: Uuid,
        pub name: String,
        pub price_cents: i64,
        pub max_transactions: Option<i32>,
        pub max_categories: Option<i32>,
        pub max_accounts: Option<i32>,
        pub max_users: Option<i32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PlansResponse {
        pub plans: Vec<PlanView>,
    }
}

pub mod limits {
    use super::*;

    /// One allow/deny decision with its diagnostic counters.
    ///
    /// Counter fields are absent when the quota is unlimited (no count is
    /// performed); `feature`/`requiredPlan` only appear on feature checks.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct LimitCheckView {
        pub allowed: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub current: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub limit: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub remaining: Option<i64>,
        pub plan_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub month_year: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub feature: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub required_plan: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PlanSummary {
        pub id: Option<Uuid>,
        pub name: String,
        pub price_cents: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct LimitsBreakdown {
        pub transactions: LimitCheckView,
        pub categories: LimitCheckView,
        pub accounts: LimitCheckView,
    }

    /// Full payload of `GET /limits`.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct LimitsInfoResponse {
        pub plan: PlanSummary,
        pub limits: LimitsBreakdown,
        pub features: Vec<String>,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TransactionCreate {
        #[serde(rename = "type")]
        pub kind: Option<TransactionKind>,
        pub amount_cents: i64,
        pub account_id: Option<Uuid>,
        pub description: Option<String>,
        pub category: Option<String>,
        /// Defaults to the current date when absent.
        pub date: Option<NaiveDate>,
        pub paid: Option<bool>,
        pub paid_at: Option<NaiveDate>,
        pub series_id: Option<Uuid>,
        pub installment_number: Option<i32>,
        pub installment_total: Option<i32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TransactionUpdate {
        #[serde(rename = "type")]
        pub kind: Option<TransactionKind>,
        pub amount_cents: Option<i64>,
        pub account_id: Option<Uuid>,
        pub description: Option<String>,
        pub category: Option<String>,
        pub date: Option<NaiveDate>,
        pub paid: Option<bool>,
        pub paid_at: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TransactionView {
        pub id: Uuid,
        #[serde(rename = "type")]
        pub kind: TransactionKind,
        pub amount_cents: i64,
        pub account_id: Option<Uuid>,
        pub description: Option<String>,
        pub category: Option<String>,
        pub date: NaiveDate,
        pub paid: bool,
        pub paid_at: Option<NaiveDate>,
        pub series_id: Option<Uuid>,
        pub installment_number: Option<i32>,
        pub installment_total: Option<i32>,
        pub created_at: DateTime<Utc>,
    }

    /// Query string of `GET /transactions`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TransactionListQuery {
        #[serde(rename = "type")]
        pub kind: Option<TransactionKind>,
        pub category: Option<String>,
        pub account_id: Option<Uuid>,
        pub start_date: Option<NaiveDate>,
        pub end_date: Option<NaiveDate>,
        pub limit: Option<u64>,
        /// Opaque pagination cursor (base64), from `nextCursor`.
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        /// Opaque cursor for fetching the next page (older items).
        pub next_cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TransactionsSummaryResponse {
        pub income_cents: i64,
        pub expense_cents: i64,
        pub balance_cents: i64,
        pub total_transactions: u64,
    }
}

pub mod series {
    use super::*;
    use crate::transaction::TransactionView;

    /// Whole installment series, ordered by installment number.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SeriesView {
        pub series_id: Uuid,
        pub installment_total: Option<i32>,
        pub installments: Vec<TransactionView>,
    }

    /// Shared-field update across every installment of a series.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SeriesUpdateRequest {
        pub description: Option<String>,
        pub category: Option<String>,
        pub amount_cents: Option<i64>,
        pub account_id: Option<Uuid>,
    }

    /// Body of `POST /series/:seriesId/pay`. `paid` is required.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SeriesPayRequest {
        pub from_date: Option<NaiveDate>,
        pub paid: Option<bool>,
        pub paid_at: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SeriesPayResponse {
        pub updated_count: u64,
        pub installments: Vec<TransactionView>,
    }

    /// Query string of `DELETE /series/:seriesId`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SeriesDeleteQuery {
        pub from_date: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SeriesDeleteResponse {
        pub deleted_count: u64,
    }
}

pub mod category {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CategoryCreate {
        pub name: String,
        #[serde(rename = "type")]
        pub kind: Option<TransactionKind>,
        pub color: Option<String>,
        pub icon: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CategoryUpdate {
        pub name: Option<String>,
        #[serde(rename = "type")]
        pub kind: Option<TransactionKind>,
        pub color: Option<String>,
        pub icon: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CategoryView {
        pub id: Uuid,
        pub name: String,
        #[serde(rename = "type")]
        pub kind: TransactionKind,
        pub color: Option<String>,
        pub icon: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CategoriesResponse {
        pub categories: Vec<CategoryView>,
    }
}

pub mod account {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AccountType {
        #[default]
        Checking,
        Savings,
        Investment,
        Digital,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AccountCreate {
        pub name: String,
        pub bank_name: Option<String>,
        pub account_type: Option<AccountType>,
        pub opening_balance_cents: Option<i64>,
        pub current_balance_cents: Option<i64>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AccountUpdate {
        pub name: Option<String>,
        pub bank_name: Option<String>,
        pub account_type: Option<AccountType>,
        pub current_balance_cents: Option<i64>,
        pub archived: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AccountView {
        pub id: Uuid,
        pub name: String,
        pub bank_name: Option<String>,
        pub account_type: AccountType,
        pub opening_balance_cents: i64,
        pub current_balance_cents: i64,
        pub archived: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AccountsResponse {
        pub accounts: Vec<AccountView>,
    }

    /// Query string of `GET /accounts` and `DELETE /accounts/:id`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AccountListQuery {
        pub include_archived: Option<bool>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AccountDeleteQuery {
        pub archive: Option<bool>,
    }
}
