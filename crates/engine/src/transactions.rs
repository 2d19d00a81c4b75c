//! Transaction primitives.
//!
//! A `Transaction` is a single income or expense row. Rows belonging to an
//! installment plan additionally carry a shared `series_id` and their
//! 1-based `installment_number` out of `installment_total`.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::Validation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Option<Uuid>,
    pub kind: TransactionKind,
    pub amount: MoneyCents,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Calendar date, timezone-naive. Quotas and forward operations key off
    /// this column, not `created_at`.
    pub date: NaiveDate,
    pub paid: bool,
    pub paid_at: Option<NaiveDate>,
    pub series_id: Option<Uuid>,
    pub installment_number: Option<i32>,
    pub installment_total: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Option<Uuid>,
    pub kind: String,
    pub amount_cents: i64,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: Date,
    pub paid: bool,
    pub paid_at: Option<Date>,
    pub series_id: Option<Uuid>,
    pub installment_number: Option<i32>,
    pub installment_total: Option<i32>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Account,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id),
            user_id: ActiveValue::Set(tx.user_id),
            account_id: ActiveValue::Set(tx.account_id),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_cents: ActiveValue::Set(tx.amount.cents()),
            description: ActiveValue::Set(tx.description.clone()),
            category: ActiveValue::Set(tx.category.clone()),
            date: ActiveValue::Set(tx.date),
            paid: ActiveValue::Set(tx.paid),
            paid_at: ActiveValue::Set(tx.paid_at),
            series_id: ActiveValue::Set(tx.series_id),
            installment_number: ActiveValue::Set(tx.installment_number),
            installment_total: ActiveValue::Set(tx.installment_total),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            account_id: model.account_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount: MoneyCents::new(model.amount_cents),
            description: model.description,
            category: model.category,
            date: model.date,
            paid: model.paid,
            paid_at: model.paid_at,
            series_id: model.series_id,
            installment_number: model.installment_number,
            installment_total: model.installment_total,
            created_at: model.created_at,
        })
    }
}
