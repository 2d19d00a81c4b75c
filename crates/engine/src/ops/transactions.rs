//! Single-transaction operations: admission-controlled create, reads with
//! keyset pagination, update, delete and totals.

use base64::Engine as _;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    Condition, ConnectionTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Statement,
    TransactionTrait, prelude::*,
};

use crate::{
    EngineError, MoneyCents, ResultEngine, Transaction, TransactionKind, transactions,
};

use super::{Engine, limits::deny_if_blocked, normalize_optional_text, with_tx};

/// Payload for creating one transaction (also one series installment).
///
/// `date` defaults to the current date; `paid` defaults to `false`; setting
/// `paid` without `paid_at` stamps the current date.
#[derive(Clone, Debug, Default)]
pub struct NewTransaction {
    pub account_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    pub amount: MoneyCents,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    pub paid: Option<bool>,
    pub paid_at: Option<NaiveDate>,
    pub series_id: Option<Uuid>,
    pub installment_number: Option<i32>,
    pub installment_total: Option<i32>,
}

/// Patch for a stored transaction. Absent fields are left untouched;
/// `paid = false` clears `paid_at`.
#[derive(Clone, Debug, Default)]
pub struct UpdateTransaction {
    pub account_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    pub amount: Option<MoneyCents>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    pub paid: Option<bool>,
    pub paid_at: Option<NaiveDate>,
}

/// Filters for listing transactions. `from`/`to` are both inclusive, on the
/// stored calendar `date`.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    pub account_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Income/expense totals over the user's whole ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionsSummary {
    pub income: MoneyCents,
    pub expense: MoneyCents,
    pub balance: MoneyCents,
    pub total_transactions: u64,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from > to
    {
        return Err(EngineError::Validation(
            "invalid range: from must be <= to".to_string(),
        ));
    }
    Ok(())
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionListFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionListFilter) -> Self {
        if let Some(kind) = filter.kind {
            self = self.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(category) = &filter.category {
            self = self.filter(transactions::Column::Category.eq(category.clone()));
        }
        if let Some(account_id) = filter.account_id {
            self = self.filter(transactions::Column::AccountId.eq(account_id));
        }
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::Date.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(transactions::Column::Date.lte(to));
        }
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TransactionsCursor {
    date: NaiveDate,
    transaction_id: Uuid,
}

impl TransactionsCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::Validation("invalid transactions cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::Validation("invalid transactions cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::Validation("invalid transactions cursor".to_string()))
    }
}

/// Normalizes a creation payload into a full row.
///
/// Shared by single create and bulk series create so both apply the same
/// date default and paid/paid_at rules.
pub(super) fn build_transaction(
    user_id: Uuid,
    new: NewTransaction,
    today: NaiveDate,
) -> ResultEngine<Transaction> {
    let kind = new
        .kind
        .ok_or_else(|| EngineError::Validation("type is required".to_string()))?;

    if new.amount.is_negative() {
        return Err(EngineError::Validation(
            "amount must be >= 0".to_string(),
        ));
    }

    if let Some(number) = new.installment_number
        && number < 1
    {
        return Err(EngineError::Validation(
            "installmentNumber must be >= 1".to_string(),
        ));
    }
    if let Some(total) = new.installment_total
        && total < 1
    {
        return Err(EngineError::Validation(
            "installmentTotal must be >= 1".to_string(),
        ));
    }
    if let (Some(number), Some(total)) = (new.installment_number, new.installment_total)
        && number > total
    {
        return Err(EngineError::Validation(
            "installmentNumber must not exceed installmentTotal".to_string(),
        ));
    }
    if new.installment_number.is_some() && new.series_id.is_none() {
        return Err(EngineError::Validation(
            "installment metadata requires a seriesId".to_string(),
        ));
    }

    let paid = new.paid.unwrap_or(false);
    let paid_at = if paid {
        Some(new.paid_at.unwrap_or(today))
    } else {
        None
    };

    Ok(Transaction {
        id: Uuid::new_v4(),
        user_id,
        account_id: new.account_id,
        kind,
        amount: new.amount,
        description: normalize_optional_text(new.description.as_deref()),
        category: normalize_optional_text(new.category.as_deref()),
        date: new.date.unwrap_or(today),
        paid,
        paid_at,
        series_id: new.series_id,
        installment_number: new.installment_number,
        installment_total: new.installment_total,
        created_at: Utc::now(),
    })
}

impl Engine {
    /// Creates one transaction.
    ///
    /// The monthly quota is checked inside the same store transaction as the
    /// insert, against the month of the row's own `date`; a denial aborts
    /// with [`EngineError::QuotaExceeded`] and writes nothing.
    pub async fn create_transaction(
        &self,
        user_id: Uuid,
        new: NewTransaction,
    ) -> ResultEngine<Transaction> {
        let today = Utc::now().date_naive();
        let row = build_transaction(user_id, new, today)?;
        let plan = self.user_plan(user_id).await;
        let limits = self.plan_limits(&plan);

        with_tx!(self, |db_tx| {
            let check = self
                .transaction_quota_check(&db_tx, &limits, user_id, row.date, 1)
                .await?;
            deny_if_blocked(check)?;

            let model = transactions::ActiveModel::from(&row).insert(&db_tx).await?;
            Transaction::try_from(model)
        })
    }

    pub async fn transaction(&self, user_id: Uuid, id: Uuid) -> ResultEngine<Transaction> {
        let model = transactions::Entity::find_by_id(id)
            .filter(transactions::Column::UserId.eq(user_id))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
        Transaction::try_from(model)
    }

    /// Lists the user's transactions, newest date first, with keyset
    /// pagination by `(date DESC, id DESC)` and an opaque base64 cursor.
    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        limit: u64,
        cursor: Option<&str>,
        filter: &TransactionListFilter,
    ) -> ResultEngine<(Vec<Transaction>, Option<String>)> {
        validate_list_filter(filter)?;

        let limit_plus_one = limit.saturating_add(1);
        let mut query = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .order_by_desc(transactions::Column::Date)
            .order_by_desc(transactions::Column::Id)
            .limit(limit_plus_one);

        if let Some(cursor) = cursor {
            let cursor = TransactionsCursor::decode(cursor)?;
            query = query.filter(
                Condition::any()
                    .add(transactions::Column::Date.lt(cursor.date))
                    .add(
                        Condition::all()
                            .add(transactions::Column::Date.eq(cursor.date))
                            .add(transactions::Column::Id.lt(cursor.transaction_id)),
                    ),
            );
        }
        query = query.apply_tx_filters(filter);

        let rows: Vec<transactions::Model> = query.all(&self.database).await?;
        let has_more = rows.len() > limit as usize;

        let mut out: Vec<Transaction> = Vec::with_capacity(rows.len().min(limit as usize));
        for model in rows.into_iter().take(limit as usize) {
            out.push(Transaction::try_from(model)?);
        }

        let next_cursor = out.last().map(|tx| TransactionsCursor {
            date: tx.date,
            transaction_id: tx.id,
        });
        let next_cursor = if has_more {
            next_cursor.map(|c| c.encode()).transpose()?
        } else {
            None
        };

        Ok((out, next_cursor))
    }

    /// Updates a stored transaction; `paid` changes re-apply the
    /// paid/paid_at invariant.
    pub async fn update_transaction(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: UpdateTransaction,
    ) -> ResultEngine<Transaction> {
        if let Some(amount) = patch.amount
            && amount.is_negative()
        {
            return Err(EngineError::Validation(
                "amount must be >= 0".to_string(),
            ));
        }

        let today = Utc::now().date_naive();

        with_tx!(self, |db_tx| {
            let model = transactions::Entity::find_by_id(id)
                .filter(transactions::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;

            let was_paid = model.paid;
            let stored_paid_at = model.paid_at;
            let mut active: transactions::ActiveModel = model.into();

            if let Some(account_id) = patch.account_id {
                active.account_id = sea_orm::ActiveValue::Set(Some(account_id));
            }
            if let Some(kind) = patch.kind {
                active.kind = sea_orm::ActiveValue::Set(kind.as_str().to_string());
            }
            if let Some(amount) = patch.amount {
                active.amount_cents = sea_orm::ActiveValue::Set(amount.cents());
            }
            if let Some(description) = patch.description.as_deref() {
                active.description = sea_orm::ActiveValue::Set(normalize_optional_text(Some(description)));
            }
            if let Some(category) = patch.category.as_deref() {
                active.category = sea_orm::ActiveValue::Set(normalize_optional_text(Some(category)));
            }
            if let Some(date) = patch.date {
                active.date = sea_orm::ActiveValue::Set(date);
            }

            match (patch.paid, patch.paid_at) {
                (Some(true), paid_at) => {
                    active.paid = sea_orm::ActiveValue::Set(true);
                    let stamped = paid_at.or(stored_paid_at).unwrap_or(today);
                    active.paid_at = sea_orm::ActiveValue::Set(Some(stamped));
                }
                (Some(false), _) => {
                    active.paid = sea_orm::ActiveValue::Set(false);
                    active.paid_at = sea_orm::ActiveValue::Set(None);
                }
                (None, Some(paid_at)) => {
                    if !was_paid {
                        return Err(EngineError::Validation(
                            "paidAt requires paid=true".to_string(),
                        ));
                    }
                    active.paid_at = sea_orm::ActiveValue::Set(Some(paid_at));
                }
                (None, None) => {}
            }

            let updated = active.update(&db_tx).await?;
            Transaction::try_from(updated)
        })
    }

    pub async fn delete_transaction(&self, user_id: Uuid, id: Uuid) -> ResultEngine<()> {
        let result = transactions::Entity::delete_many()
            .filter(transactions::Column::Id.eq(id))
            .filter(transactions::Column::UserId.eq(user_id))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound("transaction not exists".to_string()));
        }
        Ok(())
    }

    /// Returns income/expense totals and the overall balance for a user.
    pub async fn transactions_summary(&self, user_id: Uuid) -> ResultEngine<TransactionsSummary> {
        let backend = self.database.get_database_backend();

        let mut totals = [0i64; 2];
        for (slot, kind) in totals
            .iter_mut()
            .zip([TransactionKind::Income, TransactionKind::Expense])
        {
            let stmt = Statement::from_sql_and_values(
                backend,
                "SELECT COALESCE(SUM(amount_cents), 0) AS sum \
                 FROM transactions \
                 WHERE user_id = ? AND kind = ?",
                vec![user_id.into(), kind.as_str().into()],
            );
            let row = self.database.query_one(stmt).await?;
            *slot = row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0);
        }

        let total_transactions = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .count(&self.database)
            .await?;

        let income = MoneyCents::new(totals[0]);
        let expense = MoneyCents::new(totals[1]);
        Ok(TransactionsSummary {
            income,
            expense,
            balance: income - expense,
            total_transactions,
        })
    }
}
