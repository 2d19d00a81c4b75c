//! Installment series operations: atomic bulk create, whole-series update,
//! and the forward-dated bulk mutations.
//!
//! "Forward" means an inclusive lower bound on the stored `date`: an
//! installment dated exactly on `from_date` is affected. Every predicate
//! here ANDs the owning user; a `series_id` alone is never a sufficient
//! key.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Utc};
use sea_orm::{
    ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, ResultEngine, Series, Transaction, transactions,
};

use super::{
    Engine, limits::deny_if_blocked, normalize_optional_text,
    transactions::{NewTransaction, build_transaction},
    with_tx,
};

/// Shared-field patch applied to every row of a series.
#[derive(Clone, Debug, Default)]
pub struct SeriesUpdate {
    pub description: Option<String>,
    pub category: Option<String>,
    pub amount: Option<MoneyCents>,
    pub account_id: Option<Uuid>,
}

impl SeriesUpdate {
    fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.category.is_none()
            && self.amount.is_none()
            && self.account_id.is_none()
    }
}

/// Forward-dated paid-status change.
///
/// `paid` is required: absence is a validation error, never a silent no-op.
#[derive(Clone, Debug, Default)]
pub struct MarkSeriesPaid {
    pub from_date: Option<NaiveDate>,
    pub paid: Option<bool>,
    pub paid_at: Option<NaiveDate>,
}

impl Engine {
    /// Creates a whole installment series in one atomic batch.
    ///
    /// Every row must carry the shared `series_id` and a unique
    /// `installment_number`; rows go through the same date/paid
    /// normalization as single create. The monthly quota is checked per
    /// distinct target month, inside the same store transaction as the
    /// insert, so either all installments are persisted or none are.
    pub async fn create_series(
        &self,
        user_id: Uuid,
        rows: Vec<NewTransaction>,
    ) -> ResultEngine<Series> {
        if rows.is_empty() {
            return Err(EngineError::Validation(
                "series must contain at least one installment".to_string(),
            ));
        }

        let today = Utc::now().date_naive();
        let mut installments = Vec::with_capacity(rows.len());
        for row in rows {
            installments.push(build_transaction(user_id, row, today)?);
        }

        let series_id = installments[0]
            .series_id
            .ok_or_else(|| EngineError::Validation("seriesId is required".to_string()))?;
        let mut numbers = Vec::with_capacity(installments.len());
        for tx in &installments {
            if tx.series_id != Some(series_id) {
                return Err(EngineError::Validation(
                    "all installments must share one seriesId".to_string(),
                ));
            }
            let number = tx.installment_number.ok_or_else(|| {
                EngineError::Validation("installmentNumber is required".to_string())
            })?;
            numbers.push(number);
        }
        numbers.sort_unstable();
        if numbers.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(EngineError::Validation(
                "installmentNumber values must be unique within a series".to_string(),
            ));
        }

        let plan = self.user_plan(user_id).await;
        let limits = self.plan_limits(&plan);

        with_tx!(self, |db_tx| {
            let mut per_month: BTreeMap<(i32, u32), (NaiveDate, u64)> = BTreeMap::new();
            for tx in &installments {
                let entry = per_month
                    .entry((tx.date.year(), tx.date.month()))
                    .or_insert((tx.date, 0));
                entry.1 += 1;
            }
            for (date, requested) in per_month.into_values() {
                let check = self
                    .transaction_quota_check(&db_tx, &limits, user_id, date, requested)
                    .await?;
                deny_if_blocked(check)?;
            }

            let models = installments.iter().map(|tx| transactions::ActiveModel::from(tx));
            transactions::Entity::insert_many(models).exec(&db_tx).await?;

            let stored = series_rows(&db_tx, user_id, series_id, None).await?;
            Series::from_rows(series_id, user_id, stored)
        })
    }

    /// Returns the whole series owned by the user, installments ascending.
    pub async fn series(&self, user_id: Uuid, series_id: Uuid) -> ResultEngine<Series> {
        let rows = series_rows(&self.database, user_id, series_id, None).await?;
        Series::from_rows(series_id, user_id, rows)
    }

    /// Applies a shared-field update across every installment of the series.
    pub async fn update_series(
        &self,
        user_id: Uuid,
        series_id: Uuid,
        patch: SeriesUpdate,
    ) -> ResultEngine<Series> {
        if patch.is_empty() {
            return Err(EngineError::Validation("nothing to update".to_string()));
        }
        if let Some(amount) = patch.amount
            && amount.is_negative()
        {
            return Err(EngineError::Validation(
                "amount must be >= 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let mut update = transactions::Entity::update_many()
                .filter(transactions::Column::SeriesId.eq(series_id))
                .filter(transactions::Column::UserId.eq(user_id));

            if let Some(description) = patch.description.as_deref() {
                update = update.col_expr(
                    transactions::Column::Description,
                    Expr::value(normalize_optional_text(Some(description))),
                );
            }
            if let Some(category) = patch.category.as_deref() {
                update = update.col_expr(
                    transactions::Column::Category,
                    Expr::value(normalize_optional_text(Some(category))),
                );
            }
            if let Some(amount) = patch.amount {
                update = update.col_expr(
                    transactions::Column::AmountCents,
                    Expr::value(amount.cents()),
                );
            }
            if let Some(account_id) = patch.account_id {
                update = update.col_expr(
                    transactions::Column::AccountId,
                    Expr::value(Some(account_id)),
                );
            }

            let result = update.exec(&db_tx).await?;
            if result.rows_affected == 0 {
                return Err(EngineError::KeyNotFound(series_id.to_string()));
            }

            let stored = series_rows(&db_tx, user_id, series_id, None).await?;
            Series::from_rows(series_id, user_id, stored)
        })
    }

    /// Sets paid/paid_at on every installment dated on or after `from_date`
    /// (the whole series when absent).
    ///
    /// `paid = true` without a `paid_at` stamps the current date on every
    /// affected row; `paid = false` clears `paid_at`. Returns the affected
    /// rows.
    pub async fn mark_series_paid_forward(
        &self,
        user_id: Uuid,
        series_id: Uuid,
        cmd: MarkSeriesPaid,
    ) -> ResultEngine<Vec<Transaction>> {
        let paid = cmd.paid.ok_or_else(|| {
            EngineError::Validation("paid must be an explicit boolean".to_string())
        })?;
        let paid_at = if paid {
            Some(cmd.paid_at.unwrap_or_else(|| Utc::now().date_naive()))
        } else {
            None
        };

        with_tx!(self, |db_tx| {
            let mut update = transactions::Entity::update_many()
                .filter(transactions::Column::SeriesId.eq(series_id))
                .filter(transactions::Column::UserId.eq(user_id))
                .col_expr(transactions::Column::Paid, Expr::value(paid))
                .col_expr(transactions::Column::PaidAt, Expr::value(paid_at));
            if let Some(from_date) = cmd.from_date {
                update = update.filter(transactions::Column::Date.gte(from_date));
            }

            update.exec(&db_tx).await?;

            series_rows(&db_tx, user_id, series_id, cmd.from_date).await
        })
    }

    /// Deletes every installment dated on or after `from_date` (the whole
    /// series when absent) and returns the deleted rows; the count the
    /// caller reports comes from that set, not a separate count query.
    /// Remaining installments keep their numbers and totals.
    pub async fn delete_series_forward(
        &self,
        user_id: Uuid,
        series_id: Uuid,
        from_date: Option<NaiveDate>,
    ) -> ResultEngine<Vec<Transaction>> {
        with_tx!(self, |db_tx| {
            let doomed = series_rows(&db_tx, user_id, series_id, from_date).await?;

            if !doomed.is_empty() {
                let ids: Vec<Uuid> = doomed.iter().map(|tx| tx.id).collect();
                transactions::Entity::delete_many()
                    .filter(transactions::Column::Id.is_in(ids))
                    .filter(transactions::Column::UserId.eq(user_id))
                    .exec(&db_tx)
                    .await?;
            }

            Ok(doomed)
        })
    }
}

/// Rows of one series owned by one user, installments ascending, optionally
/// restricted to `date >= from_date`.
async fn series_rows<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    series_id: Uuid,
    from_date: Option<NaiveDate>,
) -> ResultEngine<Vec<Transaction>> {
    let mut query = transactions::Entity::find()
        .filter(transactions::Column::SeriesId.eq(series_id))
        .filter(transactions::Column::UserId.eq(user_id))
        .order_by_asc(transactions::Column::InstallmentNumber);
    if let Some(from_date) = from_date {
        query = query.filter(transactions::Column::Date.gte(from_date));
    }

    let models = query.all(conn).await?;
    let mut rows = Vec::with_capacity(models.len());
    for model in models {
        rows.push(Transaction::try_from(model)?);
    }
    Ok(rows)
}
