//! Installment series aggregate.
//!
//! A series is not a stored entity of its own: it is the set of transaction
//! rows sharing one `series_id` and one owner. This aggregate makes the
//! "all rows of a series" rule structural instead of a query-time
//! convention: building it checks ownership, the shared id and the
//! installment ordering.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, Transaction};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub id: Uuid,
    pub user_id: Uuid,
    pub installment_total: Option<i32>,
    /// Ordered by `installment_number` ascending.
    pub installments: Vec<Transaction>,
}

impl Series {
    /// Builds the aggregate from rows fetched for one series id and owner.
    ///
    /// Rows must all carry the expected `series_id` and `user_id`, and their
    /// installment numbers must be present, unique and ascending with `date`.
    pub fn from_rows(id: Uuid, user_id: Uuid, mut rows: Vec<Transaction>) -> ResultEngine<Self> {
        if rows.is_empty() {
            return Err(EngineError::KeyNotFound(id.to_string()));
        }

        for row in &rows {
            if row.series_id != Some(id) || row.user_id != user_id {
                return Err(EngineError::Validation(format!(
                    "row {} does not belong to series {id}",
                    row.id
                )));
            }
            if row.installment_number.is_none() {
                return Err(EngineError::Validation(format!(
                    "row {} is missing its installment number",
                    row.id
                )));
            }
        }

        rows.sort_by_key(|row| row.installment_number);

        for pair in rows.windows(2) {
            if pair[0].installment_number == pair[1].installment_number {
                return Err(EngineError::Validation(format!(
                    "duplicate installment number in series {id}"
                )));
            }
            if pair[0].date > pair[1].date {
                return Err(EngineError::Validation(format!(
                    "installment dates out of order in series {id}"
                )));
            }
        }

        let installment_total = rows[0].installment_total;

        Ok(Self {
            id,
            user_id,
            installment_total,
            installments: rows,
        })
    }

    pub fn len(&self) -> usize {
        self.installments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.installments.is_empty()
    }
}
