use sea_orm::DatabaseConnection;

use crate::{EngineError, PlanCatalog, ResultEngine};

mod accounts;
mod categories;
mod limits;
mod plans;
mod series;
mod transactions;

pub use accounts::{AccountUpdate, NewAccount};
pub use categories::{CategoryUpdate, NewCategory};
pub use limits::LimitsInfo;
pub use plans::PlanSpec;
pub use series::{MarkSeriesPaid, SeriesUpdate};
pub use transactions::{
    NewTransaction, TransactionListFilter, TransactionsSummary, UpdateTransaction,
};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    catalog: PlanCatalog,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    catalog: Option<PlanCatalog>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Override the built-in plan quota catalog.
    pub fn plan_catalog(mut self, catalog: PlanCatalog) -> EngineBuilder {
        self.catalog = Some(catalog);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            catalog: self.catalog.unwrap_or_default(),
        })
    }
}
