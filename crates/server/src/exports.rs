//! CSV export of a user's ledger, gated on the export feature of the plan.

use axum::{
    Extension,
    extract::State,
    http::header,
    response::IntoResponse,
};
use engine::{EngineError, Feature, TransactionListFilter};

use crate::{ServerError, server::ServerState, user};

const EXPORT_ROW_LIMIT: u64 = 10_000;

pub async fn transactions_csv(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<impl IntoResponse, ServerError> {
    let access = state
        .engine
        .can_access_feature(user.id, Feature::ExcelExport)
        .await;
    if !access.allowed {
        return Err(ServerError::Engine(EngineError::QuotaExceeded(Box::new(
            access,
        ))));
    }

    let (txs, _) = state
        .engine
        .list_transactions(
            user.id,
            EXPORT_ROW_LIMIT,
            None,
            &TransactionListFilter::default(),
        )
        .await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "date",
            "type",
            "amountCents",
            "category",
            "description",
            "paid",
            "paidAt",
        ])
        .map_err(|err| ServerError::Generic(err.to_string()))?;

    for tx in txs {
        writer
            .write_record([
                tx.date.to_string(),
                tx.kind.as_str().to_string(),
                tx.amount.cents().to_string(),
                tx.category.unwrap_or_default(),
                tx.description.unwrap_or_default(),
                tx.paid.to_string(),
                tx.paid_at.map(|d| d.to_string()).unwrap_or_default(),
            ])
            .map_err(|err| ServerError::Generic(err.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| ServerError::Generic(err.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.csv\"",
            ),
        ],
        bytes,
    ))
}
