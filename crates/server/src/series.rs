//! Installment series API endpoints.
//!
//! The forward mutations take an inclusive `fromDate` bound; every
//! operation is scoped to the authenticated owner.

use api_types::series::{
    SeriesDeleteQuery, SeriesDeleteResponse, SeriesPayRequest, SeriesPayResponse,
    SeriesUpdateRequest, SeriesView,
};
use api_types::transaction::TransactionCreate;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    ServerError, server::ServerState,
    transactions::{map_transaction, new_transaction_from},
    user,
};

fn map_series(series: engine::Series) -> SeriesView {
    SeriesView {
        series_id: series.id,
        installment_total: series.installment_total,
        installments: series.installments.into_iter().map(map_transaction).collect(),
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<Vec<TransactionCreate>>,
) -> Result<(StatusCode, Json<SeriesView>), ServerError> {
    let rows = payload.into_iter().map(new_transaction_from).collect();
    let series = state.engine.create_series(user.id, rows).await?;

    Ok((StatusCode::CREATED, Json(map_series(series))))
}

pub async fn get_series(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(series_id): Path<Uuid>,
) -> Result<Json<SeriesView>, ServerError> {
    let series = state.engine.series(user.id, series_id).await?;
    Ok(Json(map_series(series)))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(series_id): Path<Uuid>,
    Json(payload): Json<SeriesUpdateRequest>,
) -> Result<Json<SeriesView>, ServerError> {
    let series = state
        .engine
        .update_series(
            user.id,
            series_id,
            engine::SeriesUpdate {
                description: payload.description,
                category: payload.category,
                amount: payload.amount_cents.map(engine::MoneyCents::new),
                account_id: payload.account_id,
            },
        )
        .await?;

    Ok(Json(map_series(series)))
}

pub async fn pay_forward(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(series_id): Path<Uuid>,
    Json(payload): Json<SeriesPayRequest>,
) -> Result<Json<SeriesPayResponse>, ServerError> {
    let rows = state
        .engine
        .mark_series_paid_forward(
            user.id,
            series_id,
            engine::MarkSeriesPaid {
                from_date: payload.from_date,
                paid: payload.paid,
                paid_at: payload.paid_at,
            },
        )
        .await?;

    Ok(Json(SeriesPayResponse {
        updated_count: rows.len() as u64,
        installments: rows.into_iter().map(map_transaction).collect(),
    }))
}

pub async fn delete_forward(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(series_id): Path<Uuid>,
    Query(query): Query<SeriesDeleteQuery>,
) -> Result<Json<SeriesDeleteResponse>, ServerError> {
    let deleted = state
        .engine
        .delete_series_forward(user.id, series_id, query.from_date)
        .await?;

    Ok(Json(SeriesDeleteResponse {
        deleted_count: deleted.len() as u64,
    }))
}
