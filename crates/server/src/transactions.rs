//! Transactions API endpoints

use api_types::transaction::{
    TransactionCreate, TransactionListQuery, TransactionListResponse, TransactionUpdate,
    TransactionView, TransactionsSummaryResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

pub(crate) fn map_kind(kind: engine::TransactionKind) -> api_types::TransactionKind {
    match kind {
        engine::TransactionKind::Income => api_types::TransactionKind::Income,
        engine::TransactionKind::Expense => api_types::TransactionKind::Expense,
    }
}

pub(crate) fn map_kind_in(kind: api_types::TransactionKind) -> engine::TransactionKind {
    match kind {
        api_types::TransactionKind::Income => engine::TransactionKind::Income,
        api_types::TransactionKind::Expense => engine::TransactionKind::Expense,
    }
}

pub(crate) fn map_transaction(tx: engine::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        kind: map_kind(tx.kind),
        amount_cents: tx.amount.cents(),
        account_id: tx.account_id,
        description: tx.description,
        category: tx.category,
        date: tx.date,
        paid: tx.paid,
        paid_at: tx.paid_at,
        series_id: tx.series_id,
        installment_number: tx.installment_number,
        installment_total: tx.installment_total,
        created_at: tx.created_at,
    }
}

pub(crate) fn new_transaction_from(payload: TransactionCreate) -> engine::NewTransaction {
    engine::NewTransaction {
        account_id: payload.account_id,
        kind: payload.kind.map(map_kind_in),
        amount: engine::MoneyCents::new(payload.amount_cents),
        description: payload.description,
        category: payload.category,
        date: payload.date,
        paid: payload.paid,
        paid_at: payload.paid_at,
        series_id: payload.series_id,
        installment_number: payload.installment_number,
        installment_total: payload.installment_total,
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionCreate>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let tx = state
        .engine
        .create_transaction(user.id, new_transaction_from(payload))
        .await?;

    Ok((StatusCode::CREATED, Json(map_transaction(tx))))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let limit = query.limit.unwrap_or(50);
    let filter = engine::TransactionListFilter {
        kind: query.kind.map(map_kind_in),
        category: query.category,
        account_id: query.account_id,
        from: query.start_date,
        to: query.end_date,
    };

    let (txs, next_cursor) = state
        .engine
        .list_transactions(user.id, limit, query.cursor.as_deref(), &filter)
        .await?;

    Ok(Json(TransactionListResponse {
        transactions: txs.into_iter().map(map_transaction).collect(),
        next_cursor,
    }))
}

pub async fn get_one(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.engine.transaction(user.id, id).await?;
    Ok(Json(map_transaction(tx)))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state
        .engine
        .update_transaction(
            user.id,
            id,
            engine::UpdateTransaction {
                account_id: payload.account_id,
                kind: payload.kind.map(map_kind_in),
                amount: payload.amount_cents.map(engine::MoneyCents::new),
                description: payload.description,
                category: payload.category,
                date: payload.date,
                paid: payload.paid,
                paid_at: payload.paid_at,
            },
        )
        .await?;

    Ok(Json(map_transaction(tx)))
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_transaction(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn summary(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<TransactionsSummaryResponse>, ServerError> {
    let summary = state.engine.transactions_summary(user.id).await?;
    Ok(Json(TransactionsSummaryResponse {
        income_cents: summary.income.cents(),
        expense_cents: summary.expense.cents(),
        balance_cents: summary.balance.cents(),
        total_transactions: summary.total_transactions,
    }))
}
