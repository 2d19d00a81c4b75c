//! Accounts API endpoints.

use api_types::account::{
    AccountCreate, AccountDeleteQuery, AccountListQuery, AccountUpdate, AccountView,
    AccountsResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn map_type(account_type: engine::AccountType) -> api_types::account::AccountType {
    match account_type {
        engine::AccountType::Checking => api_types::account::AccountType::Checking,
        engine::AccountType::Savings => api_types::account::AccountType::Savings,
        engine::AccountType::Investment => api_types::account::AccountType::Investment,
        engine::AccountType::Digital => api_types::account::AccountType::Digital,
    }
}

fn map_type_in(account_type: api_types::account::AccountType) -> engine::AccountType {
    match account_type {
        api_types::account::AccountType::Checking => engine::AccountType::Checking,
        api_types::account::AccountType::Savings => engine::AccountType::Savings,
        api_types::account::AccountType::Investment => engine::AccountType::Investment,
        api_types::account::AccountType::Digital => engine::AccountType::Digital,
    }
}

fn map_account(account: engine::Account) -> AccountView {
    AccountView {
        id: account.id,
        name: account.name,
        bank_name: account.bank_name,
        account_type: map_type(account.account_type),
        opening_balance_cents: account.opening_balance.cents(),
        current_balance_cents: account.current_balance.cents(),
        archived: account.archived,
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<AccountCreate>,
) -> Result<(StatusCode, Json<AccountView>), ServerError> {
    let opening_balance = engine::MoneyCents::new(payload.opening_balance_cents.unwrap_or(0));
    let account = state
        .engine
        .create_account(
            user.id,
            engine::NewAccount {
                name: payload.name,
                bank_name: payload.bank_name,
                account_type: payload.account_type.map(map_type_in).unwrap_or_default(),
                opening_balance,
                current_balance: payload.current_balance_cents.map(engine::MoneyCents::new),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(map_account(account))))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<AccountListQuery>,
) -> Result<Json<AccountsResponse>, ServerError> {
    let accounts = state
        .engine
        .list_accounts(user.id, query.include_archived.unwrap_or(false))
        .await?
        .into_iter()
        .map(map_account)
        .collect();

    Ok(Json(AccountsResponse { accounts }))
}

pub async fn get_one(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountView>, ServerError> {
    let account = state.engine.account(user.id, id).await?;
    Ok(Json(map_account(account)))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AccountUpdate>,
) -> Result<Json<AccountView>, ServerError> {
    let account = state
        .engine
        .update_account(
            user.id,
            id,
            engine::AccountUpdate {
                name: payload.name,
                bank_name: payload.bank_name,
                account_type: payload.account_type.map(map_type_in),
                current_balance: payload.current_balance_cents.map(engine::MoneyCents::new),
                archived: payload.archived,
            },
        )
        .await?;

    Ok(Json(map_account(account)))
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AccountDeleteQuery>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_account(user.id, id, query.archive.unwrap_or(false))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
