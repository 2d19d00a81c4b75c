//! Categories API endpoints.

use api_types::category::{
    CategoriesResponse, CategoryCreate, CategoryUpdate, CategoryView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn map_kind(kind: engine::CategoryKind) -> api_types::TransactionKind {
    match kind {
        engine::CategoryKind::Income => api_types::TransactionKind::Income,
        engine::CategoryKind::Expense => api_types::TransactionKind::Expense,
    }
}

fn map_kind_in(kind: api_types::TransactionKind) -> engine::CategoryKind {
    match kind {
        api_types::TransactionKind::Income => engine::CategoryKind::Income,
        api_types::TransactionKind::Expense => engine::CategoryKind::Expense,
    }
}

fn map_category(category: engine::Category) -> CategoryView {
    CategoryView {
        id: category.id,
        name: category.name,
        kind: map_kind(category.kind),
        color: category.color,
        icon: category.icon,
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<CategoryCreate>,
) -> Result<(StatusCode, Json<CategoryView>), ServerError> {
    let category = state
        .engine
        .create_category(
            user.id,
            engine::NewCategory {
                name: payload.name,
                kind: payload
                    .kind
                    .map(map_kind_in)
                    .unwrap_or(engine::CategoryKind::Expense),
                color: payload.color,
                icon: payload.icon,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(map_category(category))))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<CategoriesResponse>, ServerError> {
    let categories = state
        .engine
        .list_categories(user.id)
        .await?
        .into_iter()
        .map(map_category)
        .collect();

    Ok(Json(CategoriesResponse { categories }))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryUpdate>,
) -> Result<Json<CategoryView>, ServerError> {
    let category = state
        .engine
        .update_category(
            user.id,
            id,
            engine::CategoryUpdate {
                name: payload.name,
                kind: payload.kind.map(map_kind_in),
                color: payload.color,
                icon: payload.icon,
            },
        )
        .await?;

    Ok(Json(map_category(category)))
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_category(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
