//! Plan-limits API endpoints: the read-only checks a client polls to render
//! usage meters and upgrade prompts. The enforcing checks run inside the
//! engine's create operations; these endpoints never mutate anything.

use api_types::limits::{LimitCheckView, LimitsBreakdown, LimitsInfoResponse, PlanSummary};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use engine::{Feature, LimitCheck, PlanTier};

use crate::{ServerError, server::ServerState, user};

pub(crate) fn map_check(check: LimitCheck) -> LimitCheckView {
    LimitCheckView {
        allowed: check.allowed,
        current: check.current,
        limit: check.limit,
        remaining: check.remaining,
        plan_name: check.plan_name,
        month_year: check.month_year,
        feature: check.feature.map(|f| f.as_str().to_string()),
        required_plan: check.required_plan.map(|tier| tier.display_name().to_string()),
    }
}

pub async fn info(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<LimitsInfoResponse>, ServerError> {
    let info = state.engine.user_limits_info(user.id).await?;

    Ok(Json(LimitsInfoResponse {
        plan: PlanSummary {
            id: info.plan.id,
            name: info.plan.name,
            price_cents: info.plan.price.cents(),
        },
        limits: LimitsBreakdown {
            transactions: map_check(info.transactions),
            categories: map_check(info.categories),
            accounts: map_check(info.accounts),
        },
        features: info
            .features
            .into_iter()
            .map(|f| f.as_str().to_string())
            .collect(),
    }))
}

pub async fn transactions(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<LimitCheckView>, ServerError> {
    let check = state.engine.can_create_transaction(user.id, None).await?;
    Ok(Json(map_check(check)))
}

pub async fn categories(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<LimitCheckView>, ServerError> {
    let check = state.engine.can_create_category(user.id).await?;
    Ok(Json(map_check(check)))
}

pub async fn accounts(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<LimitCheckView>, ServerError> {
    let check = state.engine.can_create_account(user.id).await?;
    Ok(Json(map_check(check)))
}

/// Feature checks parse against the closed feature set; an unknown name is
/// not an error but an explicit "requires Premium" denial, the most
/// restrictive reading.
pub async fn feature(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(feature_name): Path<String>,
) -> Result<Json<LimitCheckView>, ServerError> {
    match Feature::try_from(feature_name.as_str()) {
        Ok(feature) => {
            let check = state.engine.can_access_feature(user.id, feature).await;
            Ok(Json(map_check(check)))
        }
        Err(_) => {
            let plan = state.engine.user_plan(user.id).await;
            Ok(Json(LimitCheckView {
                allowed: false,
                current: None,
                limit: None,
                remaining: None,
                plan_name: plan.name,
                month_year: None,
                feature: Some(feature_name),
                required_plan: Some(PlanTier::Premium.display_name().to_string()),
            }))
        }
    }
}
