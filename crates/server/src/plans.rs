//! Public plan listing.

use api_types::plan::{PlanView, PlansResponse};
use axum::{Json, extract::State};

use crate::{ServerError, server::ServerState};

pub async fn list(State(state): State<ServerState>) -> Result<Json<PlansResponse>, ServerError> {
    let plans = state
        .engine
        .list_plans()
        .await?
        .into_iter()
        .filter_map(|plan| {
            // The synthetic Free plan has no row and never shows up here;
            // stored rows always carry an id.
            let id = plan.id?;
            Some(PlanView {
                id,
                name: plan.name,
                price_cents: plan.price.cents(),
                max_transactions: plan.max_transactions,
                max_categories: plan.max_categories,
                max_accounts: plan.max_accounts,
                max_users: plan.max_users,
            })
        })
        .collect();

    Ok(Json(PlansResponse { plans }))
}
