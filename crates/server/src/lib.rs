use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::{EngineError, LimitCheck};

use serde::Serialize;
pub use server::{run, run_with_listener, spawn_with_listener};

mod accounts;
mod categories;
mod exports;
mod limits;
mod plans;
mod series;
mod server;
mod transactions;
mod user;

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

//TODO: Find a better solution
#[derive(Serialize)]
struct Error {
    error: String,
}

/// Body of a 403 quota denial: the diagnostic counters a client needs to
/// render an upgrade prompt.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QuotaError {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    current: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    plan_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    month_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    feature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    required_plan: Option<String>,
    message: String,
    upgrade_required: bool,
}

impl QuotaError {
    fn from_check(check: LimitCheck) -> Self {
        let message = match (&check.feature, check.limit) {
            (Some(feature), _) => {
                let required = check
                    .required_plan
                    .map(|tier| tier.display_name())
                    .unwrap_or("Premium");
                format!(
                    "The \"{}\" feature requires the {required} plan. Upgrade to get access.",
                    feature.as_str()
                )
            }
            (None, Some(limit)) if check.month_year.is_some() => format!(
                "You have reached the limit of {limit} transactions/month on the {} plan. \
                 Upgrade to create more.",
                check.plan_name
            ),
            (None, Some(limit)) => format!(
                "You have reached the limit of {limit} on the {} plan. Upgrade to create more.",
                check.plan_name
            ),
            (None, None) => format!("Plan limit reached on the {} plan.", check.plan_name),
        };

        Self {
            error: "Plan limit reached".to_string(),
            current: check.current,
            limit: check.limit,
            plan_name: check.plan_name,
            month_year: check.month_year,
            feature: check.feature.map(|f| f.as_str().to_string()),
            required_plan: check.required_plan.map(|tier| tier.display_name().to_string()),
            message,
            upgrade_required: true,
        }
    }
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::QuotaExceeded(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ServerError::Engine(EngineError::QuotaExceeded(check)) => (
                StatusCode::FORBIDDEN,
                Json(QuotaError::from_check(*check)),
            )
                .into_response(),
            ServerError::Engine(err) => {
                let status = status_for_engine_error(&err);
                let error = message_for_engine_error(err);
                (status, Json(Error { error })).into_response()
            }
            ServerError::Generic(err) => {
                (StatusCode::BAD_REQUEST, Json(Error { error: err })).into_response()
            }
        }
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
