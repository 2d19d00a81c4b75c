use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{accounts, categories, exports, limits, plans, series, transactions, user};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Email.eq(auth_header.username()))
        .filter(user::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route(
            "/transactions",
            post(transactions::create).get(transactions::list),
        )
        .route("/transactions/summary", get(transactions::summary))
        .route(
            "/transactions/{id}",
            get(transactions::get_one)
                .put(transactions::update)
                .delete(transactions::remove),
        )
        .route("/series", post(series::create))
        .route(
            "/series/{series_id}",
            get(series::get_series)
                .put(series::update)
                .delete(series::delete_forward),
        )
        .route("/series/{series_id}/pay", post(series::pay_forward))
        .route("/limits", get(limits::info))
        .route("/limits/transactions", get(limits::transactions))
        .route("/limits/categories", get(limits::categories))
        .route("/limits/accounts", get(limits::accounts))
        .route("/limits/features/{feature}", get(limits::feature))
        .route(
            "/categories",
            post(categories::create).get(categories::list),
        )
        .route(
            "/categories/{id}",
            axum::routing::put(categories::update).delete(categories::remove),
        )
        .route("/accounts", post(accounts::create).get(accounts::list))
        .route(
            "/accounts/{id}",
            get(accounts::get_one)
                .put(accounts::update)
                .delete(accounts::remove),
        )
        .route(
            "/exports/transactions.csv",
            get(exports::transactions_csv),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        // Pricing is public: it backs the upgrade prompt shown to
        // unauthenticated visitors too.
        .route("/plans", get(plans::list))
        .with_state(state)
}

pub async fn run(engine: Engine, db: DatabaseConnection) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, header};
    use base64::Engine as _;
    use http_body_util::BodyExt;
    use migration::MigratorTrait;
    use sea_orm::{ActiveValue, Database};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn test_router() -> Router {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();

        let user = user::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            email: ActiveValue::Set("alice@example.com".to_string()),
            name: ActiveValue::Set("Alice".to_string()),
            password: ActiveValue::Set("password".to_string()),
            plan_id: ActiveValue::Set(None),
        };
        user::Entity::insert(user).exec(&db).await.unwrap();

        let engine = engine::Engine::builder()
            .database(db.clone())
            .build()
            .await
            .unwrap();
        router(ServerState {
            engine: Arc::new(engine),
            db,
        })
    }

    fn basic_auth(email: &str, password: &str) -> String {
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{email}:{password}"));
        format!("Basic {encoded}")
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn wrong_credentials_are_rejected() {
        let router = test_router().await;

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/limits")
                    .header(header::AUTHORIZATION, basic_auth("alice@example.com", "nope"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn limits_endpoint_reports_the_free_plan() {
        let router = test_router().await;

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/limits")
                    .header(
                        header::AUTHORIZATION,
                        basic_auth("alice@example.com", "password"),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["plan"]["name"], "Gratuito");
        assert_eq!(body["limits"]["transactions"]["limit"], 10);
        assert_eq!(body["limits"]["transactions"]["allowed"], true);
        assert_eq!(body["limits"]["accounts"]["limit"], 1);
    }

    #[tokio::test]
    async fn category_quota_denial_carries_the_upgrade_payload() {
        let router = test_router().await;
        let auth = basic_auth("alice@example.com", "password");

        for name in ["Food", "Rent", "Transport"] {
            let response = router
                .clone()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/categories")
                        .header(header::AUTHORIZATION, auth.clone())
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(Body::from(
                            serde_json::to_vec(&json!({ "name": name })).unwrap(),
                        ))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/categories")
                    .header(header::AUTHORIZATION, auth)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::to_vec(&json!({ "name": "Leisure" })).unwrap(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = body_json(response).await;
        assert_eq!(body["current"], 3);
        assert_eq!(body["limit"], 3);
        assert_eq!(body["planName"], "Gratuito");
        assert_eq!(body["upgradeRequired"], true);
    }

    #[tokio::test]
    async fn unknown_feature_names_are_premium_gated() {
        let router = test_router().await;

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/limits/features/teleportation")
                    .header(
                        header::AUTHORIZATION,
                        basic_auth("alice@example.com", "password"),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["allowed"], false);
        assert_eq!(body["requiredPlan"], "Premium");
    }

    #[tokio::test]
    async fn plans_listing_needs_no_auth() {
        let router = test_router().await;

        let response = router
            .oneshot(Request::builder().uri("/plans").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn csv_export_is_feature_gated() {
        let router = test_router().await;

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/exports/transactions.csv")
                    .header(
                        header::AUTHORIZATION,
                        basic_auth("alice@example.com", "password"),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = body_json(response).await;
        assert_eq!(body["feature"], "excelExport");
        assert_eq!(body["requiredPlan"], "Pro");
        assert_eq!(body["upgradeRequired"], true);
    }
}
