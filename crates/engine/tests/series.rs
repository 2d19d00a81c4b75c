use chrono::{NaiveDate, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement, Value};

use engine::{
    Engine, EngineError, MarkSeriesPaid, MoneyCents, NewTransaction, PlanSpec, SeriesUpdate,
    TransactionKind,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db.clone()).build().await.unwrap();
    (engine, db)
}

async fn create_user(db: &DatabaseConnection, email: &str) -> Uuid {
    let id = Uuid::new_v4();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (id, email, name, password, plan_id) VALUES (?, ?, ?, ?, ?)",
        vec![
            id.into(),
            email.into(),
            "Alice".into(),
            "password".into(),
            Value::Uuid(None),
        ],
    ))
    .await
    .unwrap();
    id
}

async fn subscribe_pro(engine: &Engine, user_id: Uuid) {
    let existing = engine
        .list_plans()
        .await
        .unwrap()
        .into_iter()
        .find(|plan| plan.name == "Pro");
    let plan = match existing {
        Some(plan) => plan,
        None => engine
            .create_plan(PlanSpec {
                name: "Pro".to_string(),
                price: MoneyCents::new(29_90),
                max_transactions: None,
                max_categories: None,
                max_accounts: None,
                max_users: None,
            })
            .await
            .unwrap(),
    };
    engine.assign_plan(user_id, plan.id).await.unwrap();
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// Twelve monthly installments dated 2025-01-01 ... 2025-12-01.
fn twelve_installments(series_id: Uuid) -> Vec<NewTransaction> {
    (1..=12)
        .map(|month| NewTransaction {
            kind: Some(TransactionKind::Expense),
            amount: MoneyCents::new(250_00),
            description: Some("Sofa".to_string()),
            date: Some(date(&format!("2025-{month:02}-01"))),
            series_id: Some(series_id),
            installment_number: Some(month),
            installment_total: Some(12),
            ..Default::default()
        })
        .collect()
}

#[tokio::test]
async fn bulk_create_returns_the_ordered_series() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;
    subscribe_pro(&engine, user).await;

    let series_id = Uuid::new_v4();
    let mut rows = twelve_installments(series_id);
    rows.reverse();

    let series = engine.create_series(user, rows).await.unwrap();
    assert_eq!(series.id, series_id);
    assert_eq!(series.installment_total, Some(12));
    assert_eq!(series.len(), 12);
    let numbers: Vec<_> = series
        .installments
        .iter()
        .map(|tx| tx.installment_number)
        .collect();
    assert_eq!(numbers, (1..=12).map(Some).collect::<Vec<_>>());
    assert!(series.installments.iter().all(|tx| !tx.paid));
}

#[tokio::test]
async fn empty_bulk_is_rejected() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;

    let err = engine.create_series(user, Vec::new()).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn bulk_rows_must_carry_series_metadata() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;

    let err = engine
        .create_series(
            user,
            vec![NewTransaction {
                kind: Some(TransactionKind::Expense),
                amount: MoneyCents::new(100),
                ..Default::default()
            }],
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("seriesId is required".to_string())
    );

    let series_id = Uuid::new_v4();
    let err = engine
        .create_series(
            user,
            vec![
                NewTransaction {
                    kind: Some(TransactionKind::Expense),
                    amount: MoneyCents::new(100),
                    series_id: Some(series_id),
                    installment_number: Some(1),
                    installment_total: Some(2),
                    ..Default::default()
                },
                NewTransaction {
                    kind: Some(TransactionKind::Expense),
                    amount: MoneyCents::new(100),
                    series_id: Some(series_id),
                    installment_number: Some(1),
                    installment_total: Some(2),
                    ..Default::default()
                },
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn bulk_create_is_all_or_nothing_on_quota_denial() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;

    // Free plan: 10 transactions/month. Twelve installments dated in the
    // same month must leave nothing behind.
    let series_id = Uuid::new_v4();
    let rows: Vec<NewTransaction> = (1..=12)
        .map(|n| NewTransaction {
            kind: Some(TransactionKind::Expense),
            amount: MoneyCents::new(100),
            date: Some(date(&format!("2025-01-{n:02}"))),
            series_id: Some(series_id),
            installment_number: Some(n),
            installment_total: Some(12),
            ..Default::default()
        })
        .collect();

    let err = engine.create_series(user, rows).await.unwrap_err();
    assert!(matches!(err, EngineError::QuotaExceeded(_)));

    let err = engine.series(user, series_id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    // Spread over twelve months, one per month fits the free plan.
    let series = engine
        .create_series(user, twelve_installments(series_id))
        .await
        .unwrap();
    assert_eq!(series.len(), 12);
}

#[tokio::test]
async fn mark_paid_forward_from_june_stamps_paid_at() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;
    subscribe_pro(&engine, user).await;

    let series_id = Uuid::new_v4();
    engine
        .create_series(user, twelve_installments(series_id))
        .await
        .unwrap();

    let updated = engine
        .mark_series_paid_forward(
            user,
            series_id,
            MarkSeriesPaid {
                from_date: Some(date("2025-06-01")),
                paid: Some(true),
                paid_at: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.len(), 7);

    let today = Utc::now().date_naive();
    let series = engine.series(user, series_id).await.unwrap();
    for tx in &series.installments {
        let number = tx.installment_number.unwrap();
        if number >= 6 {
            assert!(tx.paid, "installment {number} should be paid");
            assert_eq!(tx.paid_at, Some(today));
        } else {
            assert!(!tx.paid, "installment {number} should be untouched");
            assert_eq!(tx.paid_at, None);
        }
    }
}

#[tokio::test]
async fn mark_unpaid_clears_paid_at_for_the_whole_series() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;
    subscribe_pro(&engine, user).await;

    let series_id = Uuid::new_v4();
    engine
        .create_series(user, twelve_installments(series_id))
        .await
        .unwrap();

    engine
        .mark_series_paid_forward(
            user,
            series_id,
            MarkSeriesPaid {
                from_date: None,
                paid: Some(true),
                paid_at: Some(date("2025-05-10")),
            },
        )
        .await
        .unwrap();

    let updated = engine
        .mark_series_paid_forward(
            user,
            series_id,
            MarkSeriesPaid {
                from_date: None,
                paid: Some(false),
                paid_at: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.len(), 12);
    assert!(updated.iter().all(|tx| !tx.paid && tx.paid_at.is_none()));
}

#[tokio::test]
async fn mark_paid_requires_an_explicit_boolean() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;

    let err = engine
        .mark_series_paid_forward(user, Uuid::new_v4(), MarkSeriesPaid::default())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("paid must be an explicit boolean".to_string())
    );
}

#[tokio::test]
async fn delete_forward_is_inclusive_and_reports_the_deleted_rows() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;
    subscribe_pro(&engine, user).await;

    let series_id = Uuid::new_v4();
    engine
        .create_series(user, twelve_installments(series_id))
        .await
        .unwrap();

    let deleted = engine
        .delete_series_forward(user, series_id, Some(date("2025-06-01")))
        .await
        .unwrap();
    assert_eq!(deleted.len(), 7);
    assert!(deleted
        .iter()
        .all(|tx| tx.date >= date("2025-06-01")));

    // Earlier installments keep their numbers and the original total.
    let series = engine.series(user, series_id).await.unwrap();
    assert_eq!(series.len(), 5);
    assert_eq!(series.installment_total, Some(12));
    let numbers: Vec<_> = series
        .installments
        .iter()
        .map(|tx| tx.installment_number)
        .collect();
    assert_eq!(numbers, (1..=5).map(Some).collect::<Vec<_>>());

    // No bound deletes the rest of the series.
    let deleted = engine
        .delete_series_forward(user, series_id, None)
        .await
        .unwrap();
    assert_eq!(deleted.len(), 5);

    let err = engine.series(user, series_id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    // Deleting an already-empty series is a zero-affected no-op.
    let deleted = engine
        .delete_series_forward(user, series_id, None)
        .await
        .unwrap();
    assert!(deleted.is_empty());
}

#[tokio::test]
async fn update_series_applies_shared_fields_to_every_installment() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;
    subscribe_pro(&engine, user).await;

    let series_id = Uuid::new_v4();
    engine
        .create_series(user, twelve_installments(series_id))
        .await
        .unwrap();

    let series = engine
        .update_series(
            user,
            series_id,
            SeriesUpdate {
                description: Some("Sofa (renegotiated)".to_string()),
                category: Some("Furniture".to_string()),
                amount: Some(MoneyCents::new(199_90)),
                account_id: None,
            },
        )
        .await
        .unwrap();

    assert!(series.installments.iter().all(|tx| {
        tx.description.as_deref() == Some("Sofa (renegotiated)")
            && tx.category.as_deref() == Some("Furniture")
            && tx.amount == MoneyCents::new(199_90)
    }));

    let err = engine
        .update_series(user, series_id, SeriesUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn series_operations_never_cross_user_boundaries() {
    let (engine, db) = engine_with_db().await;
    let alice = create_user(&db, "alice@example.com").await;
    let bob = create_user(&db, "bob@example.com").await;
    subscribe_pro(&engine, alice).await;
    subscribe_pro(&engine, bob).await;

    // Same seriesId on both sides; the id alone is never a sufficient key.
    let series_id = Uuid::new_v4();
    engine
        .create_series(alice, twelve_installments(series_id))
        .await
        .unwrap();
    engine
        .create_series(bob, twelve_installments(series_id))
        .await
        .unwrap();

    engine
        .update_series(
            alice,
            series_id,
            SeriesUpdate {
                description: Some("Alice only".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let deleted = engine
        .delete_series_forward(alice, series_id, None)
        .await
        .unwrap();
    assert_eq!(deleted.len(), 12);

    let bobs = engine.series(bob, series_id).await.unwrap();
    assert_eq!(bobs.len(), 12);
    assert!(bobs
        .installments
        .iter()
        .all(|tx| tx.description.as_deref() == Some("Sofa")));
}
