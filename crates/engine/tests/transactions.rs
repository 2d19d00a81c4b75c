use chrono::{NaiveDate, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement, Value};

use engine::{
    Engine, EngineError, MoneyCents, NewTransaction, PlanSpec, TransactionKind,
    TransactionListFilter, UpdateTransaction,
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
    let plan = engine
        .create_plan(PlanSpec {
            name: "Pro".to_string(),
            price: MoneyCents::new(29_90),
            max_transactions: None,
            max_categories: None,
            max_accounts: None,
            max_users: None,
        })
        .await
        .unwrap();
    engine.assign_plan(user_id, plan.id).await.unwrap();
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

#[tokio::test]
async fn create_applies_date_and_paid_defaults() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;

    let today = Utc::now().date_naive();

    // No date: current date. Paid without paid_at: stamped with today.
    let tx = engine
        .create_transaction(
            user,
            NewTransaction {
                kind: Some(TransactionKind::Income),
                amount: MoneyCents::new(5000_00),
                description: Some("  Salary  ".to_string()),
                paid: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(tx.date, today);
    assert!(tx.paid);
    assert_eq!(tx.paid_at, Some(today));
    assert_eq!(tx.description.as_deref(), Some("Salary"));

    // Unpaid rows never carry a paid_at, even if one was sent.
    let tx = engine
        .create_transaction(
            user,
            NewTransaction {
                kind: Some(TransactionKind::Expense),
                amount: MoneyCents::new(100),
                paid: Some(false),
                paid_at: Some(date("2026-01-15")),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!tx.paid);
    assert_eq!(tx.paid_at, None);
}

#[tokio::test]
async fn create_rejects_bad_payloads() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;

    let err = engine
        .create_transaction(
            user,
            NewTransaction {
                amount: MoneyCents::new(100),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Validation("type is required".to_string()));

    let err = engine
        .create_transaction(
            user,
            NewTransaction {
                kind: Some(TransactionKind::Expense),
                amount: MoneyCents::new(-1),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_transaction(
            user,
            NewTransaction {
                kind: Some(TransactionKind::Expense),
                amount: MoneyCents::new(100),
                installment_number: Some(1),
                installment_total: Some(12),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("installment metadata requires a seriesId".to_string())
    );
}

#[tokio::test]
async fn update_repairs_the_paid_invariant() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;

    let tx = engine
        .create_transaction(
            user,
            NewTransaction {
                kind: Some(TransactionKind::Expense),
                amount: MoneyCents::new(100),
                date: Some(date("2026-02-10")),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let today = Utc::now().date_naive();
    let updated = engine
        .update_transaction(
            user,
            tx.id,
            UpdateTransaction {
                paid: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.paid);
    assert_eq!(updated.paid_at, Some(today));

    let updated = engine
        .update_transaction(
            user,
            tx.id,
            UpdateTransaction {
                paid: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!updated.paid);
    assert_eq!(updated.paid_at, None);

    // paid_at alone is only valid on an already-paid row.
    let err = engine
        .update_transaction(
            user,
            tx.id,
            UpdateTransaction {
                paid_at: Some(date("2026-02-11")),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn list_filters_and_paginates() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;
    subscribe_pro(&engine, user).await;

    for day in 1..=20 {
        let kind = if day % 2 == 0 {
            TransactionKind::Income
        } else {
            TransactionKind::Expense
        };
        engine
            .create_transaction(
                user,
                NewTransaction {
                    kind: Some(kind),
                    amount: MoneyCents::new(100 * day),
                    category: Some(if day <= 10 { "Food" } else { "Rent" }.to_string()),
                    date: Some(date(&format!("2026-05-{day:02}"))),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    // Newest first, cursor pages are disjoint and ordered.
    let filter = TransactionListFilter::default();
    let (page1, cursor) = engine
        .list_transactions(user, 8, None, &filter)
        .await
        .unwrap();
    assert_eq!(page1.len(), 8);
    assert_eq!(page1[0].date, date("2026-05-20"));
    let cursor = cursor.expect("more pages expected");

    let (page2, cursor2) = engine
        .list_transactions(user, 8, Some(&cursor), &filter)
        .await
        .unwrap();
    assert_eq!(page2.len(), 8);
    assert!(page2[0].date < page1[7].date || page2[0].id != page1[7].id);

    let (page3, cursor3) = engine
        .list_transactions(user, 8, cursor2.as_deref(), &filter)
        .await
        .unwrap();
    assert_eq!(page3.len(), 4);
    assert!(cursor3.is_none());

    // Kind, category and inclusive date-range filters.
    let (incomes, _) = engine
        .list_transactions(
            user,
            50,
            None,
            &TransactionListFilter {
                kind: Some(TransactionKind::Income),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(incomes.len(), 10);
    assert!(incomes.iter().all(|tx| tx.kind == TransactionKind::Income));

    let (food, _) = engine
        .list_transactions(
            user,
            50,
            None,
            &TransactionListFilter {
                category: Some("Food".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(food.len(), 10);

    let (ranged, _) = engine
        .list_transactions(
            user,
            50,
            None,
            &TransactionListFilter {
                from: Some(date("2026-05-05")),
                to: Some(date("2026-05-10")),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(ranged.len(), 6);

    let err = engine
        .list_transactions(
            user,
            50,
            None,
            &TransactionListFilter {
                from: Some(date("2026-05-10")),
                to: Some(date("2026-05-05")),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn summary_totals_income_and_expense() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;

    engine
        .create_transaction(
            user,
            NewTransaction {
                kind: Some(TransactionKind::Income),
                amount: MoneyCents::new(5000_00),
                date: Some(date("2026-03-01")),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    engine
        .create_transaction(
            user,
            NewTransaction {
                kind: Some(TransactionKind::Expense),
                amount: MoneyCents::new(1200_00),
                date: Some(date("2026-03-05")),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let summary = engine.transactions_summary(user).await.unwrap();
    assert_eq!(summary.income, MoneyCents::new(5000_00));
    assert_eq!(summary.expense, MoneyCents::new(1200_00));
    assert_eq!(summary.balance, MoneyCents::new(3800_00));
    assert_eq!(summary.total_transactions, 2);
}

#[tokio::test]
async fn reads_and_writes_are_scoped_to_the_owner() {
    let (engine, db) = engine_with_db().await;
    let alice = create_user(&db, "alice@example.com").await;
    let bob = create_user(&db, "bob@example.com").await;

    let tx = engine
        .create_transaction(
            alice,
            NewTransaction {
                kind: Some(TransactionKind::Expense),
                amount: MoneyCents::new(100),
                date: Some(date("2026-03-01")),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = engine.transaction(bob, tx.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine.delete_transaction(bob, tx.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    engine.delete_transaction(alice, tx.id).await.unwrap();
    let err = engine.transaction(alice, tx.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}
