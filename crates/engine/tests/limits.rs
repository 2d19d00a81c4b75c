use chrono::{NaiveDate, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement, Value};

use engine::{
    CategoryKind, Engine, EngineError, Feature, MoneyCents, NewAccount, NewCategory,
    NewTransaction, PlanSpec, PlanTier, TransactionKind,
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

async fn subscribe(engine: &Engine, user_id: Uuid, name: &str, price_cents: i64) {
    let plan = engine
        .create_plan(PlanSpec {
            name: name.to_string(),
            price: MoneyCents::new(price_cents),
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

fn expense(amount_cents: i64, on: &str) -> NewTransaction {
    NewTransaction {
        kind: Some(TransactionKind::Expense),
        amount: MoneyCents::new(amount_cents),
        date: Some(date(on)),
        ..Default::default()
    }
}

fn category(name: &str) -> NewCategory {
    NewCategory {
        name: name.to_string(),
        kind: CategoryKind::Expense,
        color: None,
        icon: None,
    }
}

fn account(name: &str) -> NewAccount {
    NewAccount {
        name: name.to_string(),
        bank_name: None,
        account_type: engine::AccountType::Checking,
        opening_balance: MoneyCents::ZERO,
        current_balance: None,
    }
}

#[tokio::test]
async fn free_plan_allows_exactly_ten_transactions_per_month() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;

    for day in 1..=10 {
        engine
            .create_transaction(user, expense(1000, &format!("2026-03-{day:02}")))
            .await
            .unwrap();
    }

    let err = engine
        .create_transaction(user, expense(1000, "2026-03-15"))
        .await
        .unwrap_err();
    let EngineError::QuotaExceeded(check) = err else {
        panic!("expected quota denial");
    };
    assert_eq!(check.current, Some(10));
    assert_eq!(check.limit, Some(10));
    assert_eq!(check.remaining, Some(0));
    assert_eq!(check.plan_name, "Gratuito");
    assert_eq!(check.month_year.as_deref(), Some("Mar/2026"));

    let check = engine
        .can_create_transaction(user, Some(date("2026-03-20")))
        .await
        .unwrap();
    assert!(!check.allowed);
    assert_eq!(check.current, Some(10));
}

#[tokio::test]
async fn quota_is_evaluated_against_the_transaction_month() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;

    for day in 1..=10 {
        engine
            .create_transaction(user, expense(500, &format!("2026-03-{day:02}")))
            .await
            .unwrap();
    }

    // March is full, but a backdated February row and a future April row are
    // judged against their own months.
    engine
        .create_transaction(user, expense(500, "2026-02-28"))
        .await
        .unwrap();
    engine
        .create_transaction(user, expense(500, "2026-04-01"))
        .await
        .unwrap();

    let check = engine
        .can_create_transaction(user, Some(date("2026-04-15")))
        .await
        .unwrap();
    assert!(check.allowed);
    assert_eq!(check.current, Some(1));
    assert_eq!(check.month_year.as_deref(), Some("Abr/2026"));
}

#[tokio::test]
async fn unlimited_plans_skip_the_count() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;
    subscribe(&engine, user, "Pro", 29_90).await;

    let check = engine.can_create_transaction(user, None).await.unwrap();
    assert!(check.allowed);
    assert_eq!(check.current, None);
    assert_eq!(check.limit, None);
    assert_eq!(check.plan_name, "Pro");

    for day in 1..=11 {
        engine
            .create_transaction(user, expense(100, &format!("2026-03-{day:02}")))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn stored_plan_quota_overrides_the_tier_default() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;

    let plan = engine
        .create_plan(PlanSpec {
            name: "Gratuito Turbo".to_string(),
            price: MoneyCents::ZERO,
            max_transactions: Some(2),
            max_categories: None,
            max_accounts: None,
            max_users: None,
        })
        .await
        .unwrap();
    engine.assign_plan(user, plan.id).await.unwrap();

    engine
        .create_transaction(user, expense(100, "2026-03-01"))
        .await
        .unwrap();
    engine
        .create_transaction(user, expense(100, "2026-03-02"))
        .await
        .unwrap();

    let err = engine
        .create_transaction(user, expense(100, "2026-03-03"))
        .await
        .unwrap_err();
    let EngineError::QuotaExceeded(check) = err else {
        panic!("expected quota denial");
    };
    assert_eq!(check.limit, Some(2));
    // Unknown plan names fold to the Free tier for the columns left unset.
    assert_eq!(check.plan_name, "Gratuito Turbo");
}

#[tokio::test]
async fn free_plan_category_scenario() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;

    for name in ["Food", "Rent", "Transport"] {
        engine.create_category(user, category(name)).await.unwrap();
    }

    let check = engine.can_create_category(user).await.unwrap();
    assert!(!check.allowed);
    assert_eq!(check.current, Some(3));
    assert_eq!(check.limit, Some(3));
    assert_eq!(check.remaining, Some(0));
    assert_eq!(check.plan_name, "Gratuito");

    let err = engine
        .create_category(user, category("Leisure"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::QuotaExceeded(_)));

    // Re-creating an existing category is idempotent, even at the limit.
    let food = engine.create_category(user, category("Food")).await.unwrap();
    assert_eq!(food.name, "Food");
    assert_eq!(engine.list_categories(user).await.unwrap().len(), 3);
}

#[tokio::test]
async fn free_plan_allows_a_single_account() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;

    engine.create_account(user, account("Nubank")).await.unwrap();

    let check = engine.can_create_account(user).await.unwrap();
    assert!(!check.allowed);
    assert_eq!(check.current, Some(1));
    assert_eq!(check.limit, Some(1));

    let err = engine
        .create_account(user, account("Itau"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::QuotaExceeded(_)));
}

#[tokio::test]
async fn feature_gates_name_the_required_tier() {
    let (engine, db) = engine_with_db().await;
    let free_user = create_user(&db, "alice@example.com").await;
    let premium_user = create_user(&db, "bob@example.com").await;
    subscribe(&engine, premium_user, "Premium", 89_90).await;

    let check = engine
        .can_access_feature(free_user, Feature::PdfExport)
        .await;
    assert!(!check.allowed);
    assert_eq!(check.required_plan, Some(PlanTier::Pro));

    let check = engine
        .can_access_feature(free_user, Feature::BankIntegration)
        .await;
    assert!(!check.allowed);
    assert_eq!(check.required_plan, Some(PlanTier::Premium));

    let check = engine
        .can_access_feature(premium_user, Feature::BankIntegration)
        .await;
    assert!(check.allowed);
    assert_eq!(check.plan_name, "Premium");
}

#[tokio::test]
async fn limits_info_gathers_all_checks() {
    let (engine, db) = engine_with_db().await;
    let user = create_user(&db, "alice@example.com").await;

    let today = Utc::now().date_naive();
    engine
        .create_transaction(user, expense(100, &today.to_string()))
        .await
        .unwrap();
    engine.create_category(user, category("Food")).await.unwrap();

    let info = engine.user_limits_info(user).await.unwrap();
    assert_eq!(info.plan.name, "Gratuito");
    assert_eq!(info.plan.id, None);
    assert_eq!(info.transactions.current, Some(1));
    assert_eq!(info.categories.current, Some(1));
    assert_eq!(info.accounts.current, Some(0));
    assert!(info.features.is_empty());
}
