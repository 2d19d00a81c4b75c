use std::{error::Error, io::Write};

use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{Engine, MoneyCents, PlanSpec};
use migration::MigratorTrait;
use sea_orm::{ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

mod users {
    use sea_orm::entity::prelude::*;
    use uuid::Uuid;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub email: String,
        pub name: String,
        pub password: String,
        pub plan_id: Option<Uuid>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

#[derive(Parser, Debug)]
#[command(name = "centavo_admin")]
#[command(about = "Admin utilities for Centavo (bootstrap users/plans)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./centavo.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Plan(Plan),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
    /// Point a user at a plan (or back at the built-in free plan).
    AssignPlan(AssignPlanArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    name: String,
}

#[derive(Args, Debug)]
struct AssignPlanArgs {
    #[arg(long)]
    email: String,
    /// Plan name; omit to reset the user to the built-in free plan.
    #[arg(long)]
    plan: Option<String>,
}

#[derive(Args, Debug)]
struct Plan {
    #[command(subcommand)]
    command: PlanCommand,
}

#[derive(Subcommand, Debug)]
enum PlanCommand {
    Create(PlanCreateArgs),
    List,
}

#[derive(Args, Debug)]
struct PlanCreateArgs {
    #[arg(long)]
    name: String,
    /// Monthly price, e.g. `29.90`.
    #[arg(long, default_value = "0")]
    price: String,
    /// Transactions per month; omit for unlimited.
    #[arg(long)]
    max_transactions: Option<i32>,
    #[arg(long)]
    max_categories: Option<i32>,
    #[arg(long)]
    max_accounts: Option<i32>,
    #[arg(long)]
    max_users: Option<i32>,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_password("Password: ")?;
        if p1.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn find_user_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<users::Model>, Box<dyn Error + Send + Sync>> {
    let user = users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .one(db)
        .await?;
    Ok(user)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = prompt_password_twice()?;

            if find_user_by_email(&db, &args.email).await?.is_some() {
                eprintln!("user already exists: {}", args.email);
                std::process::exit(1);
            }

            let user = users::ActiveModel {
                id: Set(Uuid::new_v4()),
                email: Set(args.email.clone()),
                name: Set(args.name),
                password: Set(password),
                plan_id: Set(None),
            };
            users::Entity::insert(user).exec(&db).await?;

            println!("created user: {}", args.email);
        }
        Command::User(User {
            command: UserCommand::AssignPlan(args),
        }) => {
            let Some(user) = find_user_by_email(&db, &args.email).await? else {
                eprintln!("user not found: {}", args.email);
                std::process::exit(1);
            };

            let engine = Engine::builder().database(db.clone()).build().await?;

            let plan_id = match args.plan.as_deref() {
                Some(name) => {
                    let plans = engine.list_plans().await?;
                    let Some(plan) = plans.iter().find(|plan| plan.name == name) else {
                        eprintln!("plan not found: {name}");
                        std::process::exit(1);
                    };
                    plan.id
                }
                None => None,
            };

            engine.assign_plan(user.id, plan_id).await?;
            match args.plan {
                Some(name) => println!("assigned plan {name} to {}", args.email),
                None => println!("reset {} to the free plan", args.email),
            }
        }
        Command::Plan(Plan {
            command: PlanCommand::Create(args),
        }) => {
            let price: MoneyCents = match args.price.parse() {
                Ok(v) => v,
                Err(err) => {
                    eprintln!("invalid price: {err}");
                    std::process::exit(2);
                }
            };

            let engine = Engine::builder().database(db.clone()).build().await?;
            let plan = engine
                .create_plan(PlanSpec {
                    name: args.name,
                    price,
                    max_transactions: args.max_transactions,
                    max_categories: args.max_categories,
                    max_accounts: args.max_accounts,
                    max_users: args.max_users,
                })
                .await?;

            println!("created plan: {} ({})", plan.name, plan.price);
        }
        Command::Plan(Plan {
            command: PlanCommand::List,
        }) => {
            let engine = Engine::builder().database(db.clone()).build().await?;
            for plan in engine.list_plans().await? {
                let quota = |value: Option<i32>| match value {
                    Some(v) => v.to_string(),
                    None => "unlimited".to_string(),
                };
                println!(
                    "{} {} tx/month={} categories={} accounts={} users={}",
                    plan.name,
                    plan.price,
                    quota(plan.max_transactions),
                    quota(plan.max_categories),
                    quota(plan.max_accounts),
                    quota(plan.max_users),
                );
            }
        }
    }

    Ok(())
}
