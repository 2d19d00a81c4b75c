//! Subscription plan rows.
//!
//! Quota columns are nullable: a NULL column means "not set here", and the
//! catalog tier defaults fill the gap at resolution time (see
//! [`crate::PlanLimits`]).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::MoneyCents;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "plans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub max_transactions: Option<i32>,
    pub max_categories: Option<i32>,
    pub max_accounts: Option<i32>,
    pub max_users: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::users::Entity")]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// A resolved plan.
///
/// `id: None` marks the synthetic built-in Free plan handed out when a user
/// has no subscription row (or the lookup failed).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: Option<Uuid>,
    pub name: String,
    pub price: MoneyCents,
    pub max_transactions: Option<i32>,
    pub max_categories: Option<i32>,
    pub max_accounts: Option<i32>,
    pub max_users: Option<i32>,
}

impl Plan {
    /// The built-in default plan. Plan resolution must never block other
    /// operations, so this is what every failure path degrades to.
    pub fn free() -> Self {
        Self {
            id: None,
            name: "Gratuito".to_string(),
            price: MoneyCents::ZERO,
            max_transactions: None,
            max_categories: None,
            max_accounts: None,
            max_users: None,
        }
    }
}

impl From<Model> for Plan {
    fn from(model: Model) -> Self {
        Self {
            id: Some(model.id),
            name: model.name,
            price: MoneyCents::new(model.price_cents),
            max_transactions: model.max_transactions,
            max_categories: model.max_categories,
            max_accounts: model.max_accounts,
            max_users: model.max_users,
        }
    }
}
