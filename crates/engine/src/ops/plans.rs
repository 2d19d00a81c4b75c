//! Plan resolution and administrative plan CRUD.

use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, Plan, ResultEngine, plans, users};

use super::{Engine, normalize_required_name};

/// Administrative description of a plan row (create and full update).
#[derive(Clone, Debug)]
pub struct PlanSpec {
    pub name: String,
    pub price: MoneyCents,
    pub max_transactions: Option<i32>,
    pub max_categories: Option<i32>,
    pub max_accounts: Option<i32>,
    pub max_users: Option<i32>,
}

impl Engine {
    /// Resolves the plan a user is subscribed to.
    ///
    /// Degrades to the built-in Free plan when the user carries no plan
    /// reference, the referenced row is gone, or the lookup itself fails:
    /// plan resolution must never block another operation. The failure is
    /// logged and swallowed; this is the single place the engine does that.
    pub async fn user_plan(&self, user_id: Uuid) -> Plan {
        self.user_plan_on(&self.database, user_id).await
    }

    pub(super) async fn user_plan_on<C: ConnectionTrait>(&self, conn: &C, user_id: Uuid) -> Plan {
        let lookup = users::Entity::find_by_id(user_id)
            .find_also_related(plans::Entity)
            .one(conn)
            .await;

        match lookup {
            Ok(Some((_, Some(plan)))) => Plan::from(plan),
            Ok(_) => Plan::free(),
            Err(err) => {
                tracing::warn!("plan lookup failed for user {user_id}: {err}; defaulting to free");
                Plan::free()
            }
        }
    }

    /// All stored plans, cheapest first (the public pricing listing).
    pub async fn list_plans(&self) -> ResultEngine<Vec<Plan>> {
        let models = plans::Entity::find()
            .order_by_asc(plans::Column::PriceCents)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Plan::from).collect())
    }

    pub async fn plan_by_id(&self, plan_id: Uuid) -> ResultEngine<Plan> {
        let model = plans::Entity::find_by_id(plan_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("plan not exists".to_string()))?;
        Ok(Plan::from(model))
    }

    pub async fn create_plan(&self, spec: PlanSpec) -> ResultEngine<Plan> {
        let name = normalize_required_name(&spec.name, "plan")?;
        validate_plan_spec(&spec)?;

        let existing = plans::Entity::find()
            .filter(plans::Column::Name.eq(name.clone()))
            .one(&self.database)
            .await?;
        if existing.is_some() {
            return Err(EngineError::ExistingKey(name));
        }

        let model = plans::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            name: ActiveValue::Set(name),
            price_cents: ActiveValue::Set(spec.price.cents()),
            max_transactions: ActiveValue::Set(spec.max_transactions),
            max_categories: ActiveValue::Set(spec.max_categories),
            max_accounts: ActiveValue::Set(spec.max_accounts),
            max_users: ActiveValue::Set(spec.max_users),
        }
        .insert(&self.database)
        .await?;

        Ok(Plan::from(model))
    }

    pub async fn update_plan(&self, plan_id: Uuid, spec: PlanSpec) -> ResultEngine<Plan> {
        let name = normalize_required_name(&spec.name, "plan")?;
        validate_plan_spec(&spec)?;

        let model = plans::Entity::find_by_id(plan_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("plan not exists".to_string()))?;

        let mut active: plans::ActiveModel = model.into();
        active.name = ActiveValue::Set(name);
        active.price_cents = ActiveValue::Set(spec.price.cents());
        active.max_transactions = ActiveValue::Set(spec.max_transactions);
        active.max_categories = ActiveValue::Set(spec.max_categories);
        active.max_accounts = ActiveValue::Set(spec.max_accounts);
        active.max_users = ActiveValue::Set(spec.max_users);

        let updated = active.update(&self.database).await?;
        Ok(Plan::from(updated))
    }

    pub async fn delete_plan(&self, plan_id: Uuid) -> ResultEngine<()> {
        let result = plans::Entity::delete_by_id(plan_id)
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound("plan not exists".to_string()));
        }
        Ok(())
    }

    /// Points a user at a plan row, or back at the built-in Free plan when
    /// `plan_id` is `None`.
    pub async fn assign_plan(&self, user_id: Uuid, plan_id: Option<Uuid>) -> ResultEngine<()> {
        if let Some(plan_id) = plan_id {
            plans::Entity::find_by_id(plan_id)
                .one(&self.database)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("plan not exists".to_string()))?;
        }

        let user = users::Entity::find_by_id(user_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))?;

        let mut active: users::ActiveModel = user.into();
        active.plan_id = ActiveValue::Set(plan_id);
        active.update(&self.database).await?;
        Ok(())
    }
}

fn validate_plan_spec(spec: &PlanSpec) -> ResultEngine<()> {
    if spec.price.is_negative() {
        return Err(EngineError::Validation(
            "plan price must be >= 0".to_string(),
        ));
    }
    for (label, quota) in [
        ("maxTransactions", spec.max_transactions),
        ("maxCategories", spec.max_categories),
        ("maxAccounts", spec.max_accounts),
        ("maxUsers", spec.max_users),
    ] {
        if let Some(value) = quota
            && value < 0
        {
            return Err(EngineError::Validation(format!(
                "{label} must be >= 0 or unset"
            )));
        }
    }
    Ok(())
}
