//! Category operations. Creation is admission-controlled by the plan's
//! category quota and idempotent on the NFKD-folded name.

use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Category, CategoryKind, EngineError, ResultEngine, categories,
    util::{normalize_display, normalize_key},
};

use super::{Engine, limits::deny_if_blocked, normalize_optional_text, with_tx};

#[derive(Clone, Debug)]
pub struct NewCategory {
    pub name: String,
    pub kind: CategoryKind,
    pub color: Option<String>,
    pub icon: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub kind: Option<CategoryKind>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl Engine {
    /// Creates a category for the user.
    ///
    /// An existing category with the same folded name is returned as-is
    /// instead of erroring; otherwise the category quota is checked inside
    /// the same store transaction as the insert.
    pub async fn create_category(
        &self,
        user_id: Uuid,
        new: NewCategory,
    ) -> ResultEngine<Category> {
        let display = normalize_display(&new.name)
            .ok_or_else(|| EngineError::Validation("category name must not be empty".to_string()))?;
        let norm = normalize_key(&display)
            .ok_or_else(|| EngineError::Validation("category name must not be empty".to_string()))?;

        let plan = self.user_plan(user_id).await;
        let limits = self.plan_limits(&plan);

        with_tx!(self, |db_tx| {
            if let Some(existing) = find_by_norm(&db_tx, user_id, &norm).await? {
                return Category::try_from(existing);
            }

            let check = self
                .category_quota_check(&db_tx, &limits, user_id, 1)
                .await?;
            deny_if_blocked(check)?;

            let model = categories::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                user_id: ActiveValue::Set(user_id),
                name: ActiveValue::Set(display),
                name_norm: ActiveValue::Set(norm),
                kind: ActiveValue::Set(new.kind.as_str().to_string()),
                color: ActiveValue::Set(normalize_optional_text(new.color.as_deref())),
                icon: ActiveValue::Set(normalize_optional_text(new.icon.as_deref())),
            }
            .insert(&db_tx)
            .await?;

            Category::try_from(model)
        })
    }

    pub async fn list_categories(&self, user_id: Uuid) -> ResultEngine<Vec<Category>> {
        let models = categories::Entity::find()
            .filter(categories::Column::UserId.eq(user_id))
            .order_by_asc(categories::Column::Name)
            .all(&self.database)
            .await?;

        let mut out = Vec::with_capacity(models.len());
        for model in models {
            out.push(Category::try_from(model)?);
        }
        Ok(out)
    }

    pub async fn update_category(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: CategoryUpdate,
    ) -> ResultEngine<Category> {
        with_tx!(self, |db_tx| {
            let model = categories::Entity::find_by_id(id)
                .filter(categories::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))?;

            let mut active: categories::ActiveModel = model.into();

            if let Some(name) = patch.name.as_deref() {
                let display = normalize_display(name).ok_or_else(|| {
                    EngineError::Validation("category name must not be empty".to_string())
                })?;
                let norm = normalize_key(&display).ok_or_else(|| {
                    EngineError::Validation("category name must not be empty".to_string())
                })?;
                if let Some(existing) = find_by_norm(&db_tx, user_id, &norm).await?
                    && existing.id != id
                {
                    return Err(EngineError::ExistingKey(display));
                }
                active.name = ActiveValue::Set(display);
                active.name_norm = ActiveValue::Set(norm);
            }
            if let Some(kind) = patch.kind {
                active.kind = ActiveValue::Set(kind.as_str().to_string());
            }
            if let Some(color) = patch.color.as_deref() {
                active.color = ActiveValue::Set(normalize_optional_text(Some(color)));
            }
            if let Some(icon) = patch.icon.as_deref() {
                active.icon = ActiveValue::Set(normalize_optional_text(Some(icon)));
            }

            let updated = active.update(&db_tx).await?;
            Category::try_from(updated)
        })
    }

    pub async fn delete_category(&self, user_id: Uuid, id: Uuid) -> ResultEngine<()> {
        let result = categories::Entity::delete_many()
            .filter(categories::Column::Id.eq(id))
            .filter(categories::Column::UserId.eq(user_id))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound("category not exists".to_string()));
        }
        Ok(())
    }
}

async fn find_by_norm<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    norm: &str,
) -> ResultEngine<Option<categories::Model>> {
    let model = categories::Entity::find()
        .filter(categories::Column::UserId.eq(user_id))
        .filter(categories::Column::NameNorm.eq(norm))
        .one(conn)
        .await?;
    Ok(model)
}
