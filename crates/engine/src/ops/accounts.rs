//! Account operations. Creation is admission-controlled by the plan's
//! account quota.

use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{Account, AccountType, EngineError, MoneyCents, ResultEngine, accounts};

use super::{Engine, limits::deny_if_blocked, normalize_optional_text, normalize_required_name, with_tx};

#[derive(Clone, Debug)]
pub struct NewAccount {
    pub name: String,
    pub bank_name: Option<String>,
    pub account_type: AccountType,
    pub opening_balance: MoneyCents,
    /// Defaults to the opening balance when absent.
    pub current_balance: Option<MoneyCents>,
}

#[derive(Clone, Debug, Default)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub bank_name: Option<String>,
    pub account_type: Option<AccountType>,
    pub current_balance: Option<MoneyCents>,
    pub archived: Option<bool>,
}

impl Engine {
    /// Creates an account, checking the plan's account quota inside the
    /// same store transaction as the insert.
    pub async fn create_account(&self, user_id: Uuid, new: NewAccount) -> ResultEngine<Account> {
        let name = normalize_required_name(&new.name, "account")?;

        let plan = self.user_plan(user_id).await;
        let limits = self.plan_limits(&plan);

        with_tx!(self, |db_tx| {
            let check = self.account_quota_check(&db_tx, &limits, user_id, 1).await?;
            deny_if_blocked(check)?;

            let model = accounts::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                user_id: ActiveValue::Set(user_id),
                name: ActiveValue::Set(name),
                bank_name: ActiveValue::Set(normalize_optional_text(new.bank_name.as_deref())),
                account_type: ActiveValue::Set(new.account_type.as_str().to_string()),
                opening_balance_cents: ActiveValue::Set(new.opening_balance.cents()),
                current_balance_cents: ActiveValue::Set(
                    new.current_balance.unwrap_or(new.opening_balance).cents(),
                ),
                archived: ActiveValue::Set(false),
            }
            .insert(&db_tx)
            .await?;

            Account::try_from(model)
        })
    }

    pub async fn list_accounts(
        &self,
        user_id: Uuid,
        include_archived: bool,
    ) -> ResultEngine<Vec<Account>> {
        let mut query = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .order_by_asc(accounts::Column::Name);
        if !include_archived {
            query = query.filter(accounts::Column::Archived.eq(false));
        }

        let models = query.all(&self.database).await?;
        let mut out = Vec::with_capacity(models.len());
        for model in models {
            out.push(Account::try_from(model)?);
        }
        Ok(out)
    }

    pub async fn account(&self, user_id: Uuid, id: Uuid) -> ResultEngine<Account> {
        let model = accounts::Entity::find_by_id(id)
            .filter(accounts::Column::UserId.eq(user_id))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
        Account::try_from(model)
    }

    pub async fn update_account(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: AccountUpdate,
    ) -> ResultEngine<Account> {
        let model = accounts::Entity::find_by_id(id)
            .filter(accounts::Column::UserId.eq(user_id))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;

        let mut active: accounts::ActiveModel = model.into();

        if let Some(name) = patch.name.as_deref() {
            active.name = ActiveValue::Set(normalize_required_name(name, "account")?);
        }
        if let Some(bank_name) = patch.bank_name.as_deref() {
            active.bank_name = ActiveValue::Set(normalize_optional_text(Some(bank_name)));
        }
        if let Some(account_type) = patch.account_type {
            active.account_type = ActiveValue::Set(account_type.as_str().to_string());
        }
        if let Some(current_balance) = patch.current_balance {
            active.current_balance_cents = ActiveValue::Set(current_balance.cents());
        }
        if let Some(archived) = patch.archived {
            active.archived = ActiveValue::Set(archived);
        }

        let updated = active.update(&self.database).await?;
        Account::try_from(updated)
    }

    /// Deletes or archives an account.
    pub async fn delete_account(&self, user_id: Uuid, id: Uuid, archive: bool) -> ResultEngine<()> {
        if archive {
            self.update_account(
                user_id,
                id,
                AccountUpdate {
                    archived: Some(true),
                    ..Default::default()
                },
            )
            .await?;
            return Ok(());
        }

        let result = accounts::Entity::delete_many()
            .filter(accounts::Column::Id.eq(id))
            .filter(accounts::Column::UserId.eq(user_id))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound("account not exists".to_string()));
        }
        Ok(())
    }
}
