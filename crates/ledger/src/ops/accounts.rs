use chrono::Utc;
use sea_orm::{DatabaseTransaction, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{Account, LedgerError, ResultLedger, accounts};

use super::{Ledger, normalize_required_name, with_tx};

impl Ledger {
    /// Creates a new account with an explicit opening balance.
    ///
    /// Fails with [`LedgerError::InvalidInput`] when the normalized name is
    /// empty or `initial_balance` is negative. Every successful call creates
    /// a distinct account; callers needing exactly-once creation must dedupe
    /// upstream.
    pub async fn create_account(
        &self,
        name: &str,
        initial_balance: i64,
        creator_id: &str,
    ) -> ResultLedger<Account> {
        let name = normalize_required_name(name, "account")?;
        let account = Account::new(name, initial_balance, creator_id.to_string(), Utc::now())?;

        with_tx!(self, |db_tx| {
            accounts::ActiveModel::from(&account).insert(&db_tx).await?;
            Ok(account)
        })
    }

    /// Returns an account by id.
    pub async fn account(&self, account_id: Uuid) -> ResultLedger<Account> {
        let model = accounts::Entity::find_by_id(account_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| LedgerError::KeyNotFound("account not exists".to_string()))?;
        Account::try_from(model)
    }

    pub(super) async fn require_account(
        &self,
        db: &DatabaseTransaction,
        account_id: Uuid,
    ) -> ResultLedger<accounts::Model> {
        accounts::Entity::find_by_id(account_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| LedgerError::KeyNotFound("account not exists".to_string()))
    }
}
