//! Read-side listings for management views.
//!
//! Display-name enrichment is best-effort: a missing `users` row leaves the
//! name unset and never suppresses the ledger record itself.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{Account, Entry, ResultLedger, accounts, entries, users};

use super::{Ledger, with_tx};

/// An account joined with its creator's display name, when known.
#[derive(Clone, Debug, Serialize)]
pub struct AccountView {
    pub account: Account,
    pub creator_name: Option<String>,
}

/// An entry joined with display names for its account and acting user, when
/// known.
#[derive(Clone, Debug, Serialize)]
pub struct EntryView {
    pub entry: Entry,
    pub account_name: Option<String>,
    pub actor_name: Option<String>,
}

impl Ledger {
    /// Lists all accounts, newest first, enriched with creator display
    /// names.
    pub async fn list_accounts(&self) -> ResultLedger<Vec<AccountView>> {
        with_tx!(self, |db_tx| {
            let models: Vec<accounts::Model> = accounts::Entity::find()
                .order_by_desc(accounts::Column::CreatedAt)
                .order_by_desc(accounts::Column::Id)
                .all(&db_tx)
                .await?;

            let creator_ids: Vec<String> =
                models.iter().map(|model| model.created_by.clone()).collect();
            let names = self.display_names(&db_tx, creator_ids).await;

            let mut out = Vec::with_capacity(models.len());
            for model in models {
                let creator_name = names.get(&model.created_by).cloned();
                out.push(AccountView {
                    account: Account::try_from(model)?,
                    creator_name,
                });
            }
            Ok(out)
        })
    }

    /// Lists an account's entries, newest first, enriched with the account
    /// and actor display names.
    pub async fn list_entries_for_account(
        &self,
        account_id: Uuid,
    ) -> ResultLedger<Vec<EntryView>> {
        with_tx!(self, |db_tx| {
            let account_model = self.require_account(&db_tx, account_id).await?;
            let account_name = account_model.name.clone();

            let models: Vec<entries::Model> = entries::Entity::find()
                .filter(entries::Column::AccountId.eq(account_id.to_string()))
                .order_by_desc(entries::Column::Seq)
                .all(&db_tx)
                .await?;

            let actor_ids: Vec<String> =
                models.iter().map(|model| model.actor_id.clone()).collect();
            let names = self.display_names(&db_tx, actor_ids).await;

            let mut out = Vec::with_capacity(models.len());
            for model in models {
                let actor_name = names.get(&model.actor_id).cloned();
                out.push(EntryView {
                    entry: Entry::try_from(model)?,
                    account_name: Some(account_name.clone()),
                    actor_name,
                });
            }
            Ok(out)
        })
    }

    /// Batched lookup of user display names; ids without a `users` row are
    /// simply absent from the map.
    ///
    /// A failing lookup degrades to an empty map instead of failing the
    /// listing; a missing display name must never suppress a ledger record.
    async fn display_names(
        &self,
        db: &DatabaseTransaction,
        mut ids: Vec<String>,
    ) -> HashMap<String, String> {
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return HashMap::new();
        }

        let models: Vec<users::Model> = match users::Entity::find()
            .filter(users::Column::Id.is_in(ids))
            .all(db)
            .await
        {
            Ok(models) => models,
            Err(err) => {
                tracing::warn!("display name lookup failed, listing without names: {err}");
                return HashMap::new();
            }
        };

        models
            .into_iter()
            .map(|model| (model.id, model.name))
            .collect()
    }
}
