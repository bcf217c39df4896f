use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    Condition, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*, sea_query::Expr,
};

use crate::{
    Account, BalancePoint, Direction, Entry, LedgerError, ResultLedger, accounts, entries,
    series::build_series,
};

use super::{Ledger, with_tx};

/// Attempts per `record_entry` call before a lost race is surfaced as
/// [`LedgerError::Conflict`].
const BALANCE_RETRY_ATTEMPTS: u32 = 3;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct EntriesCursor {
    created_at: DateTime<Utc>,
    entry_id: String,
}

impl EntriesCursor {
    fn encode(&self) -> ResultLedger<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| LedgerError::InvalidInput("invalid entries cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultLedger<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| LedgerError::InvalidInput("invalid entries cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| LedgerError::InvalidInput("invalid entries cursor".to_string()))
    }
}

impl Ledger {
    /// Records a balance movement against an account.
    ///
    /// On success the entry insert and the balance update commit in one
    /// database transaction: no reader ever observes one without the other.
    /// Fails with [`LedgerError::KeyNotFound`] when the account does not
    /// exist, [`LedgerError::InvalidInput`] when `amount <= 0` and
    /// [`LedgerError::InsufficientBalance`] when an outbound movement would
    /// drive the balance below zero.
    ///
    /// Two concurrent calls against the same account serialize on the
    /// balance check-and-update: the commit is guarded by the balance value
    /// read at the start of the attempt, and a lost race re-reads and
    /// re-validates before retrying. Movements that individually fit but
    /// jointly overdraw the account therefore resolve to one success and one
    /// `InsufficientBalance`. After [`BALANCE_RETRY_ATTEMPTS`] lost races
    /// the call returns [`LedgerError::Conflict`]; the whole operation is
    /// safe to retry since a failed attempt leaves no state behind.
    pub async fn record_entry(
        &self,
        account_id: Uuid,
        direction: Direction,
        amount: i64,
        actor_id: &str,
    ) -> ResultLedger<(Account, Entry)> {
        if amount <= 0 {
            return Err(LedgerError::InvalidInput("amount must be > 0".to_string()));
        }

        let mut attempts = BALANCE_RETRY_ATTEMPTS;
        loop {
            match self
                .try_record_entry(account_id, direction, amount, actor_id)
                .await
            {
                Err(LedgerError::Conflict(reason)) => {
                    attempts -= 1;
                    if attempts == 0 {
                        return Err(LedgerError::Conflict(reason));
                    }
                }
                other => return other,
            }
        }
    }

    async fn try_record_entry(
        &self,
        account_id: Uuid,
        direction: Direction,
        amount: i64,
        actor_id: &str,
    ) -> ResultLedger<(Account, Entry)> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id).await?;
            let new_balance = model
                .balance
                .checked_add(direction.signed(amount))
                .ok_or_else(|| LedgerError::InvalidInput("amount too large".to_string()))?;
            if new_balance < 0 {
                return Err(LedgerError::InsufficientBalance(model.name.clone()));
            }

            let seq = self.next_seq(&db_tx, account_id).await?;
            let entry = Entry::new(
                account_id,
                direction,
                amount,
                actor_id.to_string(),
                seq,
                Utc::now(),
            )?;
            entries::ActiveModel::from(&entry).insert(&db_tx).await?;

            // The update commits only if nobody moved the balance since this
            // attempt read it; every accepted entry changes the balance, so
            // the guard also serializes `seq` assignment.
            let updated = accounts::Entity::update_many()
                .col_expr(accounts::Column::Balance, Expr::value(new_balance))
                .filter(accounts::Column::Id.eq(account_id.to_string()))
                .filter(accounts::Column::Balance.eq(model.balance))
                .exec(&db_tx)
                .await?;
            if updated.rows_affected == 0 {
                return Err(LedgerError::Conflict(
                    "account balance changed concurrently".to_string(),
                ));
            }

            let mut account = Account::try_from(model)?;
            account.balance = new_balance;
            Ok((account, entry))
        })
    }

    /// Lists entries, newest first.
    ///
    /// With an account id the listing follows that account's `seq` order;
    /// without one it spans all accounts ordered by creation time.
    pub async fn list_entries(&self, account_id: Option<Uuid>) -> ResultLedger<Vec<Entry>> {
        with_tx!(self, |db_tx| {
            let models: Vec<entries::Model> = match account_id {
                Some(id) => {
                    self.require_account(&db_tx, id).await?;
                    entries::Entity::find()
                        .filter(entries::Column::AccountId.eq(id.to_string()))
                        .order_by_desc(entries::Column::Seq)
                        .all(&db_tx)
                        .await?
                }
                None => {
                    entries::Entity::find()
                        .order_by_desc(entries::Column::CreatedAt)
                        .order_by_desc(entries::Column::Id)
                        .all(&db_tx)
                        .await?
                }
            };

            let mut out = Vec::with_capacity(models.len());
            for model in models {
                out.push(Entry::try_from(model)?);
            }
            Ok(out)
        })
    }

    /// Lists entries across all accounts with cursor-based pagination.
    ///
    /// Pagination is newest → older by `(created_at DESC, id DESC)`.
    pub async fn list_entries_page(
        &self,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultLedger<(Vec<Entry>, Option<String>)> {
        with_tx!(self, |db_tx| {
            let limit_plus_one = limit.saturating_add(1);
            let mut query = entries::Entity::find()
                .order_by_desc(entries::Column::CreatedAt)
                .order_by_desc(entries::Column::Id)
                .limit(limit_plus_one);

            if let Some(cursor) = cursor {
                let cursor = EntriesCursor::decode(cursor)?;
                query = query.filter(
                    Condition::any()
                        .add(entries::Column::CreatedAt.lt(cursor.created_at))
                        .add(
                            Condition::all()
                                .add(entries::Column::CreatedAt.eq(cursor.created_at))
                                .add(entries::Column::Id.lt(cursor.entry_id)),
                        ),
                );
            }

            let rows: Vec<entries::Model> = query.all(&db_tx).await?;
            let has_more = rows.len() > limit as usize;

            let mut out: Vec<Entry> = Vec::with_capacity(rows.len().min(limit as usize));
            for model in rows.into_iter().take(limit as usize) {
                out.push(Entry::try_from(model)?);
            }

            let next_cursor = out.last().map(|entry| EntriesCursor {
                created_at: entry.created_at,
                entry_id: entry.id.to_string(),
            });
            let next_cursor = if has_more {
                next_cursor.map(|c| c.encode()).transpose()?
            } else {
                None
            };

            Ok((out, next_cursor))
        })
    }

    /// Reconstructs an account's running-balance trace from its entry
    /// history.
    ///
    /// Read-only convenience over [`build_series`]; repeated calls over an
    /// unchanged history return identical output.
    pub async fn balance_series(&self, account_id: Uuid) -> ResultLedger<Vec<BalancePoint>> {
        let entries = self.list_entries(Some(account_id)).await?;
        Ok(build_series(&entries))
    }

    async fn next_seq(&self, db: &DatabaseTransaction, account_id: Uuid) -> ResultLedger<i64> {
        let last = entries::Entity::find()
            .filter(entries::Column::AccountId.eq(account_id.to_string()))
            .order_by_desc(entries::Column::Seq)
            .one(db)
            .await?;
        Ok(last.map_or(0, |model| model.seq) + 1)
    }
}
