//! The module contains the representation of a ledger account.
//!
//! An account is a named pool of stock whose balance is the signed sum of
//! its entries. The `balance` column is denormalized for cheap reads; it is
//! only ever written inside the same database transaction that inserts the
//! entry producing the change, so readers always observe a balance matching
//! a prefix of the entry history.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, ResultLedger};

/// A named balance pool.
///
/// `balance` is a whole-unit quantity and never goes below zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub balance: i64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Creates a new account with an explicit opening balance.
    ///
    /// The name is expected to be already normalized and non-empty (the
    /// ledger operations take care of that before calling here).
    pub fn new(
        name: String,
        initial_balance: i64,
        created_by: String,
        created_at: DateTime<Utc>,
    ) -> ResultLedger<Self> {
        if initial_balance < 0 {
            return Err(LedgerError::InvalidInput(
                "initial balance must be >= 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            balance: initial_balance,
            created_by,
            created_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub balance: i64,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::entries::Entity")]
    Entries,
}

impl Related<super::entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        Self {
            id: ActiveValue::Set(account.id.to_string()),
            name: ActiveValue::Set(account.name.clone()),
            balance: ActiveValue::Set(account.balance),
            created_by: ActiveValue::Set(account.created_by.clone()),
            created_at: ActiveValue::Set(account.created_at),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::KeyNotFound("account not exists".to_string()))?,
            name: model.name,
            balance: model.balance,
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}
