//! Entry primitives.
//!
//! An `Entry` is an immutable, append-only record of a single balance
//! movement. Entries are never updated or deleted; corrections are made by
//! recording a compensating movement.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, ResultLedger};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }

    /// Signed contribution of a movement of `amount` in this direction.
    pub fn signed(self, amount: i64) -> i64 {
        match self {
            Self::Inbound => amount,
            Self::Outbound => -amount,
        }
    }
}

impl TryFrom<&str> for Direction {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "inbound" => Ok(Self::Inbound),
            "outbound" => Ok(Self::Outbound),
            other => Err(LedgerError::InvalidInput(format!(
                "invalid direction: {other}"
            ))),
        }
    }
}

/// A single signed movement against an account.
///
/// `seq` is the store-assigned ordering key, strictly increasing within an
/// account; it is the causal order used for balance reconstruction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub account_id: Uuid,
    pub direction: Direction,
    pub amount: i64,
    pub actor_id: String,
    pub seq: i64,
    pub created_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(
        account_id: Uuid,
        direction: Direction,
        amount: i64,
        actor_id: String,
        seq: i64,
        created_at: DateTime<Utc>,
    ) -> ResultLedger<Self> {
        if amount <= 0 {
            return Err(LedgerError::InvalidInput(
                "amount must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            account_id,
            direction,
            amount,
            actor_id,
            seq,
            created_at,
        })
    }

    /// `+amount` for inbound movements, `-amount` for outbound ones.
    pub fn signed_amount(&self) -> i64 {
        self.direction.signed(self.amount)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub account_id: String,
    pub direction: String,
    pub amount: i64,
    pub actor_id: String,
    pub seq: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Entry> for ActiveModel {
    fn from(entry: &Entry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            account_id: ActiveValue::Set(entry.account_id.to_string()),
            direction: ActiveValue::Set(entry.direction.as_str().to_string()),
            amount: ActiveValue::Set(entry.amount),
            actor_id: ActiveValue::Set(entry.actor_id.clone()),
            seq: ActiveValue::Set(entry.seq),
            created_at: ActiveValue::Set(entry.created_at),
        }
    }
}

impl TryFrom<Model> for Entry {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::KeyNotFound("entry not exists".to_string()))?,
            account_id: Uuid::parse_str(&model.account_id)
                .map_err(|_| LedgerError::KeyNotFound("account not exists".to_string()))?,
            direction: Direction::try_from(model.direction.as_str())?,
            amount: model.amount,
            actor_id: model.actor_id,
            seq: model.seq,
            created_at: model.created_at,
        })
    }
}
