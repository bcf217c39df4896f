use sea_orm::DatabaseConnection;
use unicode_normalization::UnicodeNormalization;

use crate::{LedgerError, ResultLedger};

mod accounts;
mod directory;
mod entries;

pub use directory::{AccountView, EntryView};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The ledger store.
///
/// Holds the database handle injected at construction; this is the only
/// path through which balances change. Reads never mutate state and can run
/// concurrently with writes on other accounts.
#[derive(Debug)]
pub struct Ledger {
    database: DatabaseConnection,
}

impl Ledger {
    /// Return a builder for `Ledger`. Help to build the struct.
    pub fn builder() -> LedgerBuilder {
        LedgerBuilder::default()
    }

    /// Closes the underlying database connection.
    ///
    /// Call once at shutdown; the ledger is unusable afterwards.
    pub async fn close(self) -> ResultLedger<()> {
        self.database.close().await?;
        Ok(())
    }
}

fn normalize_required_name(value: &str, label: &str) -> ResultLedger<String> {
    let trimmed: String = value.trim().nfc().collect();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidInput(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed)
}

/// The builder for `Ledger`
#[derive(Default)]
pub struct LedgerBuilder {
    database: DatabaseConnection,
}

impl LedgerBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> LedgerBuilder {
        self.database = db;
        self
    }

    /// Construct `Ledger`
    pub async fn build(self) -> ResultLedger<Ledger> {
        Ok(Ledger {
            database: self.database,
        })
    }
}
