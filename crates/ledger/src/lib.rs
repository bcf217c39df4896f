pub use accounts::Account;
pub use entries::{Direction, Entry};
pub use error::LedgerError;
pub use ops::{AccountView, EntryView, Ledger, LedgerBuilder};
pub use series::{BalancePoint, bucket_daily, build_series};

mod accounts;
mod entries;
mod error;
mod ops;
mod series;
mod users;

type ResultLedger<T> = Result<T, LedgerError>;
