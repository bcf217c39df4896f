use std::time::Duration;

use ledger::{Direction, Ledger, LedgerError};
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

async fn ledger_with_db() -> (Ledger, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let ledger = Ledger::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (ledger, db)
}

async fn ledger_with_file_db() -> (Ledger, DatabaseConnection, String, std::path::PathBuf) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("ledger_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    // Writers serialize on a single pooled connection, mirroring the
    // one-writer discipline of the store itself.
    let mut options = ConnectOptions::new(url.clone());
    options.max_connections(1);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let ledger = Ledger::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();

    (ledger, db, url, path)
}

async fn seed_user(db: &DatabaseConnection, id: &str, name: &str) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (id, name) VALUES (?, ?)",
        vec![id.into(), name.into()],
    ))
    .await
    .unwrap();
}

#[tokio::test]
async fn create_account_persists_opening_balance() {
    let (ledger, _db) = ledger_with_db().await;

    let account = ledger.create_account("Cemento", 250, "u-admin").await.unwrap();
    assert_eq!(account.balance, 250);

    let found = ledger.account(account.id).await.unwrap();
    assert_eq!(found.name, "Cemento");
    assert_eq!(found.balance, 250);
    assert_eq!(found.created_by, "u-admin");
}

#[tokio::test]
async fn create_account_rejects_invalid_input() {
    let (ledger, _db) = ledger_with_db().await;

    let err = ledger.create_account("   ", 0, "u-admin").await.unwrap_err();
    assert_eq!(
        err,
        LedgerError::InvalidInput("account name must not be empty".to_string())
    );

    let err = ledger.create_account("Arena", -5, "u-admin").await.unwrap_err();
    assert_eq!(
        err,
        LedgerError::InvalidInput("initial balance must be >= 0".to_string())
    );

    assert!(ledger.list_accounts().await.unwrap().is_empty());
}

#[tokio::test]
async fn record_entry_updates_balance_and_history() {
    let (ledger, _db) = ledger_with_db().await;
    let account = ledger.create_account("Cemento", 0, "u-admin").await.unwrap();

    let (account_after, entry) = ledger
        .record_entry(account.id, Direction::Inbound, 50, "u-admin")
        .await
        .unwrap();
    assert_eq!(account_after.balance, 50);
    assert_eq!(entry.seq, 1);
    assert_eq!(entry.signed_amount(), 50);

    ledger
        .record_entry(account.id, Direction::Outbound, 20, "u-admin")
        .await
        .unwrap();
    ledger
        .record_entry(account.id, Direction::Inbound, 5, "u-admin")
        .await
        .unwrap();

    let found = ledger.account(account.id).await.unwrap();
    assert_eq!(found.balance, 35);

    // Newest first, seq strictly increasing per account, and the balance
    // matches the signed sum of the history.
    let entries = ledger.list_entries(Some(account.id)).await.unwrap();
    let seqs: Vec<i64> = entries.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![3, 2, 1]);
    let signed_sum: i64 = entries.iter().map(|e| e.signed_amount()).sum();
    assert_eq!(signed_sum, found.balance);
}

#[tokio::test]
async fn overdraft_is_rejected_without_trace() {
    let (ledger, _db) = ledger_with_db().await;
    let account = ledger.create_account("Cemento", 10, "u-admin").await.unwrap();

    let err = ledger
        .record_entry(account.id, Direction::Outbound, 15, "u-admin")
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::InsufficientBalance("Cemento".to_string()));

    let found = ledger.account(account.id).await.unwrap();
    assert_eq!(found.balance, 10);
    assert!(ledger.list_entries(Some(account.id)).await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_amounts_are_rejected() {
    let (ledger, _db) = ledger_with_db().await;
    let account = ledger.create_account("Cemento", 10, "u-admin").await.unwrap();

    for amount in [0, -5] {
        let err = ledger
            .record_entry(account.id, Direction::Inbound, amount, "u-admin")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InvalidInput("amount must be > 0".to_string())
        );
    }

    let found = ledger.account(account.id).await.unwrap();
    assert_eq!(found.balance, 10);
    assert!(ledger.list_entries(Some(account.id)).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_account_is_not_found() {
    let (ledger, _db) = ledger_with_db().await;
    let missing = Uuid::new_v4();

    let err = ledger.account(missing).await.unwrap_err();
    assert_eq!(err, LedgerError::KeyNotFound("account not exists".to_string()));

    let err = ledger
        .record_entry(missing, Direction::Inbound, 10, "u-admin")
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::KeyNotFound("account not exists".to_string()));

    let err = ledger.balance_series(missing).await.unwrap_err();
    assert_eq!(err, LedgerError::KeyNotFound("account not exists".to_string()));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_outbounds_cannot_overdraw() {
    let (ledger, _db, _url, path) = ledger_with_file_db().await;
    let account = ledger.create_account("Cemento", 100, "u-admin").await.unwrap();

    let (first, second) = tokio::join!(
        ledger.record_entry(account.id, Direction::Outbound, 60, "u-admin"),
        ledger.record_entry(account.id, Direction::Outbound, 60, "u-admin"),
    );

    let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    let loser = if first.is_err() { first } else { second };
    assert_eq!(
        loser.unwrap_err(),
        LedgerError::InsufficientBalance("Cemento".to_string())
    );

    let found = ledger.account(account.id).await.unwrap();
    assert_eq!(found.balance, 40);
    assert_eq!(ledger.list_entries(Some(account.id)).await.unwrap().len(), 1);

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn balance_series_reflects_entry_order() {
    let (ledger, _db) = ledger_with_db().await;
    let account = ledger.create_account("Cemento", 0, "u-admin").await.unwrap();

    for (direction, amount) in [
        (Direction::Inbound, 50),
        (Direction::Outbound, 20),
        (Direction::Inbound, 5),
    ] {
        ledger
            .record_entry(account.id, direction, amount, "u-admin")
            .await
            .unwrap();
    }

    let series = ledger.balance_series(account.id).await.unwrap();
    let balances: Vec<i64> = series.iter().map(|p| p.running_balance).collect();
    assert_eq!(balances, vec![50, 30, 35]);

    // Reconstruction is read-only and repeatable.
    let again = ledger.balance_series(account.id).await.unwrap();
    assert_eq!(series, again);
}

#[tokio::test]
async fn directory_enriches_names_best_effort() {
    let (ledger, db) = ledger_with_db().await;
    seed_user(&db, "u-admin", "Admin").await;

    let known = ledger.create_account("Cemento", 0, "u-admin").await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let unknown = ledger.create_account("Arena", 0, "ghost").await.unwrap();

    let views = ledger.list_accounts().await.unwrap();
    assert_eq!(views.len(), 2);
    // Newest first.
    assert_eq!(views[0].account.id, unknown.id);
    assert_eq!(views[0].creator_name, None);
    assert_eq!(views[1].account.id, known.id);
    assert_eq!(views[1].creator_name, Some("Admin".to_string()));

    ledger
        .record_entry(known.id, Direction::Inbound, 30, "u-admin")
        .await
        .unwrap();
    ledger
        .record_entry(known.id, Direction::Inbound, 10, "ghost")
        .await
        .unwrap();

    let entries = ledger.list_entries_for_account(known.id).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].account_name, Some("Cemento".to_string()));
    assert_eq!(entries[0].actor_name, None);
    assert_eq!(entries[1].actor_name, Some("Admin".to_string()));
}

#[tokio::test]
async fn unrestricted_listing_spans_accounts_newest_first() {
    let (ledger, _db) = ledger_with_db().await;
    let cemento = ledger.create_account("Cemento", 0, "u-admin").await.unwrap();
    let arena = ledger.create_account("Arena", 0, "u-admin").await.unwrap();

    for (account_id, amount) in [(cemento.id, 10), (arena.id, 20), (cemento.id, 30)] {
        ledger
            .record_entry(account_id, Direction::Inbound, amount, "u-admin")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let all = ledger.list_entries(None).await.unwrap();
    let amounts: Vec<i64> = all.iter().map(|e| e.amount).collect();
    assert_eq!(amounts, vec![30, 20, 10]);

    let (page, cursor) = ledger.list_entries_page(2, None).await.unwrap();
    assert_eq!(page.len(), 2);
    let cursor = cursor.expect("expected a second page");

    let (rest, cursor) = ledger.list_entries_page(2, Some(&cursor)).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].amount, 10);
    assert!(cursor.is_none());
}

#[tokio::test]
async fn restart_ledger_reads_same_state() {
    let (ledger, db, url, path) = ledger_with_file_db().await;
    let account = ledger.create_account("Cemento", 0, "u-admin").await.unwrap();
    ledger
        .record_entry(account.id, Direction::Inbound, 75, "u-admin")
        .await
        .unwrap();

    ledger.close().await.unwrap();
    drop(db);

    let db2 = Database::connect(&url).await.unwrap();
    let ledger2 = Ledger::builder()
        .database(db2.clone())
        .build()
        .await
        .unwrap();

    let found = ledger2.account(account.id).await.unwrap();
    assert_eq!(found.balance, 75);
    assert_eq!(ledger2.list_entries(Some(account.id)).await.unwrap().len(), 1);

    drop(ledger2);
    drop(db2);
    let _ = std::fs::remove_file(path);
}
