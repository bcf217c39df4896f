use std::error::Error;

use clap::{Args, Parser, Subcommand};
use ledger::{Direction, Ledger};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

mod settings;

mod users {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

#[derive(Parser, Debug)]
#[command(name = "almacen")]
#[command(about = "Inventory ledger utilities (accounts, entries, balance series)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    /// Overrides the `settings.toml` database section.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Account(Account),
    Entry(Entry),
    Series(SeriesArgs),
    User(User),
}

#[derive(Args, Debug)]
struct Account {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    Create(AccountCreateArgs),
    List,
}

#[derive(Args, Debug)]
struct AccountCreateArgs {
    #[arg(long)]
    name: String,
    /// Opening balance in whole units.
    #[arg(long, default_value_t = 0)]
    balance: i64,
    /// Actor id recorded as the account creator.
    #[arg(long)]
    creator: String,
}

#[derive(Args, Debug)]
struct Entry {
    #[command(subcommand)]
    command: EntryCommand,
}

#[derive(Subcommand, Debug)]
enum EntryCommand {
    Record(EntryRecordArgs),
    List(EntryListArgs),
}

#[derive(Args, Debug)]
struct EntryRecordArgs {
    #[arg(long)]
    account: Uuid,
    /// "inbound" or "outbound".
    #[arg(long)]
    direction: String,
    #[arg(long)]
    amount: i64,
    /// Actor id recorded on the entry.
    #[arg(long)]
    actor: String,
}

#[derive(Args, Debug)]
struct EntryListArgs {
    /// Restrict the listing to one account.
    #[arg(long)]
    account: Option<Uuid>,
}

#[derive(Args, Debug)]
struct SeriesArgs {
    #[arg(long)]
    account: Uuid,
    /// Collapse the series to one point per calendar day.
    #[arg(long)]
    daily: bool,
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    name: String,
    /// Actor id; generated when omitted.
    #[arg(long)]
    id: Option<String>,
}

fn parse_direction(raw: &str) -> Result<Direction, String> {
    Direction::try_from(raw).map_err(|err| err.to_string())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "almacen={level},ledger={level}",
            level = settings.app.level
        ))
        .init();

    let database_url = cli
        .database_url
        .unwrap_or_else(|| settings.database.url());
    tracing::debug!("connecting to {database_url}");
    let db = connect_db(&database_url).await?;

    let ledger = Ledger::builder().database(db.clone()).build().await?;
    let outcome = run(&ledger, &db, cli.command).await;
    ledger.close().await?;

    if let Err(err) = outcome {
        eprintln!("{err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(
    ledger: &Ledger,
    db: &DatabaseConnection,
    command: Command,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        Command::Account(Account {
            command: AccountCommand::Create(args),
        }) => {
            let account = ledger
                .create_account(&args.name, args.balance, &args.creator)
                .await?;
            println!(
                "created account: {} ({}), balance {}",
                account.name, account.id, account.balance
            );
        }
        Command::Account(Account {
            command: AccountCommand::List,
        }) => {
            for view in ledger.list_accounts().await? {
                let creator = view
                    .creator_name
                    .unwrap_or_else(|| view.account.created_by.clone());
                println!(
                    "{}  {}  balance {}  created by {}",
                    view.account.id, view.account.name, view.account.balance, creator
                );
            }
        }
        Command::Entry(Entry {
            command: EntryCommand::Record(args),
        }) => {
            let direction = match parse_direction(&args.direction) {
                Ok(v) => v,
                Err(err) => {
                    eprintln!("{err}");
                    std::process::exit(2);
                }
            };

            let (account, entry) = ledger
                .record_entry(args.account, direction, args.amount, &args.actor)
                .await?;
            println!(
                "recorded {} {} on {} ({}), balance {}",
                entry.direction.as_str(),
                entry.amount,
                account.name,
                account.id,
                account.balance
            );
        }
        Command::Entry(Entry {
            command: EntryCommand::List(args),
        }) => match args.account {
            Some(account_id) => {
                for view in ledger.list_entries_for_account(account_id).await? {
                    let actor = view
                        .actor_name
                        .unwrap_or_else(|| view.entry.actor_id.clone());
                    println!(
                        "{}  {:8}  {:>8}  by {}",
                        view.entry.created_at,
                        view.entry.direction.as_str(),
                        view.entry.amount,
                        actor
                    );
                }
            }
            None => {
                for entry in ledger.list_entries(None).await? {
                    println!(
                        "{}  {:8}  {:>8}  account {}",
                        entry.created_at,
                        entry.direction.as_str(),
                        entry.amount,
                        entry.account_id
                    );
                }
            }
        },
        Command::Series(args) => {
            let series = ledger.balance_series(args.account).await?;
            if args.daily {
                for (date, balance) in ledger::bucket_daily(&series) {
                    println!("{date}  {balance}");
                }
            } else {
                for point in series {
                    println!("{}  {}", point.timestamp, point.running_balance);
                }
            }
        }
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let id = args.id.unwrap_or_else(|| Uuid::new_v4().to_string());

            if users::Entity::find_by_id(id.clone()).one(db).await?.is_some() {
                eprintln!("user already exists: {id}");
                std::process::exit(1);
            }

            let user = users::ActiveModel {
                id: Set(id.clone()),
                name: Set(args.name.clone()),
            };
            users::Entity::insert(user).exec(db).await?;

            println!("created user: {} ({id})", args.name);
        }
    }

    Ok(())
}
