pub use sea_orm_migration::prelude::*;

mod m20260712_090000_users;
mod m20260712_100000_accounts;
mod m20260712_110000_entries;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260712_090000_users::Migration),
            Box::new(m20260712_100000_accounts::Migration),
            Box::new(m20260712_110000_entries::Migration),
        ]
    }
}
