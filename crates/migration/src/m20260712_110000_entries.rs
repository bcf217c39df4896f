use sea_orm_migration::prelude::*;

use crate::m20260712_100000_accounts::Accounts;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Entries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Entries::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Entries::AccountId).string().not_null())
                    .col(ColumnDef::new(Entries::Direction).string().not_null())
                    .col(ColumnDef::new(Entries::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Entries::ActorId).string().not_null())
                    .col(ColumnDef::new(Entries::Seq).big_integer().not_null())
                    .col(ColumnDef::new(Entries::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-entries-account_id")
                            .from(Entries::Table, Entries::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Per-account ordering key; also backstops the store-level guarantee
        // that `seq` is unique within an account.
        manager
            .create_index(
                Index::create()
                    .name("idx-entries-account_id-seq")
                    .table(Entries::Table)
                    .col(Entries::AccountId)
                    .col(Entries::Seq)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-entries-account_id-created_at")
                    .table(Entries::Table)
                    .col(Entries::AccountId)
                    .col(Entries::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Entries::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Entries {
    Table,
    Id,
    AccountId,
    Direction,
    Amount,
    ActorId,
    Seq,
    CreatedAt,
}
