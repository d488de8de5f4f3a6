use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SharedFilmMetadata::Table)
                    .if_not_exists()
                    .col(string(SharedFilmMetadata::Id).primary_key())
                    .col(text(SharedFilmMetadata::Payload))
                    .col(big_integer(SharedFilmMetadata::FetchedAt))
                    .col(integer(SharedFilmMetadata::SchemaVersion))
                    .col(big_integer(SharedFilmMetadata::StoredAt))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(SharedFilmMetadata::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum SharedFilmMetadata {
    Table,
    Id,
    Payload,
    FetchedAt,
    SchemaVersion,
    StoredAt,
}
