use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FilmMetadata::Table)
                    .if_not_exists()
                    .col(string(FilmMetadata::Id).primary_key())
                    .col(text(FilmMetadata::Payload))
                    .col(big_integer(FilmMetadata::FetchedAt))
                    .col(integer(FilmMetadata::SchemaVersion))
                    .col(big_integer(FilmMetadata::StoredAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_film_metadata_fetched_at")
                    .table(FilmMetadata::Table)
                    .col(FilmMetadata::FetchedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(FilmMetadata::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum FilmMetadata {
    Table,
    Id,
    Payload,
    FetchedAt,
    SchemaVersion,
    StoredAt,
}
