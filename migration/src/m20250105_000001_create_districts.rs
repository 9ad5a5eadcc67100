use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(District::Table)
                    .if_not_exists()
                    .col(uuid(District::Id).primary_key())
                    .col(string_len(District::Name, 50).not_null().unique_key())
                    .col(string_len_null(District::Description, 500))
                    .col(
                        string_len(District::Image, 255)
                            .not_null()
                            .default("no-photo.jpg"),
                    )
                    .col(
                        timestamp_with_time_zone(District::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(District::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum District {
    Table,
    Id,
    Name,
    Description,
    Image,
    CreatedAt,
}
