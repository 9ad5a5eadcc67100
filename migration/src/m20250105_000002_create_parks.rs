use sea_orm_migration::{prelude::*, schema::*};

use super::m20250105_000001_create_districts::District;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Park::Table)
                    .if_not_exists()
                    .col(uuid(Park::Id).primary_key())
                    .col(string_len(Park::Name, 100).not_null().unique_key())
                    .col(string_len_null(Park::Description, 1000))
                    .col(uuid(Park::DistrictId).not_null())
                    .col(string_len(Park::Location, 255).not_null())
                    .col(
                        string_len(Park::Picture, 500)
                            .not_null()
                            .default("https://via.placeholder.com/100x100?text=No+Photo"),
                    )
                    .col(integer(Park::Capacity).not_null())
                    .col(double(Park::AdultPrice).not_null())
                    .col(double(Park::ChildPrice).not_null())
                    .col(
                        ColumnDef::new(Park::Features)
                            .array(ColumnType::Text)
                            .not_null()
                            .default(Expr::cust("'{}'")),
                    )
                    .col(
                        string_len(Park::OpeningHours, 100)
                            .not_null()
                            .default("9:00 AM - 5:00 PM"),
                    )
                    .col(boolean(Park::IsActive).not_null().default(true))
                    .col(
                        timestamp_with_time_zone(Park::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_park_district")
                            .from(Park::Table, Park::DistrictId)
                            .to(District::Table, District::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Park::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Park {
    Table,
    Id,
    Name,
    Description,
    DistrictId,
    Location,
    Picture,
    Capacity,
    AdultPrice,
    ChildPrice,
    Features,
    OpeningHours,
    IsActive,
    CreatedAt,
}
