use sea_orm_migration::{prelude::*, schema::*};

use super::m20250105_000002_create_parks::Park;
use super::m20250105_000003_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ParkAssignment::Table)
                    .if_not_exists()
                    .col(uuid(ParkAssignment::UserId).not_null())
                    .col(uuid(ParkAssignment::ParkId).not_null())
                    .primary_key(
                        Index::create()
                            .col(ParkAssignment::UserId)
                            .col(ParkAssignment::ParkId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_park_assignment_user")
                            .from(ParkAssignment::Table, ParkAssignment::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_park_assignment_park")
                            .from(ParkAssignment::Table, ParkAssignment::ParkId)
                            .to(Park::Table, Park::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ParkAssignment::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ParkAssignment {
    Table,
    UserId,
    ParkId,
}
