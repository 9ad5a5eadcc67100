use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Ticket numbers outlive their bookings: rows here are never deleted
        manager
            .create_table(
                Table::create()
                    .table(IssuedTicket::Table)
                    .if_not_exists()
                    .col(string_len(IssuedTicket::TicketNo, 16).primary_key())
                    .col(
                        timestamp_with_time_zone(IssuedTicket::IssuedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IssuedTicket::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum IssuedTicket {
    Table,
    TicketNo,
    IssuedAt,
}
