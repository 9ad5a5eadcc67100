use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20250105_000002_create_parks::Park;
use super::m20250105_000003_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(BookingStatus::Enum)
                    .values([
                        BookingStatus::Active,
                        BookingStatus::Used,
                        BookingStatus::Cancelled,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(PaymentStatus::Enum)
                    .values([
                        PaymentStatus::Pending,
                        PaymentStatus::Completed,
                        PaymentStatus::Failed,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Booking::Table)
                    .if_not_exists()
                    .col(uuid(Booking::Id).primary_key())
                    .col(string_len(Booking::TicketNo, 16).not_null().unique_key())
                    .col(uuid(Booking::ParkId).not_null())
                    .col(string_len(Booking::VisitorName, 100).not_null())
                    .col(string_len(Booking::VisitorEmail, 255).not_null())
                    .col(string_len(Booking::VisitorPhone, 50).not_null())
                    .col(integer(Booking::Adults).not_null())
                    .col(integer(Booking::Children).not_null())
                    .col(double(Booking::TotalAmount).not_null())
                    .col(date(Booking::VisitDate).not_null())
                    .col(
                        ColumnDef::new(Booking::Status)
                            .custom(BookingStatus::Enum)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Booking::PaymentStatus)
                            .custom(PaymentStatus::Enum)
                            .not_null()
                            .default("pending"),
                    )
                    .col(string_len_null(Booking::PaymentId, 100))
                    .col(boolean(Booking::IsPrinted).not_null().default(false))
                    .col(boolean(Booking::IsDownloaded).not_null().default(false))
                    .col(timestamp_with_time_zone_null(Booking::UsedAt))
                    .col(uuid_null(Booking::UsedBy))
                    .col(
                        timestamp_with_time_zone(Booking::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_park")
                            .from(Booking::Table, Booking::ParkId)
                            .to(Park::Table, Park::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_used_by")
                            .from(Booking::Table, Booking::UsedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Analytics always filters on creation time, usually narrowed by park
        manager
            .create_index(
                Index::create()
                    .name("idx_booking_park_created_at")
                    .table(Booking::Table)
                    .col(Booking::ParkId)
                    .col(Booking::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_created_at")
                    .table(Booking::Table)
                    .col(Booking::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Booking::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(PaymentStatus::Enum).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(BookingStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Booking {
    Table,
    Id,
    TicketNo,
    ParkId,
    VisitorName,
    VisitorEmail,
    VisitorPhone,
    Adults,
    Children,
    TotalAmount,
    VisitDate,
    Status,
    PaymentStatus,
    PaymentId,
    IsPrinted,
    IsDownloaded,
    UsedAt,
    UsedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum BookingStatus {
    #[sea_orm(iden = "booking_status")]
    Enum,
    #[sea_orm(iden = "active")]
    Active,
    #[sea_orm(iden = "used")]
    Used,
    #[sea_orm(iden = "cancelled")]
    Cancelled,
}

#[derive(DeriveIden)]
pub enum PaymentStatus {
    #[sea_orm(iden = "payment_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "completed")]
    Completed,
    #[sea_orm(iden = "failed")]
    Failed,
}
