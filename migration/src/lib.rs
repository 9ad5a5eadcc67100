pub use sea_orm_migration::prelude::*;

mod m20250105_000001_create_districts;
mod m20250105_000002_create_parks;
mod m20250105_000003_create_users;
mod m20250105_000004_create_park_assignments;
mod m20250105_000005_create_bookings;
mod m20250105_000006_create_issued_tickets;
mod m20250312_000001_add_password_reset_otp;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250105_000001_create_districts::Migration),
            Box::new(m20250105_000002_create_parks::Migration),
            Box::new(m20250105_000003_create_users::Migration),
            Box::new(m20250105_000004_create_park_assignments::Migration),
            Box::new(m20250105_000005_create_bookings::Migration),
            Box::new(m20250105_000006_create_issued_tickets::Migration),
            Box::new(m20250312_000001_add_password_reset_otp::Migration),
        ]
    }
}
