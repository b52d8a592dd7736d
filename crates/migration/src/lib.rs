//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_user;
mod m20240101_000002_create_company;
mod m20240101_000003_create_contact;
mod m20240101_000004_create_deal;
mod m20240101_000005_create_lead;
mod m20240101_000006_create_task;
mod m20240101_000007_create_activities;
mod m20240101_000008_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_user::Migration),
            Box::new(m20240101_000002_create_company::Migration),
            Box::new(m20240101_000003_create_contact::Migration),
            Box::new(m20240101_000004_create_deal::Migration),
            Box::new(m20240101_000005_create_lead::Migration),
            Box::new(m20240101_000006_create_task::Migration),
            Box::new(m20240101_000007_create_activities::Migration),
            // Indexes should always be applied last
            Box::new(m20240101_000008_add_indexes::Migration),
        ]
    }
}
