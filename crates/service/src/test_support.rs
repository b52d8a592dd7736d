#![cfg(test)]
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use models::user;

/// Fresh migrated in-memory database; every test gets its own.
pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    models::db::connect_in_memory().await
}

pub async fn seed_user(db: &DatabaseConnection, name: &str) -> Result<user::Model, anyhow::Error> {
    let email = format!("{}@example.com", name.to_lowercase());
    Ok(user::create(db, Uuid::new_v4(), &email, name).await?)
}

pub fn limits() -> configs::PaginationConfig { configs::PaginationConfig::default() }
