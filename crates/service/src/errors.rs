use thiserror::Error;

/// Failure kinds surfaced to callers. Display strings are the plain messages shown to clients.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("database error: {0}")]
    Db(String),
    #[error(transparent)]
    Model(#[from] models::errors::ModelError),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }

    pub fn forbidden(entity: &str) -> Self {
        Self::Forbidden(format!("You do not have permission to modify this {}", entity.to_lowercase()))
    }

    /// True for failures the client can fix; false for storage faults.
    pub fn is_client_error(&self) -> bool {
        match self {
            ServiceError::Db(_) => false,
            ServiceError::Model(models::errors::ModelError::Db(_)) => false,
            _ => true,
        }
    }
}

impl From<sea_orm::DbErr> for ServiceError {
    fn from(e: sea_orm::DbErr) -> Self { ServiceError::Db(e.to_string()) }
}
