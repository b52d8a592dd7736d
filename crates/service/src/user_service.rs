use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use tracing::{info, warn};
use uuid::Uuid;

use models::user;
use crate::errors::ServiceError;

/// Identity asserted by a verified bearer token.
#[derive(Clone, Debug)]
pub struct Claimed {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

#[derive(Clone)]
pub struct UserService {
    db: DatabaseConnection,
}

impl UserService {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }

    /// Return the caller's row, provisioning it on first sight so owner keys always resolve.
    pub async fn ensure_user(&self, claimed: &Claimed) -> Result<user::Model, ServiceError> {
        if let Some(found) = user::Entity::find_by_id(claimed.id).one(&self.db).await? {
            return Ok(found);
        }
        let email = claimed.email.trim().to_lowercase();
        let holder = user::Entity::find().filter(user::Column::Email.eq(email.as_str())).one(&self.db).await?;
        if holder.is_some() {
            warn!(user_id = %claimed.id, "token email belongs to another user");
            return Err(ServiceError::Conflict("This email is already linked to another user".into()));
        }
        let name = if claimed.name.trim().is_empty() { claimed.email.clone() } else { claimed.name.clone() };
        match user::create(&self.db, claimed.id, &email, &name).await {
            Ok(created) => {
                info!(user_id = %created.id, "provisioned_user_from_token");
                Ok(created)
            }
            // a concurrent first request for the same id won the insert
            Err(e) => match user::Entity::find_by_id(claimed.id).one(&self.db).await? {
                Some(found) => Ok(found),
                None => Err(e.into()),
            },
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<user::Model, ServiceError> {
        crate::query::find_or_404::<user::Entity, _>(&self.db, id, "User").await
    }

    /// Active users by name, for assignment pickers.
    pub async fn list_active(&self) -> Result<Vec<user::UserSummary>, ServiceError> {
        let rows = user::Entity::find()
            .filter(user::Column::IsActive.eq(true))
            .order_by_asc(user::Column::Name)
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.iter().map(user::UserSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    #[tokio::test]
    async fn ensure_user_is_idempotent() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let svc = UserService::new(db);
        let claimed = Claimed { id: Uuid::new_v4(), email: "Rep@Example.com".into(), name: "".into() };
        let first = svc.ensure_user(&claimed).await?;
        let second = svc.ensure_user(&claimed).await?;
        assert_eq!(first.id, second.id);
        assert_eq!(first.email, "rep@example.com");
        assert_eq!(first.name, "Rep@Example.com");
        assert_eq!(svc.list_active().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn email_claimed_by_another_id_conflicts() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let svc = UserService::new(db);
        svc.ensure_user(&Claimed { id: Uuid::new_v4(), email: "rep@example.com".into(), name: "Rep".into() }).await?;

        let err = svc
            .ensure_user(&Claimed { id: Uuid::new_v4(), email: "REP@example.com".into(), name: "Imposter".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert!(err.is_client_error());
        assert_eq!(svc.list_active().await?.len(), 1);
        Ok(())
    }
}
