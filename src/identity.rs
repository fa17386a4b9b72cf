use log::{debug, info};

use crate::error::AppError;
use crate::models::{NewUser, User};
use crate::store::Store;

/// Users created on first start when the users relation is empty.
pub const DEFAULT_USERS: &[(&str, &str)] = &[
    ("Testov Test Testovich", "test"),
    ("Petrov Petr Petrovich", "petrov"),
    ("Ivanov Ivan Ivanovich", "ivanov"),
];

pub async fn resolve(store: &dyn Store, api_key: &str) -> Result<User, AppError> {
    let user = store
        .find_user_by_api_key(api_key)
        .await?
        .ok_or_else(|| AppError::NotFound("no user with this api key".to_string()))?;
    debug!("Resolved api key to user {}", user.id);
    Ok(user)
}

pub async fn find(store: &dyn Store, user_id: i64) -> Result<User, AppError> {
    store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {user_id} does not exist")))
}

/// Returns how many users were created.
pub async fn seed_default_users(store: &dyn Store) -> Result<usize, AppError> {
    if store.has_users().await? {
        debug!("Users present, skipping seed");
        return Ok(0);
    }

    for (full_name, api_key) in DEFAULT_USERS {
        let user = store
            .insert_user(NewUser {
                full_name: full_name.to_string(),
                api_key: api_key.to_string(),
            })
            .await?;
        info!("Seeded user {} ({})", user.id, user.full_name);
    }
    Ok(DEFAULT_USERS.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn seeding_happens_once() {
        let store = MemoryStore::new();
        assert_eq!(seed_default_users(&store).await.unwrap(), 3);
        assert_eq!(seed_default_users(&store).await.unwrap(), 0);

        let petrov = resolve(&store, "petrov").await.unwrap();
        assert_eq!(petrov.full_name, "Petrov Petr Petrovich");
    }

    #[tokio::test]
    async fn unknown_key_is_not_found() {
        let store = MemoryStore::new();
        seed_default_users(&store).await.unwrap();
        assert!(matches!(
            resolve(&store, "nobody").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn find_reports_missing_user() {
        let store = MemoryStore::new();
        assert!(matches!(find(&store, 42).await, Err(AppError::NotFound(_))));
    }
}
