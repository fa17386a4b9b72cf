use log::{debug, info};

use crate::error::AppError;
use crate::identity;
use crate::models::{FollowEdge, Profile, User, UserRef};
use crate::store::Store;

pub async fn follow(store: &dyn Store, follower: &User, target_id: i64) -> Result<(), AppError> {
    let target = identity::find(store, target_id).await?;
    store
        .insert_follow(&FollowEdge {
            follower_id: follower.id,
            follower_name: follower.full_name.clone(),
            target_id: target.id,
            target_name: target.full_name,
        })
        .await?;

    info!("User {} now follows user {}", follower.id, target_id);
    Ok(())
}

/// Dropping an edge that does not exist is not an error.
pub async fn unfollow(store: &dyn Store, follower_id: i64, target_id: i64) -> Result<(), AppError> {
    store.delete_follow(follower_id, target_id).await?;
    info!("User {} unfollowed user {}", follower_id, target_id);
    Ok(())
}

pub async fn profile(store: &dyn Store, user: &User) -> Result<Profile, AppError> {
    let followers = store
        .followers_of(user.id)
        .await?
        .into_iter()
        .map(|row| UserRef {
            id: row.subscriber_id,
            name: row.subscriber_name,
        })
        .collect::<Vec<_>>();
    let following = store
        .following_of(user.id)
        .await?
        .into_iter()
        .map(|row| UserRef {
            id: row.target_id,
            name: row.target_name,
        })
        .collect::<Vec<_>>();

    debug!(
        "Profile {}: {} followers, {} following",
        user.id,
        followers.len(),
        following.len()
    );
    Ok(Profile {
        id: user.id,
        name: user.full_name.clone(),
        followers,
        following,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{resolve, seed_default_users};
    use crate::store::MemoryStore;

    fn user_ref(user: &User) -> UserRef {
        UserRef {
            id: user.id,
            name: user.full_name.clone(),
        }
    }

    #[tokio::test]
    async fn follow_shows_on_both_profiles_and_unfollow_clears_both() {
        let store = MemoryStore::new();
        seed_default_users(&store).await.unwrap();
        let a = resolve(&store, "test").await.unwrap();
        let b = resolve(&store, "ivanov").await.unwrap();

        follow(&store, &a, b.id).await.unwrap();

        assert_eq!(profile(&store, &b).await.unwrap().followers, vec![user_ref(&a)]);
        assert_eq!(profile(&store, &a).await.unwrap().following, vec![user_ref(&b)]);
        assert!(profile(&store, &a).await.unwrap().followers.is_empty());

        unfollow(&store, a.id, b.id).await.unwrap();

        assert!(profile(&store, &b).await.unwrap().followers.is_empty());
        assert!(profile(&store, &a).await.unwrap().following.is_empty());
    }

    #[tokio::test]
    async fn repeated_follow_keeps_single_edge() {
        let store = MemoryStore::new();
        seed_default_users(&store).await.unwrap();
        let a = resolve(&store, "test").await.unwrap();
        let b = resolve(&store, "petrov").await.unwrap();

        follow(&store, &a, b.id).await.unwrap();
        follow(&store, &a, b.id).await.unwrap();

        assert_eq!(profile(&store, &b).await.unwrap().followers.len(), 1);
    }

    #[tokio::test]
    async fn unfollow_without_edge_is_noop() {
        let store = MemoryStore::new();
        seed_default_users(&store).await.unwrap();
        let a = resolve(&store, "test").await.unwrap();

        unfollow(&store, a.id, 2).await.unwrap();
        unfollow(&store, a.id, 999).await.unwrap();
    }

    #[tokio::test]
    async fn follow_unknown_user_is_not_found() {
        let store = MemoryStore::new();
        seed_default_users(&store).await.unwrap();
        let a = resolve(&store, "test").await.unwrap();

        assert!(matches!(
            follow(&store, &a, 999).await,
            Err(AppError::NotFound(_))
        ));
        assert!(profile(&store, &a).await.unwrap().following.is_empty());
    }
}
