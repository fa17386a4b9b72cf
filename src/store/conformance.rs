// Behaviour every `Store` backend must share. Each check runs against a fresh
// `MemoryStore`, and against a throwaway Scylla keyspace when SCYLLA_NODE is set
// and ignored tests are requested.

use std::env;

use chrono::Utc;
use uuid::Uuid;

use super::{MemoryStore, ScyllaStore, Store};
use crate::engagement;
use crate::models::{AuthorSnapshot, FollowEdge, LikeSnapshot, NewMedia, NewTweet, NewUser, User};

async fn scylla_store() -> Option<ScyllaStore> {
    let node = env::var("SCYLLA_NODE").ok()?;
    let keyspace = format!("microblog_test_{}", Uuid::new_v4().simple());
    Some(ScyllaStore::connect(&node, &keyspace).await.unwrap())
}

async fn user(store: &dyn Store, name: &str) -> User {
    store
        .insert_user(NewUser {
            full_name: name.to_string(),
            api_key: format!("{name}-key"),
        })
        .await
        .unwrap()
}

async fn media(store: &dyn Store, uploader: &User, file_name: &str) -> i64 {
    store
        .insert_media(NewMedia {
            file_name: file_name.to_string(),
            uploader_id: uploader.id,
        })
        .await
        .unwrap()
        .id
}

async fn ids_are_sequential(store: &dyn Store) {
    let mut ids = Vec::new();
    for name in ["one", "two", "three"] {
        ids.push(user(store, name).await.id);
    }
    assert_eq!(ids, vec![1, 2, 3]);

    let uploader = store.find_user(1).await.unwrap().unwrap();
    assert_eq!(media(store, &uploader, "a.png").await, 1);
    assert_eq!(media(store, &uploader, "b.png").await, 2);
    assert_eq!(
        store.find_user_by_api_key("two-key").await.unwrap().map(|u| u.id),
        Some(2)
    );
}

async fn create_claims_and_delete_cascades(store: &dyn Store) {
    let author = user(store, "author").await;
    let other = user(store, "other").await;
    let mine = media(store, &author, "mine.png").await;
    let theirs = media(store, &other, "theirs.png").await;

    let tweet = engagement::create_tweet(store, &author, "hello".into(), vec![mine, theirs])
        .await
        .unwrap();

    let attached = store.media_for_tweet(tweet.id).await.unwrap();
    assert_eq!(attached.iter().map(|m| m.id).collect::<Vec<_>>(), vec![mine]);
    assert_eq!(store.find_media(&[theirs]).await.unwrap()[0].tweet_id, None);

    engagement::like(store, tweet.id, &other).await.unwrap();
    engagement::delete_tweet(store, tweet.id, &author).await.unwrap();

    assert!(store.find_tweet(tweet.id).await.unwrap().is_none());
    assert!(store.likes_for_tweet(tweet.id).await.unwrap().is_empty());
    assert!(store.find_media(&[mine]).await.unwrap().is_empty());
    assert_eq!(store.find_media(&[theirs]).await.unwrap().len(), 1);
}

async fn like_then_unlike_restores_count(store: &dyn Store) {
    let author = user(store, "author").await;
    let fan = user(store, "fan").await;
    let tweet = engagement::create_tweet(store, &author, "hello".into(), vec![])
        .await
        .unwrap();

    let liked = engagement::like(store, tweet.id, &fan).await.unwrap();
    assert_eq!(liked.like_count, 1);
    let stored = store.find_tweet(tweet.id).await.unwrap().unwrap();
    assert_eq!(
        stored.likes,
        vec![LikeSnapshot {
            user_id: fan.id,
            user_name: "fan".into()
        }]
    );

    engagement::unlike(store, tweet.id, fan.id).await.unwrap();
    engagement::unlike(store, tweet.id, fan.id).await.unwrap();

    let stored = store.find_tweet(tweet.id).await.unwrap().unwrap();
    assert_eq!(stored.like_count, 0);
    assert!(stored.likes.is_empty());
}

async fn like_update_skips_deleted_tweet(store: &dyn Store) {
    let author = user(store, "author").await;
    let tweet = store
        .create_tweet(
            NewTweet {
                author: AuthorSnapshot {
                    id: author.id,
                    name: author.full_name.clone(),
                },
                text: "gone soon".into(),
                media_ids: Vec::new(),
                created_at: Utc::now(),
            },
            &[],
        )
        .await
        .unwrap();
    store.delete_tweet(tweet.id, &[]).await.unwrap();

    store.set_tweet_likes(tweet.id, 1, &[]).await.unwrap();

    assert!(store.find_tweet(tweet.id).await.unwrap().is_none());
    assert!(store.all_tweets().await.unwrap().is_empty());
}

async fn unfollow_removes_both_mirror_rows(store: &dyn Store) {
    let a = user(store, "a").await;
    let b = user(store, "b").await;
    let edge = FollowEdge {
        follower_id: a.id,
        follower_name: a.full_name.clone(),
        target_id: b.id,
        target_name: b.full_name.clone(),
    };

    store.insert_follow(&edge).await.unwrap();
    store.insert_follow(&edge).await.unwrap();

    let following = store.following_of(a.id).await.unwrap();
    let followers = store.followers_of(b.id).await.unwrap();
    assert_eq!(following.len(), 1);
    assert_eq!((following[0].target_id, following[0].target_name.as_str()), (b.id, "b"));
    assert_eq!(followers.len(), 1);
    assert_eq!(
        (followers[0].subscriber_id, followers[0].subscriber_name.as_str()),
        (a.id, "a")
    );

    store.delete_follow(a.id, b.id).await.unwrap();
    store.delete_follow(a.id, b.id).await.unwrap();

    assert!(store.following_of(a.id).await.unwrap().is_empty());
    assert!(store.followers_of(b.id).await.unwrap().is_empty());
}

macro_rules! store_suite {
    ($($check:ident),* $(,)?) => {
        mod memory_backend {
            $(
                #[tokio::test]
                async fn $check() {
                    super::$check(&super::MemoryStore::new()).await;
                }
            )*
        }

        mod scylla_backend {
            $(
                #[tokio::test]
                #[ignore = "needs a ScyllaDB node at SCYLLA_NODE"]
                async fn $check() {
                    let Some(store) = super::scylla_store().await else {
                        return;
                    };
                    super::$check(&store).await;
                }
            )*
        }
    };
}

store_suite!(
    ids_are_sequential,
    create_claims_and_delete_cascades,
    like_then_unlike_restores_count,
    like_update_skips_deleted_tweet,
    unfollow_removes_both_mirror_rows,
);
