use std::collections::BTreeMap;

use async_trait::async_trait;
use log::debug;
use tokio::sync::RwLock;

use super::{Store, StoreResult};
use crate::models::{
    FollowEdge, Follower, Following, Like, LikeSnapshot, Media, NewLike, NewMedia, NewTweet,
    NewUser, Tweet, User,
};

#[derive(Default)]
struct Tables {
    next_id: BTreeMap<&'static str, i64>,
    users: BTreeMap<i64, User>,
    tweets: BTreeMap<i64, Tweet>,
    likes: BTreeMap<(i64, i64), Like>,
    media: BTreeMap<i64, Media>,
    following: BTreeMap<(i64, i64), Following>,
    followers: BTreeMap<(i64, i64), Follower>,
}

impl Tables {
    fn allocate(&mut self, table: &'static str) -> i64 {
        let next = self.next_id.entry(table).or_insert(0);
        *next += 1;
        *next
    }
}

/// Process-local store. Each method holds the lock for its whole body, so
/// compound writes are atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let id = tables.allocate("users");
        let user = User {
            id,
            full_name: user.full_name,
            api_key: user.api_key,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_api_key(&self, api_key: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.api_key == api_key)
            .cloned())
    }

    async fn has_users(&self) -> StoreResult<bool> {
        Ok(!self.tables.read().await.users.is_empty())
    }

    async fn create_tweet(&self, tweet: NewTweet, claimed_media: &[i64]) -> StoreResult<Tweet> {
        let mut tables = self.tables.write().await;
        let id = tables.allocate("tweets");
        let tweet = Tweet {
            id,
            author_id: tweet.author.id,
            author: tweet.author,
            text: tweet.text,
            media_ids: tweet.media_ids,
            like_count: 0,
            likes: Vec::new(),
            created_at: tweet.created_at,
        };
        tables.tweets.insert(id, tweet.clone());
        for media_id in claimed_media {
            if let Some(media) = tables.media.get_mut(media_id) {
                media.tweet_id = Some(id);
            }
        }
        debug!("memory: tweet {} stored, {} media claimed", id, claimed_media.len());
        Ok(tweet)
    }

    async fn find_tweet(&self, id: i64) -> StoreResult<Option<Tweet>> {
        Ok(self.tables.read().await.tweets.get(&id).cloned())
    }

    async fn all_tweets(&self) -> StoreResult<Vec<Tweet>> {
        Ok(self.tables.read().await.tweets.values().cloned().collect())
    }

    async fn set_tweet_likes(
        &self,
        tweet_id: i64,
        like_count: i64,
        likes: &[LikeSnapshot],
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(tweet) = tables.tweets.get_mut(&tweet_id) {
            tweet.like_count = like_count;
            tweet.likes = likes.to_vec();
        }
        Ok(())
    }

    async fn delete_tweet(&self, tweet_id: i64, media_ids: &[i64]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        for media_id in media_ids {
            tables.media.remove(media_id);
        }
        tables.likes.retain(|&(t, _), _| t != tweet_id);
        tables.tweets.remove(&tweet_id);
        Ok(())
    }

    async fn insert_like(&self, like: NewLike) -> StoreResult<Like> {
        let mut tables = self.tables.write().await;
        let key = (like.tweet_id, like.user_id);
        // keep the original row id so snapshot order survives a repeated like
        let id = match tables.likes.get(&key) {
            Some(existing) => existing.id,
            None => tables.allocate("likes"),
        };
        let like = Like {
            id,
            user_id: like.user_id,
            user_name: like.user_name,
            tweet_id: like.tweet_id,
        };
        tables.likes.insert(key, like.clone());
        Ok(like)
    }

    async fn find_like(&self, tweet_id: i64, user_id: i64) -> StoreResult<Option<Like>> {
        Ok(self
            .tables
            .read()
            .await
            .likes
            .get(&(tweet_id, user_id))
            .cloned())
    }

    async fn delete_like(&self, tweet_id: i64, user_id: i64) -> StoreResult<()> {
        self.tables.write().await.likes.remove(&(tweet_id, user_id));
        Ok(())
    }

    async fn likes_for_tweet(&self, tweet_id: i64) -> StoreResult<Vec<Like>> {
        let tables = self.tables.read().await;
        let mut likes: Vec<Like> = tables
            .likes
            .range((tweet_id, i64::MIN)..=(tweet_id, i64::MAX))
            .map(|(_, like)| like.clone())
            .collect();
        likes.sort_by_key(|like| like.id);
        Ok(likes)
    }

    async fn insert_media(&self, media: NewMedia) -> StoreResult<Media> {
        let mut tables = self.tables.write().await;
        let id = tables.allocate("media");
        let media = Media {
            id,
            file_name: media.file_name,
            uploader_id: media.uploader_id,
            tweet_id: None,
        };
        tables.media.insert(id, media.clone());
        Ok(media)
    }

    async fn find_media(&self, ids: &[i64]) -> StoreResult<Vec<Media>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.media.get(id).cloned())
            .collect())
    }

    async fn media_for_tweet(&self, tweet_id: i64) -> StoreResult<Vec<Media>> {
        let tables = self.tables.read().await;
        Ok(tables
            .media
            .values()
            .filter(|m| m.tweet_id == Some(tweet_id))
            .cloned()
            .collect())
    }

    async fn insert_follow(&self, edge: &FollowEdge) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.following.insert(
            (edge.follower_id, edge.target_id),
            Following {
                my_id: edge.follower_id,
                target_id: edge.target_id,
                target_name: edge.target_name.clone(),
            },
        );
        tables.followers.insert(
            (edge.target_id, edge.follower_id),
            Follower {
                my_id: edge.target_id,
                subscriber_id: edge.follower_id,
                subscriber_name: edge.follower_name.clone(),
            },
        );
        Ok(())
    }

    async fn delete_follow(&self, follower_id: i64, target_id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.following.remove(&(follower_id, target_id));
        tables.followers.remove(&(target_id, follower_id));
        Ok(())
    }

    async fn following_of(&self, user_id: i64) -> StoreResult<Vec<Following>> {
        let tables = self.tables.read().await;
        Ok(tables
            .following
            .range((user_id, i64::MIN)..=(user_id, i64::MAX))
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn followers_of(&self, user_id: i64) -> StoreResult<Vec<Follower>> {
        let tables = self.tables.read().await;
        Ok(tables
            .followers
            .range((user_id, i64::MIN)..=(user_id, i64::MAX))
            .map(|(_, row)| row.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthorSnapshot;
    use chrono::Utc;

    fn new_tweet(author_id: i64) -> NewTweet {
        NewTweet {
            author: AuthorSnapshot {
                id: author_id,
                name: "someone".into(),
            },
            text: "hello".into(),
            media_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn ids_are_sequential_per_relation() {
        let store = MemoryStore::new();
        let a = store.create_tweet(new_tweet(1), &[]).await.unwrap();
        let b = store.create_tweet(new_tweet(1), &[]).await.unwrap();
        let m = store
            .insert_media(NewMedia {
                file_name: "a.png".into(),
                uploader_id: 1,
            })
            .await
            .unwrap();
        assert_eq!((a.id, b.id, m.id), (1, 2, 1));
    }

    #[tokio::test]
    async fn repeated_like_keeps_one_row() {
        let store = MemoryStore::new();
        let like = || NewLike {
            user_id: 4,
            user_name: "four".into(),
            tweet_id: 9,
        };
        let first = store.insert_like(like()).await.unwrap();
        let second = store.insert_like(like()).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.likes_for_tweet(9).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_tweet_only_touches_its_own_likes() {
        let store = MemoryStore::new();
        for tweet_id in [1, 2] {
            store
                .insert_like(NewLike {
                    user_id: 1,
                    user_name: "one".into(),
                    tweet_id,
                })
                .await
                .unwrap();
        }
        store.delete_tweet(1, &[]).await.unwrap();
        assert!(store.likes_for_tweet(1).await.unwrap().is_empty());
        assert_eq!(store.likes_for_tweet(2).await.unwrap().len(), 1);
    }
}
