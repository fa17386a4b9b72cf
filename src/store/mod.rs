use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{
    FollowEdge, Follower, Following, Like, LikeSnapshot, Media, NewLike, NewMedia, NewTweet,
    NewUser, Tweet, User,
};

pub mod memory;
pub mod scylla;

#[cfg(test)]
mod conformance;

pub use self::memory::MemoryStore;
pub use self::scylla::ScyllaStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Row storage for users, tweets, likes, media and the mirrored follow tables.
/// Compound writes are single methods so each backend can make them atomic.
#[async_trait]
pub trait Store: Send + Sync {
    // --- Users ---

    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;

    async fn find_user_by_api_key(&self, api_key: &str) -> StoreResult<Option<User>>;

    async fn has_users(&self) -> StoreResult<bool>;

    // --- Tweets ---

    /// Insert a tweet with zero likes and link every media row in `claimed_media` to it.
    async fn create_tweet(&self, tweet: NewTweet, claimed_media: &[i64]) -> StoreResult<Tweet>;

    async fn find_tweet(&self, id: i64) -> StoreResult<Option<Tweet>>;

    /// Every tweet, in no particular order.
    async fn all_tweets(&self) -> StoreResult<Vec<Tweet>>;

    async fn set_tweet_likes(
        &self,
        tweet_id: i64,
        like_count: i64,
        likes: &[LikeSnapshot],
    ) -> StoreResult<()>;

    /// Remove the tweet, all of its like rows and the listed media rows as one unit.
    async fn delete_tweet(&self, tweet_id: i64, media_ids: &[i64]) -> StoreResult<()>;

    // --- Likes ---

    /// Upsert keyed by (tweet, user).
    async fn insert_like(&self, like: NewLike) -> StoreResult<Like>;

    async fn find_like(&self, tweet_id: i64, user_id: i64) -> StoreResult<Option<Like>>;

    async fn delete_like(&self, tweet_id: i64, user_id: i64) -> StoreResult<()>;

    /// Like rows of one tweet, oldest first.
    async fn likes_for_tweet(&self, tweet_id: i64) -> StoreResult<Vec<Like>>;

    // --- Media ---

    async fn insert_media(&self, media: NewMedia) -> StoreResult<Media>;

    /// Rows for the ids that exist; unknown ids are skipped.
    async fn find_media(&self, ids: &[i64]) -> StoreResult<Vec<Media>>;

    /// Media rows linked to a tweet, by ascending id.
    async fn media_for_tweet(&self, tweet_id: i64) -> StoreResult<Vec<Media>>;

    // --- Follow edges ---

    /// Write the following row and its mirror follower row together.
    async fn insert_follow(&self, edge: &FollowEdge) -> StoreResult<()>;

    /// Delete both halves of the edge; an absent half is ignored.
    async fn delete_follow(&self, follower_id: i64, target_id: i64) -> StoreResult<()>;

    async fn following_of(&self, user_id: i64) -> StoreResult<Vec<Following>>;

    async fn followers_of(&self, user_id: i64) -> StoreResult<Vec<Follower>>;
}
