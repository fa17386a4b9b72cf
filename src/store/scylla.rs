use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use ::scylla::batch::Batch;
use ::scylla::frame::response::result::{CqlValue, Row};
use ::scylla::frame::value::CqlTimestamp;
use ::scylla::{QueryResult, Session};

use super::{Store, StoreResult};
use crate::db;
use crate::error::StoreError;
use crate::models::{
    AuthorSnapshot, FollowEdge, Follower, Following, Like, LikeSnapshot, Media, NewLike, NewMedia,
    NewTweet, NewUser, Tweet, User,
};

const MAX_ID_ATTEMPTS: usize = 32;

const TWEET_COLUMNS: &str =
    "id, author_id, author, description, media, like_count, likes, created_at";
const MEDIA_COLUMNS: &str = "id, file_name, uploader_id, tweet_id";

pub struct ScyllaStore {
    session: Session,
}

impl ScyllaStore {
    pub async fn connect(known_node: &str, keyspace: &str) -> StoreResult<Self> {
        let session = db::create_session(known_node).await?;
        db::init_schema(&session, keyspace).await?;
        Ok(Self { session })
    }

    /// Allocate the next id of a relation through a compare-and-set on the
    /// sequences table. Ids are dense and increasing, so id order is creation order.
    async fn next_id(&self, table: &'static str) -> StoreResult<i64> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let current = self
                .session
                .query("SELECT value FROM sequences WHERE name = ?", (table,))
                .await?;

            let applied = match first_row(current) {
                None => {
                    let result = self
                        .session
                        .query(
                            "INSERT INTO sequences (name, value) VALUES (?, ?) IF NOT EXISTS",
                            (table, 1_i64),
                        )
                        .await?;
                    lwt_applied(result, table)?.then_some(1)
                }
                Some(row) => {
                    let value = col_i64(&row, 0, "sequences")?;
                    let result = self
                        .session
                        .query(
                            "UPDATE sequences SET value = ? WHERE name = ? IF value = ?",
                            (value + 1, table, value),
                        )
                        .await?;
                    lwt_applied(result, table)?.then_some(value + 1)
                }
            };

            if let Some(id) = applied {
                return Ok(id);
            }
            debug!("Sequence {} contended, retrying", table);
        }

        warn!("Giving up on sequence {} after {} attempts", table, MAX_ID_ATTEMPTS);
        Err(StoreError::IdContention(table))
    }

    async fn select_tweets(&self, cql: String, values: (i64,)) -> StoreResult<Vec<Tweet>> {
        let result = self.session.query(cql, values).await?;
        rows(result).iter().map(tweet_from_row).collect()
    }
}

#[async_trait]
impl Store for ScyllaStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let id = self.next_id("users").await?;
        self.session
            .query(
                "INSERT INTO users (id, full_name, api_key) VALUES (?, ?, ?)",
                (id, &user.full_name, &user.api_key),
            )
            .await?;

        Ok(User {
            id,
            full_name: user.full_name,
            api_key: user.api_key,
        })
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        let result = self
            .session
            .query("SELECT id, full_name, api_key FROM users WHERE id = ?", (id,))
            .await?;
        first_row(result).as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_api_key(&self, api_key: &str) -> StoreResult<Option<User>> {
        let result = self
            .session
            .query(
                "SELECT id, full_name, api_key FROM users WHERE api_key = ?",
                (api_key,),
            )
            .await?;
        first_row(result).as_ref().map(user_from_row).transpose()
    }

    async fn has_users(&self) -> StoreResult<bool> {
        let result = self.session.query("SELECT id FROM users LIMIT 1", ()).await?;
        Ok(first_row(result).is_some())
    }

    async fn create_tweet(&self, tweet: NewTweet, claimed_media: &[i64]) -> StoreResult<Tweet> {
        let id = self.next_id("tweets").await?;
        let author_json = serde_json::to_string(&tweet.author)?;
        let created_at = CqlTimestamp(tweet.created_at.timestamp_millis());

        self.session
            .query(
                "INSERT INTO tweets (id, author_id, author, description, media, like_count, likes, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                (
                    id,
                    tweet.author.id,
                    &author_json,
                    &tweet.text,
                    &tweet.media_ids,
                    0_i64,
                    "[]",
                    created_at,
                ),
            )
            .await?;

        if !claimed_media.is_empty() {
            let mut batch = Batch::default();
            let mut values = Vec::with_capacity(claimed_media.len());
            for media_id in claimed_media {
                batch.append_statement("UPDATE media SET tweet_id = ? WHERE id = ?");
                values.push((id, *media_id));
            }
            self.session.batch(&batch, values).await?;
        }

        Ok(Tweet {
            id,
            author_id: tweet.author.id,
            author: tweet.author,
            text: tweet.text,
            media_ids: tweet.media_ids,
            like_count: 0,
            likes: Vec::new(),
            created_at: tweet.created_at,
        })
    }

    async fn find_tweet(&self, id: i64) -> StoreResult<Option<Tweet>> {
        let tweets = self
            .select_tweets(
                format!("SELECT {TWEET_COLUMNS} FROM tweets WHERE id = ?"),
                (id,),
            )
            .await?;
        Ok(tweets.into_iter().next())
    }

    async fn all_tweets(&self) -> StoreResult<Vec<Tweet>> {
        let result = self
            .session
            .query(format!("SELECT {TWEET_COLUMNS} FROM tweets"), ())
            .await?;
        rows(result).iter().map(tweet_from_row).collect()
    }

    async fn set_tweet_likes(
        &self,
        tweet_id: i64,
        like_count: i64,
        likes: &[LikeSnapshot],
    ) -> StoreResult<()> {
        let likes_json = serde_json::to_string(likes)?;
        // IF EXISTS keeps a concurrently deleted tweet from being resurrected
        self.session
            .query(
                "UPDATE tweets SET like_count = ?, likes = ? WHERE id = ? IF EXISTS",
                (like_count, &likes_json, tweet_id),
            )
            .await?;
        Ok(())
    }

    async fn delete_tweet(&self, tweet_id: i64, media_ids: &[i64]) -> StoreResult<()> {
        let mut batch = Batch::default();
        let mut values = Vec::with_capacity(media_ids.len() + 2);
        for media_id in media_ids {
            batch.append_statement("DELETE FROM media WHERE id = ?");
            values.push((*media_id,));
        }
        batch.append_statement("DELETE FROM likes WHERE tweet_id = ?");
        values.push((tweet_id,));
        batch.append_statement("DELETE FROM tweets WHERE id = ?");
        values.push((tweet_id,));

        self.session.batch(&batch, values).await?;
        Ok(())
    }

    async fn insert_like(&self, like: NewLike) -> StoreResult<Like> {
        if let Some(existing) = self.find_like(like.tweet_id, like.user_id).await? {
            return Ok(existing);
        }

        let id = self.next_id("likes").await?;
        self.session
            .query(
                "INSERT INTO likes (tweet_id, user_id, id, user_name) VALUES (?, ?, ?, ?)",
                (like.tweet_id, like.user_id, id, &like.user_name),
            )
            .await?;

        Ok(Like {
            id,
            user_id: like.user_id,
            user_name: like.user_name,
            tweet_id: like.tweet_id,
        })
    }

    async fn find_like(&self, tweet_id: i64, user_id: i64) -> StoreResult<Option<Like>> {
        let result = self
            .session
            .query(
                "SELECT id, user_id, user_name, tweet_id FROM likes WHERE tweet_id = ? AND user_id = ?",
                (tweet_id, user_id),
            )
            .await?;
        first_row(result).as_ref().map(like_from_row).transpose()
    }

    async fn delete_like(&self, tweet_id: i64, user_id: i64) -> StoreResult<()> {
        self.session
            .query(
                "DELETE FROM likes WHERE tweet_id = ? AND user_id = ?",
                (tweet_id, user_id),
            )
            .await?;
        Ok(())
    }

    async fn likes_for_tweet(&self, tweet_id: i64) -> StoreResult<Vec<Like>> {
        let result = self
            .session
            .query(
                "SELECT id, user_id, user_name, tweet_id FROM likes WHERE tweet_id = ?",
                (tweet_id,),
            )
            .await?;
        let mut likes = rows(result)
            .iter()
            .map(like_from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        likes.sort_by_key(|like| like.id);
        Ok(likes)
    }

    async fn insert_media(&self, media: NewMedia) -> StoreResult<Media> {
        let id = self.next_id("media").await?;
        self.session
            .query(
                "INSERT INTO media (id, file_name, uploader_id) VALUES (?, ?, ?)",
                (id, &media.file_name, media.uploader_id),
            )
            .await?;

        Ok(Media {
            id,
            file_name: media.file_name,
            uploader_id: media.uploader_id,
            tweet_id: None,
        })
    }

    async fn find_media(&self, ids: &[i64]) -> StoreResult<Vec<Media>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let result = self
            .session
            .query(
                format!("SELECT {MEDIA_COLUMNS} FROM media WHERE id IN ?"),
                (ids.to_vec(),),
            )
            .await?;
        rows(result).iter().map(media_from_row).collect()
    }

    async fn media_for_tweet(&self, tweet_id: i64) -> StoreResult<Vec<Media>> {
        let result = self
            .session
            .query(
                format!("SELECT {MEDIA_COLUMNS} FROM media WHERE tweet_id = ?"),
                (tweet_id,),
            )
            .await?;
        let mut media = rows(result)
            .iter()
            .map(media_from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        media.sort_by_key(|m| m.id);
        Ok(media)
    }

    async fn insert_follow(&self, edge: &FollowEdge) -> StoreResult<()> {
        let mut batch = Batch::default();
        batch.append_statement(
            "INSERT INTO subscriptions (my_id, target_id, target_name) VALUES (?, ?, ?)",
        );
        batch.append_statement(
            "INSERT INTO subscribers (my_id, subscriber_id, subscriber_name) VALUES (?, ?, ?)",
        );
        self.session
            .batch(
                &batch,
                (
                    (edge.follower_id, edge.target_id, &edge.target_name),
                    (edge.target_id, edge.follower_id, &edge.follower_name),
                ),
            )
            .await?;
        Ok(())
    }

    async fn delete_follow(&self, follower_id: i64, target_id: i64) -> StoreResult<()> {
        let mut batch = Batch::default();
        batch.append_statement("DELETE FROM subscriptions WHERE my_id = ? AND target_id = ?");
        batch.append_statement("DELETE FROM subscribers WHERE my_id = ? AND subscriber_id = ?");
        self.session
            .batch(
                &batch,
                ((follower_id, target_id), (target_id, follower_id)),
            )
            .await?;
        Ok(())
    }

    async fn following_of(&self, user_id: i64) -> StoreResult<Vec<Following>> {
        let result = self
            .session
            .query(
                "SELECT my_id, target_id, target_name FROM subscriptions WHERE my_id = ?",
                (user_id,),
            )
            .await?;
        rows(result)
            .iter()
            .map(|row| {
                Ok(Following {
                    my_id: col_i64(row, 0, "subscriptions")?,
                    target_id: col_i64(row, 1, "subscriptions")?,
                    target_name: col_text(row, 2, "subscriptions")?,
                })
            })
            .collect()
    }

    async fn followers_of(&self, user_id: i64) -> StoreResult<Vec<Follower>> {
        let result = self
            .session
            .query(
                "SELECT my_id, subscriber_id, subscriber_name FROM subscribers WHERE my_id = ?",
                (user_id,),
            )
            .await?;
        rows(result)
            .iter()
            .map(|row| {
                Ok(Follower {
                    my_id: col_i64(row, 0, "subscribers")?,
                    subscriber_id: col_i64(row, 1, "subscribers")?,
                    subscriber_name: col_text(row, 2, "subscribers")?,
                })
            })
            .collect()
    }
}

fn rows(result: QueryResult) -> Vec<Row> {
    result.rows.unwrap_or_default()
}

fn first_row(result: QueryResult) -> Option<Row> {
    rows(result).into_iter().next()
}

/// First column of a conditional statement's result is `[applied]`.
fn lwt_applied(result: QueryResult, table: &'static str) -> StoreResult<bool> {
    let row = first_row(result).ok_or_else(|| StoreError::row(table, "empty LWT result"))?;
    match row.columns.first() {
        Some(Some(CqlValue::Boolean(applied))) => Ok(*applied),
        other => Err(StoreError::row(table, format!("bad [applied] column: {other:?}"))),
    }
}

fn col_i64(row: &Row, idx: usize, table: &'static str) -> StoreResult<i64> {
    match row.columns.get(idx) {
        Some(Some(CqlValue::BigInt(v))) => Ok(*v),
        other => Err(StoreError::row(table, format!("column {idx}: expected bigint, got {other:?}"))),
    }
}

fn col_opt_i64(row: &Row, idx: usize, table: &'static str) -> StoreResult<Option<i64>> {
    match row.columns.get(idx) {
        Some(None) => Ok(None),
        _ => col_i64(row, idx, table).map(Some),
    }
}

fn col_text(row: &Row, idx: usize, table: &'static str) -> StoreResult<String> {
    match row.columns.get(idx) {
        Some(Some(CqlValue::Text(s))) | Some(Some(CqlValue::Ascii(s))) => Ok(s.clone()),
        other => Err(StoreError::row(table, format!("column {idx}: expected text, got {other:?}"))),
    }
}

fn col_i64_list(row: &Row, idx: usize, table: &'static str) -> StoreResult<Vec<i64>> {
    match row.columns.get(idx) {
        // CQL stores an empty list as null
        Some(None) => Ok(Vec::new()),
        Some(Some(CqlValue::List(values))) => values
            .iter()
            .map(|v| match v {
                CqlValue::BigInt(id) => Ok(*id),
                other => Err(StoreError::row(table, format!("list item: {other:?}"))),
            })
            .collect(),
        other => Err(StoreError::row(table, format!("column {idx}: expected list, got {other:?}"))),
    }
}

fn col_timestamp(row: &Row, idx: usize, table: &'static str) -> StoreResult<DateTime<Utc>> {
    match row.columns.get(idx) {
        Some(Some(CqlValue::Timestamp(ts))) => {
            let timestamp_millis = ts.0;
            let seconds = timestamp_millis.div_euclid(1000);
            let nanos = (timestamp_millis.rem_euclid(1000) * 1_000_000) as u32;
            DateTime::<Utc>::from_timestamp(seconds, nanos)
                .ok_or_else(|| StoreError::row(table, "timestamp out of range"))
        }
        other => Err(StoreError::row(table, format!("column {idx}: expected timestamp, got {other:?}"))),
    }
}

fn user_from_row(row: &Row) -> StoreResult<User> {
    Ok(User {
        id: col_i64(row, 0, "users")?,
        full_name: col_text(row, 1, "users")?,
        api_key: col_text(row, 2, "users")?,
    })
}

fn tweet_from_row(row: &Row) -> StoreResult<Tweet> {
    let author: AuthorSnapshot = serde_json::from_str(&col_text(row, 2, "tweets")?)?;
    let likes: Vec<LikeSnapshot> = serde_json::from_str(&col_text(row, 6, "tweets")?)?;
    Ok(Tweet {
        id: col_i64(row, 0, "tweets")?,
        author_id: col_i64(row, 1, "tweets")?,
        author,
        text: col_text(row, 3, "tweets")?,
        media_ids: col_i64_list(row, 4, "tweets")?,
        like_count: col_i64(row, 5, "tweets")?,
        likes,
        created_at: col_timestamp(row, 7, "tweets")?,
    })
}

fn like_from_row(row: &Row) -> StoreResult<Like> {
    Ok(Like {
        id: col_i64(row, 0, "likes")?,
        user_id: col_i64(row, 1, "likes")?,
        user_name: col_text(row, 2, "likes")?,
        tweet_id: col_i64(row, 3, "likes")?,
    })
}

fn media_from_row(row: &Row) -> StoreResult<Media> {
    Ok(Media {
        id: col_i64(row, 0, "media")?,
        file_name: col_text(row, 1, "media")?,
        uploader_id: col_i64(row, 2, "media")?,
        tweet_id: col_opt_i64(row, 3, "media")?,
    })
}
