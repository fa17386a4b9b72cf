use log::info;
use scylla::{Session, SessionBuilder};

use crate::error::StoreError;

const TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS sequences (name text PRIMARY KEY, value bigint)",
    "CREATE TABLE IF NOT EXISTS users (id bigint PRIMARY KEY, full_name text, api_key text)",
    "CREATE INDEX IF NOT EXISTS users_api_key_idx ON users (api_key)",
    "CREATE TABLE IF NOT EXISTS tweets (
        id bigint PRIMARY KEY,
        author_id bigint,
        author text,
        description text,
        media list<bigint>,
        like_count bigint,
        likes text,
        created_at timestamp
    )",
    "CREATE TABLE IF NOT EXISTS likes (
        tweet_id bigint,
        user_id bigint,
        id bigint,
        user_name text,
        PRIMARY KEY (tweet_id, user_id)
    )",
    "CREATE TABLE IF NOT EXISTS media (
        id bigint PRIMARY KEY,
        file_name text,
        uploader_id bigint,
        tweet_id bigint
    )",
    "CREATE INDEX IF NOT EXISTS media_tweet_id_idx ON media (tweet_id)",
    "CREATE TABLE IF NOT EXISTS subscriptions (
        my_id bigint,
        target_id bigint,
        target_name text,
        PRIMARY KEY (my_id, target_id)
    )",
    "CREATE TABLE IF NOT EXISTS subscribers (
        my_id bigint,
        subscriber_id bigint,
        subscriber_name text,
        PRIMARY KEY (my_id, subscriber_id)
    )",
];

pub async fn create_session(known_node: &str) -> Result<Session, StoreError> {
    let session = SessionBuilder::new().known_node(known_node).build().await?;

    Ok(session)
}

/// Create the keyspace and every relation if missing, then make the keyspace
/// the session default.
pub async fn init_schema(session: &Session, keyspace: &str) -> Result<(), StoreError> {
    session
        .query(
            format!(
                "CREATE KEYSPACE IF NOT EXISTS {keyspace} WITH replication = \
                 {{'class': 'SimpleStrategy', 'replication_factor': 1}}"
            ),
            (),
        )
        .await?;
    session.use_keyspace(keyspace, false).await?;

    for statement in TABLES {
        session.query(*statement, ()).await?;
    }

    info!("Schema ready in keyspace {}", keyspace);
    Ok(())
}
