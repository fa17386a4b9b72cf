use chrono::Utc;
use futures::future::try_join_all;
use log::{debug, info};

use crate::error::AppError;
use crate::models::{AuthorSnapshot, LikeSnapshot, NewLike, NewTweet, Tweet, TweetView, User};
use crate::store::Store;

pub async fn create_tweet(
    store: &dyn Store,
    author: &User,
    text: String,
    media_ids: Vec<i64>,
) -> Result<Tweet, AppError> {
    // only the author's own uploads may be attached
    let claimed: Vec<i64> = store
        .find_media(&media_ids)
        .await?
        .into_iter()
        .filter(|media| media.uploader_id == author.id)
        .map(|media| media.id)
        .collect();

    let tweet = store
        .create_tweet(
            NewTweet {
                author: AuthorSnapshot {
                    id: author.id,
                    name: author.full_name.clone(),
                },
                text,
                media_ids,
                created_at: Utc::now(),
            },
            &claimed,
        )
        .await?;

    info!(
        "Tweet {} created by user {} with {}/{} media attached",
        tweet.id,
        author.id,
        claimed.len(),
        tweet.media_ids.len()
    );
    Ok(tweet)
}

pub async fn delete_tweet(store: &dyn Store, tweet_id: i64, caller: &User) -> Result<(), AppError> {
    let tweet = find_tweet(store, tweet_id).await?;
    if tweet.author_id != caller.id {
        return Err(AppError::Forbidden(format!(
            "tweet {tweet_id} belongs to another user"
        )));
    }

    let media_ids: Vec<i64> = store
        .media_for_tweet(tweet_id)
        .await?
        .into_iter()
        .map(|media| media.id)
        .collect();
    store.delete_tweet(tweet_id, &media_ids).await?;

    info!(
        "Tweet {} deleted by user {} ({} media removed)",
        tweet_id,
        caller.id,
        media_ids.len()
    );
    Ok(())
}

pub async fn like(store: &dyn Store, tweet_id: i64, user: &User) -> Result<Tweet, AppError> {
    find_tweet(store, tweet_id).await?;
    store
        .insert_like(NewLike {
            user_id: user.id,
            user_name: user.full_name.clone(),
            tweet_id,
        })
        .await?;

    let tweet = refresh_likes(store, tweet_id).await?;
    info!(
        "User {} liked tweet {} (now {})",
        user.id, tweet_id, tweet.like_count
    );
    Ok(tweet)
}

/// Removing a like that does not exist is not an error.
pub async fn unlike(store: &dyn Store, tweet_id: i64, user_id: i64) -> Result<(), AppError> {
    if store.find_like(tweet_id, user_id).await?.is_none() {
        debug!("User {} has no like on tweet {}, nothing to do", user_id, tweet_id);
        return Ok(());
    }

    store.delete_like(tweet_id, user_id).await?;
    let tweet = refresh_likes(store, tweet_id).await?;
    info!(
        "User {} unliked tweet {} (now {})",
        user_id, tweet_id, tweet.like_count
    );
    Ok(())
}

/// Every tweet, newest first, with attachment names read from the media rows.
pub async fn list_tweets(store: &dyn Store) -> Result<Vec<TweetView>, AppError> {
    let mut tweets = store.all_tweets().await?;
    tweets.sort_by(|a, b| b.id.cmp(&a.id));

    let attachments = try_join_all(tweets.iter().map(|tweet| store.media_for_tweet(tweet.id))).await?;

    let views: Vec<TweetView> = tweets
        .into_iter()
        .zip(attachments)
        .map(|(tweet, media)| TweetView {
            id: tweet.id,
            content: tweet.text,
            attachments: media.into_iter().map(|m| m.file_name).collect(),
            author: tweet.author,
            likes: tweet.likes,
        })
        .collect();

    debug!("Listing {} tweets", views.len());
    Ok(views)
}

async fn find_tweet(store: &dyn Store, tweet_id: i64) -> Result<Tweet, AppError> {
    store
        .find_tweet(tweet_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("tweet {tweet_id} does not exist")))
}

/// Rewrite the counter and snapshot from the like rows and return the result.
async fn refresh_likes(store: &dyn Store, tweet_id: i64) -> Result<Tweet, AppError> {
    let snapshot: Vec<LikeSnapshot> = store
        .likes_for_tweet(tweet_id)
        .await?
        .iter()
        .map(LikeSnapshot::from)
        .collect();
    let like_count = snapshot.len() as i64;
    store.set_tweet_likes(tweet_id, like_count, &snapshot).await?;

    let mut tweet = find_tweet(store, tweet_id).await?;
    tweet.like_count = like_count;
    tweet.likes = snapshot;
    Ok(tweet)
}
