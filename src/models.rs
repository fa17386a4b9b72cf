use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub api_key: String,
}

/// Author id and name as they were when the tweet was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSnapshot {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeSnapshot {
    pub user_id: i64,
    pub user_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tweet {
    pub id: i64,
    pub author_id: i64,
    pub author: AuthorSnapshot,
    pub text: String,
    pub media_ids: Vec<i64>,
    pub like_count: i64,
    pub likes: Vec<LikeSnapshot>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTweet {
    pub author: AuthorSnapshot,
    pub text: String,
    pub media_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Like {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub tweet_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewLike {
    pub user_id: i64,
    pub user_name: String,
    pub tweet_id: i64,
}

impl From<&Like> for LikeSnapshot {
    fn from(like: &Like) -> Self {
        LikeSnapshot {
            user_id: like.user_id,
            user_name: like.user_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub id: i64,
    pub file_name: String,
    pub uploader_id: i64,
    pub tweet_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewMedia {
    pub file_name: String,
    pub uploader_id: i64,
}

/// One directed follow relationship. Persisted as a following row owned by
/// the follower plus a mirror follower row owned by the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowEdge {
    pub follower_id: i64,
    pub follower_name: String,
    pub target_id: i64,
    pub target_name: String,
}

/// Row of the "following" relation: `my_id` follows `target_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Following {
    pub my_id: i64,
    pub target_id: i64,
    pub target_name: String,
}

/// Row of the "followers" relation: `subscriber_id` follows `my_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Follower {
    pub my_id: i64,
    pub subscriber_id: i64,
    pub subscriber_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub followers: Vec<UserRef>,
    pub following: Vec<UserRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TweetView {
    pub id: i64,
    pub content: String,
    pub attachments: Vec<String>,
    pub author: AuthorSnapshot,
    pub likes: Vec<LikeSnapshot>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTweetRequest {
    #[serde(alias = "tweet_data")]
    pub text: String,
    #[serde(
        alias = "tweet_media_ids",
        default,
        deserialize_with = "media_ids_or_empty"
    )]
    pub media_ids: Vec<i64>,
}

/// Older clients send `""` or `null` instead of an empty list.
fn media_ids_or_empty<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Ids(Vec<i64>),
        Text(String),
        Null(()),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Ids(ids) => Ok(ids),
        Raw::Text(text) if text.trim().is_empty() => Ok(Vec::new()),
        Raw::Text(text) => Err(serde::de::Error::custom(format!(
            "invalid media id list: {text:?}"
        ))),
        Raw::Null(()) => Ok(Vec::new()),
    }
}

#[derive(Debug, Serialize)]
pub struct ResultResponse {
    pub result: bool,
}

impl ResultResponse {
    pub fn ok() -> Self {
        ResultResponse { result: true }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateTweetResponse {
    pub result: bool,
    pub tweet_id: i64,
}

#[derive(Debug, Serialize)]
pub struct UploadMediaResponse {
    pub result: bool,
    pub media_id: i64,
}

#[derive(Debug, Serialize)]
pub struct TweetsResponse {
    pub result: bool,
    pub tweets: Vec<TweetView>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub result: bool,
    pub user: Profile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_accepts_legacy_field_names() {
        let req: CreateTweetRequest =
            serde_json::from_str(r#"{"tweet_data": "hi", "tweet_media_ids": [1, 2, 3]}"#).unwrap();
        assert_eq!(req.text, "hi");
        assert_eq!(req.media_ids, vec![1, 2, 3]);
    }

    #[test]
    fn create_request_tolerates_missing_media() {
        for body in [
            r#"{"text": "hi", "media_ids": ""}"#,
            r#"{"text": "hi", "media_ids": null}"#,
            r#"{"text": "hi"}"#,
        ] {
            let req: CreateTweetRequest = serde_json::from_str(body).unwrap();
            assert!(req.media_ids.is_empty(), "{body}");
        }
    }

    #[test]
    fn create_request_rejects_garbage_media() {
        let res: Result<CreateTweetRequest, _> =
            serde_json::from_str(r#"{"text": "hi", "media_ids": "1,2"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn user_never_serializes_api_key() {
        let user = User {
            id: 1,
            full_name: "Testov Test".into(),
            api_key: "secret".into(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
    }
}
