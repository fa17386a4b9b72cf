use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{delete, get, post, web, HttpRequest, HttpResponse};
use futures::StreamExt;
use log::debug;

use crate::blob::BlobStore;
use crate::error::AppError;
use crate::models::{
    CreateTweetRequest, CreateTweetResponse, ProfileResponse, ResultResponse, TweetsResponse,
    UploadMediaResponse, User,
};
use crate::store::Store;
use crate::{engagement, identity, media, social_graph};

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub blobs: Arc<dyn BlobStore>,
    pub max_upload_bytes: usize,
}

/// Register every route under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    // extractor failures use the same error payload as the handlers
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into());
    let path_config = web::PathConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into());

    cfg.service(
        web::scope("/api")
            .app_data(json_config)
            .app_data(path_config)
            .service(create_tweet)
            .service(list_tweets)
            .service(delete_tweet)
            .service(like_tweet)
            .service(unlike_tweet)
            .service(upload_media)
            .service(follow_user)
            .service(unfollow_user)
            // must precede the `{user_id}` route
            .service(my_profile)
            .service(user_profile),
    );
}

async fn caller(state: &AppState, req: &HttpRequest) -> Result<User, AppError> {
    let headers = req.headers();
    let api_key = headers
        .get("api-key")
        .or_else(|| headers.get("api_key"))
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("missing api-key header".to_string()))?;
    identity::resolve(state.store.as_ref(), api_key).await
}

#[post("/tweets")]
pub async fn create_tweet(
    state: web::Data<AppState>,
    req: HttpRequest,
    tweet_data: web::Json<CreateTweetRequest>,
) -> Result<HttpResponse, AppError> {
    let author = caller(&state, &req).await?;
    let CreateTweetRequest { text, media_ids } = tweet_data.into_inner();

    let tweet = engagement::create_tweet(state.store.as_ref(), &author, text, media_ids).await?;
    Ok(HttpResponse::Ok().json(CreateTweetResponse {
        result: true,
        tweet_id: tweet.id,
    }))
}

#[get("/tweets")]
pub async fn list_tweets(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let tweets = engagement::list_tweets(state.store.as_ref()).await?;
    Ok(HttpResponse::Ok().json(TweetsResponse {
        result: true,
        tweets,
    }))
}

#[delete("/tweets/{tweet_id}")]
pub async fn delete_tweet(
    state: web::Data<AppState>,
    req: HttpRequest,
    tweet_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user = caller(&state, &req).await?;
    engagement::delete_tweet(state.store.as_ref(), tweet_id.into_inner(), &user).await?;
    Ok(HttpResponse::Ok().json(ResultResponse::ok()))
}

#[post("/tweets/{tweet_id}/likes")]
pub async fn like_tweet(
    state: web::Data<AppState>,
    req: HttpRequest,
    tweet_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user = caller(&state, &req).await?;
    engagement::like(state.store.as_ref(), tweet_id.into_inner(), &user).await?;
    Ok(HttpResponse::Ok().json(ResultResponse::ok()))
}

#[delete("/tweets/{tweet_id}/likes")]
pub async fn unlike_tweet(
    state: web::Data<AppState>,
    req: HttpRequest,
    tweet_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user = caller(&state, &req).await?;
    engagement::unlike(state.store.as_ref(), tweet_id.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(ResultResponse::ok()))
}

#[post("/medias")]
pub async fn upload_media(
    state: web::Data<AppState>,
    req: HttpRequest,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let uploader = caller(&state, &req).await?;

    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| AppError::BadRequest(e.to_string()))?;
        if field.name() != "file" {
            debug!("Skipping multipart field {}", field.name());
            continue;
        }

        let file_name = field
            .content_disposition()
            .get_filename()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("file field has no filename".to_string()))?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::BadRequest(e.to_string()))?;
            if bytes.len() + chunk.len() > state.max_upload_bytes {
                return Err(AppError::BadRequest(format!(
                    "file exceeds {} bytes",
                    state.max_upload_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        let media = media::upload(
            state.store.as_ref(),
            state.blobs.as_ref(),
            uploader.id,
            &bytes,
            &file_name,
        )
        .await?;
        return Ok(HttpResponse::Ok().json(UploadMediaResponse {
            result: true,
            media_id: media.id,
        }));
    }

    Err(AppError::BadRequest("missing multipart field `file`".to_string()))
}

#[post("/users/{user_id}/follow")]
pub async fn follow_user(
    state: web::Data<AppState>,
    req: HttpRequest,
    user_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user = caller(&state, &req).await?;
    social_graph::follow(state.store.as_ref(), &user, user_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ResultResponse::ok()))
}

#[delete("/users/{user_id}/follow")]
pub async fn unfollow_user(
    state: web::Data<AppState>,
    req: HttpRequest,
    user_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user = caller(&state, &req).await?;
    social_graph::unfollow(state.store.as_ref(), user.id, user_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ResultResponse::ok()))
}

#[get("/users/me")]
pub async fn my_profile(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let user = caller(&state, &req).await?;
    let profile = social_graph::profile(state.store.as_ref(), &user).await?;
    Ok(HttpResponse::Ok().json(ProfileResponse {
        result: true,
        user: profile,
    }))
}

#[get("/users/{user_id}")]
pub async fn user_profile(
    state: web::Data<AppState>,
    user_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user = identity::find(state.store.as_ref(), user_id.into_inner()).await?;
    let profile = social_graph::profile(state.store.as_ref(), &user).await?;
    Ok(HttpResponse::Ok().json(ProfileResponse {
        result: true,
        user: profile,
    }))
}
