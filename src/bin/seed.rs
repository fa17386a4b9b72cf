use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::Name;
use fake::Fake;
use std::error::Error;
use uuid::Uuid;

use microblog::config::Config;
use microblog::models::{NewUser, User};
use microblog::store::{ScyllaStore, Store};
use microblog::{engagement, social_graph};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    println!("Starting data seeding...");

    let config = Config::load()?;
    let store = ScyllaStore::connect(&config.scylla_node, &config.keyspace).await?;

    // Configuration
    let num_users = 100;
    let tweets_per_user = 20;
    let follows_per_user = 10;
    let likes_per_user = 30;

    let users = seed_users(&store, num_users).await?;
    let tweet_ids = seed_tweets(&store, &users, tweets_per_user).await?;
    seed_engagement(&store, &users, &tweet_ids, follows_per_user, likes_per_user).await?;

    println!("Seeding completed!");
    Ok(())
}

async fn seed_users(store: &dyn Store, count: usize) -> Result<Vec<User>, Box<dyn Error>> {
    println!("Creating {} users...", count);
    let mut users = Vec::with_capacity(count);

    for i in 0..count {
        let full_name: String = Name().fake();
        let user = store
            .insert_user(NewUser {
                full_name,
                api_key: Uuid::new_v4().simple().to_string(),
            })
            .await?;

        println!(
            "Created user {}/{}: {} (id {}, api key {})",
            i + 1,
            count,
            user.full_name,
            user.id,
            user.api_key
        );
        users.push(user);
    }

    Ok(users)
}

async fn seed_tweets(
    store: &dyn Store,
    users: &[User],
    tweets_per_user: usize,
) -> Result<Vec<i64>, Box<dyn Error>> {
    println!("Creating {} tweets per user...", tweets_per_user);
    let total_tweets = users.len() * tweets_per_user;
    let mut tweet_ids = Vec::with_capacity(total_tweets);

    for user in users {
        for _ in 0..tweets_per_user {
            let content: String = Sentence(3..10).fake();
            let tweet = engagement::create_tweet(store, user, content, Vec::new()).await?;
            tweet_ids.push(tweet.id);

            if tweet_ids.len() % 100 == 0 {
                println!("Created {}/{} tweets", tweet_ids.len(), total_tweets);
            }
        }
    }

    Ok(tweet_ids)
}

async fn seed_engagement(
    store: &dyn Store,
    users: &[User],
    tweet_ids: &[i64],
    follows_per_user: usize,
    likes_per_user: usize,
) -> Result<(), Box<dyn Error>> {
    println!("Creating follows and likes...");

    // each user follows the next few users and likes a stride of tweets
    for (i, user) in users.iter().enumerate() {
        for offset in 1..=follows_per_user.min(users.len().saturating_sub(1)) {
            let target = &users[(i + offset) % users.len()];
            social_graph::follow(store, user, target.id).await?;
        }
        for n in 0..likes_per_user.min(tweet_ids.len()) {
            let tweet_id = tweet_ids[(i * 7 + n * 13) % tweet_ids.len()];
            engagement::like(store, tweet_id, user).await?;
        }
    }

    Ok(())
}
