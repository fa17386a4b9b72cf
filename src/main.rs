use actix_web::{web, App, HttpServer};
use env_logger::{Builder, Env};
use log::{error, info};
use std::sync::Arc;

use microblog::blob::DiskBlobStore;
use microblog::config::{Config, StorageBackend};
use microblog::handlers::{self, AppState};
use microblog::identity;
use microblog::store::{MemoryStore, ScyllaStore, Store};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    info!("Starting microblog backend...");
    let config = Config::load()?;

    let store: Arc<dyn Store> = match config.storage {
        StorageBackend::Scylla => {
            let store = ScyllaStore::connect(&config.scylla_node, &config.keyspace)
                .await
                .map_err(|e| {
                    error!("Failed to connect to ScyllaDB at {}: {}", config.scylla_node, e);
                    std::io::Error::other(e.to_string())
                })?;
            info!("Connected to ScyllaDB at {}", config.scylla_node);
            Arc::new(store)
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage, data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    if config.seed_users {
        identity::seed_default_users(store.as_ref())
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))?;
    }

    let state = web::Data::new(AppState {
        store,
        blobs: Arc::new(DiskBlobStore::new(&config.media_dir)),
        max_upload_bytes: config.max_upload_bytes,
    });

    info!("Listening on {}", config.bind_addr);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .workers(config.workers)
    .bind(&config.bind_addr)?
    .run()
    .await
}
