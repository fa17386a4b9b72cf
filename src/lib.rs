pub mod blob;
pub mod config;
pub mod db;
pub mod engagement;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod media;
pub mod models;
pub mod social_graph;
pub mod store;
