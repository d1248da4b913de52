pub mod chat;
pub mod config;
pub mod feed;
pub mod health;
pub mod watcher;
