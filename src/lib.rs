pub mod config;
pub mod db;
pub mod logging;
pub mod services;
pub mod text;

pub use config::EngineConfig;
pub use db::{ReviewDb, StoreError};
pub use services::FlashcardService;
