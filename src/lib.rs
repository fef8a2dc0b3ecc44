use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarvestError>;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid source URL: {0}")]
    InvalidUrl(String),

    #[error("Unknown source kind: {0}")]
    UnknownSource(String),

    #[error("Selector error: {0}")]
    Selector(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod database;
pub mod normalize;
pub mod pipeline;
pub mod scrape;

/// Bench-only access to the page parsers; not part of the public API.
#[cfg(feature = "bench")]
pub mod internal {
    pub mod books {
        pub use crate::scrape::books::extract_catalog;
    }

    pub mod quotes {
        pub use crate::scrape::quotes::extract_listing;
    }
}
