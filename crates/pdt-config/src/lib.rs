//! # PDT Config
//!
//! Application settings loaded from environment variables.
//!
//! Uses `dotenvy` to load `.env` files and provides typed configuration.

pub mod settings;

pub use settings::{
    CollectorSettings, DatabaseSettings, QuerySettings, ScoringSettings, Settings,
};
