//! MusicBrainz catalog-number lookup library - shared modules for all binaries.

pub mod catalog;
pub mod config;
pub mod error;
pub mod io;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod schema;
pub mod scoring;
pub mod sheet;
pub mod source;

pub use error::{LookupError, Result};
