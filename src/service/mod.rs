//! Service layer for business logic orchestration
//!
//! This module contains the discovery commands, separating them from the
//! CLI layer in main.rs.

pub mod disco;
pub mod query;

pub use disco::{unique_images, DiscoService, RunningImage};
pub use query::{ImagesQuery, SimpleQuery, VulnsQuery};
