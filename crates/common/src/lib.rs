//! Common utilities and shared types for rankvote.
//!
//! This crate provides foundational components used across all rankvote
//! crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based entity identifiers via [`IdGenerator`] and
//!   the template-driven contest identifier builder ([`build_id`],
//!   [`unique_id`])
//!
//! # Example
//!
//! ```no_run
//! use rankvote_common::{AppResult, Config, IdGenerator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let ballot_id = id_gen.generate();
//!     println!("Generated ID: {}", ballot_id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;

pub use config::{Config, InstanceConfig, NotifyConfig, SchedulerConfig};
pub use error::{AppError, AppResult};
pub use id::{
    DEFAULT_ID_TEMPLATE, IdGenerator, MAX_CONTEST_ID_LEN, MIN_CONTEST_ID_LEN, build_id, slugify,
    unique_id,
};
