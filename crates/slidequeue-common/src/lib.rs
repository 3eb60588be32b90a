//! Slidequeue-Common: Shared types, errors, and name utilities.
//!
//! This crate provides common functionality used across slidequeue:
//!
//! - **Media Types**: [`MediaItem`], [`MediaKind`], and the mutation actions
//!   a consumer can apply to an item
//! - **Path Utilities**: Extension-based media detection and chronological
//!   keys extracted from file and folder names
//! - **Error Handling**: The engine-wide error type and result alias
//!
//! # Examples
//!
//! ```
//! use slidequeue_common::{Error, MediaKind, Result};
//! use slidequeue_common::paths::media_kind_for;
//!
//! assert_eq!(media_kind_for("holiday/IMG_0001.jpg"), Some(MediaKind::Image));
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("item", "media/missing.jpg"))
//! }
//! assert!(example().is_err());
//! ```

pub mod error;
pub mod paths;
pub mod types;

pub use error::{Error, Interrupt, Result};
pub use types::*;
