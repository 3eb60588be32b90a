//! Slidequeue - Media queue and navigation engine for slideshows
//!
//! The library drives a slideshow over a media collection that may be far
//! too large to list up front. A [`navigation::NavigationController`] moves
//! the consumer back and forth through a bounded window of items, pulling
//! fresh ones from one of three providers:
//!
//! - [`queue::QueueManager`]: weighted random sample fed by an incremental
//!   folder scan ([`scanner`])
//! - [`sequential::SequentialCursorProvider`]: ordered traversal of the
//!   source's index, page by page
//! - [`provider::SingleItemProvider`]: one fixed item
//!
//! Sessions survive their consumer through the [`registry::SessionRegistry`].

pub mod breaker;
pub mod config;
pub mod navigation;
pub mod provider;
pub mod queue;
pub mod registry;
pub mod scanner;
pub mod sequential;
pub mod signal;
pub mod source;
