//! # Intent-change watchers.
//!
//! This module provides the [`Watch`] trait, the callback surface driven by
//! the [`WatchRegistry`](crate::WatchRegistry), plus a function-backed
//! adapter and built-in implementations.
//!
//! ## Watcher kinds
//! - **All-watchers** — registered via `watch_all`, see every change
//!   (optionally local-only), live until explicitly unregistered.
//! - **Per-intent watchers** — registered via `watch`, see one intent's
//!   changes, garbage-collected when that intent reaches a terminal state.

mod watch;
mod watch_fn;

pub use watch::{Watch, WatchRef};
pub use watch_fn::WatchFn;

// Optional: built-in demo watcher, enabled with `--features logging`.
#[cfg(feature = "logging")]
mod embedded;
#[cfg(feature = "logging")]
pub use embedded::LogWatcher;
