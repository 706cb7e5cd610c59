// src/watch/mod.rs

//! File watching.
//!
//! Turns filesystem changes under the repository root into
//! `RuntimeEvent::FilesChanged` with repository-relative paths. It knows
//! nothing about projects; the core resolves owners through the path index.

pub mod path_utils;
pub mod watcher;

pub use watcher::{spawn_watcher, WatchOptions, WatcherHandle, DEFAULT_DEBOUNCE};
