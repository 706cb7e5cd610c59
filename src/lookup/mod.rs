// src/lookup/mod.rs

//! Path ownership index.
//!
//! - [`segments`] splits serialized paths into non-empty segments.
//! - [`trie`] holds the prefix trie that maps a path to its nearest
//!   registered ancestor.
//!
//! The coordinator uses [`dirty_projects_where`] to turn a changed-file list into
//! the set of projects that must be reconsidered.

pub mod segments;
pub mod trie;

use std::collections::BTreeSet;

use tracing::{debug, trace};

pub use segments::{iterate_segments, PathSegments};
pub use trie::{PathTrie, PathTrieNode, PrefixMatch, DEFAULT_DELIMITER};

/// Resolve each changed path to its owning project; unowned paths are
/// ignored.
pub fn dirty_projects<T, I, P>(index: &PathTrie<T>, changed: I) -> BTreeSet<T>
where
    T: Clone + Ord,
    I: IntoIterator<Item = P>,
    P: AsRef<str>,
{
    dirty_projects_where(index, changed, |_, _| true)
}

/// Like [`dirty_projects`], but a path only dirties its owner when `keep`
/// accepts it.
///
/// `keep` sees the owner and the path relative to the owner's folder, with
/// `/` separators (empty when the path is the folder itself).
pub fn dirty_projects_where<T, I, P, F>(index: &PathTrie<T>, changed: I, mut keep: F) -> BTreeSet<T>
where
    T: Clone + Ord,
    I: IntoIterator<Item = P>,
    P: AsRef<str>,
    F: FnMut(&T, &str) -> bool,
{
    let mut dirty = BTreeSet::new();
    let mut unowned = 0usize;
    let mut filtered = 0usize;

    for path in changed {
        let path = path.as_ref();
        let Some(found) = index.find_longest_prefix_match(path) else {
            trace!(path, "changed path has no owning project");
            unowned += 1;
            continue;
        };

        let relative = iterate_segments(&path[found.index..], index.delimiter())
            .collect::<Vec<_>>()
            .join("/");
        if keep(found.value, &relative) {
            dirty.insert(found.value.clone());
        } else {
            trace!(path, "changed path filtered out");
            filtered += 1;
        }
    }

    debug!(
        dirty = dirty.len(),
        unowned, filtered, "resolved changed files to projects"
    );
    dirty
}
