// src/lookup/segments.rs

//! Splitting serialized paths into trie segments.

/// One non-empty segment of a path plus the byte index just past its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentEntry<'a> {
    pub segment: &'a str,
    pub end: usize,
}

/// Lazy iterator over the non-empty segments of a path.
///
/// Empty input yields nothing; consecutive or trailing delimiters never yield
/// empty segments. The iterator is `Clone`, so a sequence can be restarted
/// from any saved position.
#[derive(Debug, Clone)]
pub struct PathSegments<'a> {
    input: &'a str,
    delimiter: char,
    position: usize,
}

impl<'a> PathSegments<'a> {
    pub fn new(input: &'a str, delimiter: char) -> Self {
        Self {
            input,
            delimiter,
            position: 0,
        }
    }

    /// Same walk, but also reporting where each segment ends in the input.
    pub fn with_end_indices(self) -> SegmentEntries<'a> {
        SegmentEntries { inner: self }
    }

    fn next_entry(&mut self) -> Option<SegmentEntry<'a>> {
        while self.position < self.input.len() {
            let rest = &self.input[self.position..];
            let (len, skip) = match rest.find(self.delimiter) {
                Some(idx) => (idx, self.delimiter.len_utf8()),
                None => (rest.len(), 0),
            };
            let start = self.position;
            self.position += len + skip;

            if len > 0 {
                return Some(SegmentEntry {
                    segment: &self.input[start..start + len],
                    end: start + len,
                });
            }
        }
        None
    }
}

impl<'a> Iterator for PathSegments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().map(|e| e.segment)
    }
}

/// Iterator returned by [`PathSegments::with_end_indices`].
#[derive(Debug, Clone)]
pub struct SegmentEntries<'a> {
    inner: PathSegments<'a>,
}

impl<'a> Iterator for SegmentEntries<'a> {
    type Item = SegmentEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next_entry()
    }
}

/// Split `path` on `delimiter` into non-empty segments.
pub fn iterate_segments(path: &str, delimiter: char) -> PathSegments<'_> {
    PathSegments::new(path, delimiter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(path: &str, delimiter: char) -> Vec<&str> {
        iterate_segments(path, delimiter).collect()
    }

    #[test]
    fn empty_path_yields_nothing() {
        assert!(collect("", '/').is_empty());
        assert!(collect("///", '/').is_empty());
    }

    #[test]
    fn skips_empty_segments() {
        assert_eq!(collect("a//b/", '/'), vec!["a", "b"]);
        assert_eq!(collect("/a/b", '/'), vec!["a", "b"]);
    }

    #[test]
    fn other_delimiters_are_opaque() {
        assert_eq!(collect("a\\b/c", '/'), vec!["a\\b", "c"]);
        assert_eq!(collect("a\\b/c", '\\'), vec!["a", "b/c"]);
    }

    #[test]
    fn restartable_from_clone() {
        let mut segments = iterate_segments("x/y/z", '/');
        assert_eq!(segments.next(), Some("x"));
        let saved = segments.clone();
        assert_eq!(segments.collect::<Vec<_>>(), vec!["y", "z"]);
        assert_eq!(saved.collect::<Vec<_>>(), vec!["y", "z"]);
    }

    #[test]
    fn end_indices_point_past_each_segment() {
        let ends: Vec<usize> = iterate_segments("ab//cd/", '/')
            .with_end_indices()
            .map(|e| e.end)
            .collect();
        assert_eq!(ends, vec![2, 6]);
    }
}
