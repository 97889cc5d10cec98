//! Source ranges and the [`SourceMap`] that resolves them to line/column.
//!
//! A [`SourceRange`] is a pair of byte offsets into the original source text,
//! `end` exclusive. It carries no line/column information of its own -- that
//! translation is the job of [`SourceMap`], built once per compilation unit
//! and consulted only when a human-readable location is actually needed (for
//! example when rendering a diagnostic).

/// A half-open byte-offset range `[start, end)` into a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceRange {
    pub start: usize,
    pub end: usize,
}

impl SourceRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "SourceRange start must not exceed end");
        Self { start, end }
    }

    /// A zero-length range at `offset`.
    pub fn empty_at(offset: usize) -> Self {
        Self { start: offset, end: offset }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The smallest range covering both `self` and `other`.
    pub fn merge(&self, other: &SourceRange) -> SourceRange {
        SourceRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A resolved, human-facing position: 1-based line, 1-based column, 0-based
/// byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

/// Resolves byte offsets into [`SourceLocation`]s for one source buffer.
///
/// Built once from the full source text by scanning for line starts; lookups
/// are a binary search over that table.
#[derive(Debug)]
pub struct SourceMap {
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Resolve a byte offset to a 1-based line/column location.
    pub fn locate(&self, offset: usize) -> SourceLocation {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let line_start = self.line_starts[line_idx];
        SourceLocation {
            line: (line_idx + 1) as u32,
            column: (offset - line_start + 1) as u32,
            offset,
        }
    }

    /// Resolve a range to `(start, end)` locations.
    pub fn locate_range(&self, range: SourceRange) -> (SourceLocation, SourceLocation) {
        (self.locate(range.start), self.locate(range.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_merge_takes_min_start_max_end() {
        let a = SourceRange::new(5, 10);
        let b = SourceRange::new(2, 7);
        assert_eq!(a.merge(&b), SourceRange::new(2, 10));
    }

    #[test]
    fn range_len_and_empty() {
        assert_eq!(SourceRange::new(3, 8).len(), 5);
        assert!(SourceRange::empty_at(4).is_empty());
    }

    #[test]
    fn source_map_locates_first_line() {
        let map = SourceMap::new("abc\ndef\n");
        let loc = map.locate(1);
        assert_eq!(loc.line, 1);
        assert_eq!(loc.column, 2);
        assert_eq!(loc.offset, 1);
    }

    #[test]
    fn source_map_locates_second_line() {
        let map = SourceMap::new("abc\ndef\n");
        let loc = map.locate(5);
        assert_eq!(loc.line, 2);
        assert_eq!(loc.column, 2);
    }

    #[test]
    fn source_map_locates_exact_line_start() {
        let map = SourceMap::new("abc\ndef\n");
        let loc = map.locate(4);
        assert_eq!(loc.line, 2);
        assert_eq!(loc.column, 1);
    }

    #[test]
    fn source_map_locate_range() {
        let map = SourceMap::new("one two\nthree");
        let (start, end) = map.locate_range(SourceRange::new(4, 7));
        assert_eq!(start.line, 1);
        assert_eq!(start.column, 5);
        assert_eq!(end.column, 8);
    }
}
