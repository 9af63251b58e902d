//! Byte-range correspondence between a macro call body and its expansion.
//!
//! Every fragment of call-body text that survives into the expanded text
//! verbatim gets one [`MappedTextRange`]: `len` bytes starting at
//! `src_offset` in the call body equal `len` bytes starting at `dst_offset`
//! in the expansion. The expander keeps these exact, so "go to source" and
//! diagnostics can map offsets in either direction by simple arithmetic.

use serde::{Deserialize, Serialize};

/// A contiguous span of destination text that is byte-for-byte identical to a
/// contiguous span of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedTextRange {
    pub src_offset: usize,
    pub dst_offset: usize,
    pub len: usize,
}

impl MappedTextRange {
    pub fn new(src_offset: usize, dst_offset: usize, len: usize) -> Self {
        MappedTextRange {
            src_offset,
            dst_offset,
            len,
        }
    }

    pub fn src_end_offset(&self) -> usize {
        self.src_offset + self.len
    }

    pub fn dst_end_offset(&self) -> usize {
        self.dst_offset + self.len
    }
}

/// An ordered list of [`MappedTextRange`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeMap {
    pub ranges: Vec<MappedTextRange>,
}

impl RangeMap {
    pub fn new() -> Self {
        RangeMap::default()
    }

    pub fn from_ranges(ranges: Vec<MappedTextRange>) -> Self {
        RangeMap { ranges }
    }

    /// An identity map over `len` bytes of text.
    pub fn identity(len: usize) -> Self {
        if len == 0 {
            RangeMap::new()
        } else {
            RangeMap::from_ranges(vec![MappedTextRange::new(0, 0, len)])
        }
    }

    /// Append a range, merging it into the previous one when both the source
    /// and destination sides are exactly adjacent.
    pub fn merge_add(&mut self, range: MappedTextRange) {
        if let Some(last) = self.ranges.last_mut() {
            if last.src_end_offset() == range.src_offset
                && last.dst_end_offset() == range.dst_offset
            {
                last.len += range.len;
                return;
            }
        }
        self.ranges.push(range);
    }

    /// Compose two maps: `self` maps text A to text B, `other` maps text B to
    /// text C; the result maps A directly to C. A byte is mapped by the result
    /// iff it is mapped by both components.
    pub fn map_all(&self, other: &RangeMap) -> RangeMap {
        let mut result = RangeMap::new();
        for r2 in &other.ranges {
            for r1 in &self.ranges {
                let start = r1.dst_offset.max(r2.src_offset);
                let end = r1.dst_end_offset().min(r2.src_end_offset());
                if start < end {
                    result.merge_add(MappedTextRange::new(
                        r1.src_offset + (start - r1.dst_offset),
                        r2.dst_offset + (start - r2.src_offset),
                        end - start,
                    ));
                }
            }
        }
        result
    }

    /// Map an offset in the source text to the corresponding offset in the
    /// destination text, if that byte survived into the destination.
    pub fn map_offset_src_to_dst(&self, offset: usize) -> Option<usize> {
        self.ranges
            .iter()
            .find(|r| r.src_offset <= offset && offset < r.src_end_offset())
            .map(|r| r.dst_offset + (offset - r.src_offset))
    }

    /// Map an offset in the destination text back to the source text.
    pub fn map_offset_dst_to_src(&self, offset: usize) -> Option<usize> {
        self.ranges
            .iter()
            .find(|r| r.dst_offset <= offset && offset < r.dst_end_offset())
            .map(|r| r.src_offset + (offset - r.dst_offset))
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_add_merges_adjacent() {
        let mut map = RangeMap::new();
        map.merge_add(MappedTextRange::new(0, 10, 4));
        map.merge_add(MappedTextRange::new(4, 14, 2));
        assert_eq!(map.ranges, vec![MappedTextRange::new(0, 10, 6)]);

        // adjacent in src only: no merge
        map.merge_add(MappedTextRange::new(6, 20, 3));
        assert_eq!(map.ranges.len(), 2);
    }

    #[test]
    fn point_queries() {
        let map = RangeMap::from_ranges(vec![
            MappedTextRange::new(0, 5, 3),
            MappedTextRange::new(10, 8, 2),
        ]);
        assert_eq!(map.map_offset_src_to_dst(0), Some(5));
        assert_eq!(map.map_offset_src_to_dst(2), Some(7));
        assert_eq!(map.map_offset_src_to_dst(3), None);
        assert_eq!(map.map_offset_src_to_dst(11), Some(9));
        assert_eq!(map.map_offset_dst_to_src(9), Some(11));
        assert_eq!(map.map_offset_dst_to_src(4), None);
    }

    #[test]
    fn map_all_composes() {
        // A -> B: bytes 0..6 of A sit at 10..16 of B
        let a_to_b = RangeMap::from_ranges(vec![MappedTextRange::new(0, 10, 6)]);
        // B -> C: bytes 12..16 of B sit at 0..4 of C
        let b_to_c = RangeMap::from_ranges(vec![MappedTextRange::new(12, 0, 4)]);

        let a_to_c = a_to_b.map_all(&b_to_c);
        assert_eq!(a_to_c.ranges, vec![MappedTextRange::new(2, 0, 4)]);

        // a point is mapped iff both components map it
        assert_eq!(a_to_c.map_offset_src_to_dst(2), Some(0));
        assert_eq!(a_to_c.map_offset_src_to_dst(1), None);
    }

    #[test]
    fn identity() {
        let map = RangeMap::identity(7);
        assert_eq!(map.map_offset_src_to_dst(3), Some(3));
        assert!(RangeMap::identity(0).is_empty());
    }
}
