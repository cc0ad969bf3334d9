//! Cell to instance-range index.

use std::ops::Range;

/// Offset table mapping cell `(x, y)` of a `W x H` grid to a contiguous
/// range of the instance array.
///
/// `offsets[y*W + x]` is the first instance of the cell and
/// `offsets[y*W + x + 1]` one past its last, so the table has `W*H + 1`
/// entries. Built once during generation and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct CellIndex {
    width: usize,
    height: usize,
    offsets: Vec<u32>,
}

impl CellIndex {
    /// Start building an index; cells must be closed in raster order.
    pub fn builder(width: usize, height: usize) -> CellIndexBuilder {
        let mut offsets = Vec::with_capacity(width * height + 1);
        offsets.push(0);
        CellIndexBuilder { width, height, offsets }
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Instance range of cell `(x, y)`. Panics on an out-of-range cell.
    #[inline]
    pub fn range_for_cell(&self, x: usize, y: usize) -> Range<usize> {
        assert!(x < self.width && y < self.height, "cell ({x}, {y}) outside {}x{} index", self.width, self.height);
        let i = y * self.width + x;
        self.offsets[i] as usize..self.offsets[i + 1] as usize
    }

    /// Instance range covering the cells `x0..x1` of row `y`.
    #[inline]
    pub fn range_for_run(&self, x0: usize, x1: usize, y: usize) -> Range<usize> {
        assert!(x0 <= x1 && x1 <= self.width && y < self.height);
        let i = y * self.width;
        self.offsets[i + x0] as usize..self.offsets[i + x1] as usize
    }

    /// Total number of indexed instances.
    pub fn len(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0) as usize
    }

    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }
}

/// Accumulates cell boundaries while instances are generated.
pub struct CellIndexBuilder {
    width: usize,
    height: usize,
    offsets: Vec<u32>,
}

impl CellIndexBuilder {
    /// Close the next cell; `end` is the instance count after filling it.
    pub fn close_cell(&mut self, end: usize) {
        let last = self.offsets.last().copied().unwrap_or(0) as usize;
        assert!(end >= last, "cell end {end} before start {last}");
        assert!(self.offsets.len() <= self.width * self.height, "too many cells closed");
        self.offsets.push(end as u32);
    }

    /// Finish the index. Every cell must have been closed and the last
    /// offset must equal the instance array length.
    pub fn finish(self, total: usize) -> CellIndex {
        assert_eq!(self.offsets.len(), self.width * self.height + 1, "not every cell was closed");
        assert_eq!(self.offsets.last().copied().unwrap_or(0) as usize, total, "index does not cover the instance array");
        debug_assert!(self.offsets.windows(2).all(|w| w[0] <= w[1]));
        CellIndex {
            width: self.width,
            height: self.height,
            offsets: self.offsets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(counts: &[usize], w: usize, h: usize) -> CellIndex {
        let mut b = CellIndex::builder(w, h);
        let mut total = 0;
        for &c in counts {
            total += c;
            b.close_cell(total);
        }
        b.finish(total)
    }

    #[test]
    fn test_ranges_are_contiguous() {
        let index = build(&[2, 0, 3, 1, 4, 0], 3, 2);
        assert_eq!(index.offsets().len(), 7);
        assert_eq!(index.range_for_cell(0, 0), 0..2);
        assert_eq!(index.range_for_cell(1, 0), 2..2);
        assert_eq!(index.range_for_cell(2, 0), 2..5);
        assert_eq!(index.range_for_cell(0, 1), 5..6);
        assert_eq!(index.range_for_cell(2, 1), 10..10);
        assert_eq!(index.len(), 10);
        assert_eq!(index.range_for_run(1, 3, 1), 6..10);

        // Each cell ends where the next begins
        for y in 0..2 {
            for x in 0..3 {
                let r = index.range_for_cell(x, y);
                assert!(r.start <= r.end);
                let next = if x + 1 < 3 {
                    index.range_for_cell(x + 1, y).start
                } else if y + 1 < 2 {
                    index.range_for_cell(0, y + 1).start
                } else {
                    index.len()
                };
                assert_eq!(r.end, next);
            }
        }
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_cell_panics() {
        let index = build(&[1, 1], 2, 1);
        index.range_for_cell(2, 0);
    }

    #[test]
    #[should_panic]
    fn test_decreasing_offset_panics() {
        let mut b = CellIndex::builder(2, 1);
        b.close_cell(3);
        b.close_cell(2);
    }

    #[test]
    #[should_panic]
    fn test_incomplete_index_panics() {
        let mut b = CellIndex::builder(2, 2);
        b.close_cell(1);
        b.finish(1);
    }
}
