//! Partitioning of grid rows into contiguous chunks

use std::ops::Range;

/// Splits `rows` into at most `chunks` contiguous half-open row ranges.
///
/// Every chunk except possibly the last holds `chunk_rows()` rows; the ranges
/// are disjoint and their union is `0..rows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowChunks {
    rows: usize,
    chunk_rows: usize,
}

impl RowChunks {
    /// Partition `rows` rows for `workers` workers.
    ///
    /// The number of chunks is `min(workers, rows)`; zero workers is treated
    /// as one.
    pub fn new(rows: usize, workers: usize) -> Self {
        let n = workers.max(1).min(rows.max(1));
        let chunk_rows = rows.div_ceil(n).max(1);
        Self { rows, chunk_rows }
    }

    /// Number of rows in every full chunk
    pub fn chunk_rows(&self) -> usize {
        self.chunk_rows
    }

    /// Total number of rows covered
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of chunks
    pub fn len(&self) -> usize {
        self.rows.div_ceil(self.chunk_rows)
    }

    /// Whether there are no rows to process
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Row range of chunk `index`
    pub fn range(&self, index: usize) -> Range<usize> {
        let start = (index * self.chunk_rows).min(self.rows);
        let end = (start + self.chunk_rows).min(self.rows);
        start..end
    }

    /// Iterate over all chunk ranges in row order
    pub fn iter(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.len()).map(move |i| self.range(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_cover_all_rows() {
        for rows in [1usize, 3, 7, 64, 101] {
            for workers in [1usize, 2, 3, 8, 200] {
                let chunks = RowChunks::new(rows, workers);
                let mut next = 0;
                for r in chunks.iter() {
                    assert_eq!(r.start, next, "gap before chunk {:?}", r);
                    assert!(r.end > r.start, "empty chunk {:?}", r);
                    next = r.end;
                }
                assert_eq!(next, rows);
                assert!(chunks.len() <= workers.min(rows));
            }
        }
    }

    #[test]
    fn test_more_workers_than_rows() {
        let chunks = RowChunks::new(3, 16);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.chunk_rows(), 1);
        assert_eq!(chunks.range(2), 2..3);
    }

    #[test]
    fn test_single_worker_is_one_chunk() {
        let chunks = RowChunks::new(50, 1);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks.range(0), 0..50);
    }
}
