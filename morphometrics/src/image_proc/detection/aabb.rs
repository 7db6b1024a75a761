//! Pixel extents of labeled regions.

/// Axis-Aligned Bounding Box in pixel indices (inclusive bounds)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AABB {
    /// Minimum row (y) coordinate
    pub min_row: usize,
    /// Minimum column (x) coordinate
    pub min_col: usize,
    /// Maximum row (y) coordinate
    pub max_row: usize,
    /// Maximum column (x) coordinate
    pub max_col: usize,
}

impl AABB {
    /// Create a new empty AABB
    pub fn new() -> Self {
        Self {
            min_row: usize::MAX,
            min_col: usize::MAX,
            max_row: 0,
            max_col: 0,
        }
    }

    /// Expand this AABB to include the given point
    pub fn expand_to_include(&mut self, row: usize, col: usize) {
        self.min_row = self.min_row.min(row);
        self.min_col = self.min_col.min(col);
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
    }

    /// Number of rows spanned; only meaningful once a point was added
    pub fn height(&self) -> usize {
        self.max_row - self.min_row + 1
    }
}

impl Default for AABB {
    fn default() -> Self {
        Self::new()
    }
}
