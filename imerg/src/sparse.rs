//! Threshold filtering of grids into sparse point sets.

use crate::grid::CroppedGrid;

/// Default cutoff in mm/hr; lighter rates are treated as clear sky.
pub const DEFAULT_THRESHOLD: f32 = 0.1;

/// Cells of a grid whose value exceeds a threshold.
///
/// `lats`, `lons` and `vals` are parallel: element `i` of each describes the
/// same cell. Points appear in row-major order of the source grid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparsePointSet {
    pub lats: Vec<f32>,
    pub lons: Vec<f32>,
    pub vals: Vec<f32>,
    /// Maximum of the whole source grid, not just of the kept points.
    pub max_val: f32,
}

impl SparsePointSet {
    /// Filter `grid` to cells strictly greater than `threshold`.
    ///
    /// NaN cells never pass. `max_val` is the NaN-ignoring maximum over every
    /// cell of `grid`, regardless of how many pass, so clients can scale a
    /// color ramp even when few points survive. It is `0.0` only when the
    /// grid has no numeric cells at all.
    pub fn from_grid(grid: &CroppedGrid, threshold: f32) -> Self {
        let mut points = SparsePointSet {
            max_val: grid.max_value().unwrap_or(0.0),
            ..Default::default()
        };

        for ((row, col), &value) in grid.values().indexed_iter() {
            if value > threshold {
                points.lats.push(grid.lats()[row]);
                points.lons.push(grid.lons()[col]);
                points.vals.push(value);
            }
        }

        tracing::debug!(
            threshold,
            count = points.count(),
            max_val = points.max_val,
            "Filtered sparse points"
        );

        points
    }

    /// Number of points.
    pub fn count(&self) -> usize {
        self.vals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vals.is_empty()
    }

    /// Iterate `(lat, lon, val)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (f32, f32, f32)> + '_ {
        self.lats
            .iter()
            .zip(&self.lons)
            .zip(&self.vals)
            .map(|((&lat, &lon), &val)| (lat, lon, val))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn grid(values: Array2<f32>) -> CroppedGrid {
        let (rows, cols) = values.dim();
        let lats = (0..rows).map(|r| r as f32 * 0.1).collect();
        let lons = (0..cols).map(|c| 100.0 + c as f32 * 0.1).collect();
        CroppedGrid::new(lats, lons, values).unwrap()
    }

    #[test]
    fn test_threshold_scenario() {
        let g = grid(array![[0.0, 0.2], [0.05, 5.0]]);
        let points = SparsePointSet::from_grid(&g, DEFAULT_THRESHOLD);

        assert_eq!(points.count(), 2);
        assert_eq!(points.vals, vec![0.2, 5.0]);
        assert_eq!(points.max_val, 5.0);
        assert_eq!(points.lats, vec![0.0, 0.1]);
        assert_eq!(points.lons, vec![100.1, 100.1]);
    }

    #[test]
    fn test_row_major_order() {
        let g = grid(array![[1.0, 0.0, 2.0], [3.0, 4.0, 0.0]]);
        let points = SparsePointSet::from_grid(&g, 0.5);

        let triples: Vec<_> = points.iter().collect();
        assert_eq!(
            triples,
            vec![
                (0.0, 100.0, 1.0),
                (0.0, 100.2, 2.0),
                (0.1, 100.0, 3.0),
                (0.1, 100.1, 4.0),
            ]
        );
    }

    #[test]
    fn test_strictly_greater() {
        let g = grid(array![[0.5, 0.5000001, 0.4999]]);
        let points = SparsePointSet::from_grid(&g, 0.5);
        assert_eq!(points.count(), 1);
        assert_eq!(points.vals, vec![0.5000001]);
    }

    #[test]
    fn test_count_matches_cells_above_threshold() {
        let g = grid(Array2::from_shape_fn((7, 9), |(r, c)| ((r * 9 + c) % 5) as f32));
        for t in [-1.0, 0.0, 1.5, 3.0, 4.0, 10.0] {
            let expected = g.values().iter().filter(|&&v| v > t).count();
            assert_eq!(SparsePointSet::from_grid(&g, t).count(), expected);
        }
    }

    #[test]
    fn test_max_independent_of_threshold() {
        let g = grid(array![[0.3, 2.5], [1.0, 0.0]]);
        for t in [0.0, 0.1, 1.0, 2.4, 2.5, 100.0] {
            assert_eq!(SparsePointSet::from_grid(&g, t).max_val, 2.5);
        }

        let none = SparsePointSet::from_grid(&g, 100.0);
        assert!(none.is_empty());
        assert!(none.lats.is_empty() && none.lons.is_empty());
    }

    #[test]
    fn test_nan_cells_skipped() {
        let g = grid(array![[f32::NAN, 1.0], [f32::NAN, f32::NAN]]);
        let points = SparsePointSet::from_grid(&g, 0.1);
        assert_eq!(points.count(), 1);
        assert_eq!(points.max_val, 1.0);
    }

    #[test]
    fn test_empty_grid_max_is_zero() {
        let g = grid(Array2::zeros((0, 0)));
        let points = SparsePointSet::from_grid(&g, 0.1);
        assert_eq!(points.count(), 0);
        assert_eq!(points.max_val, 0.0);
    }
}
