//! Shape descriptors of labeled regions.
//!
//! Every region is described by its pixel count, centroid and second central
//! moments, from which the equivalent ellipse is derived:
//!
//! - `major_axis_length = 4·√λ₁`, `minor_axis_length = 4·√λ₂` where λ₁ ≥ λ₂
//!   are the eigenvalues of the pixel coordinate covariance matrix
//! - `eccentricity = √(1 − λ₂/λ₁)`, 0 for a circle and 1 for a line
//! - `orientation` is the angle in radians between the row axis and the
//!   major axis, in `[-π/2, π/2]`
//! - `solidity = area / convex_area`, where the convex hull is built from
//!   pixel corners and `convex_area` counts pixel centres inside it
//!
//! Coordinates are `(row, col)` pixel indices; lengths and areas are in
//! pixels. Calibration to micrometers happens in the engine.

use ndarray::ArrayView2;

use super::detection::{label_count, AABB};

/// Geometric properties of one labeled region.
#[derive(Debug, Clone)]
pub struct RegionProps {
    /// Label in the label image (1-based)
    pub label: usize,
    /// Number of pixels
    pub area: usize,
    /// Centroid as (row, col)
    pub centroid: (f64, f64),
    /// Central moment μ_rr / area (variance along rows)
    pub mu_rr: f64,
    /// Central moment μ_cc / area (variance along columns)
    pub mu_cc: f64,
    /// Central moment μ_rc / area (row/column covariance)
    pub mu_rc: f64,
    /// Pixels whose centres lie inside the convex hull
    pub convex_area: usize,
}

impl RegionProps {
    /// Eigenvalues (λ₁, λ₂) of the coordinate covariance matrix, λ₁ ≥ λ₂.
    pub fn inertia_eigenvalues(&self) -> (f64, f64) {
        let half_sum = (self.mu_rr + self.mu_cc) / 2.0;
        let half_diff = (self.mu_rr - self.mu_cc) / 2.0;
        let radius = (half_diff.powi(2) + self.mu_rc.powi(2)).sqrt();
        let lambda1 = half_sum + radius;
        // Clamp round-off below zero for line-like regions
        let lambda2 = (half_sum - radius).max(0.0);
        (lambda1, lambda2)
    }

    pub fn major_axis_length(&self) -> f64 {
        4.0 * self.inertia_eigenvalues().0.sqrt()
    }

    pub fn minor_axis_length(&self) -> f64 {
        4.0 * self.inertia_eigenvalues().1.sqrt()
    }

    /// Diameter of the circle with the same area.
    pub fn equivalent_diameter(&self) -> f64 {
        (4.0 * self.area as f64 / std::f64::consts::PI).sqrt()
    }

    pub fn eccentricity(&self) -> f64 {
        let (lambda1, lambda2) = self.inertia_eigenvalues();
        if lambda1 <= f64::EPSILON {
            return 0.0;
        }
        (1.0 - lambda2 / lambda1).max(0.0).sqrt()
    }

    pub fn orientation(&self) -> f64 {
        0.5 * (2.0 * self.mu_rc).atan2(self.mu_rr - self.mu_cc)
    }

    pub fn solidity(&self) -> f64 {
        if self.convex_area == 0 {
            return 0.0;
        }
        self.area as f64 / self.convex_area as f64
    }
}

/// Compute [`RegionProps`] for every label in `labels`, in label order.
pub fn regionprops(labels: &ArrayView2<usize>) -> Vec<RegionProps> {
    let n_labels = label_count(labels);
    let mut pixels: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n_labels];

    for ((row, col), &label) in labels.indexed_iter() {
        if label > 0 {
            pixels[label - 1].push((row, col));
        }
    }

    pixels
        .iter()
        .enumerate()
        .filter(|(_, coords)| !coords.is_empty())
        .map(|(idx, coords)| region_from_pixels(idx + 1, coords))
        .collect()
}

fn region_from_pixels(label: usize, coords: &[(usize, usize)]) -> RegionProps {
    let n = coords.len() as f64;
    let mut bbox = AABB::new();
    let (mut sum_r, mut sum_c) = (0.0, 0.0);

    for &(row, col) in coords {
        bbox.expand_to_include(row, col);
        sum_r += row as f64;
        sum_c += col as f64;
    }

    let centroid = (sum_r / n, sum_c / n);

    let (mut mu_rr, mut mu_cc, mut mu_rc) = (0.0, 0.0, 0.0);
    for &(row, col) in coords {
        let dr = row as f64 - centroid.0;
        let dc = col as f64 - centroid.1;
        mu_rr += dr * dr;
        mu_cc += dc * dc;
        mu_rc += dr * dc;
    }

    let hull = convex_hull(&row_extreme_corners(coords, &bbox));
    let convex_area = count_pixels_in_hull(&hull, &bbox);

    RegionProps {
        label,
        area: coords.len(),
        centroid,
        mu_rr: mu_rr / n,
        mu_cc: mu_cc / n,
        mu_rc: mu_rc / n,
        convex_area,
    }
}

/// Corners of the leftmost and rightmost pixel of every row.
///
/// The hull of these points equals the hull of all pixel corners.
fn row_extreme_corners(coords: &[(usize, usize)], bbox: &AABB) -> Vec<(f64, f64)> {
    let mut extremes = vec![(usize::MAX, 0usize); bbox.height()];
    for &(row, col) in coords {
        let entry = &mut extremes[row - bbox.min_row];
        entry.0 = entry.0.min(col);
        entry.1 = entry.1.max(col);
    }

    let mut corners = Vec::with_capacity(extremes.len() * 4);
    for (offset, &(min_col, max_col)) in extremes.iter().enumerate() {
        if min_col == usize::MAX {
            continue;
        }
        let row = (bbox.min_row + offset) as f64;
        let left = min_col as f64 - 0.5;
        let right = max_col as f64 + 0.5;
        corners.push((row - 0.5, left));
        corners.push((row + 0.5, left));
        corners.push((row - 0.5, right));
        corners.push((row + 0.5, right));
    }
    corners
}

fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// Andrew's monotone chain; returns hull vertices in counter-clockwise order.
fn convex_hull(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    sorted.dedup();

    if sorted.len() < 3 {
        return sorted;
    }

    let mut lower: Vec<(f64, f64)> = Vec::with_capacity(sorted.len());
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<(f64, f64)> = Vec::with_capacity(sorted.len());
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Count pixel centres inside (or on the boundary of) a convex polygon.
fn count_pixels_in_hull(hull: &[(f64, f64)], bbox: &AABB) -> usize {
    const EPS: f64 = 1e-9;

    if hull.len() < 3 {
        return 0;
    }

    let mut count = 0;
    for row in bbox.min_row..=bbox.max_row {
        for col in bbox.min_col..=bbox.max_col {
            let p = (row as f64, col as f64);
            let inside = (0..hull.len()).all(|i| {
                let a = hull[i];
                let b = hull[(i + 1) % hull.len()];
                cross(a, b, p) >= -EPS
            });
            if inside {
                count += 1;
            }
        }
    }
    count
}
