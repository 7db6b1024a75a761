//! Connected component labeling for binary masks.
//!
//! Two-pass labeling with a union-find equivalence table. Each connected
//! group of member pixels receives a unique label; labels are consecutive
//! integers starting at 1 in raster order of each group's first pixel, and
//! background stays 0.
//!
//! Region measurements treat objects as 8-connected (diagonal neighbours
//! touch), which is the usual convention for 2-D region properties.
//! 4-connectivity is available for callers that need it.

use ndarray::{Array2, ArrayView2};

/// Pixel adjacency used when grouping pixels into objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Horizontal and vertical neighbours only
    Four,
    /// Horizontal, vertical and diagonal neighbours
    #[default]
    Eight,
}

/// Find the root label in a disjoint-set (union-find) data structure
fn find_root(labels: &mut [usize], label: usize) -> usize {
    let mut current = label;

    while current != labels[current] {
        // Path compression - make the parent point to the grandparent
        labels[current] = labels[labels[current]];
        current = labels[current];
    }

    current
}

/// Union two labels, keeping the smaller one as root.
fn union_labels(labels: &mut [usize], label1: usize, label2: usize) -> usize {
    let root1 = find_root(labels, label1);
    let root2 = find_root(labels, label2);

    if root1 < root2 {
        labels[root2] = root1;
        root1
    } else {
        labels[root1] = root2;
        root2
    }
}

/// Label connected groups of `true` pixels.
///
/// # Arguments
/// * `mask` - Binary mask, `true` for object pixels
/// * `connectivity` - Neighbourhood used to join pixels
///
/// # Returns
/// Label image of the same shape: 0 for background, 1..=N for objects
pub fn connected_components(mask: &ArrayView2<bool>, connectivity: Connectivity) -> Array2<usize> {
    let (height, width) = mask.dim();
    let mut labels = Array2::zeros((height, width));
    let mut label_count = 0;

    // Label 0 is background; its slot is never used as a parent
    let mut parent_table = vec![0];
    let mut neighbor_labels = Vec::with_capacity(4);

    for i in 0..height {
        for j in 0..width {
            if !mask[[i, j]] {
                continue;
            }

            // Only neighbours that were already visited in raster order
            neighbor_labels.clear();
            if i > 0 && labels[[i - 1, j]] > 0 {
                neighbor_labels.push(labels[[i - 1, j]]);
            }
            if j > 0 && labels[[i, j - 1]] > 0 {
                neighbor_labels.push(labels[[i, j - 1]]);
            }
            if connectivity == Connectivity::Eight && i > 0 {
                if j > 0 && labels[[i - 1, j - 1]] > 0 {
                    neighbor_labels.push(labels[[i - 1, j - 1]]);
                }
                if j + 1 < width && labels[[i - 1, j + 1]] > 0 {
                    neighbor_labels.push(labels[[i - 1, j + 1]]);
                }
            }

            match neighbor_labels.iter().copied().min() {
                None => {
                    label_count += 1;
                    labels[[i, j]] = label_count;
                    parent_table.push(label_count);
                }
                Some(min_label) => {
                    labels[[i, j]] = min_label;
                    for &neighbor_label in &neighbor_labels {
                        if neighbor_label != min_label {
                            union_labels(&mut parent_table, min_label, neighbor_label);
                        }
                    }
                }
            }
        }
    }

    for i in 1..parent_table.len() {
        find_root(&mut parent_table, i);
    }

    // Map provisional labels to consecutive final labels
    let mut relabel_map = vec![0; parent_table.len()];
    let mut next_label = 1;

    for i in 1..parent_table.len() {
        let root = parent_table[i];
        if relabel_map[root] == 0 {
            relabel_map[root] = next_label;
            next_label += 1;
        }
        relabel_map[i] = relabel_map[root];
    }

    labels.mapv_inplace(|label| relabel_map[label]);
    labels
}

/// Number of objects in a label image.
pub fn label_count(labeled_image: &ArrayView2<usize>) -> usize {
    labeled_image.iter().copied().max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Creates a binary test mask from a 2D array of 1s and 0s
    fn create_test_mask(pattern: &[&[i32]]) -> Array2<bool> {
        let height = pattern.len();
        let width = pattern[0].len();
        Array2::from_shape_fn((height, width), |(i, j)| pattern[i][j] != 0)
    }

    fn assert_labels_match(labeled: &Array2<usize>, expected: &[&[i32]]) {
        for (i, row) in expected.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                assert_eq!(
                    labeled[[i, j]],
                    value as usize,
                    "Mismatch at position [{}, {}]",
                    i,
                    j
                );
            }
        }
    }

    #[test]
    fn test_empty_mask() {
        let mask = Array2::from_elem((5, 5), false);
        let labeled = connected_components(&mask.view(), Connectivity::Eight);
        assert!(labeled.iter().all(|&l| l == 0));
        assert_eq!(label_count(&labeled.view()), 0);
    }

    #[test]
    fn test_two_components() {
        // fmt-ignore
        let pattern: &[&[i32]] = &[
            &[0, 0, 0, 0, 0],
            &[0, 1, 1, 0, 0],
            &[0, 1, 1, 0, 0],
            &[0, 0, 0, 0, 1],
            &[0, 0, 0, 0, 0],
        ];

        let labeled = connected_components(&create_test_mask(pattern).view(), Connectivity::Eight);

        // fmt-ignore
        let expected: &[&[i32]] = &[
            &[0, 0, 0, 0, 0],
            &[0, 1, 1, 0, 0],
            &[0, 1, 1, 0, 0],
            &[0, 0, 0, 0, 2],
            &[0, 0, 0, 0, 0],
        ];

        assert_labels_match(&labeled, expected);
    }

    #[test]
    fn test_diagonal_four_connectivity() {
        // fmt-ignore
        let pattern: &[&[i32]] = &[
            &[1, 0, 0],
            &[0, 1, 0],
            &[0, 0, 1],
        ];

        let labeled = connected_components(&create_test_mask(pattern).view(), Connectivity::Four);

        // fmt-ignore
        let expected: &[&[i32]] = &[
            &[1, 0, 0],
            &[0, 2, 0],
            &[0, 0, 3],
        ];

        assert_labels_match(&labeled, expected);
    }

    #[test]
    fn test_diagonal_eight_connectivity() {
        // fmt-ignore
        let pattern: &[&[i32]] = &[
            &[1, 0, 0],
            &[0, 1, 0],
            &[0, 0, 1],
        ];

        let labeled = connected_components(&create_test_mask(pattern).view(), Connectivity::Eight);
        assert!(labeled
            .iter()
            .zip(create_test_mask(pattern).iter())
            .all(|(&l, &m)| l == usize::from(m)));
    }

    #[test]
    fn test_anti_diagonal_merges_with_eight_connectivity() {
        // Up-right neighbour joins two provisional labels
        // fmt-ignore
        let pattern: &[&[i32]] = &[
            &[0, 0, 1],
            &[1, 1, 0],
        ];

        let labeled = connected_components(&create_test_mask(pattern).view(), Connectivity::Eight);

        // fmt-ignore
        let expected: &[&[i32]] = &[
            &[0, 0, 1],
            &[1, 1, 0],
        ];

        assert_labels_match(&labeled, expected);
    }

    #[test]
    fn test_u_shape() {
        // fmt-ignore
        let pattern: &[&[i32]] = &[
            &[0, 0, 0, 0, 0],
            &[0, 1, 0, 1, 0],
            &[0, 1, 0, 1, 0],
            &[0, 1, 1, 1, 0],
            &[0, 0, 0, 0, 0],
        ];

        for connectivity in [Connectivity::Four, Connectivity::Eight] {
            let labeled = connected_components(&create_test_mask(pattern).view(), connectivity);
            assert_labels_match(&labeled, pattern);
        }
    }

    #[test]
    fn test_annulus_is_one_component_around_hole() {
        // A myelin ring around an unlabeled axon hole
        // fmt-ignore
        let pattern: &[&[i32]] = &[
            &[0, 0, 0, 0, 0, 0, 0],
            &[0, 1, 1, 1, 1, 1, 0],
            &[0, 1, 0, 0, 0, 1, 0],
            &[0, 1, 0, 0, 0, 1, 0],
            &[0, 1, 1, 1, 1, 1, 0],
            &[0, 0, 0, 0, 0, 0, 0],
        ];

        let labeled = connected_components(&create_test_mask(pattern).view(), Connectivity::Eight);
        assert_labels_match(&labeled, pattern);
    }

    #[test]
    fn test_border_components() {
        // fmt-ignore
        let pattern: &[&[i32]] = &[
            &[1, 1, 0, 0, 1],
            &[1, 0, 0, 0, 0],
            &[0, 0, 0, 0, 0],
            &[0, 0, 0, 0, 0],
            &[1, 0, 0, 1, 1],
        ];

        let labeled = connected_components(&create_test_mask(pattern).view(), Connectivity::Eight);

        // fmt-ignore
        let expected: &[&[i32]] = &[
            &[1, 1, 0, 0, 2],
            &[1, 0, 0, 0, 0],
            &[0, 0, 0, 0, 0],
            &[0, 0, 0, 0, 0],
            &[3, 0, 0, 4, 4],
        ];

        assert_labels_match(&labeled, expected);
        assert_eq!(label_count(&labeled.view()), 4);
    }

    #[test]
    fn test_tricky_equivalence() {
        // fmt-ignore
        let pattern: &[&[i32]] = &[
            &[0, 0, 0, 0, 0, 0, 0, 0],
            &[0, 1, 1, 1, 1, 0, 0, 0],
            &[0, 1, 0, 0, 1, 0, 0, 0],
            &[0, 1, 0, 0, 1, 0, 1, 0],
            &[0, 1, 1, 1, 1, 1, 1, 0],
            &[0, 0, 0, 0, 0, 0, 0, 0],
        ];

        let labeled = connected_components(&create_test_mask(pattern).view(), Connectivity::Four);
        assert_labels_match(&labeled, pattern);
    }

    #[test]
    fn test_path_compression() {
        let mut labels = vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        for i in (2..=10).rev() {
            labels[i] = i - 1;
        }

        assert_eq!(find_root(&mut labels, 10), 1);
        assert!(labels[10] < 9, "Path compression not working effectively");
    }

    #[test]
    fn test_disjoint_set_operations() {
        let mut labels = vec![0, 1, 2, 3, 4, 5, 6, 7, 8];

        union_labels(&mut labels, 1, 2);
        union_labels(&mut labels, 3, 4);
        union_labels(&mut labels, 5, 6);
        union_labels(&mut labels, 7, 8);
        union_labels(&mut labels, 1, 3);
        union_labels(&mut labels, 5, 7);
        union_labels(&mut labels, 1, 5);

        let root = find_root(&mut labels, 1);
        for i in 1..=8 {
            assert_eq!(find_root(&mut labels, i), root);
        }
    }
}
