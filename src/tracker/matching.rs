//! Gated nearest-neighbor association between tracks and detections.

use ndarray::Array2;

/// Padding cost for the square matrix handed to the assignment solver. Must
/// dominate any real squared pixel distance so padded cells are never chosen
/// over genuine pairs.
const PAD_COST: f64 = 1e9;

/// Result of one association round. Indices refer to the input slices.
#[derive(Debug, Clone)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Squared Euclidean distance matrix between track and detection positions.
pub fn distance_matrix(tracks: &[[f64; 2]], detections: &[[f64; 2]]) -> Array2<f64> {
    let mut costs = Array2::zeros((tracks.len(), detections.len()));
    for (i, t) in tracks.iter().enumerate() {
        for (j, d) in detections.iter().enumerate() {
            let dr = t[0] - d[0];
            let dc = t[1] - d[1];
            costs[[i, j]] = dr * dr + dc * dc;
        }
    }
    costs
}

/// Solve the minimum-cost assignment between tracks and detections, then
/// demote any selected pair further apart than `search_radius` to unmatched
/// on both sides.
///
/// Zero tracks or zero detections short-circuits with everything unmatched
/// and no cost matrix built.
pub fn match_positions(
    tracks: &[[f64; 2]],
    detections: &[[f64; 2]],
    search_radius: f64,
) -> AssignmentResult {
    let num_rows = tracks.len();
    let num_cols = detections.len();

    if num_rows == 0 || num_cols == 0 {
        return AssignmentResult {
            matches: vec![],
            unmatched_tracks: (0..num_rows).collect(),
            unmatched_detections: (0..num_cols).collect(),
        };
    }

    let cost_matrix = distance_matrix(tracks, detections);
    let gate = search_radius * search_radius;

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), PAD_COST);
    for i in 0..num_rows {
        for j in 0..num_cols {
            padded[[i, j]] = cost_matrix[[i, j]];
        }
    }

    let result = lapjv::lapjv(&padded);
    let mut matches = vec![];
    let mut unmatched_tracks = vec![];
    let mut unmatched_detections_mask: Vec<bool> = vec![true; num_cols];

    match result {
        Ok((row_to_col, _)) => {
            for (row_idx, &col_idx) in row_to_col.iter().enumerate() {
                if row_idx >= num_rows {
                    continue;
                }
                if col_idx >= num_cols {
                    unmatched_tracks.push(row_idx);
                } else if cost_matrix[[row_idx, col_idx]] <= gate {
                    matches.push((row_idx, col_idx));
                    unmatched_detections_mask[col_idx] = false;
                } else {
                    // Out-of-gate pair chosen by the global optimum; reject it.
                    unmatched_tracks.push(row_idx);
                }
            }
        }
        Err(_) => {
            unmatched_tracks = (0..num_rows).collect();
        }
    }

    let unmatched_detections: Vec<usize> = unmatched_detections_mask
        .iter()
        .enumerate()
        .filter_map(|(i, &u)| if u { Some(i) } else { None })
        .collect();

    AssignmentResult {
        matches,
        unmatched_tracks,
        unmatched_detections,
    }
}
