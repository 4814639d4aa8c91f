//! Cost matrices and linear assignment for track/detection association.

use ndarray::Array2;

use crate::geometry::{Rect, iou_batch};

/// Cost used to pad non-square matrices; never accepted as a match.
const PAD_COST: f64 = 1e6;

/// `1 - IoU` between every track box and every detection box.
pub fn iou_distance(track_boxes: &[Rect], det_boxes: &[Rect]) -> Array2<f32> {
    iou_batch(track_boxes, det_boxes).mapv(|iou| 1.0 - iou)
}

/// Scale IoU similarity by detection confidence, column-wise.
pub fn fuse_score(cost_matrix: &mut Array2<f32>, scores: &[f32]) {
    for mut row in cost_matrix.rows_mut() {
        for (cost, &score) in row.iter_mut().zip(scores) {
            *cost = 1.0 - (1.0 - *cost) * score;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Assignment {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Optimal assignment (LAPJV) keeping only pairs with cost `<= thresh`.
pub fn linear_assignment(cost_matrix: &Array2<f32>, thresh: f32) -> Assignment {
    let (rows, cols) = cost_matrix.dim();
    if rows == 0 || cols == 0 {
        return Assignment {
            matches: Vec::new(),
            unmatched_tracks: (0..rows).collect(),
            unmatched_detections: (0..cols).collect(),
        };
    }

    let size = rows.max(cols);
    let padded = Array2::from_shape_fn((size, size), |(i, j)| {
        if i < rows && j < cols {
            cost_matrix[[i, j]] as f64
        } else {
            PAD_COST
        }
    });

    let mut assignment = Assignment::default();
    let mut detection_taken = vec![false; cols];

    match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => {
            for (row, &col) in row_to_col.iter().enumerate().take(rows) {
                if col < cols && cost_matrix[[row, col]] <= thresh {
                    assignment.matches.push((row, col));
                    detection_taken[col] = true;
                } else {
                    assignment.unmatched_tracks.push(row);
                }
            }
        }
        Err(err) => {
            tracing::warn!(error = ?err, "linear assignment failed; leaving all tracks unmatched");
            assignment.unmatched_tracks = (0..rows).collect();
        }
    }

    assignment.unmatched_detections = detection_taken
        .iter()
        .enumerate()
        .filter_map(|(j, &taken)| (!taken).then_some(j))
        .collect();
    assignment
}
