//! Mask denoising and density-based clustering of foreground pixels.

use ndarray::Array2;

/// Apply a square median filter to a binary mask.
///
/// For a binary image the median reduces to a majority vote over the window,
/// which removes isolated speckle while preserving solid blobs. `size` must
/// be odd; a size of 1 is the identity.
pub fn median_denoise(mask: &Array2<u8>, size: usize) -> Array2<u8> {
    if size <= 1 {
        return mask.clone();
    }
    let (rows, cols) = mask.dim();
    let half = (size / 2) as isize;
    let majority = (size * size) / 2;
    let mut out = Array2::zeros((rows, cols));

    for r in 0..rows {
        for c in 0..cols {
            let mut set = 0usize;
            for dr in -half..=half {
                for dc in -half..=half {
                    let rr = r as isize + dr;
                    let cc = c as isize + dc;
                    if rr >= 0
                        && cc >= 0
                        && (rr as usize) < rows
                        && (cc as usize) < cols
                        && mask[[rr as usize, cc as usize]] != 0
                    {
                        set += 1;
                    }
                }
            }
            if set > majority {
                out[[r, c]] = 255;
            }
        }
    }
    out
}

/// Density-based clustering (DBSCAN) over pixel coordinates.
///
/// A point is a core point when its `eps`-neighborhood (Euclidean) holds at
/// least `min_samples` points, itself included. Points unreachable from any
/// core point are noise and are not returned. Cluster order and labels are
/// arbitrary per call.
pub fn dbscan(points: &[[u32; 2]], eps: f64, min_samples: usize) -> Vec<Vec<[u32; 2]>> {
    const UNVISITED: i32 = -2;
    const NOISE: i32 = -1;

    let eps_sq = eps * eps;
    let mut labels = vec![UNVISITED; points.len()];
    let mut clusters: Vec<Vec<[u32; 2]>> = Vec::new();

    let dist_sq = |a: [u32; 2], b: [u32; 2]| {
        let dr = f64::from(a[0]) - f64::from(b[0]);
        let dc = f64::from(a[1]) - f64::from(b[1]);
        dr * dr + dc * dc
    };
    let region_query = |idx: usize| -> Vec<usize> {
        points
            .iter()
            .enumerate()
            .filter(|&(_, &p)| dist_sq(points[idx], p) <= eps_sq)
            .map(|(i, _)| i)
            .collect()
    };

    for start in 0..points.len() {
        if labels[start] != UNVISITED {
            continue;
        }
        let neighbors = region_query(start);
        if neighbors.len() < min_samples {
            labels[start] = NOISE;
            continue;
        }

        let cluster_id = clusters.len() as i32;
        clusters.push(Vec::new());
        labels[start] = cluster_id;
        clusters[cluster_id as usize].push(points[start]);

        let mut seeds = neighbors;
        let mut i = 0;
        while i < seeds.len() {
            let q = seeds[i];
            i += 1;

            if labels[q] == NOISE {
                // Border point reachable from a core point.
                labels[q] = cluster_id;
                clusters[cluster_id as usize].push(points[q]);
                continue;
            }
            if labels[q] != UNVISITED {
                continue;
            }
            labels[q] = cluster_id;
            clusters[cluster_id as usize].push(points[q]);

            let q_neighbors = region_query(q);
            if q_neighbors.len() >= min_samples {
                seeds.extend(q_neighbors);
            }
        }
    }

    clusters
}
