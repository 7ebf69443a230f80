use super::error::CoreError;

/// Densifies an energy profile along the reaction coordinate with cubic
/// Hermite segments, so a plot shows the barrier shape between the sampled
/// images rather than straight lines.
///
/// `rx`, `energy` and `slope` must have equal length; `slope` holds the
/// energy derivative along the path at each node. Each segment contributes
/// `n_per_segment` samples starting at its left node; the final node is
/// appended once at the end, so every node value is reproduced exactly.
pub fn interpolate_energy(
    rx: &[f64],
    energy: &[f64],
    slope: &[f64],
    n_per_segment: usize,
) -> Result<(Vec<f64>, Vec<f64>), CoreError> {
    if rx.len() != energy.len() || rx.len() != slope.len() {
        return Err(CoreError::SizeMismatch {
            expected: rx.len(),
            found: energy.len().max(slope.len()),
        });
    }
    if rx.is_empty() || n_per_segment == 0 {
        return Ok((rx.to_vec(), energy.to_vec()));
    }

    let n_segments = rx.len() - 1;
    let mut out_rx = Vec::with_capacity(n_segments * n_per_segment + 1);
    let mut out_energy = Vec::with_capacity(n_segments * n_per_segment + 1);
    for seg in 0..n_segments {
        let h = rx[seg + 1] - rx[seg];
        for sample in 0..n_per_segment {
            let t = sample as f64 / n_per_segment as f64;
            out_rx.push(rx[seg] + t * h);
            out_energy.push(hermite(
                t,
                h,
                energy[seg],
                energy[seg + 1],
                slope[seg],
                slope[seg + 1],
            ));
        }
    }
    out_rx.push(rx[n_segments]);
    out_energy.push(energy[n_segments]);
    Ok((out_rx, out_energy))
}

/// Cubic Hermite basis evaluation on one segment of width `h`.
#[inline]
fn hermite(t: f64, h: f64, y0: f64, y1: f64, m0: f64, m1: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    h00 * y0 + h10 * h * m0 + h01 * y1 + h11 * h * m1
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn nodes_are_reproduced_exactly() {
        let rx = [0.0, 1.0, 2.5];
        let energy = [1.0, -0.5, 2.0];
        let slope = [0.3, -1.0, 0.0];
        let (xs, ys) = interpolate_energy(&rx, &energy, &slope, 10).unwrap();
        for (node_rx, node_e) in rx.iter().zip(&energy) {
            let i = xs
                .iter()
                .position(|x| (x - node_rx).abs() < TOLERANCE)
                .unwrap();
            assert!((ys[i] - node_e).abs() < TOLERANCE);
        }
    }

    #[test]
    fn sample_count_is_segments_times_resolution_plus_one() {
        let rx = [0.0, 1.0, 2.0, 3.0];
        let energy = [0.0; 4];
        let slope = [0.0; 4];
        let (xs, ys) = interpolate_energy(&rx, &energy, &slope, 20).unwrap();
        assert_eq!(xs.len(), 3 * 20 + 1);
        assert_eq!(ys.len(), xs.len());
    }

    #[test]
    fn linear_data_with_matching_slopes_stays_linear() {
        let rx = [0.0, 2.0];
        let energy = [0.0, 4.0];
        let slope = [2.0, 2.0];
        let (xs, ys) = interpolate_energy(&rx, &energy, &slope, 8).unwrap();
        for (x, y) in xs.iter().zip(&ys) {
            assert!((y - 2.0 * x).abs() < TOLERANCE);
        }
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let result = interpolate_energy(&[0.0, 1.0], &[0.0], &[0.0, 0.0], 4);
        assert!(matches!(result, Err(CoreError::SizeMismatch { .. })));
    }

    #[test]
    fn zero_resolution_returns_the_nodes_unchanged() {
        let rx = [0.0, 1.0];
        let energy = [3.0, 5.0];
        let (xs, ys) = interpolate_energy(&rx, &energy, &[0.0, 0.0], 0).unwrap();
        assert_eq!(xs, rx);
        assert_eq!(ys, energy);
    }
}
