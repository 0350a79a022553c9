//! Global thresholding.

/// Otsu threshold over an 8-bit histogram.
///
/// Pixels `<= t` form the dark class. Constant inputs return their value;
/// two-level inputs return the midpoint.
pub(crate) fn otsu_threshold(pixels: &[u8]) -> u8 {
    if pixels.is_empty() {
        return 127;
    }

    let mut hist = [0u64; 256];
    for &v in pixels {
        hist[v as usize] += 1;
    }

    let min_v = hist.iter().position(|&h| h > 0).unwrap_or(0);
    let max_v = hist.iter().rposition(|&h| h > 0).unwrap_or(255);
    if min_v == max_v {
        return min_v as u8;
    }
    if hist.iter().filter(|&&h| h > 0).count() <= 2 {
        return ((min_v + max_v) / 2) as u8;
    }

    let total = pixels.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    best_t
}
