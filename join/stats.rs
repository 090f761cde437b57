// ========================================================================================
//                               Column statistics
// ========================================================================================

/// Returns the median of `values`, or `None` when the slice is empty.
///
/// The input is copied and sorted with a total order, so the caller's data is left
/// untouched. For an even count the result is the mean of the two middle elements.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}
