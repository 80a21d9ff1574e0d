#[derive(Debug, Clone, Copy)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// argsort returns the indices that would sort an array. NaN values are ordered with
/// `f64::total_cmp` semantics, i.e. they never cause a panic.
pub fn argsort(x: &[f64], order: SortOrder) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..x.len()).collect();
    match order {
        SortOrder::Ascending => indices.sort_by(|&a, &b| x[a].total_cmp(&x[b])),
        SortOrder::Descending => indices.sort_by(|&a, &b| x[b].total_cmp(&x[a])),
    }
    indices
}

/// argmin returns the index of the minimum value in the array x, or None for an empty array.
pub fn argmin(x: &[f64]) -> Option<usize> {
    let mut idx_min = None;
    let mut val_min = f64::INFINITY;

    for (i, &val) in x.iter().enumerate() {
        if idx_min.is_none() || val < val_min {
            val_min = val;
            idx_min = Some(i);
        }
    }

    idx_min
}

/// mean returns the arithmetic mean of the values, or None if there are no values.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), val| (sum + val, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// format_laptime formats a time in seconds as `m:ss.mmm`, e.g. 83.456 -> 1:23.456.
pub fn format_laptime(t: f64) -> String {
    if !t.is_finite() || t < 0.0 {
        return "-".to_owned();
    }

    let millis = (t * 1000.0).round() as u64;
    format!(
        "{}:{:02}.{:03}",
        millis / 60_000,
        millis / 1000 % 60,
        millis % 1000
    )
}
