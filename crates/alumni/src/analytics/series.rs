//! Helpers that turn grouped counts into chart-ready series.

use std::cmp::Ordering;
use std::collections::HashMap;

/// Cap applied to top-N lists.
pub const TOP_N: usize = 12;

/// Percentage of `part` in `total`, rounded to one decimal place.
///
/// Returns `0.0` when `total` is zero.
pub fn employment_rate(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = part as f64 / total as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}

/// Produces one entry per year in `start..=end`, ascending.
///
/// `fill` receives the row for that year, or `None` when no row exists.
/// Rows outside the range are ignored.
pub fn densify_years<T, U, F>(start: i32, end: i32, rows: Vec<(i32, T)>, mut fill: F) -> Vec<U>
where
    F: FnMut(i32, Option<T>) -> U,
{
    let mut by_year: HashMap<i32, T> = rows.into_iter().collect();
    (start..=end)
        .map(|year| fill(year, by_year.remove(&year)))
        .collect()
}

/// Orders by count descending, then name ascending.
pub fn rank_by_count<T>(items: &mut [T], key: impl Fn(&T) -> (u64, &str)) {
    items.sort_by(|a, b| {
        let (count_a, name_a) = key(a);
        let (count_b, name_b) = key(b);
        match count_b.cmp(&count_a) {
            Ordering::Equal => name_a.cmp(name_b),
            other => other,
        }
    });
}

/// Ranks like [`rank_by_count`] and keeps the first [`TOP_N`].
pub fn top_n<T>(mut items: Vec<T>, key: impl Fn(&T) -> (u64, &str)) -> Vec<T> {
    rank_by_count(&mut items, key);
    items.truncate(TOP_N);
    items
}
