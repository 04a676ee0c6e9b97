//! Closed-form ordinary least squares for trend estimation.

/// Least-squares slope of `(x, y)` pairs.
///
/// `slope = (n·Σxy − Σx·Σy) / (n·Σx² − (Σx)²)`. Returns 0.0 when the
/// denominator vanishes (fewer than two points, or all x equal).
pub fn slope_of_pairs<I>(points: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut n = 0.0;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;

    for (x, y) in points {
        n += 1.0;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let denominator = n * sum_xx - sum_x * sum_x;
    if n < 2.0 || denominator == 0.0 {
        return 0.0;
    }

    (n * sum_xy - sum_x * sum_y) / denominator
}

/// Least-squares slope of `ys` against their positions `0..len`.
pub fn positional_slope<I>(ys: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    slope_of_pairs(ys.into_iter().enumerate().map(|(x, y)| (x as f64, y)))
}
