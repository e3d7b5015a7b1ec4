//! Summary statistics over one attribute column.

use overtime_types::column::Column;

/// Reduces one column of values to named summary statistics.
pub trait StatisticsEngine: Send {
    /// Summaries of `column` as `(statistic, value)` pairs.
    ///
    /// Columns the engine cannot summarize yield an empty list. An empty
    /// numeric column yields every statistic as `NaN`.
    fn summarize(&self, column: &Column) -> Vec<(&'static str, f64)>;
}

/// Descriptive (mean, extrema, deviation) and order (quartile) statistics.
///
/// Quartiles use the averaged inverse-CDF definition: when `n * p` is
/// integral the two neighbouring order statistics are averaged.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptiveStatistics;

impl DescriptiveStatistics {
    pub const STATISTICS: [&'static str; 7] = ["avg", "min", "max", "std", "q1", "med", "q3"];

    fn quantile(sorted: &[f64], p: f64) -> f64 {
        let n = sorted.len();
        let np = n as f64 * p;
        let rank = np.floor() as usize;
        if np.fract() == 0.0 && rank > 0 && rank < n {
            (sorted[rank - 1] + sorted[rank]) / 2.0
        } else {
            sorted[(np.ceil() as usize).clamp(1, n) - 1]
        }
    }
}

impl StatisticsEngine for DescriptiveStatistics {
    fn summarize(&self, column: &Column) -> Vec<(&'static str, f64)> {
        let Some(mut values) = column.to_f64_vec() else {
            return Vec::new();
        };
        values.retain(|v| !v.is_nan());

        if values.is_empty() {
            return Self::STATISTICS.iter().map(|s| (*s, f64::NAN)).collect();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = if values.len() > 1 {
            let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (sum_sq / (n - 1.0)).sqrt()
        } else {
            0.0
        };

        values.sort_by(f64::total_cmp);
        let min = values[0];
        let max = values[values.len() - 1];

        vec![
            ("avg", mean),
            ("min", min),
            ("max", max),
            ("std", std),
            ("q1", Self::quantile(&values, 0.25)),
            ("med", Self::quantile(&values, 0.5)),
            ("q3", Self::quantile(&values, 0.75)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(stats: &[(&'static str, f64)], name: &str) -> f64 {
        stats.iter().find(|(s, _)| *s == name).unwrap().1
    }

    #[test]
    fn test_descriptive_statistics() {
        let column = Column::float("x", vec![4.0, 1.0, 3.0, 2.0]);
        let stats = DescriptiveStatistics.summarize(&column);

        assert_eq!(lookup(&stats, "avg"), 2.5);
        assert_eq!(lookup(&stats, "min"), 1.0);
        assert_eq!(lookup(&stats, "max"), 4.0);
        assert!((lookup(&stats, "std") - 1.290_994_448_735_805_6).abs() < 1e-12);
        assert_eq!(lookup(&stats, "q1"), 1.5);
        assert_eq!(lookup(&stats, "med"), 2.5);
        assert_eq!(lookup(&stats, "q3"), 3.5);
    }

    #[test]
    fn test_odd_count_quartiles() {
        let column = Column::int("x", vec![5, 1, 3, 2, 4]);
        let stats = DescriptiveStatistics.summarize(&column);
        assert_eq!(lookup(&stats, "q1"), 2.0);
        assert_eq!(lookup(&stats, "med"), 3.0);
        assert_eq!(lookup(&stats, "q3"), 4.0);
    }

    #[test]
    fn test_single_value() {
        let stats = DescriptiveStatistics.summarize(&Column::float("x", vec![7.0]));
        assert_eq!(lookup(&stats, "std"), 0.0);
        assert_eq!(lookup(&stats, "med"), 7.0);
        assert_eq!(lookup(&stats, "q1"), 7.0);
    }

    #[test]
    fn test_empty_column_is_nan() {
        let stats = DescriptiveStatistics.summarize(&Column::float("x", Vec::new()));
        assert_eq!(stats.len(), DescriptiveStatistics::STATISTICS.len());
        assert!(stats.iter().all(|(_, v)| v.is_nan()));
    }

    #[test]
    fn test_text_column_is_skipped() {
        let column = Column::text("name", vec!["a".to_string()]);
        assert!(DescriptiveStatistics.summarize(&column).is_empty());
    }
}
