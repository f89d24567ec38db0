// Bias and regime statistics over a decoded return histogram
use crate::types::*;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// Neutral strategic bias reported when the histogram has no mass
pub const NEUTRAL_STRATEGIC_BIAS: f64 = 50.0;
/// Directional bias reported when the histogram has no mass
pub const NEUTRAL_DIRECTIONAL_BIAS: f64 = 0.0;

/// Sigma weight per return bucket, used for directional bias
pub static SIGMA_WEIGHTS: phf::Map<&'static str, f64> = phf::phf_map! {
    "-9%" => -3.0,
    "-6%" => -2.0,
    "-3%" => -1.0,
    "<0%" => -0.5,
    ">0%" => 0.5,
    "+3%" => 1.0,
    "+6%" => 2.0,
    "+9%" => 3.0,
};

/// Immutable weight table, built once at start-up and shared by reference
#[derive(Debug, Clone, PartialEq)]
pub struct SigmaWeights {
    weights: HashMap<String, f64>,
}

impl SigmaWeights {
    /// The fixed table the dashboard was calibrated against
    pub fn standard() -> Self {
        Self {
            weights: SIGMA_WEIGHTS
                .entries()
                .map(|(label, weight)| (label.to_string(), *weight))
                .collect(),
        }
    }

    /// Standard table with individual buckets replaced
    pub fn with_overrides(overrides: &HashMap<String, f64>) -> Self {
        let mut table = Self::standard();
        for (label, weight) in overrides {
            if !SIGMA_WEIGHTS.contains_key(label.as_str()) {
                warn!(label = %label, "Weight override for a bucket outside the standard set");
            }
            table.weights.insert(label.clone(), *weight);
        }
        table
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.weights.get(label).copied()
    }
}

impl Default for SigmaWeights {
    fn default() -> Self {
        Self::standard()
    }
}

/// Compute strategic bias, directional bias and quadrant.
///
/// Returns `None` for an empty histogram. A histogram with zero total mass
/// falls back to the neutral biases rather than failing. Buckets missing from
/// the weight table still count towards the totals but add no direction.
pub fn compute(chart_data: &ChartData, weights: &SigmaWeights) -> Option<Metrics> {
    if chart_data.is_empty() {
        return None;
    }

    let total: f64 = chart_data.values().map(|e| e.value).sum();
    let positive_total: f64 = chart_data
        .values()
        .filter(|e| e.is_positive)
        .map(|e| e.value)
        .sum();

    let weighted_sum: f64 = chart_data
        .iter()
        .filter_map(|(label, entry)| weights.get(label).map(|w| w * entry.value))
        .sum();

    let (strategic_bias, directional_bias) = if total > 0.0 {
        (positive_total / total * 100.0, weighted_sum / total)
    } else {
        (NEUTRAL_STRATEGIC_BIAS, NEUTRAL_DIRECTIONAL_BIAS)
    };

    Some(Metrics {
        strategic_bias,
        directional_bias,
        green_percentage: strategic_bias,
        quadrant: Quadrant::classify(strategic_bias, directional_bias),
    })
}

/// Dashboard reading of a set of metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSummary {
    /// "LONG" only when directional bias is strictly positive
    pub directional_text: &'static str,
    /// "MOMENTUM" or "MEAN-REVERSION"
    pub trading_condition: &'static str,
    pub quadrant: Quadrant,
    pub strategic_bias: f64,
    pub directional_bias: f64,
}

impl MarketSummary {
    pub fn from_metrics(metrics: &Metrics) -> Self {
        Self {
            directional_text: if metrics.directional_bias > 0.0 {
                "LONG"
            } else {
                "SHORT"
            },
            trading_condition: if metrics.strategic_bias < 50.0 {
                "MEAN-REVERSION"
            } else {
                "MOMENTUM"
            },
            quadrant: metrics.quadrant,
            strategic_bias: metrics.strategic_bias,
            directional_bias: metrics.directional_bias,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(entries: &[(&str, f64, bool)]) -> ChartData {
        entries
            .iter()
            .map(|(label, value, positive)| (label.to_string(), BucketEntry::new(*value, *positive)))
            .collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_tails_dominated_by_upside() {
        let data = chart(&[("-9%", 10.0, false), ("+9%", 30.0, true)]);
        let metrics = compute(&data, &SigmaWeights::standard()).unwrap();

        assert!(approx(metrics.strategic_bias, 75.0));
        assert!(approx(metrics.directional_bias, 1.5));
        assert_eq!(metrics.green_percentage, metrics.strategic_bias);
        assert_eq!(metrics.quadrant, Quadrant::MomentumLongOnly);
    }

    #[test]
    fn test_mild_downside_is_mean_reversion_short() {
        let data = chart(&[("-3%", 20.0, false), (">0%", 5.0, true)]);
        let metrics = compute(&data, &SigmaWeights::standard()).unwrap();

        assert!(approx(metrics.strategic_bias, 20.0));
        assert!(approx(metrics.directional_bias, -0.7));
        assert_eq!(metrics.quadrant, Quadrant::MeanReversionShortOnly);
    }

    #[test]
    fn test_zero_total_uses_neutral_fallback() {
        let data = chart(&[("-3%", 0.0, false), ("+3%", 0.0, true)]);
        let metrics = compute(&data, &SigmaWeights::standard()).unwrap();

        assert_eq!(metrics.strategic_bias, 50.0);
        assert_eq!(metrics.directional_bias, 0.0);
        assert_eq!(metrics.quadrant, Quadrant::MomentumLongOnly);
    }

    #[test]
    fn test_empty_chart_is_absent() {
        assert!(compute(&ChartData::new(), &SigmaWeights::standard()).is_none());
    }

    #[test]
    fn test_unknown_bucket_counts_mass_but_not_direction() {
        let data = chart(&[("+3%", 10.0, true), ("+12%", 10.0, true)]);
        let metrics = compute(&data, &SigmaWeights::standard()).unwrap();

        assert!(approx(metrics.strategic_bias, 100.0));
        assert!(approx(metrics.directional_bias, 0.5));
    }

    #[test]
    fn test_strategic_bias_stays_in_range() {
        let weights = SigmaWeights::standard();
        let cases = [
            chart(&[("-9%", 100.0, false)]),
            chart(&[("+9%", 100.0, true)]),
            chart(&[("-6%", 6.0, false), ("<0%", 44.0, false), ("+6%", 0.5, true)]),
        ];
        for data in &cases {
            let m = compute(data, &weights).unwrap();
            assert!((0.0..=100.0).contains(&m.strategic_bias));
        }
    }

    #[test]
    fn test_compute_is_repeatable() {
        let data = chart(&[("-6%", 14.0, false), ("<0%", 31.0, false), (">0%", 27.0, true)]);
        let weights = SigmaWeights::standard();
        assert_eq!(compute(&data, &weights), compute(&data, &weights));
    }

    #[test]
    fn test_weight_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert("+9%".to_string(), 4.0);
        let weights = SigmaWeights::with_overrides(&overrides);

        assert_eq!(weights.get("+9%"), Some(4.0));
        assert_eq!(weights.get("-9%"), Some(-3.0));
        assert_eq!(weights.get("<0%"), Some(-0.5));
    }

    #[test]
    fn test_summary_text() {
        let data = chart(&[("-3%", 20.0, false), (">0%", 5.0, true)]);
        let summary = MarketSummary::from_metrics(&compute(&data, &SigmaWeights::standard()).unwrap());
        assert_eq!(summary.directional_text, "SHORT");
        assert_eq!(summary.trading_condition, "MEAN-REVERSION");

        let neutral = Metrics {
            strategic_bias: 50.0,
            directional_bias: 0.0,
            green_percentage: 50.0,
            quadrant: Quadrant::MomentumLongOnly,
        };
        let summary = MarketSummary::from_metrics(&neutral);
        assert_eq!(summary.directional_text, "SHORT");
        assert_eq!(summary.trading_condition, "MOMENTUM");
    }
}
