// Chart decoding: rendered bars and labels back into bucket values
pub mod matchers;

use crate::types::*;
use tracing::debug;

/// Why a snapshot produced no chart data
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("no chart region matched the return bucket markers")]
    ContainerNotFound,

    #[error("bar/label count mismatch: {bars} bars vs {labels} labels")]
    PairingMismatch { bars: usize, labels: usize },

    #[error("chart region contained no buckets")]
    EmptyChart,
}

/// First region whose text identifies it as the return bucket chart
pub fn select_container(regions: &[ChartRegion]) -> Option<&ChartRegion> {
    regions
        .iter()
        .find(|region| matchers::is_chart_container(&region.text))
}

/// Decode the first matching region, reporting why nothing came out
pub fn try_decode(regions: &[ChartRegion]) -> std::result::Result<ChartData, DecodeError> {
    let region = select_container(regions).ok_or(DecodeError::ContainerNotFound)?;
    try_decode_region(region)
}

/// Decode a single, already selected chart region.
///
/// Bars and category labels are paired by position, so the renderer must emit
/// both in the same left-to-right order. A label seen twice keeps the last bar.
pub fn try_decode_region(region: &ChartRegion) -> std::result::Result<ChartData, DecodeError> {
    let mut labels: Vec<&str> = Vec::new();
    let mut bars: Vec<(f64, &str)> = Vec::new();

    for primitive in &region.primitives {
        match primitive {
            VisualPrimitive::Label { text } if matchers::is_category_label(text) => {
                labels.push(text.trim());
            }
            VisualPrimitive::Bar { height, fill } if matchers::is_signal_bar(*height, fill) => {
                bars.push((*height, fill.as_str()));
            }
            _ => {}
        }
    }

    if bars.len() != labels.len() {
        return Err(DecodeError::PairingMismatch {
            bars: bars.len(),
            labels: labels.len(),
        });
    }

    if bars.is_empty() {
        return Err(DecodeError::EmptyChart);
    }

    let data: ChartData = labels
        .into_iter()
        .zip(bars)
        .map(|(label, (height, fill))| {
            let is_positive = matchers::infers_positive(label, fill);
            (label.to_string(), BucketEntry::new(height, is_positive))
        })
        .collect();

    Ok(data)
}

/// Decode the return bucket chart, or nothing if the snapshot can't be read
pub fn decode(regions: &[ChartRegion]) -> Option<ChartData> {
    match try_decode(regions) {
        Ok(data) => Some(data),
        Err(e) => {
            debug!(reason = %e, "Chart decode produced no data");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_chart() -> ChartRegion {
        let heights = [12.0, 20.0, 35.0, 60.0, 80.0, 40.0, 18.0, 9.0];
        let mut primitives = Vec::new();
        for (i, h) in heights.iter().enumerate() {
            let fill = if i < 4 { "#ef4444" } else { "green" };
            primitives.push(VisualPrimitive::bar(*h, fill));
        }
        for label in BUCKET_LABELS {
            primitives.push(VisualPrimitive::label(format!(" {label} ")));
        }
        ChartRegion::from_primitives(primitives)
    }

    #[test]
    fn test_decode_full_histogram() {
        let data = decode(&[full_chart()]).unwrap();

        assert_eq!(data.len(), 8);
        assert_eq!(data["-9%"], BucketEntry::new(12.0, false));
        assert_eq!(data["<0%"], BucketEntry::new(60.0, false));
        assert_eq!(data[">0%"], BucketEntry::new(80.0, true));
        assert_eq!(data["+9%"].value, 9.0);
        assert!(data["+9%"].is_positive);
    }

    #[test]
    fn test_first_matching_region_wins() {
        let unrelated = ChartRegion {
            text: "Open interest".to_string(),
            primitives: vec![VisualPrimitive::bar(50.0, "blue")],
        };
        let other_chart = ChartRegion::from_primitives(vec![
            VisualPrimitive::label("+9%"),
            VisualPrimitive::bar(7.0, "green"),
        ]);

        let regions = [unrelated, other_chart, full_chart()];
        let selected = select_container(&regions).unwrap();
        assert_eq!(selected.primitives.len(), 2);

        let data = decode(&regions).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data["+9%"].value, 7.0);
    }

    #[test]
    fn test_no_matching_container() {
        let region = ChartRegion {
            text: "Funding".to_string(),
            primitives: vec![VisualPrimitive::bar(10.0, "red")],
        };
        assert_eq!(try_decode(&[region]), Err(DecodeError::ContainerNotFound));
        assert_eq!(decode(&[]), None);
    }

    #[test]
    fn test_count_mismatch_is_absent() {
        let mut region = full_chart();
        region.primitives.push(VisualPrimitive::bar(22.0, "red"));

        assert_eq!(
            try_decode_region(&region),
            Err(DecodeError::PairingMismatch { bars: 9, labels: 8 })
        );
        assert!(decode(&[region]).is_none());
    }

    #[test]
    fn test_noise_bars_and_plain_text_are_ignored() {
        let region = ChartRegion::from_primitives(vec![
            VisualPrimitive::label("1d Return Buckets"),
            VisualPrimitive::label("0%"),
            VisualPrimitive::bar(3.0, "red"),
            VisualPrimitive::bar(25.0, ""),
            VisualPrimitive::bar(30.0, "red"),
            VisualPrimitive::label("-6%"),
        ]);

        let data = decode(&[region]).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data["-6%"], BucketEntry::new(30.0, false));
    }

    #[test]
    fn test_label_sign_overrides_fill() {
        let region = ChartRegion::from_primitives(vec![
            VisualPrimitive::bar(15.0, "red"),
            VisualPrimitive::label("+3%"),
        ]);

        let entry = try_decode_region(&region).unwrap()["+3%"];
        assert!(entry.is_positive);
        assert_eq!(entry.color, BucketColor::Green);
    }

    #[test]
    fn test_duplicate_label_keeps_last_pairing() {
        let region = ChartRegion::from_primitives(vec![
            VisualPrimitive::bar(10.0, "red"),
            VisualPrimitive::bar(20.0, "red"),
            VisualPrimitive::label("-3%"),
            VisualPrimitive::label("-3%"),
        ]);

        let data = try_decode_region(&region).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data["-3%"].value, 20.0);
    }

    #[test]
    fn test_infinite_bar_is_dropped_before_pairing() {
        let region = ChartRegion::from_primitives(vec![
            VisualPrimitive::bar(f64::INFINITY, "green"),
            VisualPrimitive::bar(10.0, "red"),
            VisualPrimitive::label("+9%"),
            VisualPrimitive::label("-9%"),
        ]);

        assert_eq!(
            try_decode_region(&region),
            Err(DecodeError::PairingMismatch { bars: 1, labels: 2 })
        );
    }

    #[test]
    fn test_marker_without_buckets_is_absent() {
        let region = ChartRegion::from_primitives(vec![VisualPrimitive::label(
            "1d Return Buckets",
        )]);
        assert_eq!(try_decode(&[region]), Err(DecodeError::EmptyChart));
    }
}
