//! Text and geometry heuristics used to locate and read the return bucket chart.
//!
//! All predicates are pure so they can be exercised without a rendered page.

/// Substrings that identify the 1d return bucket chart container
pub const CHART_MARKERS: [&str; 3] = ["1d Return Buckets", "-9%", "+9%"];

/// Bars at or below this height are treated as rendering noise (axis ticks, gridlines)
pub const BAR_NOISE_THRESHOLD: f64 = 5.0;

const SIGN_TOKENS: [char; 4] = ['-', '+', '<', '>'];

/// Does this container text belong to the return bucket chart?
pub fn is_chart_container(text: &str) -> bool {
    CHART_MARKERS.iter().any(|marker| text.contains(marker))
}

/// A category label carries a percent sign and a sign/boundary token
pub fn is_category_label(text: &str) -> bool {
    text.contains('%') && text.contains(&SIGN_TOKENS[..])
}

/// A bar counts when it has a finite height above the noise floor and a fill
pub fn is_signal_bar(height: f64, fill: &str) -> bool {
    height.is_finite() && height > BAR_NOISE_THRESHOLD && !fill.is_empty()
}

/// Green fill or an upper-side label marks the bucket positive
pub fn infers_positive(label: &str, fill: &str) -> bool {
    fill.to_lowercase().contains("green") || label.contains('+') || label.contains('>')
}
