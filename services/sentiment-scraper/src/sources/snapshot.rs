//! Rendered-page snapshot -> candidate chart regions.
//!
//! Recharts-style charts render as SVG inside `div[role="graphics-document"]`
//! (or `graphics-object`) containers. Each container becomes one
//! [`ChartRegion`] holding its `rect` bars and `text` labels in document order.

use crate::types::*;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

const CONTAINER_SELECTOR: &str = r#"div[role="graphics-document"], div[role="graphics-object"]"#;
const PRIMITIVE_SELECTOR: &str = "rect, text";

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| SentimentError::ExtractionFailed {
        stage: "snapshot",
        reason: format!("invalid selector {css:?}: {e}"),
    })
}

/// Parse every chart container in the snapshot, in document order
pub fn extract_regions(html: &str) -> Result<Vec<ChartRegion>> {
    let doc = Html::parse_document(html);
    let containers = selector(CONTAINER_SELECTOR)?;
    let primitives = selector(PRIMITIVE_SELECTOR)?;

    let regions: Vec<ChartRegion> = doc
        .select(&containers)
        .map(|container| ChartRegion {
            text: container.text().collect::<String>(),
            primitives: container
                .select(&primitives)
                .filter_map(to_primitive)
                .collect(),
        })
        .collect();

    debug!(regions = regions.len(), "Extracted chart regions from snapshot");
    Ok(regions)
}

fn to_primitive(el: ElementRef<'_>) -> Option<VisualPrimitive> {
    let node = el.value();
    match node.name() {
        "rect" => {
            let height = node.attr("height").and_then(parse_leading_float)?;
            let fill = node.attr("fill").unwrap_or_default();
            Some(VisualPrimitive::bar(height, fill))
        }
        "text" => Some(VisualPrimitive::label(el.text().collect::<String>())),
        _ => None,
    }
}

/// Parse the leading numeric prefix of an attribute, e.g. `"42.5px"` -> 42.5
pub fn parse_leading_float(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if frac_end > frac_start || digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    // exponent only counts when followed by at least one digit
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}
