//! Coordinate extraction from free text
//!
//! For each category, a keyword followed within the same sentence fragment by
//! two numbers separated by a comma or whitespace yields one marker (latitude
//! first). Numbers are taken as written; range problems are reported as
//! diagnostics, never clamped or dropped.

use super::{Coordinate, CoordinateDiagnostic, MapMarker, MarkerCategory};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// One compiled pattern per category, in scan order
static PATTERNS: Lazy<Vec<(MarkerCategory, Regex)>> = Lazy::new(|| {
    MarkerCategory::ALL
        .iter()
        .filter_map(|&category| match Regex::new(&pattern_for(category)) {
            Ok(re) => Some((category, re)),
            Err(e) => {
                tracing::error!(category = category.as_str(), error = %e, "Bad marker pattern");
                None
            }
        })
        .collect()
});

/// Keyword at a word start, then anything short of a sentence terminator,
/// then `lat[,| ]lng`
fn pattern_for(category: MarkerCategory) -> String {
    let keywords = category
        .spec()
        .keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    format!(
        r"(?i)\b(?:{keywords})\w*[^.!?\n]*?(?P<lat>[-+]?\d+(?:\.\d+)?)(?:\s*,\s*|\s+)(?P<lng>[-+]?\d+(?:\.\d+)?)"
    )
}

/// Markers and diagnostics found in one message
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Extraction {
    /// In order of appearance in the text
    pub markers: Vec<MapMarker>,
    pub diagnostics: Vec<CoordinateDiagnostic>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Scan one assistant message
///
/// `message_index` is the message's position in the session history and
/// feeds the marker ids. Never fails: an occurrence that doesn't parse is
/// skipped.
pub fn extract(message_index: usize, text: &str, report_invalid: bool) -> Extraction {
    let mut found: Vec<(usize, MapMarker)> = Vec::new();

    for (category, re) in PATTERNS.iter() {
        let mut occurrence = 0;
        for caps in re.captures_iter(text) {
            let (Some(lat), Some(lng)) = (caps.name("lat"), caps.name("lng")) else {
                continue;
            };
            let (Ok(lat_value), Ok(lng_value)) =
                (lat.as_str().parse::<f64>(), lng.as_str().parse::<f64>())
            else {
                tracing::debug!(
                    category = category.as_str(),
                    lat = lat.as_str(),
                    lng = lng.as_str(),
                    "Unparsable coordinate skipped"
                );
                continue;
            };

            let start = caps.get(0).map_or(0, |m| m.start());
            let marker = MapMarker::new(
                message_index,
                *category,
                occurrence,
                Coordinate {
                    lat: lat_value,
                    lng: lng_value,
                },
            );
            found.push((start, marker));
            occurrence += 1;
        }
    }

    // Stable sort keeps category order for matches starting at the same keyword
    found.sort_by_key(|(start, _)| *start);
    let markers: Vec<MapMarker> = found.into_iter().map(|(_, marker)| marker).collect();

    let diagnostics = if report_invalid {
        markers
            .iter()
            .filter_map(CoordinateDiagnostic::check)
            .collect()
    } else {
        Vec::new()
    };

    Extraction {
        markers,
        diagnostics,
    }
}
