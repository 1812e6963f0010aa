//! Map state pushed by the agent backend
//!
//! The backend's map tool writes `{locations, center}` into shared state.
//! Once such a snapshot arrives it replaces the markers inferred from text
//! until the session resets.

use super::{Coordinate, CoordinateDiagnostic, MapMarker, MarkerCategory};
use serde::{Deserialize, Serialize};

/// One place as written by the backend's map tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub place_id: String,
    #[serde(default)]
    pub place_type: String,
    /// Number or string, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_open: Option<bool>,
}

impl Location {
    /// Marker for the location at `index` in its snapshot
    pub fn to_marker(&self, index: usize) -> MapMarker {
        let category = MarkerCategory::from_place_type(&self.place_type);
        let mut marker = MapMarker::new(
            0,
            category,
            index,
            Coordinate {
                lat: self.lat,
                lng: self.lng,
            },
        );
        marker.id = if self.place_id.trim().is_empty() {
            format!("x{index}-{}", category.as_str())
        } else {
            format!("x-{}", self.place_id.trim())
        };
        if !self.name.trim().is_empty() {
            marker.title = self.name.clone();
        }
        if !self.address.trim().is_empty() {
            marker.description = self.address.clone();
        }
        marker
    }
}

/// `{"kind":"map","locations":[...],"center":{"lat":..,"lng":..}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapSnapshot {
    #[serde(default)]
    pub locations: Vec<Location>,
    /// Absent means "keep the current center"
    #[serde(default)]
    pub center: Option<Coordinate>,
}

/// Resolved external map state held by the marker store
#[derive(Debug, Clone, PartialEq)]
pub(super) struct ExternalMap {
    pub markers: Vec<MapMarker>,
    pub center: Coordinate,
    pub diagnostics: Vec<CoordinateDiagnostic>,
}

impl ExternalMap {
    /// `fallback_center` applies when the snapshot carries none
    pub fn from_snapshot(
        snapshot: &MapSnapshot,
        fallback_center: Coordinate,
        report_invalid: bool,
    ) -> Self {
        let mut markers: Vec<MapMarker> = Vec::with_capacity(snapshot.locations.len());
        for (index, location) in snapshot.locations.iter().enumerate() {
            let marker = location.to_marker(index);
            // Duplicate place ids: last write wins, first position kept
            match markers.iter().position(|m| m.id == marker.id) {
                Some(pos) => markers[pos] = marker,
                None => markers.push(marker),
            }
        }
        let diagnostics = if report_invalid {
            markers
                .iter()
                .filter_map(CoordinateDiagnostic::check)
                .collect()
        } else {
            Vec::new()
        };
        Self {
            markers,
            center: snapshot.center.unwrap_or(fallback_center),
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: Coordinate = Coordinate {
        lat: 37.7749,
        lng: -122.4194,
    };

    #[test]
    fn test_parse_backend_locations() {
        let json = r#"{
            "locations": [
                {"name": "General Hospital", "address": "1 Main St", "lat": 29.7, "lng": -95.3,
                 "place_id": "abc", "place_type": "hospital", "rating": "4.5", "is_open": true},
                {"name": "Walgreens", "lat": 29.8, "lng": -95.4, "place_type": "pharmacy", "rating": 4}
            ],
            "center": {"lat": 29.75, "lng": -95.35}
        }"#;
        let snapshot: MapSnapshot = serde_json::from_str(json).unwrap();
        let map = ExternalMap::from_snapshot(&snapshot, DEFAULT, true);

        assert_eq!(map.markers.len(), 2);
        assert_eq!(map.markers[0].id, "x-abc");
        assert_eq!(map.markers[0].title, "General Hospital");
        assert_eq!(map.markers[0].description, "1 Main St");
        assert_eq!(map.markers[0].category, MarkerCategory::Hospital);
        assert_eq!(map.markers[1].id, "x1-supply");
        assert_eq!(map.markers[1].description, "Relief supply distribution point");
        assert_eq!(map.center, Coordinate { lat: 29.75, lng: -95.35 });
        assert!(map.diagnostics.is_empty());
    }

    #[test]
    fn test_missing_center_uses_fallback() {
        let snapshot = MapSnapshot::default();
        let map = ExternalMap::from_snapshot(&snapshot, DEFAULT, true);
        assert!(map.markers.is_empty());
        assert_eq!(map.center, DEFAULT);
    }

    #[test]
    fn test_duplicate_place_ids_collapse() {
        let location = |lat: f64| Location {
            name: String::new(),
            address: String::new(),
            lat,
            lng: 0.0,
            place_id: "same".to_string(),
            place_type: "shelter".to_string(),
            rating: None,
            is_open: None,
        };
        let snapshot = MapSnapshot {
            locations: vec![location(1.0), location(120.0)],
            center: None,
        };
        let map = ExternalMap::from_snapshot(&snapshot, DEFAULT, true);
        assert_eq!(map.markers.len(), 1);
        assert_eq!(map.markers[0].lat, 120.0);
        assert_eq!(map.diagnostics.len(), 1);
    }
}
