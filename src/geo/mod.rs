//! Map markers extracted from assistant text
//!
//! Each marker category is a closed variant carrying its keywords and display
//! metadata, so adding a category touches exactly one table.

pub mod extract;
pub mod snapshot;
pub mod store;

pub use extract::extract;
pub use snapshot::MapSnapshot;
pub use store::MarkerStore;

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn lat_in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat)
    }

    pub fn lng_in_range(&self) -> bool {
        (-180.0..=180.0).contains(&self.lng)
    }
}

/// Kind of point of interest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerCategory {
    Disaster,
    Shelter,
    Hospital,
    Supply,
    /// Pushed location whose place type matches no other category
    Place,
}

/// Keywords and display metadata for one category
#[derive(Debug)]
pub struct CategorySpec {
    pub name: &'static str,
    /// Matched case-insensitively at a word start
    pub keywords: &'static [&'static str],
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    /// Marker color (hex)
    pub color: &'static str,
}

const DISASTER: CategorySpec = CategorySpec {
    name: "disaster",
    keywords: &["disaster", "alert", "warning"],
    title: "Disaster Alert",
    description: "Reported disaster or hazard location",
    icon: "🌪️",
    color: "#ef4444",
};

const SHELTER: CategorySpec = CategorySpec {
    name: "shelter",
    keywords: &["shelter"],
    title: "Emergency Shelter",
    description: "Emergency shelter location",
    icon: "🏠",
    color: "#3b82f6",
};

const HOSPITAL: CategorySpec = CategorySpec {
    name: "hospital",
    keywords: &["hospital"],
    title: "Hospital",
    description: "Medical facility location",
    icon: "🏥",
    color: "#22c55e",
};

const SUPPLY: CategorySpec = CategorySpec {
    name: "supply",
    keywords: &["supply", "supplies", "distribution"],
    title: "Supply Distribution",
    description: "Relief supply distribution point",
    icon: "📦",
    color: "#eab308",
};

const PLACE: CategorySpec = CategorySpec {
    name: "place",
    keywords: &[],
    title: "Location",
    description: "Reported location",
    icon: "📍",
    color: "#6b7280",
};

impl MarkerCategory {
    /// Categories scanned for in text, in scan order
    pub const ALL: [MarkerCategory; 4] = [
        MarkerCategory::Disaster,
        MarkerCategory::Shelter,
        MarkerCategory::Hospital,
        MarkerCategory::Supply,
    ];

    pub fn spec(self) -> &'static CategorySpec {
        match self {
            MarkerCategory::Disaster => &DISASTER,
            MarkerCategory::Shelter => &SHELTER,
            MarkerCategory::Hospital => &HOSPITAL,
            MarkerCategory::Supply => &SUPPLY,
            MarkerCategory::Place => &PLACE,
        }
    }

    /// Category for a pushed location's place type
    ///
    /// Matches the text categories' keywords, plus `pharmacy` as a supply
    /// point. Anything else is a generic place.
    pub fn from_place_type(place_type: &str) -> Self {
        let place_type = place_type.to_lowercase();
        if place_type.contains("pharmacy") {
            return MarkerCategory::Supply;
        }
        Self::ALL
            .into_iter()
            .find(|c| c.spec().keywords.iter().any(|k| place_type.contains(*k)))
            .unwrap_or(MarkerCategory::Place)
    }

    pub fn as_str(self) -> &'static str {
        self.spec().name
    }
}

/// A geolocated point of interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMarker {
    /// Stable across recomputation: `m{message}-{category}-{occurrence}`
    pub id: String,
    pub category: MarkerCategory,
    pub lat: f64,
    pub lng: f64,
    pub title: String,
    pub description: String,
    pub icon: String,
    /// Hex color for the category
    pub color: String,
}

impl MapMarker {
    pub fn new(
        message_index: usize,
        category: MarkerCategory,
        occurrence: usize,
        at: Coordinate,
    ) -> Self {
        let spec = category.spec();
        Self {
            id: marker_id(message_index, category, occurrence),
            category,
            lat: at.lat,
            lng: at.lng,
            title: spec.title.to_string(),
            description: spec.description.to_string(),
            icon: spec.icon.to_string(),
            color: spec.color.to_string(),
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

pub fn marker_id(message_index: usize, category: MarkerCategory, occurrence: usize) -> String {
    format!("m{message_index}-{}-{occurrence}", category.as_str())
}

/// Coordinate accepted as-is but outside the valid range
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateDiagnostic {
    pub marker_id: String,
    pub lat: f64,
    pub lng: f64,
    pub reason: &'static str,
}

impl CoordinateDiagnostic {
    /// Diagnostic for a marker, if its coordinate is out of range
    pub fn check(marker: &MapMarker) -> Option<Self> {
        let at = marker.coordinate();
        let reason = match (at.lat_in_range(), at.lng_in_range()) {
            (true, true) => return None,
            (false, true) => "latitude outside [-90, 90]",
            (true, false) => "longitude outside [-180, 180]",
            (false, false) => "latitude and longitude out of range",
        };
        Some(Self {
            marker_id: marker.id.clone(),
            lat: at.lat,
            lng: at.lng,
            reason,
        })
    }
}
