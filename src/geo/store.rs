use super::extract::extract;
use super::snapshot::{ExternalMap, MapSnapshot};
use super::{Coordinate, CoordinateDiagnostic, MapMarker};
use crate::event::Message;
use std::collections::HashMap;

/// Deduplicated marker set derived from the whole message history
///
/// Markers accumulate across messages and are keyed by id, so the same place
/// mentioned in two messages shows up twice. Recomputing from an unchanged
/// history always yields the same set.
///
/// A pushed `MapSnapshot` takes over markers, center and diagnostics until
/// `reset`. Extraction keeps running underneath but is not shown.
#[derive(Debug, Clone)]
pub struct MarkerStore {
    /// Insertion order
    markers: Vec<MapMarker>,
    /// id -> position in `markers`
    index: HashMap<String, usize>,
    center: Option<Coordinate>,
    default_center: Coordinate,
    diagnostics: Vec<CoordinateDiagnostic>,
    report_invalid: bool,
    external: Option<ExternalMap>,
}

impl MarkerStore {
    pub fn new(default_center: Coordinate, report_invalid: bool) -> Self {
        Self {
            markers: Vec::new(),
            index: HashMap::new(),
            center: None,
            default_center,
            diagnostics: Vec::new(),
            report_invalid,
            external: None,
        }
    }

    pub fn is_external(&self) -> bool {
        self.external.is_some()
    }

    pub fn markers(&self) -> &[MapMarker] {
        match &self.external {
            Some(map) => &map.markers,
            None => &self.markers,
        }
    }

    pub fn diagnostics(&self) -> &[CoordinateDiagnostic] {
        match &self.external {
            Some(map) => &map.diagnostics,
            None => &self.diagnostics,
        }
    }

    /// Pushed center, else the last marker of the most recent message that
    /// produced any, else the default
    pub fn center(&self) -> Coordinate {
        match &self.external {
            Some(map) => map.center,
            None => self.center.unwrap_or(self.default_center),
        }
    }

    /// Replace the external map state; from now on it is authoritative
    ///
    /// A snapshot without a center keeps the previously pushed one.
    #[must_use = "check if state changed to trigger re-render"]
    pub fn apply_snapshot(&mut self, snapshot: &MapSnapshot) -> bool {
        let fallback = self
            .external
            .as_ref()
            .map_or(self.default_center, |map| map.center);
        let map = ExternalMap::from_snapshot(snapshot, fallback, self.report_invalid);
        if self.external.as_ref() == Some(&map) {
            return false;
        }

        let previous = self
            .external
            .as_ref()
            .map_or(&[][..], |m| m.diagnostics.as_slice());
        for d in map
            .diagnostics
            .iter()
            .filter(|d| !previous.iter().any(|p| p.marker_id == d.marker_id))
        {
            tracing::warn!(
                marker = %d.marker_id,
                lat = d.lat,
                lng = d.lng,
                reason = d.reason,
                "Invalid pushed coordinate accepted"
            );
        }

        if self.external.is_none() {
            tracing::info!("External map state received, switching source");
        }
        tracing::debug!(
            markers = map.markers.len(),
            center = ?map.center,
            "Map snapshot applied"
        );
        self.external = Some(map);
        true
    }

    /// Re-scan every assistant message and rebuild the set
    ///
    /// Returns `true` if the visible markers or center changed, i.e. only
    /// while no external map state is present.
    #[must_use = "check if state changed to trigger re-render"]
    pub fn recompute(&mut self, messages: &[Message]) -> bool {
        let mut rebuilt = MarkerStore::new(self.default_center, self.report_invalid);

        for (message_index, message) in messages.iter().enumerate() {
            let Some(text) = message.assistant_text() else {
                continue;
            };
            let extraction = extract(message_index, text, self.report_invalid);
            if let Some(last) = extraction.markers.last() {
                rebuilt.center = Some(last.coordinate());
            }
            for marker in extraction.markers {
                rebuilt.merge(marker);
            }
            rebuilt.diagnostics.extend(extraction.diagnostics);
        }

        for d in self.newly_reported(&rebuilt.diagnostics) {
            tracing::warn!(
                marker = %d.marker_id,
                lat = d.lat,
                lng = d.lng,
                reason = d.reason,
                "Invalid coordinate accepted"
            );
        }

        let changed = rebuilt.markers != self.markers || rebuilt.center != self.center;
        if changed {
            tracing::debug!(
                markers = rebuilt.markers.len(),
                added = rebuilt.markers.len().saturating_sub(self.markers.len()),
                center = ?rebuilt.center,
                "Marker set recomputed"
            );
        }
        rebuilt.external = self.external.take();
        *self = rebuilt;
        changed && self.external.is_none()
    }

    /// Diagnostics in `current` not already reported by this store
    fn newly_reported<'a>(
        &self,
        current: &'a [CoordinateDiagnostic],
    ) -> Vec<&'a CoordinateDiagnostic> {
        current
            .iter()
            .filter(|d| !self.diagnostics.iter().any(|p| p.marker_id == d.marker_id))
            .collect()
    }

    /// Insert or replace by id, keeping the original position
    fn merge(&mut self, marker: MapMarker) {
        match self.index.get(&marker.id) {
            Some(&pos) => self.markers[pos] = marker,
            None => {
                self.index.insert(marker.id.clone(), self.markers.len());
                self.markers.push(marker);
            }
        }
    }

    pub fn reset(&mut self) {
        self.markers.clear();
        self.index.clear();
        self.center = None;
        self.diagnostics.clear();
        self.external = None;
    }
}
