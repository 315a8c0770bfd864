use tracing::debug;

use crate::geofence_editor::GeofenceEditor;
use crate::types::{Coordinate, Device, Geofence};

/// Fill opacity for enabled fences.
pub const ENABLED_FENCE_OPACITY: f64 = 1.0;
/// Disabled fences stay visible, just dimmed, so users keep spatial
/// awareness of inactive boundaries.
pub const DISABLED_FENCE_OPACITY: f64 = 0.4;

/// One rendered geofence circle.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleOverlay {
    pub geofence_id: String,
    pub center: Coordinate,
    pub radius_m: f64,
    pub opacity: f64,
}

/// One rendered device marker. `popup_open` is true for at most one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerOverlay {
    pub device_id: String,
    pub position: Coordinate,
    pub label: String,
    pub popup_open: bool,
}

/// The full overlay set for one render pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlaySet {
    pub circles: Vec<CircleOverlay>,
    pub markers: Vec<MarkerOverlay>,
}

/// Map view-model: holds the viewport and marker selection, and re-derives
/// the complete overlay set from the synchronized lists on every change.
/// No incremental diffing; full replacement is the contract.
pub struct MapView {
    center: Coordinate,
    zoom: u8,
    selected_device: Option<String>,
}

impl MapView {
    /// Starts over New York City, matching the product default.
    pub fn new() -> Self {
        Self {
            center: Coordinate { lat: 40.7128, lng: -74.0060 },
            zoom: 11,
            selected_device: None,
        }
    }

    pub fn center(&self) -> Coordinate {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn selected_device(&self) -> Option<&str> {
        self.selected_device.as_deref()
    }

    /// Re-centers the viewport, e.g. after a successful address lookup.
    pub fn recenter(&mut self, at: Coordinate) {
        self.center = at;
    }

    /// Opens the detail popup for one marker, replacing any previous
    /// selection.
    pub fn select_device(&mut self, device_id: &str) {
        self.selected_device = Some(device_id.to_string());
    }

    pub fn close_popup(&mut self) {
        self.selected_device = None;
    }

    /// A click on empty map area. Always clears the marker selection; while
    /// a draft is open the click additionally becomes the draft center.
    /// Both effects happen on the same click.
    pub fn handle_map_click(&mut self, at: Coordinate, editor: &mut GeofenceEditor) {
        self.selected_device = None;
        if editor.is_drafting() {
            // Cannot fail: the state was just checked.
            let _ = editor.set_center_from_map(at);
        }
    }

    /// Derives the overlay set: one circle per synchronized geofence, one
    /// marker per device with a known location. A selection pointing at a
    /// device that disappeared or lost its location is dropped here.
    pub fn reconcile(&mut self, fences: &[Geofence], devices: &[Device]) -> OverlaySet {
        let circles = fences
            .iter()
            .map(|fence| CircleOverlay {
                geofence_id: fence.geofence_id.clone(),
                center: fence.center,
                radius_m: fence.radius_m,
                opacity: if fence.is_enabled {
                    ENABLED_FENCE_OPACITY
                } else {
                    DISABLED_FENCE_OPACITY
                },
            })
            .collect();

        if let Some(selected) = &self.selected_device {
            let still_rendered = devices
                .iter()
                .any(|device| &device.device_id == selected && device.latest_location.is_some());
            if !still_rendered {
                debug!(device_id = %selected, "selected device no longer rendered, closing popup");
                self.selected_device = None;
            }
        }

        let markers = devices
            .iter()
            .filter_map(|device| {
                device.latest_location.map(|position| MarkerOverlay {
                    device_id: device.device_id.clone(),
                    position,
                    label: device.name.clone(),
                    popup_open: self.selected_device.as_deref() == Some(&device.device_id),
                })
            })
            .collect();

        OverlaySet { circles, markers }
    }
}

impl Default for MapView {
    fn default() -> Self {
        Self::new()
    }
}
