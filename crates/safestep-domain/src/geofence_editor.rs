use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{DomainError, DomainResult};
use crate::geocoder::{GeocodeError, Geocoder};
use crate::store::GeofenceStore;
use crate::types::{Coordinate, CreateGeofenceInput, Geofence};

/// Where the editor is in the create-geofence workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Idle,
    Drafting,
    Saving,
}

/// The in-progress, not-yet-persisted geofence. The radius is kept as the
/// raw text the user typed and parsed only at validation time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeofenceDraft {
    pub center: Option<Coordinate>,
    pub name: String,
    pub radius_input: String,
}

/// State machine for defining a new geofence: pick a center via map click
/// or address lookup, set name and radius, validate, persist.
///
/// One draft exists at a time. The center is last-writer-wins between the
/// two input paths. Address lookups hold a single in-flight slot; a second
/// lookup while one is outstanding is rejected rather than queued.
pub struct GeofenceEditor {
    store: Arc<dyn GeofenceStore>,
    geocoder: Arc<dyn Geocoder>,
    owner_id: String,
    state: EditorState,
    draft: GeofenceDraft,
    lookup_in_flight: bool,
}

impl GeofenceEditor {
    pub fn new(store: Arc<dyn GeofenceStore>, geocoder: Arc<dyn Geocoder>, owner_id: impl Into<String>) -> Self {
        Self {
            store,
            geocoder,
            owner_id: owner_id.into(),
            state: EditorState::Idle,
            draft: GeofenceDraft::default(),
            lookup_in_flight: false,
        }
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn draft(&self) -> &GeofenceDraft {
        &self.draft
    }

    pub fn is_drafting(&self) -> bool {
        self.state == EditorState::Drafting
    }

    /// Opens an empty draft. Only valid from `Idle`.
    pub fn start(&mut self) -> DomainResult<()> {
        if self.state != EditorState::Idle {
            return Err(DomainError::EditorState(format!(
                "cannot start a draft while {:?}",
                self.state
            )));
        }
        self.state = EditorState::Drafting;
        self.draft = GeofenceDraft::default();
        debug!("geofence draft opened");
        Ok(())
    }

    /// Abandons the draft from any non-`Idle` state. Every field is
    /// discarded; nothing leaks into a later drafting session.
    pub fn cancel(&mut self) {
        if self.state != EditorState::Idle {
            debug!(state = ?self.state, "geofence draft cancelled");
        }
        self.state = EditorState::Idle;
        self.draft = GeofenceDraft::default();
        self.lookup_in_flight = false;
    }

    pub fn set_name(&mut self, name: &str) -> DomainResult<()> {
        self.require_drafting("set name")?;
        self.draft.name = name.to_string();
        Ok(())
    }

    pub fn set_radius_input(&mut self, radius: &str) -> DomainResult<()> {
        self.require_drafting("set radius")?;
        self.draft.radius_input = radius.to_string();
        Ok(())
    }

    /// Map-click path for the draft center. Overrides whatever an earlier
    /// address lookup produced.
    pub fn set_center_from_map(&mut self, at: Coordinate) -> DomainResult<()> {
        self.require_drafting("set center")?;
        self.draft.center = Some(at);
        debug!(center = %at, "draft center set from map click");
        Ok(())
    }

    /// Claims the single in-flight lookup slot and returns the trimmed
    /// address to geocode. The completion is fed back through
    /// [`complete_address_lookup`](Self::complete_address_lookup).
    pub fn begin_address_lookup(&mut self, address: &str) -> DomainResult<String> {
        self.require_drafting("look up an address")?;
        if self.lookup_in_flight {
            return Err(DomainError::GeocodeInFlight);
        }
        let address = address.trim().to_string();
        self.lookup_in_flight = true;
        Ok(address)
    }

    /// Applies a lookup outcome. Success makes the resolved coordinate the
    /// draft center (last-writer-wins with map clicks) and returns it so
    /// the view can re-center. Failure clears only the center; name and
    /// radius survive for retry.
    ///
    /// Outcomes arriving after the draft was cancelled are discarded.
    pub fn complete_address_lookup(
        &mut self,
        outcome: Result<Coordinate, GeocodeError>,
    ) -> DomainResult<Coordinate> {
        if !self.lookup_in_flight {
            return Err(DomainError::EditorState(
                "no address lookup in flight".to_string(),
            ));
        }
        self.lookup_in_flight = false;
        match outcome {
            Ok(center) => {
                self.draft.center = Some(center);
                debug!(center = %center, "draft center set from address lookup");
                Ok(center)
            }
            Err(err) => {
                warn!(reason = %err, "address lookup failed, clearing draft center");
                self.draft.center = None;
                Err(DomainError::Geocode(err))
            }
        }
    }

    /// Convenience wrapper running the full lookup round trip through the
    /// injected geocoder.
    pub async fn lookup_address(&mut self, address: &str) -> DomainResult<Coordinate> {
        let address = self.begin_address_lookup(address)?;
        let outcome = self.geocoder.geocode(&address).await;
        self.complete_address_lookup(outcome)
    }

    /// Checks the draft without persisting. The first failing condition is
    /// reported: center set, then non-empty trimmed name, then a radius
    /// that parses to a number strictly greater than zero.
    pub fn validate(&self) -> DomainResult<CreateGeofenceInput> {
        let center = self.draft.center.ok_or(DomainError::MissingCenter)?;
        let name = self.draft.name.trim();
        if name.is_empty() {
            return Err(DomainError::InvalidGeofenceName);
        }
        let radius_input = self.draft.radius_input.trim();
        let radius_m: f64 = radius_input
            .parse()
            .map_err(|_| DomainError::InvalidRadius(radius_input.to_string()))?;
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return Err(DomainError::InvalidRadius(radius_input.to_string()));
        }
        Ok(CreateGeofenceInput {
            owner_id: self.owner_id.clone(),
            name: name.to_string(),
            center,
            radius_m,
        })
    }

    /// Validates and persists the draft. On success the editor returns to
    /// `Idle` with the draft cleared; on failure it stays in `Drafting`
    /// with every field intact so the user can retry.
    pub async fn save(&mut self) -> DomainResult<Geofence> {
        self.require_drafting("save")?;
        let input = self.validate()?;
        self.state = EditorState::Saving;
        match self.store.create_geofence(input).await {
            Ok(fence) => {
                info!(geofence_id = %fence.geofence_id, name = %fence.name, "geofence saved");
                self.state = EditorState::Idle;
                self.draft = GeofenceDraft::default();
                Ok(fence)
            }
            Err(err) => {
                warn!(reason = %err, "geofence save failed, keeping draft");
                self.state = EditorState::Drafting;
                Err(err)
            }
        }
    }

    fn require_drafting(&self, action: &str) -> DomainResult<()> {
        if self.state != EditorState::Drafting {
            return Err(DomainError::EditorState(format!(
                "cannot {action} while {:?}",
                self.state
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocoder::MockGeocoder;
    use crate::store::MockGeofenceStore;
    use anyhow::anyhow;

    fn editor_with(store: MockGeofenceStore, geocoder: MockGeocoder) -> GeofenceEditor {
        GeofenceEditor::new(Arc::new(store), Arc::new(geocoder), "owner-1")
    }

    fn drafting_editor() -> GeofenceEditor {
        let mut editor = editor_with(MockGeofenceStore::new(), MockGeocoder::new());
        editor.start().unwrap();
        editor
    }

    #[test]
    fn save_is_blocked_without_center() {
        let mut editor = drafting_editor();
        editor.set_name("Yard").unwrap();
        editor.set_radius_input("50").unwrap();
        assert!(matches!(editor.validate(), Err(DomainError::MissingCenter)));
    }

    #[test]
    fn save_is_blocked_with_blank_name() {
        let mut editor = drafting_editor();
        editor.set_center_from_map(Coordinate::new(1.0, 1.0).unwrap()).unwrap();
        editor.set_name("   ").unwrap();
        editor.set_radius_input("50").unwrap();
        assert!(matches!(editor.validate(), Err(DomainError::InvalidGeofenceName)));
    }

    #[test]
    fn save_is_blocked_with_zero_radius() {
        let mut editor = drafting_editor();
        editor.set_center_from_map(Coordinate::new(1.0, 1.0).unwrap()).unwrap();
        editor.set_name("Yard").unwrap();
        editor.set_radius_input("0").unwrap();
        assert!(matches!(editor.validate(), Err(DomainError::InvalidRadius(_))));
    }

    #[test]
    fn valid_draft_passes_validation() {
        let mut editor = drafting_editor();
        editor.set_center_from_map(Coordinate::new(1.0, 1.0).unwrap()).unwrap();
        editor.set_name("Yard").unwrap();
        editor.set_radius_input("50").unwrap();

        let input = editor.validate().unwrap();
        assert_eq!(input.name, "Yard");
        assert_eq!(input.radius_m, 50.0);
        assert_eq!(input.owner_id, "owner-1");
    }

    #[tokio::test]
    async fn geocode_result_overrides_map_click() {
        let mut geocoder = MockGeocoder::new();
        geocoder
            .expect_geocode()
            .withf(|address| address == "12 Elm St")
            .times(1)
            .return_once(|_| Ok(Coordinate::new(20.0, 20.0).unwrap()));
        let mut editor = editor_with(MockGeofenceStore::new(), geocoder);
        editor.start().unwrap();

        editor.set_center_from_map(Coordinate::new(10.0, 10.0).unwrap()).unwrap();
        let resolved = editor.lookup_address("  12 Elm St ").await.unwrap();

        assert_eq!(resolved, Coordinate::new(20.0, 20.0).unwrap());
        assert_eq!(editor.draft().center, Some(resolved));
    }

    #[tokio::test]
    async fn geocode_failure_clears_center_and_keeps_fields() {
        let mut geocoder = MockGeocoder::new();
        geocoder
            .expect_geocode()
            .times(1)
            .return_once(|_| Err(GeocodeError::NotFound));
        let mut editor = editor_with(MockGeofenceStore::new(), geocoder);
        editor.start().unwrap();
        editor.set_center_from_map(Coordinate::new(10.0, 10.0).unwrap()).unwrap();
        editor.set_name("Yard").unwrap();
        editor.set_radius_input("50").unwrap();

        let err = editor.lookup_address("???invalid").await.unwrap_err();
        assert!(matches!(err, DomainError::Geocode(GeocodeError::NotFound)));
        assert_eq!(err.to_string(), "Address not found");
        assert_eq!(editor.draft().center, None);
        assert_eq!(editor.draft().name, "Yard");
        assert_eq!(editor.draft().radius_input, "50");
    }

    #[test]
    fn second_lookup_while_in_flight_is_rejected() {
        let mut editor = drafting_editor();
        editor.begin_address_lookup("12 Elm St").unwrap();
        assert!(matches!(
            editor.begin_address_lookup("34 Oak Ave"),
            Err(DomainError::GeocodeInFlight)
        ));
    }

    #[test]
    fn lookup_completing_after_cancel_is_discarded() {
        let mut editor = drafting_editor();
        editor.begin_address_lookup("12 Elm St").unwrap();
        editor.cancel();

        let outcome = editor.complete_address_lookup(Ok(Coordinate::new(20.0, 20.0).unwrap()));
        assert!(matches!(outcome, Err(DomainError::EditorState(_))));
        assert_eq!(editor.state(), EditorState::Idle);
        assert_eq!(editor.draft().center, None);
    }

    #[test]
    fn cancel_discards_every_draft_field() {
        let mut editor = drafting_editor();
        editor.set_center_from_map(Coordinate::new(3.0, 4.0).unwrap()).unwrap();
        editor.set_name("Yard").unwrap();
        editor.set_radius_input("75").unwrap();

        editor.cancel();
        assert_eq!(editor.state(), EditorState::Idle);

        editor.start().unwrap();
        assert_eq!(editor.draft(), &GeofenceDraft::default());
    }

    #[tokio::test]
    async fn save_persists_trimmed_name_and_clears_draft() {
        let mut store = MockGeofenceStore::new();
        store
            .expect_create_geofence()
            .withf(|input: &CreateGeofenceInput| {
                input.name == "Yard" && input.radius_m == 50.0 && input.owner_id == "owner-1"
            })
            .times(1)
            .return_once(|input| {
                Ok(Geofence {
                    geofence_id: "gf-1".to_string(),
                    owner_id: input.owner_id,
                    name: input.name,
                    center: input.center,
                    radius_m: input.radius_m,
                    is_enabled: true,
                    created_at: None,
                })
            });
        let mut editor = editor_with(store, MockGeocoder::new());
        editor.start().unwrap();
        editor.set_center_from_map(Coordinate::new(1.0, 1.0).unwrap()).unwrap();
        editor.set_name("  Yard  ").unwrap();
        editor.set_radius_input("50").unwrap();

        let fence = editor.save().await.unwrap();
        assert!(fence.is_enabled);
        assert_eq!(editor.state(), EditorState::Idle);
        assert_eq!(editor.draft(), &GeofenceDraft::default());
    }

    #[tokio::test]
    async fn failed_save_keeps_the_draft_for_retry() {
        let mut store = MockGeofenceStore::new();
        store
            .expect_create_geofence()
            .times(1)
            .return_once(|_| Err(DomainError::RepositoryError(anyhow!("write refused"))));
        let mut editor = editor_with(store, MockGeocoder::new());
        editor.start().unwrap();
        editor.set_center_from_map(Coordinate::new(1.0, 1.0).unwrap()).unwrap();
        editor.set_name("Yard").unwrap();
        editor.set_radius_input("50").unwrap();

        assert!(editor.save().await.is_err());
        assert_eq!(editor.state(), EditorState::Drafting);
        assert_eq!(editor.draft().name, "Yard");
        assert_eq!(editor.draft().radius_input, "50");
        assert!(editor.draft().center.is_some());
    }

    #[test]
    fn only_one_draft_at_a_time() {
        let mut editor = drafting_editor();
        assert!(matches!(editor.start(), Err(DomainError::EditorState(_))));
    }
}
