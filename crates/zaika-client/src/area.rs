//! Delivery-area session state.
//!
//! A session holds at most one confirmed area; it gates which storefront the
//! user sees. The confirmed area is persisted locally and rehydrated on the
//! next launch, so returning users skip the location prompt. The prompt
//! itself fires at most once per session, and clearing the area re-arms it.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::{debug, info};

use zaika_net::{ApiClient, AreaWithZone, CheckAreaResponse};
use zaika_shared::constants::{FALLBACK_DELIVERY_FEE, FALLBACK_ESTIMATED_TIME};
use zaika_shared::{LatLng, SelectedArea};
use zaika_store::{Database, StoredArea};

use crate::error::Result;

/// Where the session stands with respect to a delivery area.
#[derive(Debug, Clone, PartialEq)]
pub enum AreaState {
    /// Nothing confirmed yet and no check in flight.
    Unchecked,
    /// A geofence check is in flight.
    Checking,
    /// The session is locked to this area.
    Confirmed(SelectedArea),
    /// The last check landed outside every delivery zone.
    NotInService { message: String },
}

/// Why obtaining the device location failed. The failure never changes the
/// session state; the user can retry or pick an area manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationFailure {
    PermissionDenied,
    Timeout,
    Unavailable,
}

impl LocationFailure {
    pub fn user_message(self) -> &'static str {
        match self {
            LocationFailure::PermissionDenied => {
                "Location access denied. Please select your area manually"
            }
            LocationFailure::Timeout => "Location request timed out. Please try again",
            LocationFailure::Unavailable => {
                "Couldn't determine your location. Please select your area manually"
            }
        }
    }
}

struct SessionInner {
    state: AreaState,
    prompted: bool,
}

/// Session-scoped area state with local persistence.
pub struct AreaSession {
    db: Arc<Mutex<Database>>,
    api: Arc<ApiClient>,
    inner: Mutex<SessionInner>,
}

impl AreaSession {
    pub fn new(db: Arc<Mutex<Database>>, api: Arc<ApiClient>) -> Self {
        Self {
            db,
            api,
            inner: Mutex::new(SessionInner {
                state: AreaState::Unchecked,
                prompted: false,
            }),
        }
    }

    /// Restore a previously confirmed area from the local store. A restored
    /// area also suppresses the location prompt for this session.
    pub fn hydrate(&self) -> Result<()> {
        let stored = self.lock_db().load_area()?;
        if let Some(stored) = stored {
            info!(area = %stored.area.name, "restored delivery area");
            let mut inner = self.lock_inner();
            inner.state = AreaState::Confirmed(stored.area);
            inner.prompted = true;
        }
        Ok(())
    }

    pub fn state(&self) -> AreaState {
        self.lock_inner().state.clone()
    }

    pub fn selected_area(&self) -> Option<SelectedArea> {
        match self.lock_inner().state {
            AreaState::Confirmed(ref area) => Some(area.clone()),
            _ => None,
        }
    }

    /// Whether the UI should show the location prompt now. Returns `true`
    /// at most once per session; [`clear`](Self::clear) re-arms it.
    pub fn should_prompt(&self) -> bool {
        let mut inner = self.lock_inner();
        if inner.prompted || !matches!(inner.state, AreaState::Unchecked) {
            return false;
        }
        inner.prompted = true;
        true
    }

    /// Run a geofence check for a device location and commit the outcome.
    ///
    /// A confirmed area is persisted. An out-of-service result only moves
    /// the session state: a previously stored area stays on disk until the
    /// user explicitly changes or clears it.
    pub async fn check_location(&self, location: LatLng) -> Result<AreaState> {
        self.lock_inner().state = AreaState::Checking;

        let response = match self.api.check_area(location).await {
            Ok(response) => response,
            Err(e) => {
                // The check failed in transit, not in the geofence; don't
                // lock the session out of service.
                self.lock_inner().state = AreaState::Unchecked;
                return Err(e.into());
            }
        };

        let (state, stored) = commit_check_result(response, location);
        self.apply_check_outcome(&state, stored)?;
        Ok(state)
    }

    fn apply_check_outcome(&self, state: &AreaState, stored: Option<StoredArea>) -> Result<()> {
        if let Some(stored) = stored {
            self.lock_db().save_area(&stored)?;
        }
        self.lock_inner().state = state.clone();
        Ok(())
    }

    /// Lock the session to an area picked from the list, bypassing the
    /// geofence check. Zone-less areas fall back to default terms.
    pub fn select_area_manually(&self, area: AreaWithZone) -> Result<SelectedArea> {
        let selected = selected_from_listing(area);
        debug!(area = %selected.name, "area selected manually");

        self.lock_db().save_area(&StoredArea {
            area: selected.clone(),
            user_location: None,
            checked_at: Utc::now(),
        })?;

        let mut inner = self.lock_inner();
        inner.state = AreaState::Confirmed(selected.clone());
        inner.prompted = true;
        Ok(selected)
    }

    /// Forget the confirmed area and re-arm the location prompt.
    pub fn clear(&self) -> Result<()> {
        self.lock_db().clear_area()?;
        let mut inner = self.lock_inner();
        inner.state = AreaState::Unchecked;
        inner.prompted = false;
        Ok(())
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_db(&self) -> std::sync::MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Turn a geofence response into the next session state, plus the record to
/// persist when the area is confirmed.
fn commit_check_result(
    response: CheckAreaResponse,
    location: LatLng,
) -> (AreaState, Option<StoredArea>) {
    let area = match (response.in_service, response.area) {
        (true, Some(area)) => area,
        _ => {
            let message = response
                .message
                .unwrap_or_else(|| "Sorry, we don't deliver to your location yet".to_string());
            return (AreaState::NotInService { message }, None);
        }
    };

    let (fee, min_order, estimated_time) = match response.delivery {
        Some(terms) => (terms.fee, terms.min_order, terms.estimated_time),
        None => (
            FALLBACK_DELIVERY_FEE,
            0,
            FALLBACK_ESTIMATED_TIME.to_string(),
        ),
    };

    let selected = SelectedArea {
        full_address: format!("{}, {}", area.name, area.city),
        id: area.id,
        name: area.name,
        city: area.city,
        center: area.center,
        delivery_fee: fee,
        min_order_amount: min_order,
        estimated_time,
    };

    let stored = StoredArea {
        area: selected.clone(),
        user_location: Some(location),
        checked_at: Utc::now(),
    };

    (AreaState::Confirmed(selected), Some(stored))
}

fn selected_from_listing(area: AreaWithZone) -> SelectedArea {
    let (fee, min_order, estimated_time) = match area.delivery_zone {
        Some(zone) => (zone.delivery_fee, zone.min_order_amount, zone.estimated_time),
        None => (
            FALLBACK_DELIVERY_FEE,
            0,
            FALLBACK_ESTIMATED_TIME.to_string(),
        ),
    };

    SelectedArea {
        full_address: format!("{}, {}", area.name, area.city),
        id: area.id,
        name: area.name,
        city: area.city,
        center: None,
        delivery_fee: fee,
        min_order_amount: min_order,
        estimated_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zaika_net::{AreaSummary, DeliveryZone};
    use zaika_shared::{AreaId, DeliveryTerms};

    fn session() -> AreaSession {
        let db = Database::open_in_memory().unwrap();
        let api = ApiClient::new("http://localhost:5000/api");
        AreaSession::new(Arc::new(Mutex::new(db)), Arc::new(api))
    }

    fn in_service_response() -> CheckAreaResponse {
        CheckAreaResponse {
            success: true,
            in_service: true,
            has_delivery_zone: true,
            area: Some(AreaSummary {
                id: AreaId("a1".into()),
                name: "Gulshan Block 5".into(),
                city: "Karachi".into(),
                center: Some(LatLng {
                    lat: 24.91,
                    lng: 67.09,
                }),
            }),
            delivery: Some(DeliveryTerms {
                fee: 199,
                min_order: 0,
                estimated_time: "25-35 min".into(),
            }),
            message: None,
        }
    }

    #[test]
    fn in_service_check_confirms_with_zone_terms() {
        let location = LatLng {
            lat: 24.91,
            lng: 67.09,
        };
        let (state, stored) = commit_check_result(in_service_response(), location);

        let area = match state {
            AreaState::Confirmed(area) => area,
            other => panic!("expected Confirmed, got {other:?}"),
        };
        assert_eq!(area.delivery_fee, 199);
        assert_eq!(area.min_order_amount, 0);
        assert_eq!(area.estimated_time, "25-35 min");
        assert_eq!(stored.unwrap().user_location, Some(location));
    }

    #[test]
    fn missing_zone_falls_back_to_default_terms() {
        let mut response = in_service_response();
        response.delivery = None;

        let (state, _) = commit_check_result(
            response,
            LatLng {
                lat: 24.91,
                lng: 67.09,
            },
        );
        match state {
            AreaState::Confirmed(area) => {
                assert_eq!(area.delivery_fee, FALLBACK_DELIVERY_FEE);
                assert_eq!(area.estimated_time, FALLBACK_ESTIMATED_TIME);
            }
            other => panic!("expected Confirmed, got {other:?}"),
        }
    }

    #[test]
    fn out_of_service_keeps_server_message() {
        let response = CheckAreaResponse {
            success: true,
            in_service: false,
            has_delivery_zone: false,
            area: None,
            delivery: None,
            message: Some("Coming to DHA soon!".into()),
        };

        let (state, stored) = commit_check_result(
            response,
            LatLng {
                lat: 24.80,
                lng: 67.03,
            },
        );
        assert_eq!(
            state,
            AreaState::NotInService {
                message: "Coming to DHA soon!".into()
            }
        );
        assert!(stored.is_none());
    }

    #[test]
    fn out_of_service_check_keeps_the_stored_area() {
        let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        let api = Arc::new(ApiClient::new("http://localhost:5000/api"));
        let session = AreaSession::new(db.clone(), api);

        session
            .select_area_manually(AreaWithZone {
                id: AreaId("a1".into()),
                name: "Clifton".into(),
                city: "Karachi".into(),
                delivery_zone: None,
                has_delivery_zone: false,
            })
            .unwrap();

        // A later check lands outside every zone. Only the session state
        // moves; the persisted area stays until an explicit change.
        let (state, stored) = commit_check_result(
            CheckAreaResponse {
                success: true,
                in_service: false,
                has_delivery_zone: false,
                area: None,
                delivery: None,
                message: None,
            },
            LatLng {
                lat: 24.80,
                lng: 67.03,
            },
        );
        session.apply_check_outcome(&state, stored).unwrap();

        assert!(matches!(session.state(), AreaState::NotInService { .. }));
        let persisted = db.lock().unwrap().load_area().unwrap().unwrap();
        assert_eq!(persisted.area.name, "Clifton");
    }

    #[test]
    fn prompt_fires_once_until_cleared() {
        let session = session();

        assert!(session.should_prompt());
        assert!(!session.should_prompt());

        session.clear().unwrap();
        assert!(session.should_prompt());
    }

    #[test]
    fn manual_selection_persists_and_rehydrates() {
        let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        let api = Arc::new(ApiClient::new("http://localhost:5000/api"));

        let session = AreaSession::new(db.clone(), api.clone());
        session
            .select_area_manually(AreaWithZone {
                id: AreaId("a1".into()),
                name: "Clifton".into(),
                city: "Karachi".into(),
                delivery_zone: Some(DeliveryZone {
                    delivery_fee: 199,
                    min_order_amount: 0,
                    estimated_time: "25-35 min".into(),
                    is_active: true,
                }),
                has_delivery_zone: true,
            })
            .unwrap();

        // A second session over the same store starts confirmed and never
        // prompts.
        let restored = AreaSession::new(db, api);
        restored.hydrate().unwrap();
        let area = restored.selected_area().unwrap();
        assert_eq!(area.name, "Clifton");
        assert_eq!(area.delivery_fee, 199);
        assert!(!restored.should_prompt());
    }

    #[test]
    fn location_failures_have_distinct_messages() {
        let messages = [
            LocationFailure::PermissionDenied.user_message(),
            LocationFailure::Timeout.user_message(),
            LocationFailure::Unavailable.user_message(),
        ];
        assert_ne!(messages[0], messages[1]);
        assert_ne!(messages[1], messages[2]);
        assert_ne!(messages[0], messages[2]);
    }
}
