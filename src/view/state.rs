//! View State Store
//!
//! Holds the session's view state and notifies observers when it changes.
//! Observers get a `watch` receiver of immutable snapshots.
//!
//! Fetch results are applied through sequence-numbered tickets: each
//! operation key (vehicles, stops) numbers its requests in issue order, and
//! a completion only lands if its number is above the last one applied for
//! that key. A slow, superseded request therefore can never overwrite the
//! result of a newer one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::geo::LocationError;
use crate::model::{StopPosition, UserLocation, VehiclePosition};
use crate::source::{FetchError, Fetched};

/// Operations whose results are sequenced independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKey {
    Vehicles,
    Stops,
}

impl RequestKey {
    fn index(self) -> usize {
        match self {
            RequestKey::Vehicles => 0,
            RequestKey::Stops => 1,
        }
    }
}

/// Issued when a request starts; presented again when it completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub key: RequestKey,
    pub seq: u64,
}

/// What happened to a completed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Result became the current snapshot (or its error was recorded)
    Applied,
    /// A newer request for the same key had already landed
    Stale,
}

/// Component that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorOrigin {
    Location,
    Vehicles,
    Stops,
}

impl From<RequestKey> for ErrorOrigin {
    fn from(key: RequestKey) -> Self {
        match key {
            RequestKey::Vehicles => ErrorOrigin::Vehicles,
            RequestKey::Stops => ErrorOrigin::Stops,
        }
    }
}

/// Error surfaced to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewError {
    pub origin: ErrorOrigin,
    pub message: String,
}

/// Progress of the one-shot location request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationStatus {
    #[default]
    Pending,
    Known,
    Failed,
}

/// Coarse session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Loading,
    Ready,
}

/// Everything the map needs to draw itself
#[derive(Debug, Clone, Serialize)]
pub struct ViewState {
    pub vehicles: Vec<VehiclePosition>,
    pub stops: Vec<StopPosition>,
    pub user_location: Option<UserLocation>,
    pub location_status: LocationStatus,
    /// True until the first vehicle fetch settles, never set again
    pub loading: bool,
    pub last_error: Option<ViewError>,
    pub filter_line_number: String,
    /// Vehicle records dropped for invalid coordinates, over the session
    pub dropped_vehicles: usize,
    /// Stop records dropped for invalid coordinates, over the session
    pub dropped_stops: usize,
    pub vehicles_updated: Option<DateTime<Utc>>,
    pub stops_updated: Option<DateTime<Utc>>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            vehicles: Vec::new(),
            stops: Vec::new(),
            user_location: None,
            location_status: LocationStatus::Pending,
            loading: true,
            last_error: None,
            filter_line_number: String::new(),
            dropped_vehicles: 0,
            dropped_stops: 0,
            vehicles_updated: None,
            stops_updated: None,
        }
    }
}

impl ViewState {
    pub fn phase(&self) -> Phase {
        if self.loading {
            Phase::Loading
        } else {
            Phase::Ready
        }
    }

    fn record_error(&mut self, origin: ErrorOrigin, message: String) {
        self.last_error = Some(ViewError { origin, message });
    }

    /// Clear the current error if it came from `origin`
    fn clear_error(&mut self, origin: ErrorOrigin) {
        if self.last_error.as_ref().map(|e| e.origin) == Some(origin) {
            self.last_error = None;
        }
    }
}

/// Owner of the session's [`ViewState`]
#[derive(Debug)]
pub struct ViewStore {
    tx: watch::Sender<Arc<ViewState>>,
    issued: [AtomicU64; 2],
    /// Only touched inside `send_if_modified`, which serializes writers
    applied: [AtomicU64; 2],
}

impl Default for ViewStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewStore {
    /// Create a store holding an empty, loading view
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Arc::new(ViewState::default()));
        Self {
            tx,
            issued: [AtomicU64::new(0), AtomicU64::new(0)],
            applied: [AtomicU64::new(0), AtomicU64::new(0)],
        }
    }

    /// Receive a notification (and the new snapshot) on every change
    pub fn subscribe(&self) -> watch::Receiver<Arc<ViewState>> {
        self.tx.subscribe()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<ViewState> {
        Arc::clone(&self.tx.borrow())
    }

    /// Number a new request for `key`
    pub fn begin(&self, key: RequestKey) -> Ticket {
        let seq = self.issued[key.index()].fetch_add(1, Ordering::SeqCst) + 1;
        Ticket { key, seq }
    }

    /// Apply a settled vehicles request
    pub fn complete_vehicles(
        &self,
        ticket: Ticket,
        result: Result<Fetched<VehiclePosition>, FetchError>,
    ) -> Applied {
        debug_assert_eq!(ticket.key, RequestKey::Vehicles);
        self.complete(ticket, result, |state, fetched| {
            state.vehicles = fetched.records;
            state.dropped_vehicles += fetched.dropped;
            state.vehicles_updated = Some(Utc::now());
        })
    }

    /// Apply a settled stops request
    pub fn complete_stops(
        &self,
        ticket: Ticket,
        result: Result<Fetched<StopPosition>, FetchError>,
    ) -> Applied {
        debug_assert_eq!(ticket.key, RequestKey::Stops);
        self.complete(ticket, result, |state, fetched| {
            state.stops = fetched.records;
            state.dropped_stops += fetched.dropped;
            state.stops_updated = Some(Utc::now());
        })
    }

    fn complete<T>(
        &self,
        ticket: Ticket,
        result: Result<Fetched<T>, FetchError>,
        apply: impl FnOnce(&mut ViewState, Fetched<T>),
    ) -> Applied {
        let mut outcome = Applied::Stale;

        self.tx.send_if_modified(|current| {
            let applied = &self.applied[ticket.key.index()];
            // A newer response already landed, which also settled `loading`
            if ticket.seq <= applied.load(Ordering::SeqCst) {
                tracing::debug!(
                    key = ?ticket.key,
                    seq = ticket.seq,
                    "Discarding superseded response"
                );
                return false;
            }

            applied.store(ticket.seq, Ordering::SeqCst);
            outcome = Applied::Applied;

            let state = Arc::make_mut(current);
            if ticket.key == RequestKey::Vehicles {
                state.loading = false;
            }

            let origin = ErrorOrigin::from(ticket.key);
            match result {
                Ok(fetched) => {
                    state.clear_error(origin);
                    apply(state, fetched);
                }
                Err(e) => {
                    tracing::warn!(key = ?ticket.key, seq = ticket.seq, error = %e, "Fetch failed");
                    state.record_error(origin, e.to_string());
                }
            }
            true
        });

        outcome
    }

    /// Record the outcome of the location request.
    ///
    /// Only the first outcome is kept; later calls are ignored.
    pub fn set_location(&self, result: Result<UserLocation, LocationError>) -> bool {
        self.tx.send_if_modified(|current| {
            if current.location_status != LocationStatus::Pending {
                tracing::debug!("Location already settled, ignoring");
                return false;
            }

            let state = Arc::make_mut(current);
            match result {
                Ok(location) => {
                    state.user_location = Some(location);
                    state.location_status = LocationStatus::Known;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Location unavailable");
                    state.location_status = LocationStatus::Failed;
                    state.record_error(ErrorOrigin::Location, e.to_string());
                }
            }
            true
        })
    }

    /// Update the line filter text, returning whether it changed
    pub fn set_filter(&self, text: &str) -> bool {
        self.tx.send_if_modified(|current| {
            if current.filter_line_number == text {
                return false;
            }
            Arc::make_mut(current).filter_line_number = text.to_string();
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicles(line: &str, count: usize) -> Fetched<VehiclePosition> {
        Fetched::new(
            (0..count)
                .map(|i| VehiclePosition::new(59.4 + i as f64 * 0.001, 24.7, "bus", line))
                .collect(),
        )
    }

    fn server_error() -> FetchError {
        FetchError::Status {
            status: 500,
            message: String::new(),
        }
    }

    #[test]
    fn test_initial_state() {
        let store = ViewStore::new();
        let state = store.snapshot();

        assert!(state.loading);
        assert_eq!(state.phase(), Phase::Loading);
        assert!(state.vehicles.is_empty());
        assert!(state.user_location.is_none());
        assert_eq!(state.location_status, LocationStatus::Pending);
    }

    #[test]
    fn test_tickets_increase_per_key() {
        let store = ViewStore::new();

        assert_eq!(store.begin(RequestKey::Vehicles).seq, 1);
        assert_eq!(store.begin(RequestKey::Vehicles).seq, 2);
        assert_eq!(store.begin(RequestKey::Stops).seq, 1);
    }

    #[test]
    fn test_success_replaces_snapshot() {
        let store = ViewStore::new();

        let t1 = store.begin(RequestKey::Vehicles);
        store.complete_vehicles(t1, Ok(vehicles("5", 3)));
        assert_eq!(store.snapshot().vehicles.len(), 3);

        let t2 = store.begin(RequestKey::Vehicles);
        store.complete_vehicles(t2, Ok(vehicles("7", 1)));

        let state = store.snapshot();
        assert_eq!(state.vehicles.len(), 1);
        assert_eq!(state.vehicles[0].line_number, "7");
        assert!(state.vehicles_updated.is_some());
        assert!(!state.loading);
    }

    #[test]
    fn test_failure_keeps_previous_snapshot() {
        let store = ViewStore::new();

        let t1 = store.begin(RequestKey::Vehicles);
        store.complete_vehicles(t1, Ok(vehicles("5", 2)));
        let before = store.snapshot().vehicles.clone();

        let t2 = store.begin(RequestKey::Vehicles);
        assert_eq!(store.complete_vehicles(t2, Err(server_error())), Applied::Applied);

        let state = store.snapshot();
        assert_eq!(state.vehicles, before);
        let error = state.last_error.as_ref().unwrap();
        assert_eq!(error.origin, ErrorOrigin::Vehicles);
        assert!(!error.message.is_empty());
    }

    #[test]
    fn test_first_failure_clears_loading() {
        let store = ViewStore::new();

        let t1 = store.begin(RequestKey::Vehicles);
        store.complete_vehicles(t1, Err(FetchError::Timeout));

        assert!(!store.snapshot().loading);
    }

    #[test]
    fn test_stops_do_not_clear_loading() {
        let store = ViewStore::new();

        let t = store.begin(RequestKey::Stops);
        store.complete_stops(t, Ok(Fetched::new(vec![StopPosition::new(59.4, 24.7)])));

        let state = store.snapshot();
        assert!(state.loading);
        assert_eq!(state.stops.len(), 1);
    }

    #[test]
    fn test_out_of_order_completion_is_discarded() {
        let store = ViewStore::new();

        let older = store.begin(RequestKey::Vehicles);
        let newer = store.begin(RequestKey::Vehicles);

        assert_eq!(store.complete_vehicles(newer, Ok(vehicles("7", 1))), Applied::Applied);
        assert_eq!(store.complete_vehicles(older, Ok(vehicles("5", 4))), Applied::Stale);

        let state = store.snapshot();
        assert_eq!(state.vehicles.len(), 1);
        assert_eq!(state.vehicles[0].line_number, "7");
    }

    #[test]
    fn test_stale_failure_is_not_surfaced() {
        let store = ViewStore::new();

        let older = store.begin(RequestKey::Vehicles);
        let newer = store.begin(RequestKey::Vehicles);
        store.complete_vehicles(newer, Ok(vehicles("7", 1)));
        store.complete_vehicles(older, Err(server_error()));

        assert!(store.snapshot().last_error.is_none());
    }

    #[test]
    fn test_stale_response_does_not_notify() {
        let store = ViewStore::new();
        let mut rx = store.subscribe();

        let older = store.begin(RequestKey::Vehicles);
        let newer = store.begin(RequestKey::Vehicles);
        store.complete_vehicles(newer, Ok(vehicles("7", 1)));
        let _ = rx.borrow_and_update();

        assert_eq!(store.complete_vehicles(older, Ok(vehicles("5", 1))), Applied::Stale);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_keys_are_independent() {
        let store = ViewStore::new();

        let v = store.begin(RequestKey::Vehicles);
        let s1 = store.begin(RequestKey::Stops);
        let s2 = store.begin(RequestKey::Stops);

        store.complete_stops(s2, Ok(Fetched::new(vec![StopPosition::new(1.0, 2.0)])));
        assert_eq!(store.complete_stops(s1, Ok(Fetched::new(vec![]))), Applied::Stale);
        assert_eq!(store.complete_vehicles(v, Ok(vehicles("5", 1))), Applied::Applied);
        assert_eq!(store.snapshot().stops.len(), 1);
    }

    #[test]
    fn test_dropped_counts_accumulate() {
        let store = ViewStore::new();

        for dropped in [2, 3] {
            let t = store.begin(RequestKey::Vehicles);
            let mut fetched = vehicles("5", 1);
            fetched.dropped = dropped;
            store.complete_vehicles(t, Ok(fetched));
        }

        assert_eq!(store.snapshot().dropped_vehicles, 5);
    }

    #[test]
    fn test_location_set_once() {
        let store = ViewStore::new();

        assert!(store.set_location(Ok(UserLocation::new(59.4, 24.7))));
        assert!(!store.set_location(Ok(UserLocation::new(0.0, 0.0))));
        assert!(!store.set_location(Err(LocationError::Timeout)));

        let state = store.snapshot();
        assert_eq!(state.user_location, Some(UserLocation::new(59.4, 24.7)));
        assert_eq!(state.location_status, LocationStatus::Known);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_location_denied() {
        let store = ViewStore::new();

        store.set_location(Err(LocationError::PermissionDenied));

        let state = store.snapshot();
        assert!(state.user_location.is_none());
        assert_eq!(state.location_status, LocationStatus::Failed);
        let error = state.last_error.as_ref().unwrap();
        assert_eq!(error.origin, ErrorOrigin::Location);
        assert_eq!(error.message, "User denied Geolocation");
    }

    #[test]
    fn test_success_clears_only_own_error() {
        let store = ViewStore::new();
        store.set_location(Err(LocationError::PermissionDenied));

        let t = store.begin(RequestKey::Vehicles);
        store.complete_vehicles(t, Ok(vehicles("5", 1)));
        assert_eq!(
            store.snapshot().last_error.as_ref().map(|e| e.origin),
            Some(ErrorOrigin::Location)
        );

        let t = store.begin(RequestKey::Stops);
        store.complete_stops(t, Err(FetchError::Unavailable));
        let t = store.begin(RequestKey::Stops);
        store.complete_stops(t, Ok(Fetched::new(vec![])));
        assert!(store.snapshot().last_error.is_none());
    }

    #[tokio::test]
    async fn test_subscribers_notified() {
        let store = ViewStore::new();
        let mut rx = store.subscribe();

        assert!(store.set_filter("5"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().filter_line_number, "5");

        assert!(!store.set_filter("5"));
        assert!(!rx.has_changed().unwrap());
    }
}
