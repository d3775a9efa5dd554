//! Live Session
//!
//! Wires a [`DataSource`], a [`GeoLocator`] and a [`ViewStore`] together and
//! drives them: the one-shot location request and the first fetches on
//! mount, vehicle refreshes on filter changes and submissions, and optional
//! periodic polling.
//!
//! Every fetch takes its sequence ticket before it is spawned, so tickets
//! follow issue order even though completions may arrive in any order.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::SessionConfig;
use crate::geo::{GeoLocator, TimeoutLocator};
use crate::source::{normalize_filter, DataSource};
use crate::view::{Applied, QueryForm, RequestKey, Ticket, ViewState, ViewStore};

/// Handles of the work started by [`LiveSession::mount`]
#[derive(Debug)]
pub struct Mounted {
    pub location: JoinHandle<bool>,
    pub vehicles: JoinHandle<Applied>,
    pub stops: JoinHandle<Applied>,
}

impl Mounted {
    /// Wait until the location request and both first fetches have settled
    pub async fn settled(self) -> Result<(), JoinError> {
        self.location.await?;
        self.vehicles.await?;
        self.stops.await?;
        Ok(())
    }
}

/// One live map session
pub struct LiveSession {
    source: Arc<dyn DataSource>,
    locator: Arc<dyn GeoLocator>,
    store: Arc<ViewStore>,
    form: Mutex<QueryForm>,
    config: SessionConfig,
    tasks: Mutex<Vec<AbortHandle>>,
}

impl LiveSession {
    pub fn new(
        source: Arc<dyn DataSource>,
        locator: Arc<dyn GeoLocator>,
        config: SessionConfig,
    ) -> Self {
        let locator: Arc<dyn GeoLocator> = if config.locate_timeout_ms > 0 {
            Arc::new(TimeoutLocator::new(
                locator,
                Duration::from_millis(config.locate_timeout_ms),
            ))
        } else {
            locator
        };

        Self {
            source,
            locator,
            store: Arc::new(ViewStore::new()),
            form: Mutex::new(QueryForm::new()),
            config,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Start with `text` already in the filter, without fetching
    pub fn with_filter(mut self, text: &str) -> Self {
        let form = self.form.get_mut().unwrap_or_else(PoisonError::into_inner);
        form.input(text);
        self.store.set_filter(text);
        self
    }

    pub fn store(&self) -> &Arc<ViewStore> {
        &self.store
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ViewState>> {
        self.store.subscribe()
    }

    pub fn snapshot(&self) -> Arc<ViewState> {
        self.store.snapshot()
    }

    /// Request the location and run the first vehicle and stop fetches
    pub fn mount(&self) -> Mounted {
        let filter = self.form_text();
        tracing::info!(filter = %filter, "Mounting live session");

        Mounted {
            location: self.locate(),
            vehicles: self.refresh_vehicles(normalize_filter(Some(&filter))),
            stops: self.refresh_stops(),
        }
    }

    /// Filter text changed. Returns the vehicle refresh if one was started.
    pub fn input(&self, text: &str) -> Option<JoinHandle<Applied>> {
        let query = self
            .form
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .input(text)?;

        self.store.set_filter(text);
        if self.config.refetch_stops_on_filter_change {
            self.refresh_stops();
        }
        Some(self.refresh_vehicles(query.filter()))
    }

    /// Form submitted: refresh vehicles with the current text
    pub fn submit(&self) -> JoinHandle<Applied> {
        let query = self
            .form
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .submit();
        self.refresh_vehicles(query.filter())
    }

    /// Fetch vehicles for `filter` in the background
    pub fn refresh_vehicles(&self, filter: Option<&str>) -> JoinHandle<Applied> {
        let ticket = self.store.begin(RequestKey::Vehicles);
        let filter = normalize_filter(filter).map(str::to_string);
        tracing::debug!(seq = ticket.seq, filter = ?filter, "Refreshing vehicles");

        let handle = tokio::spawn(fetch_vehicles(
            Arc::clone(&self.source),
            Arc::clone(&self.store),
            ticket,
            filter,
        ));
        self.track(handle.abort_handle());
        handle
    }

    /// Fetch stops in the background
    pub fn refresh_stops(&self) -> JoinHandle<Applied> {
        let ticket = self.store.begin(RequestKey::Stops);
        tracing::debug!(seq = ticket.seq, "Refreshing stops");

        let handle = tokio::spawn(fetch_stops(
            Arc::clone(&self.source),
            Arc::clone(&self.store),
            ticket,
        ));
        self.track(handle.abort_handle());
        handle
    }

    /// Ask for the user's location once
    pub fn locate(&self) -> JoinHandle<bool> {
        let locator = Arc::clone(&self.locator);
        let store = Arc::clone(&self.store);

        let handle = tokio::spawn(async move { store.set_location(locator.locate().await) });
        self.track(handle.abort_handle());
        handle
    }

    /// Start the periodic vehicle (and optionally stop) polls
    pub fn start_polling(&self) {
        if self.config.vehicle_refresh_secs > 0 {
            let period = Duration::from_secs(self.config.vehicle_refresh_secs);
            let source = Arc::clone(&self.source);
            let store = Arc::clone(&self.store);

            let handle = tokio::spawn(async move {
                let mut interval = interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    interval.tick().await;
                    let filter = normalize_filter(Some(&store.snapshot().filter_line_number))
                        .map(str::to_string);
                    let ticket = store.begin(RequestKey::Vehicles);
                    fetch_vehicles(Arc::clone(&source), Arc::clone(&store), ticket, filter).await;
                }
            });
            self.track(handle.abort_handle());
            tracing::info!(every_secs = period.as_secs(), "Polling vehicles");
        }

        if self.config.stops_refresh_secs > 0 {
            let period = Duration::from_secs(self.config.stops_refresh_secs);
            let source = Arc::clone(&self.source);
            let store = Arc::clone(&self.store);

            let handle = tokio::spawn(async move {
                let mut interval = interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    interval.tick().await;
                    let ticket = store.begin(RequestKey::Stops);
                    fetch_stops(Arc::clone(&source), Arc::clone(&store), ticket).await;
                }
            });
            self.track(handle.abort_handle());
            tracing::info!(every_secs = period.as_secs(), "Polling stops");
        }
    }

    /// Cancel polling and every request still in flight
    pub fn shutdown(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        for task in &tasks {
            task.abort();
        }
        tracing::info!(tasks = tasks.len(), "Live session stopped");
    }

    fn form_text(&self) -> String {
        self.form
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .text()
            .to_string()
    }

    fn track(&self, handle: AbortHandle) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|t| !t.is_finished());
        tasks.push(handle);
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

async fn fetch_vehicles(
    source: Arc<dyn DataSource>,
    store: Arc<ViewStore>,
    ticket: Ticket,
    filter: Option<String>,
) -> Applied {
    let result = source.fetch_vehicles(filter.as_deref()).await;
    if let Ok(fetched) = &result {
        tracing::debug!(
            seq = ticket.seq,
            count = fetched.len(),
            dropped = fetched.dropped,
            "Vehicles fetched"
        );
    }
    store.complete_vehicles(ticket, result)
}

async fn fetch_stops(source: Arc<dyn DataSource>, store: Arc<ViewStore>, ticket: Ticket) -> Applied {
    let result = source.fetch_stops().await;
    if let Ok(fetched) = &result {
        tracing::debug!(
            seq = ticket.seq,
            count = fetched.len(),
            dropped = fetched.dropped,
            "Stops fetched"
        );
    }
    store.complete_stops(ticket, result)
}
