//! Sequencing of range resolution, slider mount and statistics refreshes.

use crate::controller::{TimeSliderConfig, TimeWindowController};
use crate::resolver::DateRangeResolver;
use log::{error, info};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use vmap_core::error::PipelineError;
use vmap_core::geometry::Geometry;
use vmap_core::query::{AggregateSpec, QueryFilter};
use vmap_core::service::DEFAULT_DATE_FIELD;
use vmap_core::time_extent::{TimeExtent, TimeWindow};
use vmap_core::traits::{DisplaySurface, FeatureSource, MapView};
use vmap_stats::fields::{vaccination_spec, DisplayField, VACCINATION_FIELDS};
use vmap_stats::{format_outcome, StatsFetcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Uninitialized,
    RangeResolving,
    RangeResolved(TimeExtent),
    RangeFailed,
    WindowReady,
    Listening,
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestratorState::Uninitialized => write!(f, "Uninitialized"),
            OrchestratorState::RangeResolving => write!(f, "RangeResolving"),
            OrchestratorState::RangeResolved(extent) => write!(f, "RangeResolved {}", extent),
            OrchestratorState::RangeFailed => write!(f, "RangeFailed"),
            OrchestratorState::WindowReady => write!(f, "WindowReady"),
            OrchestratorState::Listening => write!(f, "Listening"),
        }
    }
}

/// Fetch, format and display for one filter, with stale results dropped.
struct StatsPipeline {
    fetcher: StatsFetcher,
    fields: Vec<DisplayField>,
    view: Arc<dyn MapView>,
    display: Arc<dyn DisplaySurface>,
    generation: AtomicU64,
    begun: Mutex<Option<QueryFilter>>,
    completed: watch::Sender<u64>,
    display_lock: Mutex<()>,
}

impl StatsPipeline {
    /// Scope the map to `filter` and claim a new generation. Any refresh
    /// started under an older generation will not reach the display.
    fn begin(&self, filter: &QueryFilter) -> u64 {
        self.view.apply_feature_effect(filter);
        // generation before filter: `is_settled` reads them in reverse
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.begun.lock().unwrap_or_else(PoisonError::into_inner) = Some(*filter);
        generation
    }

    fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// The latest refresh has finished and it was started for `filter`.
    fn is_settled(&self, filter: &QueryFilter) -> bool {
        let begun = *self.begun.lock().unwrap_or_else(PoisonError::into_inner);
        *self.completed.borrow() >= self.generation.load(Ordering::SeqCst)
            && begun.as_ref() == Some(filter)
    }

    /// Returns whether the display was updated.
    async fn refresh(&self, filter: QueryFilter, generation: u64) -> bool {
        let shown = self.fetch_and_show(filter, generation).await;
        self.completed
            .send_modify(|completed| *completed = (*completed).max(generation));
        shown
    }

    async fn fetch_and_show(&self, filter: QueryFilter, generation: u64) -> bool {
        let outcome = self.fetcher.fetch(&filter).await;
        let Some(display) = format_outcome(&outcome, &self.fields) else {
            return false;
        };
        let _guard = self
            .display_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.generation.load(Ordering::SeqCst) != generation {
            info!(
                "[VMAP] orchestrator: dropping stale result for {}",
                filter.time_window
            );
            return false;
        }
        self.display.show(&display);
        true
    }
}

/// Drives the pipeline from an empty map to a listening session.
pub struct Orchestrator {
    source: Arc<dyn FeatureSource>,
    view: Arc<dyn MapView>,
    display: Arc<dyn DisplaySurface>,
    date_field: String,
    slider: TimeSliderConfig,
    spec: AggregateSpec,
    fields: Vec<DisplayField>,
    state: OrchestratorState,
}

impl Orchestrator {
    /// Vaccination defaults: `WeekEndDate`, weekly stops, the five panel rows.
    pub fn new(
        source: Arc<dyn FeatureSource>,
        view: Arc<dyn MapView>,
        display: Arc<dyn DisplaySurface>,
    ) -> Self {
        Self {
            source,
            view,
            display,
            date_field: DEFAULT_DATE_FIELD.to_string(),
            slider: TimeSliderConfig::default(),
            spec: vaccination_spec(),
            fields: VACCINATION_FIELDS.to_vec(),
            state: OrchestratorState::Uninitialized,
        }
    }

    pub fn with_date_field(mut self, date_field: &str) -> Self {
        self.date_field = date_field.to_string();
        self
    }

    pub fn with_slider_config(mut self, config: TimeSliderConfig) -> Self {
        self.slider = config;
        self
    }

    /// Replace the aggregate spec and the rows projected from its output.
    pub fn with_aggregate_spec(mut self, spec: AggregateSpec, fields: Vec<DisplayField>) -> Self {
        self.spec = spec;
        self.fields = fields;
        self
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    fn transition(&mut self, next: OrchestratorState) {
        info!("[VMAP] orchestrator: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Resolve the extent, mount the slider, show the initial statistics and
    /// start listening for window and viewport changes.
    ///
    /// Only valid once, from `Uninitialized`. A failed resolution leaves the
    /// orchestrator in `RangeFailed` with no slider mounted.
    pub async fn start(&mut self) -> Result<Session, PipelineError> {
        if self.state != OrchestratorState::Uninitialized {
            return Err(PipelineError::InvalidState(self.state.to_string()));
        }

        self.transition(OrchestratorState::RangeResolving);
        let resolver = DateRangeResolver::new(self.source.clone(), &self.date_field);
        let extent = match resolver.resolve().await {
            Ok(extent) => extent,
            Err(e) => {
                error!("[VMAP] orchestrator: time extent unavailable: {}", e);
                self.transition(OrchestratorState::RangeFailed);
                return Err(e);
            }
        };
        self.transition(OrchestratorState::RangeResolved(extent));

        let controller = TimeWindowController::new(extent, self.slider);
        let window = controller.current();
        self.view.mount_time_slider(&extent, &window);

        let pipeline = Arc::new(StatsPipeline {
            fetcher: StatsFetcher::new(self.source.clone(), &self.date_field, self.spec.clone()),
            fields: self.fields.clone(),
            view: self.view.clone(),
            display: self.display.clone(),
            generation: AtomicU64::new(0),
            begun: Mutex::new(None),
            completed: watch::channel(0).0,
            display_lock: Mutex::new(()),
        });
        let (viewport, viewports) = watch::channel(self.view.extent());
        let windows = controller.subscribe();

        let filter = QueryFilter::new(window, *viewports.borrow());
        let generation = pipeline.begin(&filter);
        pipeline.refresh(filter, generation).await;
        self.transition(OrchestratorState::WindowReady);

        let listener = tokio::spawn(listen(pipeline.clone(), windows, viewports));
        self.transition(OrchestratorState::Listening);

        Ok(Session {
            controller,
            view: self.view.clone(),
            viewport,
            pipeline,
            listener,
        })
    }
}

/// Refresh on every committed window or viewport change. A newer change
/// aborts the refresh still in flight.
async fn listen(
    pipeline: Arc<StatsPipeline>,
    mut windows: watch::Receiver<TimeWindow>,
    mut viewports: watch::Receiver<Geometry>,
) {
    let mut in_flight: Option<JoinHandle<bool>> = None;
    loop {
        tokio::select! {
            changed = windows.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            changed = viewports.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
        let filter = QueryFilter::new(*windows.borrow_and_update(), *viewports.borrow_and_update());
        if let Some(previous) = in_flight.take() {
            previous.abort();
        }
        let generation = pipeline.begin(&filter);
        let task = pipeline.clone();
        in_flight = Some(tokio::spawn(async move {
            task.refresh(filter, generation).await
        }));
    }
    info!("[VMAP] orchestrator: change feed closed, listener stopping");
}

/// A started pipeline. Dropping it stops the listener and discards any
/// refresh still in flight.
pub struct Session {
    controller: TimeWindowController,
    view: Arc<dyn MapView>,
    viewport: watch::Sender<Geometry>,
    pipeline: Arc<StatsPipeline>,
    listener: JoinHandle<()>,
}

impl Session {
    pub fn controller(&self) -> &TimeWindowController {
        &self.controller
    }

    pub fn extent(&self) -> TimeExtent {
        self.controller.extent()
    }

    pub fn viewport(&self) -> Geometry {
        *self.viewport.borrow()
    }

    /// Publish a new viewport. Setting the current one again is a no-op.
    pub fn set_viewport(&self, geometry: Geometry) {
        self.viewport.send_if_modified(|current| {
            if *current == geometry {
                false
            } else {
                *current = geometry;
                true
            }
        });
    }

    /// Re-read the viewport from the map view.
    pub fn refresh_viewport(&self) {
        self.set_viewport(self.view.extent());
    }

    /// Wait until the refresh for the current window and viewport has
    /// finished, whether it was shown, failed or found no rows.
    pub async fn settled(&self) {
        let mut completed = self.pipeline.completed.subscribe();
        loop {
            let filter = QueryFilter::new(self.controller.current(), self.viewport());
            if self.pipeline.is_settled(&filter) || self.listener.is_finished() {
                return;
            }
            if completed.changed().await.is_err() {
                return;
            }
        }
    }

    fn close(&self) {
        self.pipeline.invalidate();
        self.listener.abort();
    }

    /// Stop listening and wait for the listener task to exit.
    pub async fn shutdown(mut self) {
        self.close();
        let _ = (&mut self.listener).await;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
        info!("[VMAP] orchestrator: session closed");
    }
}
