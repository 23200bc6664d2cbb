//! Slider position inside the resolved time extent.
//!
//! The controller is the single owner of the current [`TimeWindow`]. Every
//! committed change is published on a `tokio::sync::watch` channel, so a
//! subscriber always sees the latest committed window; intermediate drag
//! positions are kept aside until committed.

use chrono::NaiveDate;
use log::{info, warn};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vmap_core::date_range::{nearest_stop, next_stop, WEEK_DAYS};
use vmap_core::error::PipelineError;
use vmap_core::time_extent::{TimeExtent, TimeWindow};

/// Slider behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSliderConfig {
    /// Delay between playback steps.
    pub play_rate: Duration,
    /// Distance between stops in days; `None` lets the slider rest on any day
    /// (playback then steps one week at a time).
    pub stop_interval_days: Option<i64>,
}

impl Default for TimeSliderConfig {
    fn default() -> Self {
        Self {
            play_rate: Duration::from_millis(500),
            stop_interval_days: Some(WEEK_DAYS),
        }
    }
}

/// Outcome of a set request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowUpdate {
    /// The committed window.
    pub window: TimeWindow,
    /// The requested date lay outside the extent and was pulled back to it.
    pub clamped: bool,
}

struct ControllerInner {
    extent: TimeExtent,
    config: TimeSliderConfig,
    sender: watch::Sender<TimeWindow>,
    dragging: Mutex<Option<NaiveDate>>,
}

/// Owner of the current window. Clones share the same state.
#[derive(Clone)]
pub struct TimeWindowController {
    inner: Arc<ControllerInner>,
}

impl TimeWindowController {
    /// Starts on the latest instant of `extent`.
    pub fn new(extent: TimeExtent, config: TimeSliderConfig) -> Self {
        let (sender, _) = watch::channel(TimeWindow::instant(extent.end()));
        Self {
            inner: Arc::new(ControllerInner {
                extent,
                config,
                sender,
                dragging: Mutex::new(None),
            }),
        }
    }

    pub fn extent(&self) -> TimeExtent {
        self.inner.extent
    }

    pub fn config(&self) -> TimeSliderConfig {
        self.inner.config
    }

    pub fn current(&self) -> TimeWindow {
        *self.inner.sender.borrow()
    }

    /// Receiver of committed windows. The current window counts as seen.
    pub fn subscribe(&self) -> watch::Receiver<TimeWindow> {
        self.inner.sender.subscribe()
    }

    fn step_days(&self) -> i64 {
        self.inner.config.stop_interval_days.unwrap_or(WEEK_DAYS)
    }

    /// Clamp, snap to the nearest stop, commit.
    fn place(&self, date: NaiveDate) -> NaiveDate {
        let extent = &self.inner.extent;
        match self.inner.config.stop_interval_days {
            Some(days) => nearest_stop(extent, days, date),
            None => extent.clamp(date),
        }
    }

    fn commit(&self, date: NaiveDate) -> TimeWindow {
        let window = TimeWindow::instant(date);
        self.inner.sender.send_if_modified(|current| {
            if *current == window {
                false
            } else {
                *current = window;
                true
            }
        });
        window
    }

    /// Move the slider to `date`. Dates outside the extent are clamped to the
    /// nearest bound with a warning; this never fails.
    pub fn set_instant(&self, date: NaiveDate) -> WindowUpdate {
        let clamped = !self.inner.extent.contains(date);
        if clamped {
            warn!(
                "[VMAP] controller: {} is outside {}, clamping",
                date, self.inner.extent
            );
        }
        let window = self.commit(self.place(date));
        WindowUpdate { window, clamped }
    }

    /// Strict form of [`set_instant`](Self::set_instant): dates outside the
    /// extent are rejected and nothing is committed.
    pub fn try_set_instant(&self, date: NaiveDate) -> Result<WindowUpdate, PipelineError> {
        if !self.inner.extent.contains(date) {
            return Err(PipelineError::Range {
                requested: date,
                extent: self.inner.extent,
            });
        }
        Ok(self.set_instant(date))
    }

    /// Record an in-progress drag position. Not published.
    pub fn drag(&self, date: NaiveDate) {
        *self
            .inner
            .dragging
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(date);
    }

    /// Commit the last drag position, if a drag is in progress.
    pub fn commit_drag(&self) -> Option<WindowUpdate> {
        let dragged = self
            .inner
            .dragging
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        dragged.map(|date| self.set_instant(date))
    }

    /// Advance to the next stop; `None` when already at the end.
    pub fn step_forward(&self) -> Option<WindowUpdate> {
        let current = self.current().end();
        next_stop(&self.inner.extent, self.step_days(), current).map(|date| WindowUpdate {
            window: self.commit(date),
            clamped: false,
        })
    }

    /// Start playback at the configured rate.
    pub fn play(&self) -> Playback {
        self.play_at(self.inner.config.play_rate)
    }

    /// Step forward one stop every `rate` until the extent end is reached or
    /// the returned [`Playback`] is stopped. Playing from the end restarts at
    /// the extent start. Must be called inside a tokio runtime.
    pub fn play_at(&self, rate: Duration) -> Playback {
        let extent = self.inner.extent;
        if self.current().end() >= extent.end() && extent.start() < extent.end() {
            self.commit(extent.start());
        }
        let token = CancellationToken::new();
        let controller = self.clone();
        let cancel = token.clone();
        info!(
            "[VMAP] controller: playback from {} every {:?}",
            self.current(),
            rate
        );
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return PlaybackEnd::Cancelled,
                    _ = tokio::time::sleep(rate) => {}
                }
                match controller.step_forward() {
                    Some(update) if update.window.end() < extent.end() => continue,
                    _ => {
                        info!("[VMAP] controller: playback reached {}", extent.end());
                        return PlaybackEnd::ReachedEnd;
                    }
                }
            }
        });
        Playback { token, handle }
    }
}

/// Why playback finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEnd {
    ReachedEnd,
    Cancelled,
}

/// Handle to a running playback. Dropping it stops the playback.
pub struct Playback {
    token: CancellationToken,
    handle: JoinHandle<PlaybackEnd>,
}

impl Playback {
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Wait for playback to finish.
    pub async fn join(mut self) -> PlaybackEnd {
        (&mut self.handle).await.unwrap_or(PlaybackEnd::Cancelled)
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
