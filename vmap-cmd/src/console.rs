//! Terminal stand-ins for the map view and the statistics panel.

use log::info;
use std::io::Write;
use std::sync::{Mutex, PoisonError};
use vmap_core::display::StatsDisplay;
use vmap_core::geometry::Geometry;
use vmap_core::query::QueryFilter;
use vmap_core::time_extent::{TimeExtent, TimeWindow};
use vmap_core::traits::{DisplaySurface, MapView};

/// A fixed viewport that logs what the map would render.
pub struct ConsoleMap {
    viewport: Geometry,
}

impl ConsoleMap {
    pub fn new(viewport: Geometry) -> Self {
        Self { viewport }
    }
}

impl MapView for ConsoleMap {
    fn extent(&self) -> Geometry {
        self.viewport
    }

    fn apply_feature_effect(&self, filter: &QueryFilter) {
        info!(
            "[VMAP] map: highlighting {} within {}",
            filter.time_window, filter.geometry
        );
    }

    fn mount_time_slider(&self, extent: &TimeExtent, window: &TimeWindow) {
        info!("[VMAP] map: time slider over {} at {}", extent, window);
    }
}

/// Writes each panel update as a block of `label: value` lines.
pub struct ConsolePanel<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> ConsolePanel<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConsolePanel<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> DisplaySurface for ConsolePanel<W> {
    fn show(&self, display: &StatsDisplay) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let mut block = display.to_text_lines().join("\n");
        block.push_str("\n\n");
        if let Err(e) = out.write_all(block.as_bytes()).and_then(|_| out.flush()) {
            log::error!("[VMAP] panel: write failed: {}", e);
        }
    }
}
