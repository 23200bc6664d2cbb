use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vmap_core::display::StatsDisplay;
use vmap_core::error::{PipelineError, QueryError};
use vmap_core::geometry::Geometry;
use vmap_core::query::{QueryFilter, StatisticsQuery, TopFeaturesQuery};
use vmap_core::stats_record::StatsRecord;
use vmap_core::time_extent::{TimeExtent, TimeWindow};
use vmap_core::traits::{DisplaySurface, FeatureSource, MapView};
use vmap_db::Database;
use vmap_stats::formatter::NO_DATA_MESSAGE;
use vmap_timeline::{Orchestrator, OrchestratorState};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Country A (0..10, 0..10) reports every week from 2021-01-03 to 2021-03-07;
/// Country B (100..120, -40..-20) only in week 1.
const WEEKLY_CSV: &str = "\
Country,ISO3,Week,Year,WeekEndDate,Percentage,XMin,YMin,XMax,YMax
Country A,AAA,1,2021,2021-01-03,1.0,0,0,10,10
Country A,AAA,2,2021,2021-01-10,5.0,0,0,10,10
Country A,AAA,3,2021,2021-01-17,10.0,0,0,10,10
Country A,AAA,4,2021,2021-01-24,15.0,0,0,10,10
Country A,AAA,5,2021,2021-01-31,20.0,0,0,10,10
Country A,AAA,6,2021,2021-02-07,25.0,0,0,10,10
Country A,AAA,7,2021,2021-02-14,30.0,0,0,10,10
Country A,AAA,8,2021,2021-02-21,35.0,0,0,10,10
Country A,AAA,9,2021,2021-02-28,40.0,0,0,10,10
Country A,AAA,10,2021,2021-03-07,50.0,0,0,10,10
Country B,BBB,1,2021,2021-01-03,3.0,100,-40,120,-20
";

fn weekly_db() -> Database {
    let db = Database::new().unwrap();
    db.load_features(WEEKLY_CSV).unwrap();
    db
}

fn country_b_area() -> Geometry {
    Geometry::envelope(100.0, -40.0, 120.0, -20.0).unwrap()
}

#[derive(Default)]
struct RecordingMap {
    extent: Mutex<Option<Geometry>>,
    effects: Mutex<Vec<QueryFilter>>,
    sliders: Mutex<Vec<(TimeExtent, TimeWindow)>>,
}

impl RecordingMap {
    fn effects(&self) -> Vec<QueryFilter> {
        self.effects.lock().unwrap().clone()
    }

    fn sliders(&self) -> Vec<(TimeExtent, TimeWindow)> {
        self.sliders.lock().unwrap().clone()
    }
}

impl MapView for RecordingMap {
    fn extent(&self) -> Geometry {
        self.extent.lock().unwrap().unwrap_or(Geometry::WORLD)
    }

    fn apply_feature_effect(&self, filter: &QueryFilter) {
        self.effects.lock().unwrap().push(*filter);
    }

    fn mount_time_slider(&self, extent: &TimeExtent, window: &TimeWindow) {
        self.sliders.lock().unwrap().push((*extent, *window));
    }
}

#[derive(Default)]
struct RecordingPanel {
    shown: Mutex<Vec<StatsDisplay>>,
}

impl RecordingPanel {
    fn shown(&self) -> Vec<StatsDisplay> {
        self.shown.lock().unwrap().clone()
    }

    fn last_lines(&self) -> Vec<String> {
        self.shown()
            .last()
            .map(StatsDisplay::to_text_lines)
            .unwrap_or_default()
    }
}

impl DisplaySurface for RecordingPanel {
    fn show(&self, display: &StatsDisplay) {
        self.shown.lock().unwrap().push(display.clone());
    }
}

/// Delays statistics (for one week or for all) and can be told to fail them.
struct ScriptedSource {
    inner: Database,
    slow_week: Option<(NaiveDate, Duration)>,
    stats_delay: Duration,
    fail_stats: AtomicBool,
}

impl ScriptedSource {
    fn new(inner: Database) -> Self {
        Self {
            inner,
            slow_week: None,
            stats_delay: Duration::ZERO,
            fail_stats: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl FeatureSource for ScriptedSource {
    async fn query_top_features(
        &self,
        query: &TopFeaturesQuery,
    ) -> Result<Vec<NaiveDate>, QueryError> {
        FeatureSource::query_top_features(&self.inner, query).await
    }

    async fn query_statistics(
        &self,
        query: &StatisticsQuery,
    ) -> Result<Vec<StatsRecord>, QueryError> {
        if self.fail_stats.load(Ordering::SeqCst) {
            return Err(QueryError::Transport("connection reset".into()));
        }
        tokio::time::sleep(self.stats_delay).await;
        if let Some((week, delay)) = self.slow_week {
            if query.filter.time_window.end() == week {
                tokio::time::sleep(delay).await;
            }
        }
        FeatureSource::query_statistics(&self.inner, query).await
    }
}

struct Unreachable;

#[async_trait]
impl FeatureSource for Unreachable {
    async fn query_top_features(
        &self,
        _query: &TopFeaturesQuery,
    ) -> Result<Vec<NaiveDate>, QueryError> {
        Err(QueryError::Transport("connection refused".into()))
    }

    async fn query_statistics(
        &self,
        _query: &StatisticsQuery,
    ) -> Result<Vec<StatsRecord>, QueryError> {
        Err(QueryError::Transport("connection refused".into()))
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}

fn pipeline_with(
    source: Arc<dyn FeatureSource>,
) -> (Orchestrator, Arc<RecordingMap>, Arc<RecordingPanel>) {
    let map = Arc::new(RecordingMap::default());
    let panel = Arc::new(RecordingPanel::default());
    let orchestrator = Orchestrator::new(source, map.clone(), panel.clone());
    (orchestrator, map, panel)
}

#[tokio::test]
async fn start_shows_latest_week() {
    let (mut orchestrator, map, panel) = pipeline_with(Arc::new(weekly_db()));
    let session = orchestrator.start().await.unwrap();

    assert_eq!(orchestrator.state(), OrchestratorState::Listening);
    let extent = TimeExtent::new(d(2021, 1, 3), d(2021, 3, 7)).unwrap();
    assert_eq!(session.extent(), extent);
    assert_eq!(
        map.sliders(),
        vec![(extent, TimeWindow::instant(d(2021, 3, 7)))]
    );
    assert_eq!(
        map.effects(),
        vec![QueryFilter::new(
            TimeWindow::instant(d(2021, 3, 7)),
            Geometry::WORLD
        )]
    );
    assert_eq!(
        panel.last_lines(),
        vec![
            "Week: 10",
            "Year: 2021",
            "Max percentage: 50.00%",
            "Average percentage: 50.00%",
            "Min percentage: 50.00%",
        ]
    );
}

#[tokio::test]
async fn slider_change_refreshes_panel() {
    let (mut orchestrator, map, panel) = pipeline_with(Arc::new(weekly_db()));
    let session = orchestrator.start().await.unwrap();

    session.controller().set_instant(d(2021, 1, 3));
    wait_until(|| panel.shown().len() == 2).await;
    assert_eq!(
        panel.last_lines(),
        vec![
            "Week: 1",
            "Year: 2021",
            "Max percentage: 3.00%",
            "Average percentage: 2.00%",
            "Min percentage: 1.00%",
        ]
    );
    assert_eq!(
        map.effects().last().unwrap().time_window,
        TimeWindow::instant(d(2021, 1, 3))
    );
}

#[tokio::test]
async fn empty_viewport_shows_fallback() {
    let (mut orchestrator, map, panel) = pipeline_with(Arc::new(weekly_db()));
    let session = orchestrator.start().await.unwrap();

    session.set_viewport(country_b_area());
    wait_until(|| panel.shown().len() == 2).await;
    assert_eq!(
        panel.shown().last().unwrap(),
        &StatsDisplay::Fallback(NO_DATA_MESSAGE.to_string())
    );
    assert_eq!(map.effects().last().unwrap().geometry, country_b_area());

    session.controller().set_instant(d(2021, 1, 3));
    wait_until(|| panel.shown().len() == 3).await;
    assert!(panel
        .last_lines()
        .contains(&"Average percentage: 3.00%".to_string()));
}

#[tokio::test]
async fn week_five_outside_viewport_falls_back_and_map_follows() {
    let (mut orchestrator, map, panel) = pipeline_with(Arc::new(weekly_db()));
    *map.extent.lock().unwrap() = Some(country_b_area());
    let session = orchestrator.start().await.unwrap();

    session.controller().set_instant(d(2021, 1, 31));
    wait_until(|| panel.shown().len() == 2).await;

    let fallback = StatsDisplay::Fallback(NO_DATA_MESSAGE.to_string());
    assert_eq!(panel.shown(), vec![fallback.clone(), fallback]);
    assert_eq!(
        map.effects().last().unwrap(),
        &QueryFilter::new(TimeWindow::instant(d(2021, 1, 31)), country_b_area())
    );
}

#[tokio::test]
async fn viewport_is_read_from_map() {
    let (mut orchestrator, map, panel) = pipeline_with(Arc::new(weekly_db()));
    *map.extent.lock().unwrap() = Some(country_b_area());
    let session = orchestrator.start().await.unwrap();

    assert_eq!(session.viewport(), country_b_area());
    assert!(panel.shown()[0].is_fallback());

    *map.extent.lock().unwrap() = Some(Geometry::WORLD);
    session.refresh_viewport();
    wait_until(|| panel.shown().len() == 2).await;
    assert!(!panel.shown()[1].is_fallback());
}

#[tokio::test]
async fn unreachable_service_fails_range_without_slider() {
    let (mut orchestrator, map, panel) = pipeline_with(Arc::new(Unreachable));
    let err = orchestrator.start().await.err().unwrap();

    assert_eq!(
        err,
        PipelineError::UpstreamQuery(QueryError::Transport("connection refused".into()))
    );
    assert_eq!(orchestrator.state(), OrchestratorState::RangeFailed);
    assert!(map.sliders().is_empty());
    assert!(map.effects().is_empty());
    assert!(panel.shown().is_empty());
}

#[tokio::test]
async fn empty_dataset_fails_range() {
    let (mut orchestrator, map, _panel) = pipeline_with(Arc::new(Database::new().unwrap()));
    let err = orchestrator.start().await.err().unwrap();

    assert_eq!(
        err,
        PipelineError::NoData {
            field: "WeekEndDate".into()
        }
    );
    assert_eq!(orchestrator.state(), OrchestratorState::RangeFailed);
    assert!(map.sliders().is_empty());
}

#[tokio::test]
async fn second_start_is_rejected() {
    let (mut orchestrator, map, _panel) = pipeline_with(Arc::new(weekly_db()));
    let _session = orchestrator.start().await.unwrap();

    let err = orchestrator.start().await.err().unwrap();
    assert_eq!(err, PipelineError::InvalidState("Listening".into()));
    assert_eq!(map.sliders().len(), 1);

    let (mut failed, _, _) = pipeline_with(Arc::new(Unreachable));
    assert!(failed.start().await.is_err());
    assert_eq!(
        failed.start().await.err().unwrap(),
        PipelineError::InvalidState("RangeFailed".into())
    );
}

#[tokio::test]
async fn stale_response_never_reaches_panel() {
    let mut source = ScriptedSource::new(weekly_db());
    source.slow_week = Some((d(2021, 1, 10), Duration::from_millis(300)));
    let (mut orchestrator, _map, panel) = pipeline_with(Arc::new(source));
    let session = orchestrator.start().await.unwrap();

    session.controller().set_instant(d(2021, 1, 10));
    tokio::time::sleep(Duration::from_millis(30)).await;
    session.controller().set_instant(d(2021, 1, 17));
    wait_until(|| panel.shown().len() == 2).await;
    tokio::time::sleep(Duration::from_millis(400)).await;

    let shown = panel.shown();
    assert_eq!(shown.len(), 2);
    assert!(shown[1]
        .to_text_lines()
        .contains(&"Average percentage: 10.00%".to_string()));
}

#[tokio::test]
async fn failed_refresh_keeps_previous_panel() {
    let source = Arc::new(ScriptedSource::new(weekly_db()));
    let (mut orchestrator, map, panel) = pipeline_with(source.clone());
    let session = orchestrator.start().await.unwrap();
    let before = panel.shown();

    source.fail_stats.store(true, Ordering::SeqCst);
    session.controller().set_instant(d(2021, 1, 3));
    wait_until(|| map.effects().len() == 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(panel.shown(), before);
}

#[tokio::test]
async fn clamped_request_keeps_window_and_panel() {
    let (mut orchestrator, map, panel) = pipeline_with(Arc::new(weekly_db()));
    let session = orchestrator.start().await.unwrap();

    let update = session.controller().set_instant(d(2030, 1, 1));
    assert!(update.clamped);
    assert_eq!(update.window, TimeWindow::instant(d(2021, 3, 7)));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(map.effects().len(), 1);
    assert_eq!(panel.shown().len(), 1);
}

#[tokio::test]
async fn shutdown_stops_refreshes() {
    let (mut orchestrator, map, panel) = pipeline_with(Arc::new(weekly_db()));
    let session = orchestrator.start().await.unwrap();
    let controller = session.controller().clone();

    session.shutdown().await;
    controller.set_instant(d(2021, 1, 3));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(map.effects().len(), 1);
    assert_eq!(panel.shown().len(), 1);
}

#[tokio::test]
async fn playback_refreshes_every_week() {
    let (mut orchestrator, _map, panel) = pipeline_with(Arc::new(weekly_db()));
    let session = orchestrator.start().await.unwrap();

    let playback = session.controller().play_at(Duration::from_millis(40));
    playback.join().await;
    wait_until(|| {
        panel
            .last_lines()
            .contains(&"Average percentage: 50.00%".to_string())
            && panel.shown().len() > 2
    })
    .await;
    assert_eq!(
        session.controller().current(),
        TimeWindow::instant(d(2021, 3, 7))
    );
}

#[tokio::test]
async fn same_filter_gives_same_panel() {
    let (mut orchestrator, _map, panel) = pipeline_with(Arc::new(weekly_db()));
    let session = orchestrator.start().await.unwrap();

    session.controller().set_instant(d(2021, 1, 3));
    wait_until(|| panel.shown().len() == 2).await;
    session.controller().set_instant(d(2021, 3, 7));
    wait_until(|| panel.shown().len() == 3).await;

    let shown = panel.shown();
    assert_eq!(shown[0], shown[2]);
    assert_ne!(shown[0], shown[1]);
}

#[tokio::test]
async fn settled_waits_for_last_week_after_slow_playback() {
    let mut source = ScriptedSource::new(weekly_db());
    source.stats_delay = Duration::from_millis(30);
    let (mut orchestrator, _map, panel) = pipeline_with(Arc::new(source));
    let session = orchestrator.start().await.unwrap();

    session.controller().play_at(Duration::from_millis(5)).join().await;
    session.settled().await;

    assert!(panel
        .last_lines()
        .contains(&"Week: 10".to_string()));
    assert!(panel.shown().len() >= 2, "final week never displayed");
    session.shutdown().await;
}

#[tokio::test]
async fn settled_returns_after_failed_refresh() {
    let source = Arc::new(ScriptedSource::new(weekly_db()));
    let (mut orchestrator, _map, panel) = pipeline_with(source.clone());
    let session = orchestrator.start().await.unwrap();
    session.settled().await;

    source.fail_stats.store(true, Ordering::SeqCst);
    session.controller().set_instant(d(2021, 1, 3));
    tokio::time::timeout(Duration::from_secs(2), session.settled())
        .await
        .unwrap();
    assert_eq!(panel.shown().len(), 1);
}
