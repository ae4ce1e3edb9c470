use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

use crate::monitoring::detection_loop::{Acquisition, DetectionLoop, LoopState, TickOutcome};
use crate::monitoring::domain::stats_aggregator::{Stats, StatsView};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to spawn monitoring thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("monitoring loop has shut down")]
    Stopped,
}

enum Command {
    Enable,
    Disable,
    Reset,
    Shutdown,
}

/// Loop status mirrored for readers on other threads. Written only by the loop.
#[derive(Default)]
struct LoopStatus {
    enabled: AtomicBool,
    running: AtomicBool,
}

impl LoopStatus {
    fn publish(&self, detection_loop: &DetectionLoop) {
        self.enabled
            .store(detection_loop.is_enabled(), Ordering::Relaxed);
        self.running.store(
            detection_loop.state() == LoopState::Running,
            Ordering::Relaxed,
        );
    }
}

/// Runs a `DetectionLoop` on a dedicated thread and exposes its control surface.
///
/// Control calls are messages on a command channel and return immediately.
/// While enabled, the loop thread ticks at the loop's frame interval; on
/// disable it drops its ticker, so no further frames are fetched. A frame
/// whose detection is in flight when a disable or reset arrives is
/// discarded once the detector returns.
///
/// Dropping the engine shuts the thread down.
pub struct MonitoringEngine {
    commands: Sender<Command>,
    stats: StatsView,
    status: Arc<LoopStatus>,
    exhausted: Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl MonitoringEngine {
    pub fn spawn(detection_loop: DetectionLoop) -> Result<Self, EngineError> {
        let (command_tx, command_rx) = crossbeam_channel::unbounded::<Command>();
        let (exhausted_tx, exhausted_rx) = crossbeam_channel::unbounded::<()>();
        let stats = detection_loop.stats();
        let status = Arc::new(LoopStatus::default());
        let status_clone = status.clone();

        let handle = std::thread::Builder::new()
            .name("examguard-monitor".into())
            .spawn(move || run_loop(detection_loop, command_rx, exhausted_tx, status_clone))
            .map_err(EngineError::Spawn)?;

        Ok(Self {
            commands: command_tx,
            stats,
            status,
            exhausted: exhausted_rx,
            handle: Some(handle),
        })
    }

    pub fn enable(&self) -> Result<(), EngineError> {
        self.send(Command::Enable)
    }

    /// No-op when already disabled.
    pub fn disable(&self) -> Result<(), EngineError> {
        self.send(Command::Disable)
    }

    /// Clears tracker state and stats without changing enabled state.
    pub fn reset(&self) -> Result<(), EngineError> {
        self.send(Command::Reset)
    }

    pub fn get_stats(&self) -> Stats {
        self.stats.snapshot()
    }

    pub fn is_enabled(&self) -> bool {
        self.status.enabled.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.status.running.load(Ordering::Relaxed)
    }

    /// Blocks until the frame source reports it has no more frames, or the
    /// timeout elapses. Returns `true` if the source was exhausted.
    pub fn wait_for_exhaustion(&self, timeout: Duration) -> bool {
        self.exhausted.recv_timeout(timeout).is_ok()
    }

    /// Stops the loop thread and waits for it to finish. Stats stay readable.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.commands.send(Command::Shutdown);
        if handle.join().is_err() {
            log::error!("Monitoring thread panicked");
        }
    }

    fn send(&self, command: Command) -> Result<(), EngineError> {
        if self.handle.is_none() {
            return Err(EngineError::Stopped);
        }
        self.commands.send(command).map_err(|_| EngineError::Stopped)
    }
}

impl Drop for MonitoringEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_loop(
    mut detection_loop: DetectionLoop,
    commands: Receiver<Command>,
    exhausted: Sender<()>,
    status: Arc<LoopStatus>,
) {
    let interval = detection_loop.frame_interval();

    'outer: loop {
        if !detection_loop.is_enabled() {
            let flow = match commands.recv() {
                Ok(command) => handle_command(&mut detection_loop, command),
                Err(_) => ControlFlow::Break(()),
            };
            status.publish(&detection_loop);
            if flow.is_break() {
                break;
            }
            continue;
        }

        let ticker = crossbeam_channel::tick(interval);
        while detection_loop.is_enabled() {
            let flow = crossbeam_channel::select! {
                recv(commands) -> msg => {
                    match msg {
                        Ok(command) => handle_command(&mut detection_loop, command),
                        Err(_) => ControlFlow::Break(()),
                    }
                }
                recv(ticker) -> _ => {
                    run_tick(&mut detection_loop, &commands, &exhausted)
                }
            };
            status.publish(&detection_loop);
            if flow.is_break() {
                break 'outer;
            }
        }
    }

    detection_loop.disable();
    status.publish(&detection_loop);
    detection_loop.log_summary();
}

fn run_tick(
    detection_loop: &mut DetectionLoop,
    commands: &Receiver<Command>,
    exhausted: &Sender<()>,
) -> ControlFlow<()> {
    match detection_loop.acquire() {
        Acquisition::Skipped(TickOutcome::SourceExhausted) => {
            let _ = exhausted.send(());
            ControlFlow::Continue(())
        }
        Acquisition::Skipped(_) => ControlFlow::Continue(()),
        Acquisition::Detected(detected) => {
            // Commands that arrived during detection take effect before its result.
            while let Ok(command) = commands.try_recv() {
                if handle_command(detection_loop, command).is_break() {
                    return ControlFlow::Break(());
                }
            }
            detection_loop.apply(detected);
            ControlFlow::Continue(())
        }
    }
}

fn handle_command(detection_loop: &mut DetectionLoop, command: Command) -> ControlFlow<()> {
    match command {
        Command::Enable => {
            detection_loop.enable();
        }
        Command::Disable => {
            detection_loop.disable();
        }
        Command::Reset => detection_loop.reset(),
        Command::Shutdown => return ControlFlow::Break(()),
    }
    ControlFlow::Continue(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_detector::FaceDetector;
    use crate::detection::domain::frame_source::FrameSource;
    use crate::monitoring::detection_loop::ViolationSink;
    use crate::monitoring::domain::violation::{Violation, ViolationCategory};
    use crate::shared::face_box::FaceBox;
    use crate::shared::frame::Frame;
    use crate::shared::settings::MonitorSettings;
    use std::sync::atomic::AtomicUsize;

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Serves `limit` frames 33 ms apart (unbounded when `None`), counting
    /// how many were handed out.
    struct CountingSource {
        served: Arc<AtomicUsize>,
        limit: Option<usize>,
    }

    impl CountingSource {
        fn new(limit: Option<usize>) -> (Self, Arc<AtomicUsize>) {
            let served = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    served: served.clone(),
                    limit,
                },
                served,
            )
        }
    }

    impl FrameSource for CountingSource {
        fn is_ready(&self) -> bool {
            true
        }

        fn current_frame(&mut self) -> Option<Frame> {
            let index = self.served.load(Ordering::SeqCst);
            if self.limit.is_some_and(|limit| index >= limit) {
                return None;
            }
            self.served.fetch_add(1, Ordering::SeqCst);
            Some(Frame::without_pixels(640, 480, index, index as u64 * 33))
        }

        fn frame_interval(&self) -> Duration {
            Duration::from_millis(1)
        }
    }

    /// Reports a fixed face set and announces each call on a channel.
    struct FixedDetector {
        faces: Vec<FaceBox>,
        calls: Option<Sender<()>>,
        fail: bool,
    }

    impl FixedDetector {
        fn faces(count: usize) -> Self {
            Self {
                faces: (0..count)
                    .map(|i| FaceBox::new(100.0 + 200.0 * i as f64, 200.0, 40.0, 40.0))
                    .collect(),
                calls: None,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::faces(0)
            }
        }

        fn announcing(mut self, calls: Sender<()>) -> Self {
            self.calls = Some(calls);
            self
        }
    }

    impl FaceDetector for FixedDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
            _timestamp_ms: u64,
        ) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
            if let Some(calls) = &self.calls {
                let _ = calls.send(());
            }
            if self.fail {
                return Err("detector unavailable".into());
            }
            Ok(self.faces.clone())
        }
    }

    /// Blocks every call until released, then reports two faces.
    struct GatedDetector {
        entered: Sender<()>,
        release: Receiver<()>,
    }

    impl FaceDetector for GatedDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
            _timestamp_ms: u64,
        ) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
            let _ = self.entered.send(());
            let _ = self.release.recv();
            Ok(vec![
                FaceBox::new(100.0, 200.0, 40.0, 40.0),
                FaceBox::new(400.0, 200.0, 40.0, 40.0),
            ])
        }
    }

    fn channel_sink() -> (ViolationSink, Receiver<Violation>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let sink: ViolationSink = Box::new(move |v: &Violation| {
            let _ = tx.send(v.clone());
        });
        (sink, rx)
    }

    fn engine_with(
        source: CountingSource,
        detector: Box<dyn FaceDetector>,
        sink: Option<ViolationSink>,
    ) -> MonitoringEngine {
        let mut detection_loop =
            DetectionLoop::new(Box::new(source), detector, &MonitorSettings::default());
        if let Some(sink) = sink {
            detection_loop = detection_loop.with_sink(sink);
        }
        MonitoringEngine::spawn(detection_loop).unwrap()
    }

    #[test]
    fn test_thirty_five_empty_frames_yield_one_no_face() {
        let (source, served) = CountingSource::new(Some(35));
        let (sink, violations) = channel_sink();
        let engine = engine_with(source, Box::new(FixedDetector::faces(0)), Some(sink));

        engine.enable().unwrap();
        assert!(engine.wait_for_exhaustion(TIMEOUT));

        let stats = engine.get_stats();
        assert_eq!(served.load(Ordering::SeqCst), 35);
        assert_eq!(stats.violations.len(), 1);
        assert_eq!(stats.count(ViolationCategory::NoFace), 1);
        assert_eq!(violations.try_iter().count(), 1);
    }

    #[test]
    fn test_exhaustion_leaves_engine_disabled() {
        let (source, _) = CountingSource::new(Some(3));
        let mut engine = engine_with(source, Box::new(FixedDetector::faces(1)), None);

        engine.enable().unwrap();
        assert!(engine.wait_for_exhaustion(TIMEOUT));
        engine.shutdown();

        assert!(!engine.is_enabled());
        assert!(!engine.is_running());
    }

    #[test]
    fn test_nothing_is_processed_before_enable() {
        let (source, served) = CountingSource::new(None);
        let mut engine = engine_with(source, Box::new(FixedDetector::faces(0)), None);

        std::thread::sleep(Duration::from_millis(20));
        engine.shutdown();

        assert_eq!(served.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_disable_stops_fetching_frames() {
        let (source, served) = CountingSource::new(None);
        let (calls_tx, calls_rx) = crossbeam_channel::unbounded();
        let detector = FixedDetector::faces(1).announcing(calls_tx);
        let mut engine = engine_with(source, Box::new(detector), None);

        engine.enable().unwrap();
        for _ in 0..5 {
            calls_rx.recv_timeout(TIMEOUT).unwrap();
        }
        engine.disable().unwrap();
        engine.disable().unwrap();
        let after_disable = served.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(30));
        engine.shutdown();

        assert!(served.load(Ordering::SeqCst) <= after_disable + 1);
    }

    #[test]
    fn test_disable_while_idle_is_noop_and_enable_still_works() {
        let (source, _) = CountingSource::new(None);
        let (calls_tx, calls_rx) = crossbeam_channel::unbounded();
        let detector = FixedDetector::faces(1).announcing(calls_tx);
        let engine = engine_with(source, Box::new(detector), None);

        engine.disable().unwrap();
        engine.disable().unwrap();
        engine.enable().unwrap();

        assert!(calls_rx.recv_timeout(TIMEOUT).is_ok());
    }

    #[test]
    fn test_detector_failures_do_not_stop_the_loop() {
        let (source, served) = CountingSource::new(Some(10));
        let engine = engine_with(source, Box::new(FixedDetector::failing()), None);

        engine.enable().unwrap();
        assert!(engine.wait_for_exhaustion(TIMEOUT));

        assert_eq!(served.load(Ordering::SeqCst), 10);
        assert_eq!(engine.get_stats().total(), 0);
    }

    #[test]
    fn test_in_flight_result_is_discarded_after_disable() {
        let (source, _) = CountingSource::new(None);
        let (entered_tx, entered_rx) = crossbeam_channel::unbounded();
        let (release_tx, release_rx) = crossbeam_channel::unbounded();
        let detector = GatedDetector {
            entered: entered_tx,
            release: release_rx,
        };
        let (sink, violations) = channel_sink();
        let mut engine = engine_with(source, Box::new(detector), Some(sink));

        engine.enable().unwrap();
        entered_rx.recv_timeout(TIMEOUT).unwrap();
        engine.disable().unwrap();
        release_tx.send(()).unwrap();
        engine.shutdown();

        assert_eq!(engine.get_stats().total(), 0);
        assert!(violations.try_recv().is_err());
    }

    #[test]
    fn test_multiple_faces_reach_sink() {
        let (source, _) = CountingSource::new(Some(1));
        let (sink, violations) = channel_sink();
        let engine = engine_with(source, Box::new(FixedDetector::faces(2)), Some(sink));

        engine.enable().unwrap();
        let violation = violations.recv_timeout(TIMEOUT).unwrap();

        assert_eq!(violation.category, ViolationCategory::MultipleFaces);
        assert_eq!(violation.description, "2 faces detected");
    }

    #[test]
    fn test_stats_view_taken_before_spawn_tracks_engine() {
        let (source, _) = CountingSource::new(Some(2));
        let detection_loop = DetectionLoop::new(
            Box::new(source),
            Box::new(FixedDetector::faces(2)),
            &MonitorSettings::default(),
        );
        let view = detection_loop.stats();
        let engine = MonitoringEngine::spawn(detection_loop).unwrap();

        assert_eq!(view.snapshot().total(), 0);
        engine.enable().unwrap();
        assert!(engine.wait_for_exhaustion(TIMEOUT));

        assert_eq!(view.snapshot().count(ViolationCategory::MultipleFaces), 1);
        assert_eq!(view.snapshot(), engine.get_stats());
    }

    #[test]
    fn test_control_after_shutdown_is_an_error() {
        let (source, _) = CountingSource::new(None);
        let mut engine = engine_with(source, Box::new(FixedDetector::faces(0)), None);

        engine.shutdown();
        engine.shutdown();

        assert!(matches!(engine.enable(), Err(EngineError::Stopped)));
    }
}
