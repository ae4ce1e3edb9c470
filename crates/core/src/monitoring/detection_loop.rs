use std::time::{Duration, Instant};

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::frame_source::FrameSource;
use crate::monitoring::domain::stats_aggregator::{StatsAggregator, StatsView};
use crate::monitoring::domain::throttle_gate::ThrottleGate;
use crate::monitoring::domain::tracker_state::TrackerState;
use crate::monitoring::domain::violation::Violation;
use crate::monitoring::domain::violation_classifier::ViolationClassifier;
use crate::monitoring::monitor_logger::{MonitorLogger, NullMonitorLogger};
use crate::shared::face_box::FaceBox;
use crate::shared::settings::MonitorSettings;

/// Callback invoked once per accepted violation, on the loop's thread.
pub type ViolationSink = Box<dyn FnMut(&Violation) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Disabled,
    SourceNotReady,
    SourceExhausted,
    DetectorFailed,
    /// Detection finished after the loop was disabled or reset; result dropped.
    Discarded,
    Processed { accepted: usize },
}

/// Detections for one frame, waiting to be classified.
#[derive(Debug, Clone)]
pub struct DetectedFrame {
    pub index: usize,
    pub timestamp_ms: u64,
    pub width: u32,
    pub height: u32,
    pub faces: Vec<FaceBox>,
    generation: u64,
}

/// Result of the detection half of a tick.
#[derive(Debug)]
pub enum Acquisition {
    Skipped(TickOutcome),
    Detected(DetectedFrame),
}

/// Single-owner driver that turns frames into accepted violations.
///
/// Owns the frame source, detector, and `TrackerState`; it is the only
/// writer of its `StatsAggregator`. A tick is split into `acquire` (fetch
/// and detect) and `apply` (classify, throttle, publish) so a scheduler can
/// react to control signals that arrive while the detector is busy.
///
/// State machine: `Idle → Running` on the first tick that finds the loop
/// enabled and the source ready; `Running → Idle` on `disable` or when the
/// source runs out of frames. Detector failures never leave `Running`.
pub struct DetectionLoop {
    source: Box<dyn FrameSource>,
    detector: Box<dyn FaceDetector>,
    classifier: ViolationClassifier,
    throttle: ThrottleGate,
    tracker: TrackerState,
    stats: StatsAggregator,
    sink: Option<ViolationSink>,
    logger: Box<dyn MonitorLogger>,
    frame_interval: Duration,
    enabled: bool,
    state: LoopState,
    generation: u64,
    frames_processed: usize,
}

impl DetectionLoop {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn FaceDetector>,
        settings: &MonitorSettings,
    ) -> Self {
        let frame_interval = settings
            .frame_interval()
            .unwrap_or_else(|| source.frame_interval());
        Self {
            source,
            detector,
            classifier: settings.classifier(),
            throttle: settings.throttle_gate(),
            tracker: TrackerState::new(),
            stats: StatsAggregator::new(),
            sink: None,
            logger: Box::new(NullMonitorLogger),
            frame_interval,
            enabled: false,
            state: LoopState::Idle,
            generation: 0,
            frames_processed: 0,
        }
    }

    pub fn with_sink(mut self, sink: ViolationSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn MonitorLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn frames_processed(&self) -> usize {
        self.frames_processed
    }

    pub fn tracker(&self) -> &TrackerState {
        &self.tracker
    }

    /// Read-only handle onto the loop's stats.
    pub fn stats(&self) -> StatsView {
        self.stats.view()
    }

    /// Returns `false` when already enabled.
    pub fn enable(&mut self) -> bool {
        if self.enabled {
            return false;
        }
        self.enabled = true;
        self.logger.info("Monitoring enabled");
        true
    }

    /// Returns `false` when already disabled.
    pub fn disable(&mut self) -> bool {
        if !self.enabled {
            return false;
        }
        self.enabled = false;
        self.generation += 1;
        if self.state == LoopState::Running {
            self.state = LoopState::Idle;
            self.logger.info("Monitoring stopped");
        }
        true
    }

    /// Clears tracker state and stats. Enabled/disabled state is unchanged.
    pub fn reset(&mut self) {
        self.tracker = TrackerState::new();
        self.stats.clear();
        self.generation += 1;
        self.logger.info("Monitoring state reset");
    }

    /// Fetches the current frame and runs detection on it.
    pub fn acquire(&mut self) -> Acquisition {
        if !self.enabled {
            return Acquisition::Skipped(TickOutcome::Disabled);
        }
        if !self.source.is_ready() {
            log::debug!("Frame source not ready, waiting");
            return Acquisition::Skipped(TickOutcome::SourceNotReady);
        }
        if self.state == LoopState::Idle {
            self.state = LoopState::Running;
            self.logger.info("Monitoring started");
        }

        let Some(frame) = self.source.current_frame() else {
            self.logger.info("Frame source exhausted");
            self.disable();
            return Acquisition::Skipped(TickOutcome::SourceExhausted);
        };

        let started = Instant::now();
        let result = self.detector.detect(&frame, frame.timestamp_ms());
        self.logger
            .timing("detect", started.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(faces) => Acquisition::Detected(DetectedFrame {
                index: frame.index(),
                timestamp_ms: frame.timestamp_ms(),
                width: frame.width(),
                height: frame.height(),
                faces,
                generation: self.generation,
            }),
            Err(e) => {
                log::warn!("Face detection failed on frame {}: {e}", frame.index());
                Acquisition::Skipped(TickOutcome::DetectorFailed)
            }
        }
    }

    /// Classifies a detected frame, throttles its candidates, and publishes
    /// the accepted ones. Results acquired before a disable or reset are dropped.
    pub fn apply(&mut self, detected: DetectedFrame) -> TickOutcome {
        if !self.enabled || detected.generation != self.generation {
            log::debug!("Discarding stale detections for frame {}", detected.index);
            return TickOutcome::Discarded;
        }

        let started = Instant::now();
        let (candidates, mut next) = self.classifier.classify(
            &detected.faces,
            detected.width,
            detected.height,
            &self.tracker,
        );

        let mut accepted = 0;
        for candidate in candidates {
            if !self
                .throttle
                .accept(candidate.category, detected.timestamp_ms, &mut next)
            {
                log::debug!(
                    "Violation throttled: {} at {}ms",
                    candidate.category,
                    detected.timestamp_ms
                );
                continue;
            }
            let violation = candidate.into_violation(detected.timestamp_ms);
            log::info!(
                "Violation recorded: {} at {}ms ({})",
                violation.category,
                violation.timestamp_ms,
                violation.description
            );
            self.stats.record(violation.clone());
            if let Some(sink) = self.sink.as_mut() {
                sink(&violation);
            }
            accepted += 1;
        }
        self.tracker = next;

        self.frames_processed += 1;
        self.logger
            .timing("classify", started.elapsed().as_secs_f64() * 1000.0);
        self.logger.metric("faces", detected.faces.len() as f64);
        self.logger.frame(self.frames_processed);
        log::debug!(
            "Frame {}: {} face(s), {accepted} violation(s) accepted",
            detected.index,
            detected.faces.len()
        );

        TickOutcome::Processed { accepted }
    }

    /// Runs one full tick: acquire, then apply.
    pub fn tick(&mut self) -> TickOutcome {
        match self.acquire() {
            Acquisition::Skipped(outcome) => outcome,
            Acquisition::Detected(detected) => self.apply(detected),
        }
    }

    pub fn log_summary(&self) {
        self.logger.summary();
    }
}
