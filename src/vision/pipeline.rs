use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::camera::{CameraSource, Frame};
use super::mask::{apply_hue_mask, HUE_STEPS};
use super::HueDetectionState;
use crate::error::CameraError;
use crate::params::ParameterSnapshot;
use crate::publish::Published;

// how long the loop naps while detection is off, or after a failed capture
const IDLE_POLL: Duration = Duration::from_millis(50);
const RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionSettings {
    pub analysis_width: usize,
    /// regions below this fraction of the analysed frame count as nothing
    pub min_coverage: f32,
    /// how long the last good state survives capture failures
    pub grace: Duration,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            analysis_width: 400,
            min_coverage: 0.002,
            grace: Duration::from_millis(500),
        }
    }
}

pub struct ColorDetectionPipeline<C: CameraSource> {
    camera: C,
    settings: DetectionSettings,
    params: Published<ParameterSnapshot>,
    state: Published<HueDetectionState>,
    last_good: Option<Instant>,
    last_error: Option<CameraError>,
}

impl<C: CameraSource> ColorDetectionPipeline<C> {
    pub fn new(
        camera: C,
        settings: DetectionSettings,
        params: Published<ParameterSnapshot>,
        state: Published<HueDetectionState>,
    ) -> Self {
        Self { camera, settings, params, state, last_good: None, last_error: None }
    }

    pub fn capture_frame(&mut self) -> Result<Frame, CameraError> {
        self.camera.capture()
    }

    /// Detection result for one frame under the given sliders.
    pub fn detect(&self, frame: &Frame, params: &ParameterSnapshot) -> HueDetectionState {
        let center = params.hue_center.rem_euclid(HUE_STEPS);
        let m = apply_hue_mask(frame, center, params.sensitivity, self.settings.analysis_width);
        if m.region_pixels == 0 || m.coverage < self.settings.min_coverage {
            return HueDetectionState::default();
        }
        HueDetectionState { detected: true, hue: m.hue, coverage: m.coverage, camera_fault: false }
    }

    /// One capture/analyse/publish round. Returns what is published afterwards.
    pub fn process_once(&mut self, now: Instant) -> HueDetectionState {
        let params = self.params.load_full();
        if !params.hue_detection_enabled {
            self.last_good = None;
            self.last_error = None;
            let idle = HueDetectionState::default();
            self.state.publish(idle);
            return idle;
        }

        match self.capture_frame() {
            Ok(frame) => {
                if let Some(err) = self.last_error.take() {
                    log::info!("camera recovered after: {err}");
                }
                self.last_good = Some(now);
                let next = self.detect(&frame, &params);
                self.state.publish(next);
                next
            }
            Err(err) => {
                if self.last_error.as_ref() != Some(&err) {
                    log::warn!("{err}");
                }
                self.last_error = Some(err);
                let current = **self.state.load();
                let within_grace = self
                    .last_good
                    .is_some_and(|t| now.saturating_duration_since(t) <= self.settings.grace);
                if within_grace {
                    return current;
                }
                let lost = HueDetectionState { detected: false, hue: current.hue, coverage: 0.0, camera_fault: true };
                if current != lost {
                    self.state.publish(lost);
                }
                lost
            }
        }
    }

    pub fn camera_failing(&self) -> bool {
        self.last_error.is_some()
    }
}

impl<C: CameraSource + 'static> ColorDetectionPipeline<C> {
    /// Run on a dedicated thread until `stop` is raised. The camera sets the
    /// pace; this loop adds no timing of its own while frames are flowing.
    pub fn spawn(mut self, stop: Arc<AtomicBool>) -> std::io::Result<JoinHandle<()>> {
        log::info!("color detection using {}", self.camera.describe());
        std::thread::Builder::new()
            .name("huegrid-camera".to_string())
            .spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    self.process_once(Instant::now());
                    if !self.params.load().hue_detection_enabled {
                        std::thread::sleep(IDLE_POLL);
                    } else if self.camera_failing() {
                        std::thread::sleep(RETRY_DELAY);
                    }
                }
                log::debug!("camera thread stopped");
            })
    }
}
