//! Slider state as an immutable snapshot.
//!
//! The control surface is the only writer. The sequencer reads Speed on each
//! tick, the mixer reads the volumes once per buffer, the camera thread reads
//! HueCenter and Sensitivity once per frame.

use std::ops::RangeInclusive;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const VOLUME_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const HUE_VOLUME_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const HUE_REVERB_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const SPEED_RANGE: RangeInclusive<f32> = 1.0..=10.0;
/// Hue in the 0..180 camera convention (degrees / 2)
pub const HUE_CENTER_RANGE: RangeInclusive<f32> = 0.0..=179.0;
pub const SENSITIVITY_RANGE: RangeInclusive<f32> = 1.0..=10.0;

const SLOWEST_TICK_MS: f32 = 230.0;
const MS_PER_SPEED_STEP: f32 = 20.0;

/// Clamp into `range`; NaN and infinities fall back to `default`.
pub fn clamp_to(v: f32, range: &RangeInclusive<f32>, default: f32) -> f32 {
    if v.is_finite() {
        v.clamp(*range.start(), *range.end())
    } else {
        default
    }
}

/// Step period for a Speed value. Faster speed never yields a longer period.
/// 1 -> 230 ms, 10 -> 50 ms.
pub fn tick_interval(speed: f32) -> Duration {
    let speed = clamp_to(speed, &SPEED_RANGE, ParameterSnapshot::default().speed);
    let ms = SLOWEST_TICK_MS - (speed - SPEED_RANGE.start()) * MS_PER_SPEED_STEP;
    Duration::from_micros((ms * 1000.0).round() as u64)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSnapshot {
    pub volume: f32,
    pub hue_volume: f32,
    pub hue_reverb: f32,
    pub speed: f32,
    pub hue_center: f32,
    pub sensitivity: f32,
    pub hue_detection_enabled: bool,
    /// Sample played by every Sample cell
    pub sample: Option<String>,
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        Self {
            volume: 0.5,
            hue_volume: 0.5,
            hue_reverb: 0.5,
            speed: 5.0,
            hue_center: 50.0,
            sensitivity: 5.0,
            hue_detection_enabled: true,
            sample: None,
        }
    }
}

impl ParameterSnapshot {
    pub fn set_volume(&mut self, v: f32) {
        self.volume = clamp_to(v, &VOLUME_RANGE, self.volume);
    }

    pub fn set_hue_volume(&mut self, v: f32) {
        self.hue_volume = clamp_to(v, &HUE_VOLUME_RANGE, self.hue_volume);
    }

    pub fn set_hue_reverb(&mut self, v: f32) {
        self.hue_reverb = clamp_to(v, &HUE_REVERB_RANGE, self.hue_reverb);
    }

    pub fn set_speed(&mut self, v: f32) {
        self.speed = clamp_to(v, &SPEED_RANGE, self.speed);
    }

    pub fn set_hue_center(&mut self, v: f32) {
        self.hue_center = clamp_to(v, &HUE_CENTER_RANGE, self.hue_center);
    }

    pub fn set_sensitivity(&mut self, v: f32) {
        self.sensitivity = clamp_to(v, &SENSITIVITY_RANGE, self.sensitivity);
    }

    /// Re-clamp every field, for values that came from a config file.
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();
        self.volume = clamp_to(self.volume, &VOLUME_RANGE, d.volume);
        self.hue_volume = clamp_to(self.hue_volume, &HUE_VOLUME_RANGE, d.hue_volume);
        self.hue_reverb = clamp_to(self.hue_reverb, &HUE_REVERB_RANGE, d.hue_reverb);
        self.speed = clamp_to(self.speed, &SPEED_RANGE, d.speed);
        self.hue_center = clamp_to(self.hue_center, &HUE_CENTER_RANGE, d.hue_center);
        self.sensitivity = clamp_to(self.sensitivity, &SENSITIVITY_RANGE, d.sensitivity);
        self
    }

    pub fn tick_interval(&self) -> Duration {
        tick_interval(self.speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_interval_never_grows_with_speed() {
        let mut prev = tick_interval(*SPEED_RANGE.start());
        let mut s = *SPEED_RANGE.start();
        while s <= *SPEED_RANGE.end() {
            let cur = tick_interval(s);
            assert!(cur <= prev, "interval grew at speed {s}: {cur:?} > {prev:?}");
            prev = cur;
            s += 0.05;
        }
    }

    #[test]
    fn tick_interval_endpoints() {
        assert_eq!(tick_interval(1.0).as_millis(), 230);
        assert_eq!(tick_interval(10.0).as_millis(), 50);
        // outside the slider: clamped, no panic
        assert_eq!(tick_interval(50.0).as_millis(), 50);
        assert_eq!(tick_interval(-3.0).as_millis(), 230);
    }

    #[test]
    fn setters_clamp_silently() {
        let mut p = ParameterSnapshot::default();
        p.set_volume(4.0);
        p.set_hue_volume(-1.0);
        p.set_hue_reverb(f32::NAN);
        p.set_speed(0.0);
        p.set_hue_center(400.0);
        p.set_sensitivity(11.0);
        assert_eq!(p.volume, 1.0);
        assert_eq!(p.hue_volume, 0.0);
        assert_eq!(p.hue_reverb, 0.5, "NaN keeps the previous value");
        assert_eq!(p.speed, 1.0);
        assert_eq!(p.hue_center, 179.0);
        assert_eq!(p.sensitivity, 10.0);
    }

    #[test]
    fn sanitized_fixes_config_values() {
        let p = ParameterSnapshot { volume: 9.0, speed: f32::INFINITY, ..Default::default() }.sanitized();
        assert_eq!(p.volume, 1.0);
        assert_eq!(p.speed, 5.0);
    }
}
