//! Detected color -> auxiliary voice parameters.
//!
//! Pure: no state, no clock, no I/O. The mixer calls this once per audio
//! buffer with whatever detection snapshot and sliders are current.

use crate::params::ParameterSnapshot;
use crate::vision::HueDetectionState;

/// Ten-step scale the detected hue is quantized onto, low hue to high hue.
pub const HUE_SCALE: [f32; 10] = [
    220.0, 246.94, 261.63, 293.66, 329.63, 392.0, 440.0, 493.88, 523.25, 587.33,
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AuxHueVoiceParams {
    pub frequency: f32,
    /// HueVolume x coverage, in [0, 1]; zero when muted
    pub gain: f32,
    pub reverb_wet: f32,
}

impl AuxHueVoiceParams {
    pub const SILENT: AuxHueVoiceParams = AuxHueVoiceParams { frequency: HUE_SCALE[0], gain: 0.0, reverb_wet: 0.0 };
}

/// Monotonic step curve from normalized hue to pitch.
pub fn hue_to_frequency(hue: f32) -> f32 {
    let hue = if hue.is_finite() { hue.clamp(0.0, 1.0) } else { 0.0 };
    let idx = ((hue * HUE_SCALE.len() as f32) as usize).min(HUE_SCALE.len() - 1);
    HUE_SCALE[idx]
}

pub fn map_aux_voice(state: &HueDetectionState, params: &ParameterSnapshot) -> AuxHueVoiceParams {
    let audible = params.hue_detection_enabled && state.detected;
    let gain = if audible {
        let g = params.hue_volume * state.coverage;
        if g.is_finite() { g.clamp(0.0, 1.0) } else { 0.0 }
    } else {
        0.0
    };
    AuxHueVoiceParams {
        frequency: hue_to_frequency(state.hue),
        gain,
        reverb_wet: params.hue_reverb.clamp(0.0, 1.0),
    }
}
