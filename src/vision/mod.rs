//! Camera side: frame sources, hue masking, and the detection loop that
//! publishes a `HueDetectionState` for the mixer.

mod camera;
mod mask;
mod pipeline;

pub use camera::{CameraSource, Frame, ImageDirCamera, NullCamera};
pub use mask::{apply_hue_mask, hue_distance, rgb_to_hsv, MaskResult};
pub use pipeline::{ColorDetectionPipeline, DetectionSettings};

/// Latest detection result. Replaced wholesale on every processed frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HueDetectionState {
    pub detected: bool,
    /// Mean hue of the dominant region, normalized to [0, 1)
    pub hue: f32,
    /// Dominant region size as a fraction of the frame
    pub coverage: f32,
    /// Set once capture has been failing for longer than the grace period
    pub camera_fault: bool,
}
