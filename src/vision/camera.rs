//! Frame sources.
//!
//! The pipeline only sees the `CameraSource` trait. `ImageDirCamera` plays a
//! directory of still images back at a fixed frame rate, which is what the
//! binary uses in place of a capture device; `NullCamera` is the "no camera"
//! case and always fails.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::CameraError;

/// One RGB8 image, row major, no padding. Only built through `new` or
/// `filled`, so the buffer always matches the dimensions.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Frame {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, CameraError> {
        if width == 0 || height == 0 || data.len() != width * height * 3 {
            return Err(CameraError::BadFrame { width, height, len: data.len() });
        }
        Ok(Self { width, height, data })
    }

    /// Solid color frame, at least 1x1
    pub fn filled(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let data = rgb.iter().copied().cycle().take(width * height * 3).collect();
        Self { width, height, data }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let i = (y * self.width + x) * 3;
        self.data[i..i + 3].copy_from_slice(&rgb);
    }
}

pub trait CameraSource: Send {
    /// Block until the next frame is available (or fail).
    fn capture(&mut self) -> Result<Frame, CameraError>;

    fn describe(&self) -> String {
        "camera".to_string()
    }
}

pub struct NullCamera;

impl CameraSource for NullCamera {
    fn capture(&mut self) -> Result<Frame, CameraError> {
        Err(CameraError::Unavailable("no camera configured".to_string()))
    }

    fn describe(&self) -> String {
        "none".to_string()
    }
}

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

/// Loops over the images in a directory at `fps`, decoding each file once.
pub struct ImageDirCamera {
    dir: PathBuf,
    paths: Vec<PathBuf>,
    cache: Vec<Option<Frame>>,
    next: usize,
    frame_period: Duration,
    next_due: Option<Instant>,
}

impl ImageDirCamera {
    pub fn open(dir: &Path, fps: f32) -> Result<Self, CameraError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| CameraError::Unavailable(format!("{}: {e}", dir.display())))?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
            })
            .collect();
        if paths.is_empty() {
            return Err(CameraError::Unavailable(format!("no images in {}", dir.display())));
        }
        paths.sort();
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 15.0 };
        Ok(Self {
            dir: dir.to_path_buf(),
            cache: vec![None; paths.len()],
            paths,
            next: 0,
            frame_period: Duration::from_secs_f32(1.0 / fps),
            next_due: None,
        })
    }

    fn decode(path: &Path) -> Result<Frame, CameraError> {
        let img = image::open(path)
            .map_err(|e| CameraError::ReadFailed(format!("{}: {e}", path.display())))?
            .to_rgb8();
        let (w, h) = img.dimensions();
        Frame::new(w as usize, h as usize, img.into_raw())
    }
}

impl CameraSource for ImageDirCamera {
    fn capture(&mut self) -> Result<Frame, CameraError> {
        // pace like a device would: absolute deadlines, no drift
        let now = Instant::now();
        let due = self.next_due.unwrap_or(now);
        if due > now {
            std::thread::sleep(due - now);
        }
        let after = due + self.frame_period;
        self.next_due = Some(if after < now { now + self.frame_period } else { after });

        let idx = self.next;
        self.next = (self.next + 1) % self.paths.len();
        if let Some(frame) = &self.cache[idx] {
            return Ok(frame.clone());
        }
        let frame = Self::decode(&self.paths[idx])?;
        self.cache[idx] = Some(frame.clone());
        Ok(frame)
    }

    fn describe(&self) -> String {
        format!("images in {} ({} frames)", self.dir.display(), self.paths.len())
    }
}
