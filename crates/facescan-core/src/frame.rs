//! Grayscale frame type shared by the camera layer, the detector and the face store.

use crate::types::FaceRegion;
use image::GrayImage;

/// A captured grayscale camera frame.
#[derive(Clone)]
pub struct Frame {
    /// Grayscale pixel data (width * height bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: std::time::Instant,
    pub sequence: u32,
    pub is_dark: bool,
}

impl Frame {
    /// Wrap a grayscale buffer captured now.
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp: std::time::Instant::now(),
            sequence,
            is_dark: false,
        }
    }

    /// View the frame as an `image` buffer.
    ///
    /// Returns `None` if the buffer is shorter than `width * height`.
    pub fn to_image(&self) -> Option<GrayImage> {
        let pixels = (self.width as usize) * (self.height as usize);
        if self.data.len() < pixels {
            return None;
        }
        GrayImage::from_raw(self.width, self.height, self.data[..pixels].to_vec())
    }

    /// Copy out the pixels inside `region`.
    ///
    /// Returns `None` when the region is empty or does not lie inside the frame.
    pub fn crop(&self, region: &FaceRegion) -> Option<GrayImage> {
        if region.is_empty()
            || region.x + region.width > self.width
            || region.y + region.height > self.height
        {
            return None;
        }
        let w = self.width as usize;
        if self.data.len() < w * self.height as usize {
            return None;
        }

        let mut out = Vec::with_capacity((region.width * region.height) as usize);
        for y in region.y..region.y + region.height {
            let row = y as usize * w;
            let start = row + region.x as usize;
            out.extend_from_slice(&self.data[start..start + region.width as usize]);
        }
        GrayImage::from_raw(region.width, region.height, out)
    }
}
