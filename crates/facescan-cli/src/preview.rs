//! Live preview as a snapshot image on disk.
//!
//! Each cycle the current frame is written with detected faces outlined. The
//! file is replaced by rename so an image viewer never sees a partial write.

use facescan_core::{Detection, FaceRegion, Frame, Preview};
use image::{GrayImage, Luma};
use std::path::{Path, PathBuf};

pub const PREVIEW_FILE_NAME: &str = "preview.jpg";

const OUTLINE: Luma<u8> = Luma([255]);

pub struct SnapshotPreview {
    path: PathBuf,
}

impl SnapshotPreview {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Preview for SnapshotPreview {
    fn show(
        &mut self,
        frame: &Frame,
        detections: &[Detection],
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut img = frame
            .to_image()
            .ok_or("frame buffer does not match its dimensions")?;
        for detection in detections {
            draw_outline(&mut img, &detection.region);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp.jpg");
        img.save(&tmp)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Draw a 1-pixel rectangle along the inside edge of `region`.
fn draw_outline(img: &mut GrayImage, region: &FaceRegion) {
    if region.is_empty() {
        return;
    }
    let x1 = (region.x + region.width - 1).min(img.width().saturating_sub(1));
    let y1 = (region.y + region.height - 1).min(img.height().saturating_sub(1));
    if region.x > x1 || region.y > y1 {
        return;
    }

    for x in region.x..=x1 {
        img.put_pixel(x, region.y, OUTLINE);
        img.put_pixel(x, y1, OUTLINE);
    }
    for y in region.y..=y1 {
        img.put_pixel(region.x, y, OUTLINE);
        img.put_pixel(x1, y, OUTLINE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_outline() {
        let mut img = GrayImage::new(6, 6);
        draw_outline(&mut img, &FaceRegion { x: 1, y: 1, width: 3, height: 3 });

        assert_eq!(img.get_pixel(1, 1), &OUTLINE);
        assert_eq!(img.get_pixel(3, 3), &OUTLINE);
        assert_eq!(img.get_pixel(3, 1), &OUTLINE);
        // Interior and outside untouched
        assert_eq!(img.get_pixel(2, 2), &Luma([0]));
        assert_eq!(img.get_pixel(4, 4), &Luma([0]));
    }

    #[test]
    fn test_show_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut preview = SnapshotPreview::new(dir.path().join(PREVIEW_FILE_NAME));
        let frame = Frame::new(vec![90u8; 40 * 30], 40, 30, 0);
        let detection = Detection {
            region: FaceRegion { x: 5, y: 5, width: 10, height: 10 },
            confidence: Some(0.8),
        };

        preview.show(&frame, &[detection]).unwrap();
        let img = image::open(preview.path()).unwrap();
        assert_eq!((img.width(), img.height()), (40, 30));
        assert!(!dir.path().join("preview.tmp.jpg").exists());
    }

    #[test]
    fn test_show_rejects_short_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut preview = SnapshotPreview::new(dir.path().join(PREVIEW_FILE_NAME));
        let frame = Frame::new(vec![0u8; 10], 40, 30, 0);
        assert!(preview.show(&frame, &[]).is_err());
    }
}
