//! V4L2 camera capture via the `v4l` crate.

use crate::frame::{self, Frame, FrameError, DARK_FRAME_THRESHOLD};
use facescan_core::{DeviceError, FrameSource};
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

/// Resolution requested from the driver; it may negotiate something else.
const REQUESTED_WIDTH: u32 = 640;
const REQUESTED_HEIGHT: u32 = 480;
const STREAM_BUFFERS: u32 = 4;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
    #[error("streaming not supported")]
    StreamingNotSupported,
}

impl From<CameraError> for DeviceError {
    fn from(e: CameraError) -> Self {
        match e {
            CameraError::CaptureFailed(msg) => DeviceError::ReadFailed(msg),
            other => DeviceError::Unavailable(other.to_string()),
        }
    }
}

/// Info about a discovered V4L2 device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
}

/// Negotiated pixel format for the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUYV 4:2:2 packed (2 bytes/pixel, extract Y channel).
    Yuyv,
    /// 8-bit grayscale.
    Grey,
    /// 16-bit little-endian grayscale.
    Y16,
}

/// V4L2 camera device handle.
pub struct Camera {
    device: Device,
    pub width: u32,
    pub height: u32,
    pub device_path: String,
    pub fourcc: FourCC,
    pixel_format: PixelFormat,
}

impl Camera {
    /// Open a V4L2 camera device by path (e.g., "/dev/video0").
    pub fn open(device_path: &str) -> Result<Self, CameraError> {
        if !Path::new(device_path).exists() {
            return Err(CameraError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| {
            if e.to_string().contains("busy") || e.to_string().contains("EBUSY") {
                CameraError::DeviceBusy
            } else {
                CameraError::DeviceNotFound(format!("{device_path}: {e}"))
            }
        })?;

        let caps = device.query_caps().map_err(|e| {
            CameraError::CaptureFailed(format!("failed to query capabilities: {e}"))
        })?;

        tracing::info!(
            device = device_path,
            driver = %caps.driver,
            card = %caps.card,
            "opened camera"
        );

        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CameraError::StreamingNotSupported);
        }

        // Ask for YUYV; drivers that only do grayscale will hand back GREY or Y16.
        let mut fmt = device.format().map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to get format: {e}"))
        })?;
        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = REQUESTED_WIDTH;
        fmt.height = REQUESTED_HEIGHT;

        let negotiated = device.set_format(&fmt).map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to set format: {e}"))
        })?;

        let fourcc = negotiated.fourcc;
        let pixel_format = pixel_format_for(fourcc).ok_or_else(|| {
            CameraError::FormatNegotiationFailed(format!(
                "unsupported pixel format: {fourcc:?} (need YUYV, GREY, or Y16)"
            ))
        })?;

        tracing::info!(
            width = negotiated.width,
            height = negotiated.height,
            fourcc = ?fourcc,
            "negotiated format"
        );

        Ok(Self {
            device,
            width: negotiated.width,
            height: negotiated.height,
            device_path: device_path.to_string(),
            fourcc,
            pixel_format,
        })
    }

    /// Start streaming. The stream borrows the camera for its lifetime.
    pub fn stream(&self) -> Result<CameraStream<'_>, CameraError> {
        let stream = MmapStream::with_buffers(&self.device, BufType::VideoCapture, STREAM_BUFFERS)
            .map_err(|e| CameraError::CaptureFailed(format!("failed to create mmap stream: {e}")))?;
        Ok(CameraStream {
            camera: self,
            stream,
        })
    }

    /// Convert a raw buffer to grayscale based on the negotiated format.
    fn buf_to_grayscale(&self, buf: &[u8]) -> Result<Vec<u8>, FrameError> {
        match self.pixel_format {
            PixelFormat::Grey => frame::grey_to_grayscale(buf, self.width, self.height),
            PixelFormat::Y16 => frame::y16_to_grayscale(buf, self.width, self.height),
            PixelFormat::Yuyv => frame::yuyv_to_grayscale(buf, self.width, self.height),
        }
    }

    /// List available V4L2 video capture devices.
    pub fn list_devices() -> Vec<DeviceInfo> {
        let mut devices = Vec::new();

        for i in 0..16 {
            let path = format!("/dev/video{i}");
            if !Path::new(&path).exists() {
                continue;
            }
            let Ok(dev) = Device::with_path(&path) else {
                continue;
            };
            let Ok(caps) = dev.query_caps() else {
                continue;
            };
            if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
                continue;
            }
            devices.push(DeviceInfo {
                path,
                name: caps.card.clone(),
            });
        }

        devices
    }
}

fn pixel_format_for(fourcc: FourCC) -> Option<PixelFormat> {
    if fourcc == FourCC::new(b"GREY") {
        Some(PixelFormat::Grey)
    } else if fourcc == FourCC::new(b"YUYV") {
        Some(PixelFormat::Yuyv)
    } else if fourcc == FourCC::new(b"Y16 ") || fourcc == FourCC::new(b"Y16\0") {
        Some(PixelFormat::Y16)
    } else {
        None
    }
}

/// A running capture stream on a [`Camera`].
pub struct CameraStream<'a> {
    camera: &'a Camera,
    stream: MmapStream<'a>,
}

impl CameraStream<'_> {
    /// Dequeue one frame and convert it to grayscale.
    pub fn capture_frame(&mut self) -> Result<Frame, CameraError> {
        let (buf, meta) = self
            .stream
            .next()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;
        let sequence = meta.sequence;

        let gray = self
            .camera
            .buf_to_grayscale(buf)
            .map_err(|e| {
                CameraError::CaptureFailed(format!("{:?}: {e}", self.camera.pixel_format))
            })?;

        let mut frame = Frame::new(gray, self.camera.width, self.camera.height, sequence);
        frame.is_dark = frame::is_dark_frame(&frame.data, DARK_FRAME_THRESHOLD);
        Ok(frame)
    }

    /// Throw away `count` frames while auto exposure settles.
    pub fn discard(&mut self, count: usize) -> Result<(), CameraError> {
        if count > 0 {
            tracing::info!(count, "discarding warmup frames");
        }
        for _ in 0..count {
            self.stream
                .next()
                .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;
        }
        Ok(())
    }
}

impl FrameSource for CameraStream<'_> {
    fn next_frame(&mut self) -> Result<Frame, DeviceError> {
        Ok(self.capture_frame()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_format_for() {
        assert_eq!(pixel_format_for(FourCC::new(b"YUYV")), Some(PixelFormat::Yuyv));
        assert_eq!(pixel_format_for(FourCC::new(b"GREY")), Some(PixelFormat::Grey));
        assert_eq!(pixel_format_for(FourCC::new(b"Y16 ")), Some(PixelFormat::Y16));
        assert_eq!(pixel_format_for(FourCC::new(b"MJPG")), None);
    }

    #[test]
    fn test_capture_failure_maps_to_read_failed() {
        let err: DeviceError = CameraError::CaptureFailed("timeout".into()).into();
        assert!(matches!(err, DeviceError::ReadFailed(msg) if msg == "timeout"));
    }

    #[test]
    fn test_open_failures_map_to_unavailable() {
        let err: DeviceError = CameraError::DeviceNotFound("/dev/video9".into()).into();
        assert!(matches!(err, DeviceError::Unavailable(msg) if msg.contains("/dev/video9")));
        let err: DeviceError = CameraError::DeviceBusy.into();
        assert!(matches!(err, DeviceError::Unavailable(_)));
    }

    #[test]
    fn test_open_missing_device() {
        let result = Camera::open("/dev/definitely-not-a-camera");
        assert!(matches!(result, Err(CameraError::DeviceNotFound(_))));
    }
}
