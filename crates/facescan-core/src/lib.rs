//! facescan-core: scan log, face store and the live scanning session.
//!
//! Face detection runs through the [`Detector`] trait; [`FaceDetector`] is
//! the SCRFD implementation on ONNX Runtime.

pub mod detector;
pub mod frame;
pub mod record;
pub mod scan_log;
pub mod session;
pub mod store;
pub mod types;

pub use detector::{Detector, DetectorError, FaceDetector};
pub use frame::Frame;
pub use record::ScanRecord;
pub use scan_log::{LogError, ScanLog, ScanStats};
pub use session::{
    DeviceError, FrameSource, KeyInput, Preview, Session, SessionError, SessionOptions,
    SessionState, SessionSummary,
};
pub use store::{FaceStore, SavedFace, StoreError};
pub use types::{BoundingBox, Detection, FaceRegion};
