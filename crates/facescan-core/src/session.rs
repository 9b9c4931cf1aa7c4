//! Live scanning session: frame → detect → save → log, one cycle at a time.
//!
//! The loop is strictly sequential. It blocks on the frame source, checks
//! for one key per cycle, and stops on `q` or when the device fails. Save and
//! log failures are reported and the session keeps going.

use crate::detector::Detector;
use crate::frame::Frame;
use crate::record::ScanRecord;
use crate::scan_log::{LogError, ScanLog};
use crate::store::{FaceStore, StoreError};
use crate::types::Detection;
use chrono::Local;
use std::fs;
use thiserror::Error;

/// Camera went away or never came up. Fatal to a session.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read frame: {0}")]
    ReadFailed(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Why a single face could not be persisted.
#[derive(Error, Debug)]
pub enum SaveError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Log(#[from] LogError),
}

/// Produces frames, blocking until one is available.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Frame, DeviceError>;
}

/// Non-blocking interactive input. `None` when no key is waiting.
pub trait KeyInput {
    fn poll_key(&mut self) -> Option<char>;
}

/// Live view of the session.
pub trait Preview {
    fn show(
        &mut self,
        frame: &Frame,
        detections: &[Detection],
    ) -> Result<(), Box<dyn std::error::Error>>;
}

pub const KEY_QUIT: char = 'q';
pub const KEY_SAVE: char = 's';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    AwaitingInput,
    Stopped,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Save every detected face without being asked.
    pub auto_save: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { auto_save: true }
    }
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames: u64,
    pub dark_frames: u64,
    pub faces_detected: u64,
    pub faces_saved: u64,
    pub save_failures: u64,
    pub detect_failures: u64,
}

/// A processed frame held until its key check.
struct PendingFrame {
    frame: Frame,
    detections: Vec<Detection>,
}

pub struct Session {
    store: FaceStore,
    log: ScanLog,
    options: SessionOptions,
    state: SessionState,
    summary: SessionSummary,
    pending: Option<PendingFrame>,
}

impl Session {
    pub fn new(store: FaceStore, log: ScanLog, options: SessionOptions) -> Self {
        Self {
            store,
            log,
            options,
            state: SessionState::Running,
            summary: SessionSummary::default(),
            pending: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn summary(&self) -> SessionSummary {
        self.summary
    }

    /// Run cycles until `q` is pressed or the frame source fails.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        detector: &mut dyn Detector,
        keys: &mut dyn KeyInput,
        mut preview: Option<&mut dyn Preview>,
    ) -> Result<SessionSummary, SessionError> {
        tracing::info!(auto_save = self.options.auto_save, "scanning session started");

        while self.state != SessionState::Stopped {
            let preview = preview.as_mut().map(|p| &mut **p as &mut dyn Preview);
            if let Err(e) = self.cycle(source, detector, keys, preview) {
                self.state = SessionState::Stopped;
                self.pending = None;
                tracing::error!(error = %e, "scanning session aborted");
                return Err(e);
            }
        }

        tracing::info!(
            frames = self.summary.frames,
            faces_saved = self.summary.faces_saved,
            save_failures = self.summary.save_failures,
            "scanning session stopped"
        );
        Ok(self.summary)
    }

    /// One full cycle: acquire, detect, save, present, read a key.
    pub fn cycle(
        &mut self,
        source: &mut dyn FrameSource,
        detector: &mut dyn Detector,
        keys: &mut dyn KeyInput,
        preview: Option<&mut dyn Preview>,
    ) -> Result<(), SessionError> {
        self.process_frame(source, detector, preview)?;
        self.handle_key(keys);
        Ok(())
    }

    /// Acquire one frame, detect, auto-save and present it.
    ///
    /// The frame and its detections are held and the session moves to
    /// [`SessionState::AwaitingInput`] until [`Session::handle_key`] runs.
    pub fn process_frame(
        &mut self,
        source: &mut dyn FrameSource,
        detector: &mut dyn Detector,
        preview: Option<&mut dyn Preview>,
    ) -> Result<(), SessionError> {
        let frame = source.next_frame()?;
        self.summary.frames += 1;

        let detections = self.detect(detector, &frame);

        if self.options.auto_save {
            for detection in &detections {
                self.save_reporting(&frame, detection, "auto");
            }
        }

        if let Some(preview) = preview {
            if let Err(e) = preview.show(&frame, &detections) {
                tracing::warn!(error = %e, "preview update failed");
            }
        }

        self.pending = Some(PendingFrame { frame, detections });
        self.state = SessionState::AwaitingInput;
        Ok(())
    }

    /// Check for one key against the held frame.
    ///
    /// Does nothing unless the session is awaiting input.
    pub fn handle_key(&mut self, keys: &mut dyn KeyInput) -> SessionState {
        if self.state != SessionState::AwaitingInput {
            return self.state;
        }
        let pending = self.pending.take();

        self.state = match keys.poll_key() {
            Some(KEY_QUIT) => {
                tracing::info!("quit requested");
                SessionState::Stopped
            }
            Some(KEY_SAVE) => {
                let target = pending
                    .as_ref()
                    .and_then(|p| p.detections.first().map(|d| (&p.frame, d)));
                match target {
                    Some((frame, detection)) => {
                        if let Some(record) = self.save_reporting(frame, detection, "manual") {
                            println!("Manually saved face: {}", record.face_id);
                        }
                    }
                    None => println!("No face in view to save"),
                }
                SessionState::Running
            }
            Some(other) => {
                tracing::debug!(key = %other, "ignoring key");
                SessionState::Running
            }
            None => SessionState::Running,
        };
        self.state
    }

    /// Run the detector and validate its output against the frame.
    fn detect(&mut self, detector: &mut dyn Detector, frame: &Frame) -> Vec<Detection> {
        if frame.is_dark {
            self.summary.dark_frames += 1;
            tracing::debug!(seq = frame.sequence, "skipping detection on dark frame");
            return Vec::new();
        }

        let boxes = match detector.detect(frame) {
            Ok(boxes) => boxes,
            Err(e) => {
                self.summary.detect_failures += 1;
                tracing::warn!(seq = frame.sequence, error = %e, "face detection failed");
                return Vec::new();
            }
        };

        let detections: Vec<Detection> = boxes
            .iter()
            .filter_map(|b| Detection::from_bbox(b, frame.width, frame.height))
            .collect();
        if detections.len() < boxes.len() {
            tracing::debug!(
                dropped = boxes.len() - detections.len(),
                "discarded invalid detector boxes"
            );
        }
        self.summary.faces_detected += detections.len() as u64;
        detections
    }

    fn save_reporting(
        &mut self,
        frame: &Frame,
        detection: &Detection,
        trigger: &str,
    ) -> Option<ScanRecord> {
        match self.save(frame, detection) {
            Ok(record) => {
                self.summary.faces_saved += 1;
                tracing::info!(
                    face_id = %record.face_id,
                    trigger,
                    confidence = ?record.confidence,
                    "face saved"
                );
                Some(record)
            }
            Err(e) => {
                self.summary.save_failures += 1;
                tracing::warn!(error = %e, trigger, "failed to save face");
                eprintln!("Failed to save face: {e}");
                None
            }
        }
    }

    /// Crop, store and log one detection.
    ///
    /// If the log rejects the record the freshly written image is removed again
    /// so no unreferenced file is left behind.
    pub fn save(&mut self, frame: &Frame, detection: &Detection) -> Result<ScanRecord, SaveError> {
        let timestamp = Local::now().fixed_offset();
        let crop = frame.crop(&detection.region).ok_or(StoreError::EmptyRegion)?;
        let saved = self.store.save(&crop, timestamp)?;

        let record =
            ScanRecord::new(saved.face_id, timestamp, &saved.filepath, detection.confidence);
        if let Err(e) = self.log.append(record.clone()) {
            if let Err(rm) = fs::remove_file(&saved.filepath) {
                tracing::warn!(
                    path = %saved.filepath.display(),
                    error = %rm,
                    "failed to remove unlogged image"
                );
            }
            return Err(e.into());
        }
        Ok(record)
    }
}
