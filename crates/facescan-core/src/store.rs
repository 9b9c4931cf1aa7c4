//! Face image store: writes face crops as JPEG files with unique ids.

use chrono::{DateTime, FixedOffset};
use image::imageops::FilterType;
use image::{GrayImage, ImageFormat};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const FACES_DIR_NAME: &str = "scanned_faces";
/// Side length of saved face crops, in pixels.
pub const DEFAULT_CROP_SIZE: u32 = 200;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("face region is empty")]
    EmptyRegion,
    #[error("failed to create face directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to encode face image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to write face image {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Where a face crop ended up. `filepath` is always absolute.
#[derive(Debug, Clone)]
pub struct SavedFace {
    pub face_id: String,
    pub filepath: PathBuf,
}

/// Writes face crops into one directory.
///
/// Ids have the form `face_<hash8>_<unix-millis>_<seq>`: the first 8 hex
/// digits of the SHA-256 of the encoded JPEG, the capture time, and a
/// per-store sequence number that keeps ids unique within a run.
pub struct FaceStore {
    dir: PathBuf,
    crop_size: u32,
    next_seq: u64,
}

impl FaceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            crop_size: DEFAULT_CROP_SIZE,
            next_seq: 0,
        }
    }

    /// The store at `<data_dir>/scanned_faces`.
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(FACES_DIR_NAME))
    }

    /// Resize crops to `size`×`size` before saving. 0 keeps the crop as is.
    pub fn with_crop_size(mut self, size: u32) -> Self {
        self.crop_size = size;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save a face crop captured at `timestamp`.
    pub fn save(
        &mut self,
        region: &GrayImage,
        timestamp: DateTime<FixedOffset>,
    ) -> Result<SavedFace, StoreError> {
        if region.width() == 0 || region.height() == 0 {
            return Err(StoreError::EmptyRegion);
        }

        let size = self.crop_size;
        let resized;
        let face = if size > 0 && region.dimensions() != (size, size) {
            resized = image::imageops::resize(region, size, size, FilterType::Triangle);
            &resized
        } else {
            region
        };

        let mut jpeg = Vec::new();
        face.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)?;

        let face_id = format!(
            "face_{}_{}_{:04}",
            short_hash(&jpeg),
            timestamp.timestamp_millis(),
            self.next_seq
        );
        self.next_seq += 1;

        let dir = self
            .absolute_dir()
            .and_then(|dir| fs::create_dir_all(&dir).map(|()| dir))
            .map_err(|source| StoreError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;

        let filepath = dir.join(format!("{face_id}.jpg"));
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&filepath)
            .and_then(|mut file| file.write_all(&jpeg))
            .map_err(|source| StoreError::Write {
                path: filepath.clone(),
                source,
            })?;

        tracing::debug!(
            face_id = %face_id,
            path = %filepath.display(),
            bytes = jpeg.len(),
            "face image saved"
        );
        Ok(SavedFace { face_id, filepath })
    }

    /// The store directory resolved against the current directory, so saved
    /// paths still point at the image after the process changes directory.
    fn absolute_dir(&self) -> io::Result<PathBuf> {
        if self.dir.is_absolute() {
            Ok(self.dir.clone())
        } else {
            Ok(std::env::current_dir()?.join(&self.dir))
        }
    }
}

fn short_hash(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .take(4)
        .map(|b| format!("{b:02x}"))
        .collect()
}
