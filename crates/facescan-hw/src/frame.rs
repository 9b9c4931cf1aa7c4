//! Raw buffer → grayscale conversion and dark-frame detection.

pub use facescan_core::Frame;

/// Fraction of near-black pixels at or above which a frame counts as dark.
pub const DARK_FRAME_THRESHOLD: f32 = 0.95;

/// Convert packed YUYV (4:2:2) to grayscale by extracting the Y channel.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V].
pub fn yuyv_to_grayscale(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }
    Ok(yuyv[..expected].iter().step_by(2).copied().collect())
}

/// Downscale 16-bit little-endian grayscale to 8 bits by keeping the high byte.
pub fn y16_to_grayscale(y16: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if y16.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: y16.len(),
        });
    }
    Ok(y16[..expected].chunks_exact(2).map(|px| px[1]).collect())
}

/// Take the first `width * height` bytes of an 8-bit grayscale buffer.
pub fn grey_to_grayscale(grey: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height) as usize;
    grey.get(..expected)
        .map(<[u8]>::to_vec)
        .ok_or(FrameError::InvalidLength {
            expected,
            actual: grey.len(),
        })
}

/// True if at least `threshold_pct` of pixels are below 32.
pub fn is_dark_frame(gray: &[u8], threshold_pct: f32) -> bool {
    if gray.is_empty() {
        return true;
    }
    let dark_count = gray.iter().filter(|&&p| p < 32).count();
    (dark_count as f32 / gray.len() as f32) >= threshold_pct
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid buffer length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_to_grayscale() {
        // 2x1 image: [Y0=100, U=128, Y1=200, V=128]
        let yuyv = vec![100, 128, 200, 128];
        assert_eq!(yuyv_to_grayscale(&yuyv, 2, 1).unwrap(), vec![100, 200]);
    }

    #[test]
    fn test_yuyv_invalid_length() {
        assert!(yuyv_to_grayscale(&[100, 128], 2, 1).is_err());
    }

    #[test]
    fn test_y16_keeps_high_byte() {
        // 0x1234 and 0xff00, little-endian
        let y16 = vec![0x34, 0x12, 0x00, 0xff];
        assert_eq!(y16_to_grayscale(&y16, 2, 1).unwrap(), vec![0x12, 0xff]);
        assert!(y16_to_grayscale(&y16, 3, 1).is_err());
    }

    #[test]
    fn test_grey_truncates_padding() {
        let grey = vec![1, 2, 3, 4, 99, 99];
        assert_eq!(grey_to_grayscale(&grey, 2, 2).unwrap(), vec![1, 2, 3, 4]);
        assert!(grey_to_grayscale(&grey, 3, 3).is_err());
    }

    #[test]
    fn test_dark_frame_all_black() {
        assert!(is_dark_frame(&[0u8; 1000], DARK_FRAME_THRESHOLD));
    }

    #[test]
    fn test_dark_frame_normal() {
        assert!(!is_dark_frame(&[128u8; 1000], DARK_FRAME_THRESHOLD));
    }

    #[test]
    fn test_dark_frame_empty() {
        assert!(is_dark_frame(&[], DARK_FRAME_THRESHOLD));
    }

    #[test]
    fn test_dark_frame_borderline() {
        // 96% dark -> dark; 94% dark -> not dark
        let mut mostly_dark = vec![10u8; 960];
        mostly_dark.extend(vec![128u8; 40]);
        assert!(is_dark_frame(&mostly_dark, DARK_FRAME_THRESHOLD));

        let mut mostly_lit = vec![10u8; 940];
        mostly_lit.extend(vec![128u8; 60]);
        assert!(!is_dark_frame(&mostly_lit, DARK_FRAME_THRESHOLD));
    }

    #[test]
    fn test_dark_frame_exact_threshold() {
        let mut frame = vec![0u8; 950];
        frame.extend(vec![200u8; 50]);
        assert!(is_dark_frame(&frame, DARK_FRAME_THRESHOLD));
    }
}
