use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QrError {
    /// The payload does not fit the symbol capacity for the requested
    /// error-correction level. Surfaced to the caller, never truncated.
    #[error("QR encoding failed: {0}")]
    Encoding(#[from] qrcode::types::QrError),

    #[error("PNG rendering failed: {0}")]
    Png(#[from] image::ImageError),
}

/// Render an opaque string as a PNG QR image.
///
/// Deterministic for identical inputs. `min_size` is the minimum pixel
/// dimension of the rendered image; the module grid scales up to at least
/// that size.
pub fn encode_png(data: &str, min_size: u32, ec: EcLevel) -> Result<Vec<u8>, QrError> {
    let code = QrCode::with_error_correction_level(data, ec)?;

    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(min_size, min_size)
        .build();

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(image).write_to(&mut out, ImageFormat::Png)?;

    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

    #[test]
    fn produces_png_bytes() {
        let png = encode_png("https://example.test/checkin", 256, EcLevel::M).unwrap();
        assert_eq!(&png[..8], &PNG_MAGIC);
    }

    #[test]
    fn deterministic_for_identical_input() {
        let a = encode_png("same-payload", 256, EcLevel::M).unwrap();
        let b = encode_png("same-payload", 256, EcLevel::M).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn oversized_payload_is_an_error() {
        // QR version 40 at EC level H caps out well below 3 KiB.
        let oversized = "x".repeat(4096);
        assert!(matches!(
            encode_png(&oversized, 256, EcLevel::H),
            Err(QrError::Encoding(_))
        ));
    }
}
