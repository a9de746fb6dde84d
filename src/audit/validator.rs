//! Structural validity checks per media kind.

use std::path::Path;

use crate::error::{Error, Result};
use crate::manifest::MediaKind;

/// A structural check for one kind of media file.
pub trait Validator: Send + Sync {
    /// Return `Ok` if the file parses as its format.
    fn validate(&self, path: &Path) -> Result<()>;
}

/// Parses the RIFF/WAVE container and its `fmt ` header.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavValidator;

impl Validator for WavValidator {
    fn validate(&self, path: &Path) -> Result<()> {
        let reader = hound::WavReader::open(path).map_err(|e| Error::Integrity {
            path: path.to_path_buf(),
            message: format!("Invalid WAV header: {}", e),
        })?;

        let spec = reader.spec();
        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(Error::Integrity {
                path: path.to_path_buf(),
                message: format!(
                    "Invalid WAV parameters: {} channels at {} Hz",
                    spec.channels, spec.sample_rate
                ),
            });
        }

        Ok(())
    }
}

/// Decodes the whole image.
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegValidator;

impl Validator for JpegValidator {
    fn validate(&self, path: &Path) -> Result<()> {
        image::open(path).map_err(|e| Error::Integrity {
            path: path.to_path_buf(),
            message: format!("Failed to decode image: {}", e),
        })?;
        Ok(())
    }
}

/// Validator for a media kind.
pub fn validator_for(kind: MediaKind) -> &'static dyn Validator {
    match kind {
        MediaKind::Wav => &WavValidator,
        MediaKind::Jpeg => &JpegValidator,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Write a short 16-bit mono WAV file.
    pub(crate) fn write_wav(path: &Path) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..800i16 {
            writer.write_sample(i).unwrap();
        }
        writer.finalize().unwrap();
    }

    /// Write a small JPEG image.
    pub(crate) fn write_jpeg(path: &Path) {
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([10, 120, 200]));
        img.save_with_format(path, image::ImageFormat::Jpeg).unwrap();
    }

    #[test]
    fn test_wav_validator() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.wav");
        write_wav(&good);
        assert!(WavValidator.validate(&good).is_ok());

        let truncated = dir.path().join("truncated.wav");
        std::fs::write(&truncated, b"RIFF\x24\x00\x00\x00WAVEfm").unwrap();
        assert!(matches!(
            WavValidator.validate(&truncated),
            Err(Error::Integrity { .. })
        ));

        let garbage = dir.path().join("garbage.wav");
        std::fs::write(&garbage, b"<html>429 Too Many Requests</html>").unwrap();
        assert!(WavValidator.validate(&garbage).is_err());
    }

    #[test]
    fn test_jpeg_validator() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.jpg");
        write_jpeg(&good);
        assert!(JpegValidator.validate(&good).is_ok());

        let garbage = dir.path().join("garbage.jpg");
        std::fs::write(&garbage, b"not an image at all").unwrap();
        assert!(matches!(
            JpegValidator.validate(&garbage),
            Err(Error::Integrity { .. })
        ));
    }

    #[test]
    fn test_validator_for_kind() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("a.wav");
        write_wav(&wav);

        assert!(validator_for(MediaKind::Wav).validate(&wav).is_ok());
        assert!(validator_for(MediaKind::Jpeg).validate(&wav).is_err());
    }
}
