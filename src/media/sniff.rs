//! Content sniffing for fetched media.
//!
//! Servers routinely lie about `Content-Type`, so the type is taken from the
//! payload's leading bytes instead. Only image and video types are accepted;
//! anything else (audio, documents, HTML error pages) fails detection.

use infer::MatcherType;

use super::{MediaError, MediaSniffer};

/// Detects media types from magic bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicSniffer;

impl MediaSniffer for MagicSniffer {
    fn detect(&self, bytes: &[u8]) -> Result<&'static str, MediaError> {
        infer::get(bytes)
            .filter(|kind| matches!(kind.matcher_type(), MatcherType::Image | MatcherType::Video))
            .map(|kind| kind.mime_type())
            .ok_or(MediaError::TypeDetection {
                len: bytes.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(bytes: &[u8]) -> Result<&'static str, MediaError> {
        MagicSniffer.detect(bytes)
    }

    #[test]
    fn test_detects_images() {
        assert_eq!(detect(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR").unwrap(), "image/png");
        assert_eq!(detect(b"\xff\xd8\xff\xe0\0\x10JFIF").unwrap(), "image/jpeg");
        assert_eq!(detect(b"GIF89a\x01\0\x01\0").unwrap(), "image/gif");
        assert_eq!(detect(b"RIFF\x24\0\0\0WEBPVP8 ").unwrap(), "image/webp");
    }

    #[test]
    fn test_iso_images_are_not_video() {
        let avif = b"\0\0\0\x1cftypavif\0\0\0\0avifmif1miaf";
        let heic = b"\0\0\0\x18ftypheic\0\0\0\0mif1heic";

        assert_eq!(detect(avif).unwrap(), "image/avif");
        let heic_type = detect(heic).unwrap();
        assert!(heic_type.starts_with("image/"), "got {heic_type}");
    }

    #[test]
    fn test_detects_video_containers() {
        assert_eq!(detect(b"\0\0\0\x18ftypmp42\0\0\0\0isommp42").unwrap(), "video/mp4");
        assert_eq!(detect(b"\0\0\0\x14ftypqt  \0\0\0\0qt  ").unwrap(), "video/quicktime");
        let webm = b"\x1a\x45\xdf\xa3\x9f\x42\x86\x81\x01\x42\xf7\x81\x01\x42\xf2\x81\x04\x42\xf3\x81\x08\x42\x82\x84webm";
        assert_eq!(detect(webm).unwrap(), "video/webm");
    }

    #[test]
    fn test_rejects_unknown_payloads() {
        assert_eq!(
            detect(b"<html><body>404</body></html>"),
            Err(MediaError::TypeDetection {
                len: 29
            })
        );
        assert!(detect(b"").is_err());
        // RIFF but not WEBP (WAV audio)
        assert!(detect(b"RIFF\x24\0\0\0WAVEfmt ").is_err());
        // ISO container carrying audio
        assert!(detect(b"\0\0\0\x18ftypM4A \0\0\0\0M4A isom").is_err());
    }
}
