//! Icon references
//!
//! Launcher icons are stored as image blobs. The presentation layer gets a
//! self-contained `data:` URL instead of the raw bytes.

use base64::Engine;
use image::ImageFormat;

const DATA_URL_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

fn mime_type(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::WebP) => "image/webp",
        // Launcher icons are PNG unless the bytes say otherwise
        _ => "image/png",
    }
}

/// Build a renderable URL for an icon blob. Empty blobs have no icon.
pub fn icon_url(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Some(format!("{}{}{}{}", DATA_URL_PREFIX, mime_type(bytes), BASE64_MARKER, encoded))
}

/// Recover the image bytes behind a URL produced by [`icon_url`].
pub fn decode_icon_url(url: &str) -> Option<Vec<u8>> {
    let rest = url.strip_prefix(DATA_URL_PREFIX)?;
    let (_, payload) = rest.split_once(BASE64_MARKER)?;
    base64::engine::general_purpose::STANDARD.decode(payload).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn test_mime_sniffing() {
        assert!(icon_url(PNG_MAGIC).unwrap().starts_with("data:image/png;base64,"));
        assert!(icon_url(JPEG_MAGIC).unwrap().starts_with("data:image/jpeg;base64,"));
        assert!(icon_url(b"opaque").unwrap().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_same_bytes_decode_identically() {
        let first = icon_url(PNG_MAGIC).unwrap();
        let second = icon_url(PNG_MAGIC).unwrap();
        assert_eq!(decode_icon_url(&first), decode_icon_url(&second));
        assert_eq!(decode_icon_url(&first).unwrap(), PNG_MAGIC);
    }

    #[test]
    fn test_empty_blob_has_no_url() {
        assert_eq!(icon_url(&[]), None);
    }

    #[test]
    fn test_decode_rejects_foreign_urls() {
        assert_eq!(decode_icon_url("https://example.com/icon.png"), None);
        assert_eq!(decode_icon_url("data:image/png,rawtext"), None);
    }
}
