//! Image type sniffing for saved downloads.

pub fn detect_image_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x89, 0x50, 0x4E, 0x47, ..] => "image/png",
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => "image/webp",
        _ => {
            tracing::warn!(
                "Unrecognized image format (first 4 bytes: {:02X?}), falling back to image/png",
                &bytes[..bytes.len().min(4)]
            );
            "image/png"
        }
    }
}

/// File extension matching the sniffed image type.
pub fn image_extension(bytes: &[u8]) -> &'static str {
    match detect_image_mime(bytes) {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    }
}
