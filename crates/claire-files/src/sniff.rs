//! Byte-signature ("magic number") sniffing, cross-checked against the
//! declared `Content-Type` for the media-type allowlist.

/// A family of file formats recognized by their leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFamily {
    /// PNG (`\x89PNG`).
    Png,
    /// JPEG (`\xFF\xD8\xFF`).
    Jpeg,
    /// PDF (`%PDF`).
    Pdf,
    /// ZIP-based container, e.g. Office Open XML (`PK\x03\x04`).
    Zip,
}

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_MAGIC: &[u8] = b"\xFF\xD8\xFF";
const PDF_MAGIC: &[u8] = b"%PDF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Identify a format family from its leading bytes. Returns `None` for
/// formats with no stable byte signature (e.g. plain text, CSV) — those
/// are validated by declared media type alone.
#[must_use]
pub fn sniff(bytes: &[u8]) -> Option<MediaFamily> {
    if bytes.starts_with(PNG_MAGIC) {
        Some(MediaFamily::Png)
    } else if bytes.starts_with(JPEG_MAGIC) {
        Some(MediaFamily::Jpeg)
    } else if bytes.starts_with(PDF_MAGIC) {
        Some(MediaFamily::Pdf)
    } else if bytes.starts_with(ZIP_MAGIC) {
        Some(MediaFamily::Zip)
    } else {
        None
    }
}

/// Whether a declared media type is consistent with a sniffed family.
#[must_use]
pub fn family_matches_declared(family: MediaFamily, declared: &str) -> bool {
    match family {
        MediaFamily::Png => declared == "image/png",
        MediaFamily::Jpeg => declared == "image/jpeg" || declared == "image/jpg",
        MediaFamily::Pdf => declared == "application/pdf",
        MediaFamily::Zip => {
            declared.starts_with("application/vnd.openxmlformats-officedocument")
                || declared == "application/zip"
        }
    }
}

/// Validate a declared media type against both the allowlist and the
/// sniffed byte signature (when the format has one).
#[must_use]
pub fn is_accepted(bytes: &[u8], declared: &str, allowed: &[String]) -> bool {
    if !allowed.iter().any(|a| a == declared) {
        return false;
    }
    match sniff(bytes) {
        Some(family) => family_matches_declared(family, declared),
        // No recognizable signature (e.g. text/plain, text/csv): the
        // allowlist check above is all we can do.
        None => true,
    }
}
