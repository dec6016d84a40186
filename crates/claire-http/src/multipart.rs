//! Multipart form data parsing for `POST /api/v1/files`: a hand-rolled
//! boundary-splitting parser that also surfaces the client-declared
//! filename.

use bytes::Bytes;

use crate::error::HttpError;

/// A parsed multipart upload: the file field's bytes, declared content
/// type, and declared filename.
#[derive(Debug)]
pub struct MultipartFile {
    /// The uploaded bytes, exactly as received — no transcoding.
    pub data: Bytes,
    /// `Content-Type` declared on the file part, if any.
    pub content_type: Option<String>,
    /// `filename` declared on the file part's `Content-Disposition`, if any.
    pub filename: Option<String>,
}

/// Extract the boundary from a `Content-Type: multipart/form-data;
/// boundary=...` header.
///
/// # Errors
/// Returns [`HttpError::MalformedBody`] if the header is missing, not
/// multipart, or carries no boundary parameter.
pub fn extract_boundary(content_type: &str) -> Result<String, HttpError> {
    if !content_type
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
    {
        return Err(HttpError::MalformedBody(format!(
            "expected multipart/form-data, got {content_type}"
        )));
    }
    for part in content_type.split(';') {
        let trimmed = part.trim();
        if let Some(val) = trimmed.strip_prefix("boundary=") {
            let boundary = val.trim_matches('"').to_owned();
            if boundary.is_empty() {
                return Err(HttpError::MalformedBody("empty multipart boundary".to_owned()));
            }
            return Ok(boundary);
        }
    }
    Err(HttpError::MalformedBody("missing multipart boundary".to_owned()))
}

/// Parse a multipart body into its single file field, per `POST
/// /api/v1/files`'s contract: exactly one file part, named `file`.
///
/// # Errors
/// Returns [`HttpError::MalformedBody`] if no file field is present.
pub fn parse_file_field(body: &[u8], boundary: &str) -> Result<MultipartFile, HttpError> {
    let delimiter = format!("--{boundary}");
    let end_delimiter = format!("--{boundary}--");
    let parts = split_parts(body, delimiter.as_bytes(), end_delimiter.as_bytes());

    for part in parts {
        let Some((headers, part_body)) = split_headers_body(part) else {
            continue;
        };
        let disposition = parse_content_disposition(headers);
        if disposition.name.as_deref() == Some("file") || disposition.filename.is_some() {
            return Ok(MultipartFile {
                data: Bytes::copy_from_slice(part_body),
                content_type: parse_part_content_type(headers),
                filename: disposition.filename,
            });
        }
    }

    Err(HttpError::MalformedBody("missing file field in multipart body".to_owned()))
}

fn split_parts<'a>(body: &'a [u8], delimiter: &[u8], end_delimiter: &[u8]) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let Some(pos) = find_bytes(body, delimiter) else {
        return parts;
    };
    let mut remaining = skip_crlf(&body[pos + delimiter.len()..]);

    loop {
        if remaining.starts_with(end_delimiter)
            || remaining
                .strip_prefix(b"\r\n")
                .is_some_and(|r| r.starts_with(end_delimiter))
        {
            break;
        }
        if let Some(pos) = find_bytes(remaining, delimiter) {
            parts.push(strip_trailing_crlf(&remaining[..pos]));
            remaining = skip_crlf(&remaining[pos + delimiter.len()..]);
        } else {
            let part = strip_trailing_crlf(remaining);
            if !part.is_empty() {
                parts.push(part);
            }
            break;
        }
    }
    parts
}

fn split_headers_body(part: &[u8]) -> Option<(&[u8], &[u8])> {
    let separator = b"\r\n\r\n";
    find_bytes(part, separator).map(|pos| (&part[..pos], &part[pos + separator.len()..]))
}

struct ContentDisposition {
    name: Option<String>,
    filename: Option<String>,
}

fn parse_content_disposition(headers: &[u8]) -> ContentDisposition {
    let headers_str = String::from_utf8_lossy(headers);
    let mut name = None;
    let mut filename = None;
    for line in headers_str.split("\r\n") {
        if !line.to_ascii_lowercase().starts_with("content-disposition:") {
            continue;
        }
        if let Some(n) = extract_quoted_param(line, "name") {
            name = Some(n);
        }
        if let Some(f) = extract_quoted_param(line, "filename") {
            filename = Some(f);
        }
    }
    ContentDisposition { name, filename }
}

fn parse_part_content_type(headers: &[u8]) -> Option<String> {
    let headers_str = String::from_utf8_lossy(headers);
    for line in headers_str.split("\r\n") {
        let lower = line.to_ascii_lowercase();
        if let Some(rest) = lower.strip_prefix("content-type:") {
            return Some(rest.trim().to_owned());
        }
    }
    None
}

fn extract_quoted_param(header_line: &str, param_name: &str) -> Option<String> {
    let quoted_pattern = format!("{param_name}=\"");
    let lower_line = header_line.to_ascii_lowercase();
    if let Some(pos) = lower_line.find(&quoted_pattern) {
        let start = pos + quoted_pattern.len();
        let rest = &header_line[start..];
        if let Some(end) = rest.find('"') {
            return Some(rest[..end].to_owned());
        }
    }
    None
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn skip_crlf(data: &[u8]) -> &[u8] {
    data.strip_prefix(b"\r\n").unwrap_or(data)
}

fn strip_trailing_crlf(data: &[u8]) -> &[u8] {
    data.strip_suffix(b"\r\n").unwrap_or(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_extract_boundary() {
        let ct = "multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxkTrZu0gW";
        assert_eq!(
            extract_boundary(ct).unwrap(),
            "----WebKitFormBoundary7MA4YWxkTrZu0gW"
        );
    }

    #[test]
    fn test_should_reject_non_multipart_content_type() {
        assert!(extract_boundary("application/json").is_err());
    }

    #[test]
    fn test_should_parse_file_field_with_filename_and_content_type() {
        let boundary = "----b";
        let body = "------b\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"sample.png\"\r\n\
             Content-Type: image/png\r\n\
             \r\n\
             \x89PNGDATA\r\n\
             ------b--\r\n";
        let parsed = parse_file_field(body.as_bytes(), boundary).unwrap();
        assert_eq!(parsed.data.as_ref(), b"\x89PNGDATA");
        assert_eq!(parsed.content_type.as_deref(), Some("image/png"));
        assert_eq!(parsed.filename.as_deref(), Some("sample.png"));
    }

    #[test]
    fn test_should_error_when_file_field_missing() {
        let boundary = "b";
        let body = "--b\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhi\r\n--b--\r\n";
        assert!(parse_file_field(body.as_bytes(), boundary).is_err());
    }

    #[test]
    fn test_should_preserve_binary_bytes_exactly() {
        let boundary = "b";
        let mut body = Vec::new();
        body.extend_from_slice(b"--b\r\n");
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"file\"; filename=\"x.bin\"\r\n");
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(&[0u8, 255, 10, 13, 0, 200]);
        body.extend_from_slice(b"\r\n--b--\r\n");
        let parsed = parse_file_field(&body, boundary).unwrap();
        assert_eq!(parsed.data.as_ref(), &[0u8, 255, 10, 13, 0, 200]);
    }
}
