use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use thiserror::Error;

/// Header fields in wire order
///
/// Names keep their original casing and duplicates are kept as separate
/// entries; values stay raw bytes since HTTP does not require them to be UTF-8.
pub type HeaderList = Vec<(String, Vec<u8>)>;

/// Content-Length that is not a number, or conflicting Content-Length values
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid Content-Length header")]
pub struct InvalidContentLength;

/// Copy parsed headers into an owned list
pub fn headers_from_parsed(parsed: &[httparse::Header<'_>]) -> HeaderList {
    parsed
        .iter()
        .map(|h| (h.name.to_string(), h.value.to_vec()))
        .collect()
}

/// All values of a header, case-insensitively, in wire order
pub fn header_values<'a>(
    headers: &'a [(String, Vec<u8>)],
    name: &'a str,
) -> impl Iterator<Item = &'a [u8]> + 'a {
    headers
        .iter()
        .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_slice())
}

/// First value of a header, case-insensitively
pub fn find_header<'a>(headers: &'a [(String, Vec<u8>)], name: &str) -> Option<&'a [u8]> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_slice())
}

/// Declared Content-Length, if any
///
/// Repeated headers (or comma-separated lists) are accepted only when every
/// value agrees.
pub fn content_length(headers: &[(String, Vec<u8>)]) -> Result<Option<u64>, InvalidContentLength> {
    let mut found: Option<u64> = None;

    for value in header_values(headers, CONTENT_LENGTH.as_str()) {
        let value = std::str::from_utf8(value).map_err(|_| InvalidContentLength)?;
        for part in value.split(',') {
            let part = part.trim();
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(InvalidContentLength);
            }
            let len: u64 = part.parse().map_err(|_| InvalidContentLength)?;
            match found {
                Some(existing) if existing != len => return Err(InvalidContentLength),
                _ => found = Some(len),
            }
        }
    }

    Ok(found)
}

/// Whether a Transfer-Encoding header is present at all
pub fn has_transfer_encoding(headers: &[(String, Vec<u8>)]) -> bool {
    find_header(headers, TRANSFER_ENCODING.as_str()).is_some()
}

/// Whether `chunked` is the final transfer coding
pub fn is_chunked(headers: &[(String, Vec<u8>)]) -> bool {
    header_values(headers, TRANSFER_ENCODING.as_str())
        .flat_map(|v| v.split(|b| *b == b','))
        .map(|coding| coding.trim_ascii())
        .filter(|coding| !coding.is_empty())
        .last()
        .is_some_and(|coding| coding.eq_ignore_ascii_case(b"chunked"))
}

/// Append `name: value\r\n` lines for every header
pub fn write_header_block(buf: &mut Vec<u8>, headers: &[(String, Vec<u8>)]) {
    for (name, value) in headers {
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value);
        buf.extend_from_slice(b"\r\n");
    }
}
