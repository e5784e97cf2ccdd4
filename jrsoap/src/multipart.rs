//! Multipart (SOAP with attachments) response parser.
//!
//! The repository service answers `runReport` and `get` on file resources with
//! a MIME multipart body: the SOAP envelope first, then one part per
//! attachment. The HTTP layer hands us the raw body, so the boundary is
//! recovered from the body itself. The toolkit always generates boundaries of
//! the shape `----=_Part_<n>_<id>`.

use crate::error::{Result, SoapError};
use base64::Engine;
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::borrow::Cow;
use tracing::{debug, trace};

static BOUNDARY_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"----=[^\r\n]*").expect("valid boundary regex"));

/// Content id of the file attachment returned by `get` on a file resource.
pub const ATTACHMENT_CONTENT_ID: &str = "<attachment>";

const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// One part of a multipart response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    /// Declared media type, lower-cased, without parameters
    pub content_type: String,
    /// `Content-Id` header, verbatim (angle brackets included)
    pub content_id: Option<String>,
    /// Raw headers, in order
    pub headers: Vec<(String, String)>,
    /// Decoded payload
    pub data: Vec<u8>,
}

impl MultipartPart {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    pub fn is_xml(&self) -> bool {
        self.content_type == "text/xml" || self.content_type.ends_with("+xml")
    }
}

/// Outcome of parsing a response that may or may not be multipart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Multipart {
    Parts(Vec<MultipartPart>),
    NotMultipart,
}

impl Multipart {
    /// Parses a raw response body, locating the boundary inside it.
    ///
    /// The boundary is wrapped in a synthetic
    /// `multipart/alternative; boundary="..."` content type and decoded with
    /// [`Multipart::parse_with_content_type`].
    pub fn parse(body: &[u8]) -> Result<Self> {
        let Some(boundary) = find_boundary(body) else {
            debug!(size = body.len(), "No multipart boundary in response");
            return Ok(Multipart::NotMultipart);
        };

        let content_type = format!("multipart/alternative; boundary=\"{boundary}\"");
        Self::parse_with_content_type(&content_type, body)
    }

    /// Parses a body whose `Content-Type` header is known.
    pub fn parse_with_content_type(content_type: &str, body: &[u8]) -> Result<Self> {
        let media_type = media_type(content_type);
        if !media_type.starts_with("multipart/") {
            return Ok(Multipart::NotMultipart);
        }
        let boundary = header_parameter(content_type, "boundary")
            .ok_or_else(|| SoapError::malformed("multipart content type without boundary"))?;

        let sections = split_sections(body, &boundary);
        if sections.is_empty() {
            return Err(SoapError::malformed(format!(
                "no part delimited by boundary {boundary}"
            )));
        }

        let parts = sections
            .into_iter()
            .map(parse_part)
            .collect::<Result<Vec<_>>>()?;

        debug!(boundary = %boundary, parts = parts.len(), "Parsed multipart response");
        Ok(Multipart::Parts(parts))
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, Multipart::Parts(_))
    }

    /// Parts, or [`SoapError::NotMultipart`].
    pub fn into_parts(self) -> Result<Vec<MultipartPart>> {
        match self {
            Multipart::Parts(parts) => Ok(parts),
            Multipart::NotMultipart => Err(SoapError::NotMultipart),
        }
    }
}

/// Finds the first toolkit-generated boundary marker in a body.
pub fn find_boundary(body: &[u8]) -> Option<String> {
    BOUNDARY_MARKER
        .find(body)
        .map(|m| String::from_utf8_lossy(m.as_bytes()).trim_end().to_string())
        .filter(|b| !b.is_empty())
}

/// Finds a part by its Content-Id.
pub fn find_by_content_id<'a>(parts: &'a [MultipartPart], content_id: &str) -> Option<&'a MultipartPart> {
    parts
        .iter()
        .find(|p| p.content_id.as_deref() == Some(content_id))
}

/// `type/subtype` of a content type header, lower-cased.
///
/// Invalid values fall back to `text/plain`, like mail readers do.
fn media_type(value: &str) -> String {
    let media = value.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    if media.split('/').count() == 2 && !media.starts_with('/') && !media.ends_with('/') {
        media
    } else {
        DEFAULT_CONTENT_TYPE.to_string()
    }
}

fn header_parameter(value: &str, name: &str) -> Option<String> {
    value.split(';').skip(1).find_map(|param| {
        let (key, val) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case(name) {
            Some(val.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Splits a body into raw part sections (headers + payload).
///
/// The line break preceding a delimiter belongs to the delimiter. A missing
/// closing delimiter ends the last part at the end of the body.
fn split_sections<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delimiter = format!("--{boundary}").into_bytes();
    let mut sections = Vec::new();
    let mut open: Option<usize> = None;
    let mut search = 0;

    while let Some(offset) = find_bytes(&body[search..], &delimiter) {
        let pos = search + offset;
        let after = pos + delimiter.len();

        let at_line_start = pos == 0 || body[pos - 1] == b'\n';
        let rest = &body[after..];
        let well_terminated = rest.is_empty()
            || rest.starts_with(b"--")
            || matches!(rest[0], b'\r' | b'\n' | b' ' | b'\t');
        if !at_line_start || !well_terminated {
            search = after;
            continue;
        }

        if let Some(start) = open.take() {
            sections.push(&body[start..strip_line_break(body, start, pos)]);
        }

        if rest.starts_with(b"--") {
            trace!(offset = pos, "Closing delimiter");
            return sections;
        }

        let line_end = match rest.iter().position(|&b| b == b'\n') {
            Some(i) => after + i + 1,
            None => body.len(),
        };
        open = Some(line_end);
        search = line_end;
    }

    if let Some(start) = open {
        sections.push(&body[start..strip_line_break(body, start, body.len())]);
    }
    sections
}

fn strip_line_break(body: &[u8], start: usize, end: usize) -> usize {
    let mut end = end;
    if end > start && body[end - 1] == b'\n' {
        end -= 1;
        if end > start && body[end - 1] == b'\r' {
            end -= 1;
        }
    }
    end
}

fn parse_part(section: &[u8]) -> Result<MultipartPart> {
    let (header_block, payload) = split_headers(section);
    let headers = parse_headers(header_block);

    let header = |name: &str| {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    };

    let content_type = header("Content-Type")
        .map(media_type)
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
    let content_id = header("Content-Id").map(str::to_string);
    let encoding = header("Content-Transfer-Encoding")
        .map(|e| e.trim().to_ascii_lowercase())
        .unwrap_or_default();

    let data = decode_payload(&encoding, payload)?;

    Ok(MultipartPart {
        content_type,
        content_id,
        headers,
        data,
    })
}

/// Splits a section at the first empty line.
fn split_headers(section: &[u8]) -> (&[u8], &[u8]) {
    // Section sans en-têtes : commence directement par une ligne vide
    if section.starts_with(b"\r\n") {
        return (&[], &section[2..]);
    }
    if section.starts_with(b"\n") {
        return (&[], &section[1..]);
    }
    if let Some(i) = find_bytes(section, b"\r\n\r\n") {
        let lf = find_bytes(section, b"\n\n");
        if lf.is_none_or(|j| i < j) {
            return (&section[..i], &section[i + 4..]);
        }
    }
    match find_bytes(section, b"\n\n") {
        Some(j) => (&section[..j], &section[j + 2..]),
        None => (section, &[]),
    }
}

fn parse_headers(block: &[u8]) -> Vec<(String, String)> {
    let text = String::from_utf8_lossy(block);
    let mut headers: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.starts_with(' ') || line.starts_with('\t') {
            // continuation (folded header)
            if let Some((_, value)) = headers.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }
    headers
}

fn decode_payload(encoding: &str, payload: &[u8]) -> Result<Vec<u8>> {
    match encoding {
        "base64" => {
            let compact: Vec<u8> = payload
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            base64::engine::general_purpose::STANDARD
                .decode(compact)
                .map_err(|e| SoapError::malformed(format!("invalid base64 payload: {e}")))
        }
        "quoted-printable" => {
            quoted_printable::decode(payload, quoted_printable::ParseMode::Robust)
                .map_err(|e| SoapError::malformed(format!("invalid quoted-printable payload: {e}")))
        }
        _ => Ok(payload.to_vec()),
    }
}
