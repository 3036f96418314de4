//! Content classification for batch input files
//!
//! Leading bytes are sniffed into a coarse MIME category (`image`, `text`,
//! `application`, ...). Text is ambiguous, so for text files the extension
//! decides the effective type instead; that is how `.json` payloads are told
//! apart from plain text.

use std::path::PathBuf;

/// Sniffing never looks past this many bytes
const SNIFF_LEN: usize = 512;

/// How a file has to be sent to the model server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// Decoded and converted to a pixel tensor
    Image,
    /// Sent verbatim, assumed to already be a payload
    Json,
    Unsupported,
}

impl ContentType {
    /// Map an effective type tag onto a supported content type
    pub fn from_tag(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case("image") {
            ContentType::Image
        } else if tag.eq_ignore_ascii_case("json") {
            ContentType::Json
        } else {
            ContentType::Unsupported
        }
    }

    pub fn is_supported(&self) -> bool {
        *self != ContentType::Unsupported
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Image => write!(f, "image"),
            ContentType::Json => write!(f, "json"),
            ContentType::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// A directory entry after classification
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub name: String,
    pub path: PathBuf,
    pub content_type: ContentType,
}

/// Directories and hidden files are never candidates for inference
pub fn is_candidate(name: &str, is_dir: bool) -> bool {
    !is_dir && !name.starts_with('.')
}

/// Classify a candidate file from its name and contents
pub fn classify(name: &str, contents: &[u8]) -> ContentType {
    ContentType::from_tag(&effective_type(name, contents))
}

/// The sniffed category, or the extension when the category is `text`
pub fn effective_type(name: &str, contents: &[u8]) -> String {
    let category = sniff_category(contents);
    if category == "text" {
        return extension(name).to_string();
    }
    category.to_string()
}

/// Substring after the final `.`; the whole name when there is none
fn extension(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

enum Pattern {
    /// Exact prefix match
    Exact(&'static [u8]),
    /// Exact prefix match after optional leading whitespace
    Trimmed(&'static [u8]),
    /// Prefix match under a mask
    Masked {
        mask: &'static [u8],
        pattern: &'static [u8],
    },
    /// Case-insensitive HTML tag after optional whitespace, followed by a
    /// space or `>`
    Html(&'static [u8]),
    Mp4,
}

const SIGNATURES: &[(Pattern, &str)] = &[
    (Pattern::Html(b"<!DOCTYPE HTML"), "text"),
    (Pattern::Html(b"<HTML"), "text"),
    (Pattern::Html(b"<HEAD"), "text"),
    (Pattern::Html(b"<SCRIPT"), "text"),
    (Pattern::Html(b"<IFRAME"), "text"),
    (Pattern::Html(b"<H1"), "text"),
    (Pattern::Html(b"<DIV"), "text"),
    (Pattern::Html(b"<FONT"), "text"),
    (Pattern::Html(b"<TABLE"), "text"),
    (Pattern::Html(b"<A"), "text"),
    (Pattern::Html(b"<STYLE"), "text"),
    (Pattern::Html(b"<TITLE"), "text"),
    (Pattern::Html(b"<B"), "text"),
    (Pattern::Html(b"<BODY"), "text"),
    (Pattern::Html(b"<BR"), "text"),
    (Pattern::Html(b"<P"), "text"),
    (Pattern::Html(b"<!--"), "text"),
    (Pattern::Trimmed(b"<?xml"), "text"),
    (Pattern::Exact(b"%PDF-"), "application"),
    (Pattern::Exact(b"%!PS-Adobe-"), "application"),
    (Pattern::Masked {
        mask: b"\xFF\xFF\x00\x00",
        pattern: b"\xFE\xFF\x00\x00",
    }, "text"),
    (Pattern::Masked {
        mask: b"\xFF\xFF\x00\x00",
        pattern: b"\xFF\xFE\x00\x00",
    }, "text"),
    (Pattern::Masked {
        mask: b"\xFF\xFF\xFF\x00",
        pattern: b"\xEF\xBB\xBF\x00",
    }, "text"),
    (Pattern::Exact(b"\x00\x00\x01\x00"), "image"),
    (Pattern::Exact(b"\x00\x00\x02\x00"), "image"),
    (Pattern::Exact(b"BM"), "image"),
    (Pattern::Exact(b"GIF87a"), "image"),
    (Pattern::Exact(b"GIF89a"), "image"),
    (Pattern::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00WEBPVP",
    }, "image"),
    (Pattern::Exact(b"\x89PNG\x0D\x0A\x1A\x0A"), "image"),
    (Pattern::Exact(b"\xFF\xD8\xFF"), "image"),
    (Pattern::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"FORM\x00\x00\x00\x00AIFF",
    }, "audio"),
    (Pattern::Masked {
        mask: b"\xFF\xFF\xFF",
        pattern: b"ID3",
    }, "audio"),
    (Pattern::Exact(b"OggS\x00"), "application"),
    (Pattern::Exact(b"MThd\x00\x00\x00\x06"), "audio"),
    (Pattern::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00AVI ",
    }, "video"),
    (Pattern::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00WAVE",
    }, "audio"),
    (Pattern::Mp4, "video"),
    (Pattern::Exact(b"\x1A\x45\xDF\xA3"), "video"),
    (Pattern::Exact(b"wOFF"), "font"),
    (Pattern::Exact(b"wOF2"), "font"),
    (Pattern::Exact(b"\x00\x01\x00\x00"), "font"),
    (Pattern::Exact(b"OTTO"), "font"),
    (Pattern::Exact(b"\x1F\x8B\x08"), "application"),
    (Pattern::Exact(b"PK\x03\x04"), "application"),
    (Pattern::Exact(b"Rar!\x1A\x07\x00"), "application"),
    (Pattern::Exact(b"Rar!\x1A\x07\x01\x00"), "application"),
    (Pattern::Exact(b"\x00\x61\x73\x6D"), "application"),
];

/// Coarse MIME category of a byte buffer
pub fn sniff_category(contents: &[u8]) -> &'static str {
    let data = &contents[..contents.len().min(SNIFF_LEN)];

    let first_non_ws = data
        .iter()
        .position(|b| !is_whitespace(*b))
        .unwrap_or(data.len());

    for (pattern, category) in SIGNATURES {
        if pattern.matches(data, first_non_ws) {
            return *category;
        }
    }

    if data.iter().any(|b| is_binary(*b)) {
        "application"
    } else {
        "text"
    }
}

impl Pattern {
    fn matches(&self, data: &[u8], first_non_ws: usize) -> bool {
        match self {
            Pattern::Exact(sig) => data.starts_with(sig),
            Pattern::Trimmed(sig) => data[first_non_ws..].starts_with(sig),
            Pattern::Masked { mask, pattern } => {
                data.len() >= pattern.len()
                    && data
                        .iter()
                        .zip(mask.iter().zip(pattern.iter()))
                        .all(|(d, (m, p))| d & m == *p)
            }
            Pattern::Html(tag) => {
                let data = &data[first_non_ws..];
                if data.len() < tag.len() + 1 {
                    return false;
                }
                let matches_tag = data
                    .iter()
                    .zip(tag.iter())
                    .all(|(d, t)| d.to_ascii_uppercase() == *t);
                let terminator = data[tag.len()];
                matches_tag && (terminator == b' ' || terminator == b'>')
            }
            Pattern::Mp4 => is_mp4(data),
        }
    }
}

fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if data.len() < box_size || box_size % 4 != 0 || box_size < 12 {
        return false;
    }
    if &data[4..8] != b"ftyp" {
        return false;
    }
    (8..box_size)
        .step_by(4)
        .filter(|&st| st != 12)
        .any(|st| data.get(st..st + 3) == Some(&b"mp4"[..]))
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

fn is_binary(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
