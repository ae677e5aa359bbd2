//! Fixed-layout parsing of the playlist text the service serves. The
//! format interleaves metadata and URL lines at a fixed stride, so all
//! of the line math lives here and nowhere else.

// Master playlist: two header lines, then three lines per variant
// (media attributes, stream attributes, segment-list URL).
const FIRST_VARIANT_LINE: usize = 2;
const VARIANT_STRIDE: usize = 3;
const VARIANT_URL_OFFSET: usize = 2;

// Media playlist: the sequence header sits on line 3 and segment URLs
// run from line 10 at a stride of 3.
const MEDIA_SEQUENCE_LINE: usize = 3;
const FIRST_SEGMENT_LINE: usize = 10;
const SEGMENT_STRIDE: usize = 3;

#[derive(Debug, Clone)]
pub struct VariantEntry {
    pub label: String,
    /// Line holding this variant's segment-list URL, recorded so a
    /// re-resolve can address the same variant in a fresh playlist.
    pub line_index: usize,
    pub url: String,
}

#[derive(Debug)]
pub struct SegmentListSnapshot {
    pub start_sequence: i64,
    pub segments: Vec<Segment>,
}

#[derive(Debug)]
pub struct Segment {
    pub sequence: i64,
    pub url: String,
}

#[derive(thiserror::Error, Debug)]
pub enum PlaylistError {
    #[error("playlist has no line {0}")]
    MissingLine(usize),
    #[error("malformed sequence header: {0:?}")]
    BadSequenceHeader(String),
}

fn quality_label(media_line: &str) -> Option<&str> {
    let rest = media_line.split_once("NAME=\"")?.1;
    let name = rest.split('"').next()?;

    // Source variants are labelled e.g. `1080p60 (source)`.
    name.split_whitespace().next()
}

/// Variant entries in the order the service lists them. Entries without
/// a NAME attribute are skipped.
pub fn variants(master: &str) -> Vec<VariantEntry> {
    let lines: Vec<&str> = master.lines().collect();
    let mut entries = Vec::new();

    let mut line = FIRST_VARIANT_LINE;
    while line + VARIANT_URL_OFFSET < lines.len() {
        if let Some(label) = quality_label(lines[line]) {
            entries.push(VariantEntry {
                label: label.to_string(),
                line_index: line + VARIANT_URL_OFFSET,
                url: lines[line + VARIANT_URL_OFFSET].to_string(),
            });
        }
        line += VARIANT_STRIDE;
    }

    entries
}

/// The line a previous selection recorded, out of a freshly fetched
/// copy of the master playlist.
pub fn line_at(master: &str, index: usize) -> Result<&str, PlaylistError> {
    master
        .lines()
        .nth(index)
        .ok_or(PlaylistError::MissingLine(index))
}

pub fn segment_list(media: &str) -> Result<SegmentListSnapshot, PlaylistError> {
    let header = media
        .lines()
        .nth(MEDIA_SEQUENCE_LINE)
        .ok_or(PlaylistError::MissingLine(MEDIA_SEQUENCE_LINE))?;
    let start_sequence: i64 = header
        .split(':')
        .nth(1)
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| PlaylistError::BadSequenceHeader(header.to_string()))?;

    let segments = media
        .lines()
        .skip(FIRST_SEGMENT_LINE)
        .step_by(SEGMENT_STRIDE)
        .enumerate()
        .map(|(n, url)| Segment {
            sequence: start_sequence + n as i64,
            url: url.to_string(),
        })
        .collect();

    Ok(SegmentListSnapshot {
        start_sequence,
        segments,
    })
}
