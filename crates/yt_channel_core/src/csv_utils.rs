use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use encoding_rs::{Encoding, UTF_8};
use encoding_rs_io::{DecodeReaderBytes, DecodeReaderBytesBuilder};
use tracing::warn;

use crate::errors::SyncError;
use crate::models::{MetadataUpdate, VideoRecord};
use crate::timestamp::normalize_video_id;

/// Header of the export file.
pub const FIELDNAMES: [&str; 3] = ["title", "video_id", "likes"];

// Accepted header spellings, canonical name first.
pub const TITLE_COLUMNS: [&str; 3] = ["title", "Título Corregido", "Título del video"];
pub const VIDEO_ID_COLUMNS: [&str; 3] = ["video_id", "ID de YouTube", "ID de youtube"];
pub const DESCRIPTION_COLUMNS: [&str; 2] = ["description", "Descripción"];

/// Rows accepted from an input file plus the number dropped for lacking an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRows<T> {
    pub rows: Vec<T>,
    pub dropped: usize,
}

fn resolve_encoding(label: &str) -> Result<&'static Encoding, SyncError> {
    Encoding::for_label(label.as_bytes())
        .ok_or_else(|| SyncError::Encoding(format!("unsupported encoding: {label}")))
}

fn open_reader(
    path: &Path,
    encoding: &str,
) -> Result<csv::Reader<DecodeReaderBytes<File, Vec<u8>>>, SyncError> {
    if !path.exists() {
        return Err(SyncError::Config(format!(
            "CSV file not found: {}",
            path.display()
        )));
    }
    let enc = resolve_encoding(encoding)?;
    let file = File::open(path)?;
    Ok(csv::ReaderBuilder::new().flexible(true).from_reader(
        DecodeReaderBytesBuilder::new()
            .encoding(Some(enc))
            .build(file),
    ))
}

fn find_column(headers: &csv::StringRecord, candidates: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|name| candidates.iter().any(|candidate| *candidate == name.trim()))
}

fn require_column(
    path: &Path,
    headers: &csv::StringRecord,
    candidates: &[&str],
) -> Result<usize, SyncError> {
    find_column(headers, candidates).ok_or_else(|| {
        let found: Vec<&str> = headers.iter().collect();
        SyncError::Config(format!(
            "CSV file {} is missing required column '{}' (found: {})",
            path.display(),
            candidates[0],
            found.join(", ")
        ))
    })
}

/// Reads the corrected title, id and description of each row. Rows without an
/// id are dropped with a warning.
pub fn read_metadata_updates(
    path: &Path,
    encoding: &str,
) -> Result<ParsedRows<MetadataUpdate>, SyncError> {
    let mut reader = open_reader(path, encoding)?;
    let headers = reader.headers()?.clone();
    let title_idx = require_column(path, &headers, &TITLE_COLUMNS)?;
    let id_idx = require_column(path, &headers, &VIDEO_ID_COLUMNS)?;
    let description_idx = require_column(path, &headers, &DESCRIPTION_COLUMNS)?;

    let mut parsed = ParsedRows {
        rows: Vec::new(),
        dropped: 0,
    };
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let Some(video_id) = record.get(id_idx).and_then(normalize_video_id) else {
            warn!(row = line + 1, "row has no video id, dropping it");
            parsed.dropped += 1;
            continue;
        };
        parsed.rows.push(MetadataUpdate {
            title: record.get(title_idx).unwrap_or_default().trim().to_string(),
            video_id,
            description: record.get(description_idx).unwrap_or_default().to_string(),
        });
    }
    Ok(parsed)
}

pub fn read_video_ids(path: &Path, encoding: &str) -> Result<ParsedRows<String>, SyncError> {
    let mut reader = open_reader(path, encoding)?;
    let headers = reader.headers()?.clone();
    let id_idx = require_column(path, &headers, &VIDEO_ID_COLUMNS)?;

    let mut parsed = ParsedRows {
        rows: Vec::new(),
        dropped: 0,
    };
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        match record.get(id_idx).and_then(normalize_video_id) {
            Some(video_id) => parsed.rows.push(video_id),
            None => {
                warn!(row = line + 1, "row has no video id, dropping it");
                parsed.dropped += 1;
            }
        }
    }
    Ok(parsed)
}

/// Writes the export file, replacing any previous content. The header is
/// written even when `records` is empty.
pub fn write_video_records(
    path: &Path,
    encoding: &str,
    records: &[VideoRecord],
) -> Result<usize, SyncError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let enc = resolve_encoding(encoding)?;
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    write_record(&mut writer, enc, &FIELDNAMES)?;
    for record in records {
        let likes = record.likes.to_string();
        write_record(
            &mut writer,
            enc,
            &[
                record.title.as_str(),
                record.video_id.as_str(),
                likes.as_str(),
            ],
        )?;
    }

    writer.flush()?;
    Ok(records.len())
}

fn write_record<W: Write>(
    writer: &mut W,
    encoding: &'static Encoding,
    record: &[&str],
) -> Result<(), SyncError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    csv_writer.write_record(record)?;
    csv_writer.flush()?;
    let buffer = csv_writer
        .into_inner()
        .map_err(|err| SyncError::Io(err.into_error()))?;
    if encoding == UTF_8 {
        writer.write_all(&buffer)?;
    } else {
        let utf8 = String::from_utf8(buffer).map_err(|err| SyncError::Encoding(err.to_string()))?;
        let (encoded, _, had_errors) = encoding.encode(&utf8);
        if had_errors {
            return Err(SyncError::Encoding(format!(
                "text cannot be represented in {}",
                encoding.name()
            )));
        }
        writer.write_all(&encoded)?;
    }
    Ok(())
}
