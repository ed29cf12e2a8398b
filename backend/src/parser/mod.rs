//! Local-file extractor: CSV (or JSON) to [`RawRecord`]s.
//!
//! Detects text encoding and delimiter, reads rows with a real CSV reader and
//! pads short rows to the header length. No student-specific logic here.

use serde_json::Value;
use std::path::Path;

use crate::error::{CsvError, CsvResult, StructuralError};
use crate::models::RawRecord;

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed rows, in file order
    pub records: Vec<RawRecord>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Column headers, in file order
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Latin-1 goes through windows-1252, its superset in the WHATWG tables.
/// Unknown encodings and invalid UTF-8 fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0
        }
        "iso-8859-15" | "latin-9" | "latin9" => encoding_rs::ISO_8859_15.decode(bytes).0,
        _ => String::from_utf8_lossy(bytes),
    };
    decoded.trim_start_matches('\u{feff}').to_string()
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text into rows with an explicit delimiter.
///
/// # Example
/// ```ignore
/// use rosterload::csv_to_records;
///
/// let rows = csv_to_records("Student ID,Email\n1,a@b.com", ',').unwrap();
/// assert_eq!(rows[0].get("Email"), Some("a@b.com"));
/// ```
pub fn csv_to_records(content: &str, delimiter: char) -> CsvResult<Vec<RawRecord>> {
    parse_string_with_metadata(content, delimiter, "utf-8".to_string()).map(|r| r.records)
}

/// Parse CSV file with auto-detection of encoding and delimiter.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    parse_string_with_metadata(&content, delimiter, encoding)
}

/// Parse CSV string with explicit delimiter and return metadata.
pub fn parse_string_with_metadata(
    content: &str,
    delimiter: char,
    encoding: String,
) -> CsvResult<ParseResult> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_matches('"').to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        // Short rows are padded, long rows truncated
        let record: RawRecord = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), row.get(i).unwrap_or("").to_string()))
            .collect();
        records.push(record);
    }

    Ok(ParseResult {
        records,
        encoding,
        delimiter,
        headers,
    })
}

/// Convert a JSON array of objects into rows.
///
/// Cells may be strings, numbers, booleans or null; they are stringified, null
/// becoming empty. Anything else is not row-shaped.
pub fn records_from_json(value: &Value) -> Result<Vec<RawRecord>, StructuralError> {
    let rows = value
        .as_array()
        .ok_or_else(|| StructuralError::NotASequence(json_kind(value).to_string()))?;

    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let obj = row.as_object().ok_or_else(|| StructuralError::NotRowShaped {
                index,
                found: json_kind(row).to_string(),
            })?;
            obj.iter()
                .map(|(header, cell)| {
                    let text = match cell {
                        Value::String(s) => s.clone(),
                        Value::Number(n) => n.to_string(),
                        Value::Bool(b) => b.to_string(),
                        Value::Null => String::new(),
                        other => {
                            return Err(StructuralError::NotRowShaped {
                                index,
                                found: format!("{} in column '{}'", json_kind(other), header),
                            })
                        }
                    };
                    Ok((header.clone(), text))
                })
                .collect::<Result<RawRecord, _>>()
        })
        .collect()
}

/// Headers in first-seen order across a batch.
pub fn collect_headers(records: &[RawRecord]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for record in records {
        let mut row_headers: Vec<&str> = record.headers().collect();
        row_headers.sort_unstable();
        for header in row_headers {
            if !headers.iter().any(|h| h == header) {
                headers.push(header.to_string());
            }
        }
    }
    headers
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
