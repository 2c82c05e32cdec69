//! CSV reader for import files, with encoding auto-detection.
//!
//! Rows are kept as ordered field lists aligned with the header row:
//! the header order is the order fields are mapped in.

use std::path::Path;

/// Default field delimiter of objectum CSV files.
pub const DEFAULT_DELIMITER: u8 = b';';

/// CSV parsing error with its line
#[derive(Debug, Clone)]
pub struct CsvError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for CsvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for CsvError {}

impl CsvError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// One data row.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    /// 1-based data row number (header and blank lines not counted)
    pub line: usize,
    /// Trimmed values, one per header column
    pub values: Vec<String>,
}

impl CsvRow {
    /// Iterate `(header, value)` pairs in header order.
    pub fn fields<'a>(&'a self, headers: &'a [String]) -> impl Iterator<Item = (&'a str, &'a str)> {
        headers
            .iter()
            .zip(self.values.iter())
            .map(|(h, v)| (h.as_str(), v.as_str()))
    }
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Column headers (property codes)
    pub headers: Vec<String>,
    /// Data rows in file order
    pub rows: Vec<CsvRow>,
    /// Detected encoding
    pub encoding: String,
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

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        // WHATWG decodes latin1 as windows-1252
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        "iso-8859-15" | "latin-9" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        // UTF-8 and anything unknown: lossy UTF-8
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Parse CSV text with an explicit delimiter.
///
/// # Example
/// ```ignore
/// use objectum_cli::parser::parse_str;
///
/// let result = parse_str("name;age\nAlice;30\nBob;25", b';')?;
/// assert_eq!(result.headers, vec!["name", "age"]);
/// assert_eq!(result.rows[1].values, vec!["Bob", "25"]);
/// ```
pub fn parse_str(content: &str, delimiter: u8) -> Result<ParseResult, CsvError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CsvError::new(1, format!("Cannot read header: {}", e)))?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::new(1, "Empty CSV file"));
    }

    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| {
            let line = e.position().map(|p| p.line() as usize).unwrap_or(0);
            CsvError::new(line, e.to_string())
        })?;

        if record.iter().all(str::is_empty) {
            continue;
        }

        let values = (0..headers.len())
            .map(|i| record.get(i).unwrap_or("").to_string())
            .collect();

        rows.push(CsvRow {
            line: rows.len() + 1,
            values,
        });
    }

    Ok(ParseResult {
        headers,
        rows,
        encoding: "utf-8".to_string(),
    })
}

/// Parse CSV bytes with encoding auto-detection.
pub fn parse_bytes(bytes: &[u8], delimiter: u8) -> Result<ParseResult, CsvError> {
    // valid UTF-8 wins over a statistical guess
    let encoding = match std::str::from_utf8(bytes) {
        Ok(_) => "utf-8".to_string(),
        Err(_) => detect_encoding(bytes),
    };
    let content = decode_content(bytes, &encoding);

    let mut result = parse_str(&content, delimiter)?;
    result.encoding = encoding;
    Ok(result)
}

/// Read and parse a CSV file with encoding auto-detection.
pub async fn parse_file(path: &Path, delimiter: u8) -> Result<ParseResult, CsvError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CsvError::new(0, format!("Cannot read file '{}': {}", path.display(), e)))?;

    parse_bytes(&bytes, delimiter)
}
