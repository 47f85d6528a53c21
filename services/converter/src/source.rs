//! JSON-lines record source.
//!
//! Development record format: one JSON-encoded `DecodedRecord` per
//! line, optionally gzip-compressed. Real wire decoders plug in behind
//! the same `RecordSource` trait.

use flate2::read::GzDecoder;
use grid_common::{DecodedRecord, RecordSource, SourceResult};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub struct JsonLinesSource {
    reader: Box<dyn BufRead + Send>,
    line: String,
}

impl JsonLinesSource {
    /// Open a `.jsonl` or `.jsonl.gz` record file.
    pub fn open(path: &Path) -> SourceResult<Self> {
        let file = File::open(path)?;
        let gz = path.extension().and_then(|e| e.to_str()) == Some("gz");
        let reader: Box<dyn BufRead + Send> = if gz {
            Box::new(BufReader::new(GzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(Self {
            reader,
            line: String::new(),
        })
    }
}

impl RecordSource for JsonLinesSource {
    fn next_record(&mut self) -> SourceResult<Option<DecodedRecord>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Ok(Some(serde_json::from_str(trimmed)?));
        }
    }
}
