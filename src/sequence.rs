use camino::Utf8Path;
use needletail::errors::ParseErrorKind;
use needletail::{FastxReader, parse_fastx_file};

use crate::error::SketchError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub name: String,
    pub sequence: Vec<u8>,
}

pub type RecordStream<'a> = Box<dyn Iterator<Item = Result<SequenceRecord, SketchError>> + 'a>;

/// Lazy single-pass access to the records of a sequence file.
pub trait SequenceSource: Send + Sync {
    /// An empty file yields an empty stream rather than an error.
    fn records(&self, path: &Utf8Path) -> Result<RecordStream<'_>, SketchError>;

    fn first_record(&self, path: &Utf8Path) -> Result<Option<SequenceRecord>, SketchError> {
        self.records(path)?.next().transpose()
    }
}

/// FASTA/FASTQ reader, gzip detected from content.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastxSource;

impl SequenceSource for FastxSource {
    fn records(&self, path: &Utf8Path) -> Result<RecordStream<'_>, SketchError> {
        match parse_fastx_file(path.as_std_path()) {
            Ok(reader) => Ok(Box::new(FastxRecords {
                reader,
                path: path.to_string(),
            })),
            Err(err) if matches!(err.kind, ParseErrorKind::EmptyFile) => {
                Ok(Box::new(std::iter::empty()))
            }
            Err(err) => Err(SketchError::SequenceParse(format!("{path}: {err}"))),
        }
    }
}

struct FastxRecords {
    reader: Box<dyn FastxReader>,
    path: String,
}

impl Iterator for FastxRecords {
    type Item = Result<SequenceRecord, SketchError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.reader.next()?;
        Some(
            record
                .map(|record| SequenceRecord {
                    name: String::from_utf8_lossy(record.id()).into_owned(),
                    sequence: record.seq().into_owned(),
                })
                .map_err(|err| SketchError::SequenceParse(format!("{}: {err}", self.path))),
        )
    }
}
