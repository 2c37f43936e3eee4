use std::collections::HashMap;
use std::io::{BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use sourmash::manifest::Record;
use tempfile::NamedTempFile;
use tracing::info;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::SketchError;
use crate::fs_util::{persist, temp_file_beside};
use crate::manifest::{MANIFEST_ENTRY, SIGNATURE_SUFFIXES, write_manifest_csv};
use crate::sketch::Signature;

#[derive(Debug, Clone, Serialize)]
pub struct SinkSummary {
    pub location: Utf8PathBuf,
    pub count: usize,
}

/// Destination for finished signatures. Nothing is visible at `location`
/// until `close` succeeds.
pub trait SignatureSink {
    fn add(&mut self, signature: Signature) -> Result<(), SketchError>;

    fn len(&self) -> usize;

    fn location(&self) -> &Utf8Path;

    fn close(self: Box<Self>) -> Result<SinkSummary, SketchError>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Only destinations that can later be read back as already-done input are
/// accepted.
pub fn check_sink_location(location: &Utf8Path) -> Result<(), SketchError> {
    let name = location.as_str();
    if name.ends_with(".zip") || SIGNATURE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
        Ok(())
    } else {
        Err(SketchError::Configuration(format!(
            "output '{location}' must end in .zip, .sig, .sig.gz, .json or .json.gz"
        )))
    }
}

/// Pick a sink from the destination name: `.zip` collections, otherwise a
/// JSON signature list (gzipped for `.gz`).
pub fn open_sink(location: &Utf8Path) -> Result<Box<dyn SignatureSink>, SketchError> {
    check_sink_location(location)?;
    if location.as_str().ends_with(".zip") {
        Ok(Box::new(ZipSink::create(location)?))
    } else {
        Ok(Box::new(JsonSink::create(location)?))
    }
}

pub struct ZipSink {
    location: Utf8PathBuf,
    zip: ZipWriter<NamedTempFile>,
    records: Vec<Record>,
    md5_seen: HashMap<String, usize>,
    count: usize,
}

impl ZipSink {
    pub fn create(location: &Utf8Path) -> Result<Self, SketchError> {
        let temp = temp_file_beside(location)?;
        Ok(Self {
            location: location.to_path_buf(),
            zip: ZipWriter::new(temp),
            records: Vec::new(),
            md5_seen: HashMap::new(),
            count: 0,
        })
    }

    fn options() -> SimpleFileOptions {
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored)
    }
}

impl SignatureSink for ZipSink {
    fn add(&mut self, signature: Signature) -> Result<(), SketchError> {
        let md5sum = signature.md5sum();
        let seen = self.md5_seen.entry(md5sum.clone()).or_insert(0);
        *seen += 1;
        let internal_location = if *seen > 1 {
            format!("signatures/{md5sum}_{seen}.sig.gz")
        } else {
            format!("signatures/{md5sum}.sig.gz")
        };
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        serde_json::to_writer(&mut encoder, &[&signature])
            .map_err(|err| SketchError::Filesystem(err.to_string()))?;
        let bytes = encoder
            .finish()
            .map_err(|err| SketchError::Filesystem(err.to_string()))?;

        self.zip
            .start_file(internal_location.as_str(), Self::options())
            .map_err(|err| SketchError::Filesystem(err.to_string()))?;
        self.zip
            .write_all(&bytes)
            .map_err(|err| SketchError::Filesystem(err.to_string()))?;

        self.records
            .extend(Record::from_sig(&signature, &internal_location));
        self.count += 1;
        Ok(())
    }

    fn len(&self) -> usize {
        self.count
    }

    fn location(&self) -> &Utf8Path {
        &self.location
    }

    fn close(self: Box<Self>) -> Result<SinkSummary, SketchError> {
        let ZipSink {
            location,
            mut zip,
            records,
            count,
            ..
        } = *self;
        zip.start_file(MANIFEST_ENTRY, Self::options())
            .map_err(|err| SketchError::Filesystem(err.to_string()))?;
        write_manifest_csv(&mut zip, &records)?;
        let temp = zip
            .finish()
            .map_err(|err| SketchError::Filesystem(err.to_string()))?;
        persist(temp, &location)?;
        info!("saved {count} signature(s) to '{location}'. Note: signature license is CC0.");
        Ok(SinkSummary { location, count })
    }
}

pub struct JsonSink {
    location: Utf8PathBuf,
    signatures: Vec<Signature>,
}

impl JsonSink {
    pub fn create(location: &Utf8Path) -> Result<Self, SketchError> {
        Ok(Self {
            location: location.to_path_buf(),
            signatures: Vec::new(),
        })
    }
}

impl SignatureSink for JsonSink {
    fn add(&mut self, signature: Signature) -> Result<(), SketchError> {
        self.signatures.push(signature);
        Ok(())
    }

    fn len(&self) -> usize {
        self.signatures.len()
    }

    fn location(&self) -> &Utf8Path {
        &self.location
    }

    fn close(self: Box<Self>) -> Result<SinkSummary, SketchError> {
        let JsonSink {
            location,
            signatures,
        } = *self;
        let mut temp = temp_file_beside(&location)?;
        {
            let writer = BufWriter::new(temp.as_file_mut());
            if location.as_str().ends_with(".gz") {
                let mut encoder = GzEncoder::new(writer, Compression::default());
                serde_json::to_writer(&mut encoder, &signatures)
                    .map_err(|err| SketchError::Filesystem(err.to_string()))?;
                encoder
                    .finish()
                    .and_then(|mut inner| inner.flush())
                    .map_err(|err| SketchError::Filesystem(err.to_string()))?;
            } else {
                let mut writer = writer;
                serde_json::to_writer(&mut writer, &signatures)
                    .map_err(|err| SketchError::Filesystem(err.to_string()))?;
                writer
                    .flush()
                    .map_err(|err| SketchError::Filesystem(err.to_string()))?;
            }
        }
        persist(temp, &location)?;
        let count = signatures.len();
        info!("saved {count} signature(s) to '{location}'. Note: signature license is CC0.");
        Ok(SinkSummary { location, count })
    }
}
