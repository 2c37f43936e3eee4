use std::fs::File;
use std::io::{BufReader, Read, Write};

use camino::Utf8Path;
use flate2::read::MultiGzDecoder;
use sourmash::manifest::Record;
use sourmash::signature::Signature;
use zip::ZipArchive;

use crate::domain::MoleculeType;
use crate::error::SketchError;

pub const MANIFEST_ENTRY: &str = "SOURMASH-MANIFEST.csv";
const MANIFEST_VERSION_LINE: &[u8] = b"# SOURMASH-MANIFEST-VERSION: 1.0\n";

/// Suffixes [`FileManifestLoader`] can read signatures back from.
pub const SIGNATURE_SUFFIXES: [&str; 4] = [".sig", ".sig.gz", ".json", ".json.gz"];

/// Loads the manifest records describing an existing signature collection.
pub trait ManifestLoader: Send + Sync {
    fn load(&self, path: &Utf8Path) -> Result<Vec<Record>, SketchError>;
}

/// Reads zip collections, manifest CSVs and JSON signature files.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileManifestLoader;

impl ManifestLoader for FileManifestLoader {
    fn load(&self, path: &Utf8Path) -> Result<Vec<Record>, SketchError> {
        let name = path.file_name().unwrap_or(path.as_str());
        let fail = |message: String| SketchError::Manifest {
            path: path.to_path_buf(),
            message,
        };
        let file = File::open(path.as_std_path()).map_err(|err| fail(err.to_string()))?;

        if name.ends_with(".zip") {
            let mut archive = ZipArchive::new(file).map_err(|err| fail(err.to_string()))?;
            let entry = archive
                .by_name(MANIFEST_ENTRY)
                .map_err(|err| fail(format!("{MANIFEST_ENTRY}: {err}")))?;
            read_manifest_csv(entry, path)
        } else if name.ends_with(".csv") {
            read_manifest_csv(BufReader::new(file), path)
        } else if SIGNATURE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
            if name.ends_with(".gz") {
                signature_records(MultiGzDecoder::new(BufReader::new(file)), path)
            } else {
                signature_records(BufReader::new(file), path)
            }
        } else {
            Err(fail(
                "unsupported manifest location (expected .zip, .csv, .sig or .json)".to_string(),
            ))
        }
    }
}

/// Parse a sourmash manifest CSV. Rows without a name are dropped; a named row
/// whose `moltype` is not one of DNA, protein, dayhoff or hp is an error.
pub fn read_manifest_csv<R: Read>(reader: R, path: &Utf8Path) -> Result<Vec<Record>, SketchError> {
    let fail = |message: String| SketchError::Manifest {
        path: path.to_path_buf(),
        message,
    };
    let mut csv_reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|err| fail(err.to_string()))?
        .clone();
    let column = |field: &str| headers.iter().position(|header| header == field);
    let (Some(moltype_at), Some(name_at)) = (column("moltype"), column("name")) else {
        return Err(fail("manifest needs 'moltype' and 'name' columns".to_string()));
    };

    let mut records = Vec::new();
    for row in csv_reader.records() {
        let row = row.map_err(|err| fail(err.to_string()))?;
        let name = row.get(name_at).unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        let moltype = row.get(moltype_at).unwrap_or_default();
        if MoleculeType::from_manifest_str(moltype).is_none() {
            return Err(SketchError::MoleculeType {
                name: name.to_string(),
                moltype: moltype.to_string(),
            });
        }
        let record: Record = row
            .deserialize(Some(&headers))
            .map_err(|err| fail(err.to_string()))?;
        records.push(record);
    }
    Ok(records)
}

pub fn write_manifest_csv<W: Write>(mut writer: W, records: &[Record]) -> Result<(), SketchError> {
    writer
        .write_all(MANIFEST_VERSION_LINE)
        .map_err(|err| SketchError::Filesystem(err.to_string()))?;
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer
            .serialize(record)
            .map_err(|err| SketchError::Filesystem(err.to_string()))?;
    }
    csv_writer
        .flush()
        .map_err(|err| SketchError::Filesystem(err.to_string()))
}

/// One manifest record per sketch in a JSON signature file.
fn signature_records<R: Read>(mut reader: R, path: &Utf8Path) -> Result<Vec<Record>, SketchError> {
    let signatures = Signature::load_signatures(&mut reader, None, None, None).map_err(|err| {
        SketchError::Manifest {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    })?;
    Ok(signatures
        .iter()
        .flat_map(|signature| Record::from_sig(signature, path.as_str()))
        .collect())
}
