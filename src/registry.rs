use std::collections::HashMap;
use std::io::{Read, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::SourceKind;
use crate::error::SketchError;
use crate::sequence::SequenceSource;

/// The genome and/or protein files belonging to one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityDescriptor {
    pub ident: String,
    pub name: String,
    pub genome_filename: Option<Utf8PathBuf>,
    pub protein_filename: Option<Utf8PathBuf>,
}

impl EntityDescriptor {
    pub fn new(ident: String, name: String, kind: SourceKind, filename: Utf8PathBuf) -> Self {
        let mut descriptor = Self {
            ident,
            name,
            genome_filename: None,
            protein_filename: None,
        };
        match kind {
            SourceKind::Genome => descriptor.genome_filename = Some(filename),
            SourceKind::Protein => descriptor.protein_filename = Some(filename),
        }
        descriptor
    }

    pub fn filename(&self, kind: SourceKind) -> Option<&Utf8Path> {
        match kind {
            SourceKind::Genome => self.genome_filename.as_deref(),
            SourceKind::Protein => self.protein_filename.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ident.is_empty()
            || self.name.is_empty()
            || (self.genome_filename.is_none() && self.protein_filename.is_none())
    }

    /// Combine a genome-only and a protein-only descriptor for the same entity.
    pub fn merge(mut self, other: EntityDescriptor) -> Result<Self, SketchError> {
        if self.ident != other.ident {
            return Err(SketchError::InvalidEntity(format!(
                "cannot merge '{}' with '{}'",
                self.ident, other.ident
            )));
        }
        if self.name != other.name {
            return Err(SketchError::EntityMismatch {
                ident: self.ident,
                left: self.name,
                right: other.name,
            });
        }
        for kind in [SourceKind::Genome, SourceKind::Protein] {
            if let (Some(existing), Some(incoming)) = (self.filename(kind), other.filename(kind)) {
                return Err(SketchError::DuplicateSource {
                    ident: self.ident.clone(),
                    kind: kind.as_str(),
                    existing: existing.to_path_buf(),
                    incoming: incoming.to_path_buf(),
                });
            }
        }
        self.genome_filename = self.genome_filename.or(other.genome_filename);
        self.protein_filename = self.protein_filename.or(other.protein_filename);
        Ok(self)
    }

    fn ensure_valid(&self) -> Result<(), SketchError> {
        if self.is_empty() {
            return Err(SketchError::InvalidEntity(format!(
                "'{}' needs an identifier, a name and at least one file",
                self.ident
            )));
        }
        Ok(())
    }
}

/// Entities keyed by identifier, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entries: Vec<EntityDescriptor>,
    index: HashMap<String, usize>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, ident: &str) -> Option<&EntityDescriptor> {
        self.index.get(ident).map(|&pos| &self.entries[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entries.iter()
    }

    /// Insert a new descriptor or merge it into the one already stored under
    /// its identifier. Empty descriptors are never stored.
    pub fn insert(&mut self, descriptor: EntityDescriptor) -> Result<(), SketchError> {
        match self.index.get(&descriptor.ident) {
            Some(&pos) => {
                let merged = self.entries[pos].clone().merge(descriptor)?;
                merged.ensure_valid()?;
                self.entries[pos] = merged;
            }
            None => {
                descriptor.ensure_valid()?;
                self.index
                    .insert(descriptor.ident.clone(), self.entries.len());
                self.entries.push(descriptor);
            }
        }
        Ok(())
    }

    /// The header is written even when there are no entries.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), SketchError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv_writer
            .write_record(SOURCE_COLUMNS)
            .map_err(|err| SketchError::Filesystem(err.to_string()))?;
        for entry in &self.entries {
            csv_writer
                .serialize(SourceRow::from(entry))
                .map_err(|err| SketchError::Filesystem(err.to_string()))?;
        }
        csv_writer
            .flush()
            .map_err(|err| SketchError::Filesystem(err.to_string()))
    }

    pub fn read_csv<R: Read>(reader: R) -> Result<Self, SketchError> {
        let mut registry = Self::new();
        let mut csv_reader = csv::Reader::from_reader(reader);
        for row in csv_reader.deserialize::<SourceRow>() {
            let row = row.map_err(|err| SketchError::Filesystem(err.to_string()))?;
            registry.insert(row.into())?;
        }
        Ok(registry)
    }
}

const SOURCE_COLUMNS: [&str; 4] = ["ident", "name", "genome_filename", "protein_filename"];

/// Interchange row: `ident,name,genome_filename,protein_filename`.
#[derive(Debug, Serialize, Deserialize)]
struct SourceRow {
    ident: String,
    name: String,
    genome_filename: String,
    protein_filename: String,
}

impl From<&EntityDescriptor> for SourceRow {
    fn from(entry: &EntityDescriptor) -> Self {
        Self {
            ident: entry.ident.clone(),
            name: entry.name.clone(),
            genome_filename: entry
                .genome_filename
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            protein_filename: entry
                .protein_filename
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }
}

impl From<SourceRow> for EntityDescriptor {
    fn from(row: SourceRow) -> Self {
        let non_empty = |value: String| (!value.is_empty()).then(|| Utf8PathBuf::from(value));
        Self {
            ident: row.ident,
            name: row.name,
            genome_filename: non_empty(row.genome_filename),
            protein_filename: non_empty(row.protein_filename),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentMode {
    /// First two `_`-separated tokens of the file name.
    #[default]
    FromFilename,
    /// First whitespace token of the first record's header.
    FromHeader,
}

pub fn ident_from_filename(path: &Utf8Path) -> Result<String, SketchError> {
    let base = path.file_name().unwrap_or(path.as_str());
    let tokens: Vec<&str> = base.splitn(3, '_').collect();
    if tokens.len() < 2 || tokens[0].is_empty() || tokens[1].is_empty() {
        return Err(SketchError::Identifier(path.to_string()));
    }
    Ok(format!("{}_{}", tokens[0], tokens[1]))
}

/// Split a record header into identifier and display name.
pub fn ident_from_header(header: &str) -> (String, String) {
    let header = header.trim();
    match header.split_once(char::is_whitespace) {
        Some((ident, rest)) if !rest.trim().is_empty() => {
            (ident.to_string(), rest.trim().to_string())
        }
        Some((ident, _)) => (ident.to_string(), ident.to_string()),
        None => (header.to_string(), header.to_string()),
    }
}

pub struct RegistryBuilder<'a, S: SequenceSource> {
    source: &'a S,
    mode: IdentMode,
}

impl<'a, S: SequenceSource> RegistryBuilder<'a, S> {
    pub fn new(source: &'a S, mode: IdentMode) -> Self {
        Self { source, mode }
    }

    pub fn describe(&self, path: &Utf8Path) -> Result<EntityDescriptor, SketchError> {
        let kind = SourceKind::try_from(path)?;
        let (ident, name) = match self.mode {
            IdentMode::FromFilename => {
                let ident = ident_from_filename(path)?;
                (ident.clone(), ident)
            }
            IdentMode::FromHeader => {
                // All records in a file belong to one entity; the first is enough.
                let record = self
                    .source
                    .first_record(path)?
                    .ok_or_else(|| SketchError::EmptySource(path.to_path_buf()))?;
                ident_from_header(&record.name)
            }
        };
        Ok(EntityDescriptor::new(ident, name, kind, path.to_path_buf()))
    }

    pub fn build<P: AsRef<Utf8Path>>(&self, paths: &[P]) -> Result<EntityRegistry, SketchError> {
        let mut registry = EntityRegistry::new();
        for path in paths {
            let path = path.as_ref();
            info!("processing '{path}'");
            let descriptor = self.describe(path)?;
            debug!(ident = %descriptor.ident, name = %descriptor.name, "classified source");
            registry.insert(descriptor)?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn ident_uses_file_name_only() {
        let ident = ident_from_filename(Utf8Path::new(
            "data/genomes/GCA_000005845.2_ASM584v2_genomic.fna.gz",
        ))
        .unwrap();
        assert_eq!(ident, "GCA_000005845.2");
    }

    #[test]
    fn ident_needs_two_tokens() {
        let err = ident_from_filename(Utf8Path::new("dir_x/genome.fna")).unwrap_err();
        assert_matches!(err, SketchError::Identifier(_));
    }

    #[test]
    fn header_split() {
        assert_eq!(
            ident_from_header("GCA_1.1 Escherichia coli K-12"),
            ("GCA_1.1".to_string(), "Escherichia coli K-12".to_string())
        );
        assert_eq!(
            ident_from_header("lonely"),
            ("lonely".to_string(), "lonely".to_string())
        );
    }

    #[test]
    fn csv_round_trip_keeps_order_and_blanks() {
        let mut registry = EntityRegistry::new();
        registry
            .insert(EntityDescriptor::new(
                "B_2".into(),
                "B_2".into(),
                SourceKind::Protein,
                "B_2_x.faa".into(),
            ))
            .unwrap();
        registry
            .insert(EntityDescriptor::new(
                "A_1".into(),
                "A_1".into(),
                SourceKind::Genome,
                "A_1_x.fna".into(),
            ))
            .unwrap();

        let mut buffer = Vec::new();
        registry.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with("ident,name,genome_filename,protein_filename\n"));
        assert!(text.contains("B_2,B_2,,B_2_x.faa"));

        let again = EntityRegistry::read_csv(buffer.as_slice()).unwrap();
        let idents: Vec<&str> = again.iter().map(|e| e.ident.as_str()).collect();
        assert_eq!(idents, vec!["B_2", "A_1"]);
        assert!(again.get("B_2").unwrap().genome_filename.is_none());
    }
}
