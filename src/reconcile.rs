use std::collections::HashMap;

use camino::Utf8PathBuf;
use sourmash::manifest::Record;
use tracing::{debug, info};

use crate::domain::{MoleculeType, SketchSize, SketchSpec};
use crate::error::SketchError;
use crate::manifest::ManifestLoader;

/// Sketch specs already computed, keyed by entity name.
///
/// Specs for one name keep manifest order and are not de-duplicated.
#[derive(Debug, Clone, Default)]
pub struct DoneIndex {
    by_name: HashMap<String, Vec<SketchSpec>>,
}

impl DoneIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: String, spec: SketchSpec) {
        self.by_name.entry(name).or_default().push(spec);
    }

    /// Seed is not part of the comparison; manifests do not record it.
    pub fn contains(&self, name: &str, spec: &SketchSpec) -> bool {
        self.by_name
            .get(name)
            .is_some_and(|specs| specs.contains(spec))
    }

    pub fn specs_for(&self, name: &str) -> &[SketchSpec] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn names(&self) -> usize {
        self.by_name.len()
    }

    pub fn extend_from_rows<I>(&mut self, rows: I) -> Result<(), SketchError>
    where
        I: IntoIterator<Item = Record>,
    {
        for row in rows {
            let name = row.name().to_string();
            if name.is_empty() {
                continue;
            }
            let spec = spec_from_row(&row)?;
            self.insert(name, spec);
        }
        Ok(())
    }

    pub fn load<L: ManifestLoader>(
        loader: &L,
        locations: &[Utf8PathBuf],
    ) -> Result<Self, SketchError> {
        let mut index = Self::new();
        for location in locations {
            let rows = loader.load(location)?;
            debug!(location = %location, rows = rows.len(), "loaded manifest");
            index.extend_from_rows(rows)?;
        }
        info!("Loaded {} pre-existing names from manifest(s)", index.names());
        Ok(index)
    }
}

/// Rebuild the spec a manifest row satisfies. Row ksizes are in the
/// molecule's own alphabet.
pub fn spec_from_row(row: &Record) -> Result<SketchSpec, SketchError> {
    let moltype = MoleculeType::from_hash_function(&row.moltype()).ok_or_else(|| {
        SketchError::MoleculeType {
            name: row.name().to_string(),
            moltype: row.moltype().to_string(),
        }
    })?;
    let out_of_range = |message: String| SketchError::ManifestRecord {
        name: row.name().to_string(),
        message,
    };

    let ksize = row
        .ksize()
        .checked_mul(moltype.ksize_multiplier())
        .ok_or_else(|| out_of_range(format!("ksize {} overflows", row.ksize())))?;
    let scaled = u64::from(*row.scaled());
    let size = if scaled > 0 {
        let scaled = u32::try_from(scaled)
            .map_err(|_| out_of_range(format!("scaled {scaled} does not fit in 32 bits")))?;
        SketchSize::Scaled(scaled)
    } else {
        SketchSize::Num(*row.num())
    };
    Ok(SketchSpec {
        moltype,
        ksize,
        size,
        track_abundance: row.with_abundance(),
    })
}
