use std::fmt;
use std::str::FromStr;

use camino::Utf8Path;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sourmash::encodings::HashFunctions;

use crate::error::SketchError;

/// Seed used for every sketch. Manifests do not record it.
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MoleculeType {
    #[serde(alias = "DNA")]
    Dna,
    Protein,
    Dayhoff,
    Hp,
}

impl MoleculeType {
    pub fn is_dna(self) -> bool {
        matches!(self, MoleculeType::Dna)
    }

    /// Molecule type behind a sourmash hash function. Skipmer encodings have
    /// no counterpart here.
    pub fn from_hash_function(hash_function: &HashFunctions) -> Option<Self> {
        match hash_function {
            HashFunctions::Murmur64Dna => Some(MoleculeType::Dna),
            HashFunctions::Murmur64Protein => Some(MoleculeType::Protein),
            HashFunctions::Murmur64Dayhoff => Some(MoleculeType::Dayhoff),
            HashFunctions::Murmur64Hp => Some(MoleculeType::Hp),
            _ => None,
        }
    }

    /// Parse a manifest `moltype` column the way sourmash does.
    pub fn from_manifest_str(moltype: &str) -> Option<Self> {
        HashFunctions::try_from(moltype)
            .ok()
            .and_then(|hash_function| Self::from_hash_function(&hash_function))
    }

    /// Stored k-mer sizes are in the molecule's own alphabet; specs use nucleotides.
    pub fn ksize_multiplier(self) -> u32 {
        if self.is_dna() { 1 } else { 3 }
    }

    pub fn source_kind(self) -> SourceKind {
        if self.is_dna() {
            SourceKind::Genome
        } else {
            SourceKind::Protein
        }
    }
}

impl fmt::Display for MoleculeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoleculeType::Dna => write!(f, "dna"),
            MoleculeType::Protein => write!(f, "protein"),
            MoleculeType::Dayhoff => write!(f, "dayhoff"),
            MoleculeType::Hp => write!(f, "hp"),
        }
    }
}

impl FromStr for MoleculeType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "dna" | "DNA" => Ok(MoleculeType::Dna),
            "protein" => Ok(MoleculeType::Protein),
            "dayhoff" => Ok(MoleculeType::Dayhoff),
            "hp" => Ok(MoleculeType::Hp),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SketchSize {
    /// Bottom-n MinHash.
    Num(u32),
    /// FracMinHash keeping roughly one hash in `scaled`.
    Scaled(u32),
}

impl SketchSize {
    pub fn num(self) -> u32 {
        match self {
            SketchSize::Num(n) => n,
            SketchSize::Scaled(_) => 0,
        }
    }

    pub fn scaled(self) -> u32 {
        match self {
            SketchSize::Num(_) => 0,
            SketchSize::Scaled(s) => s,
        }
    }
}

/// One concrete sketch configuration, compared by value.
///
/// `ksize` is in nucleotide units for every molecule type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SketchSpec {
    pub moltype: MoleculeType,
    pub ksize: u32,
    pub size: SketchSize,
    pub track_abundance: bool,
}

impl SketchSpec {
    /// k-mer length in the alphabet the sketch actually hashes.
    pub fn alphabet_ksize(&self) -> u32 {
        self.ksize / self.moltype.ksize_multiplier()
    }
}

impl fmt::Display for SketchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},k={}", self.moltype, self.alphabet_ksize())?;
        match self.size {
            SketchSize::Num(n) => write!(f, ",num={n}")?,
            SketchSize::Scaled(s) => write!(f, ",scaled={s}")?,
        }
        if self.track_abundance {
            write!(f, ",abund")
        } else {
            write!(f, ",noabund")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Genome,
    Protein,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Genome => "genome",
            SourceKind::Protein => "protein",
        }
    }

    pub fn classify(path: &Utf8Path) -> Option<Self> {
        let name = path.file_name()?;
        if name.ends_with(".fna") || name.ends_with(".fna.gz") {
            Some(SourceKind::Genome)
        } else if name.ends_with(".faa") || name.ends_with(".faa.gz") {
            Some(SourceKind::Protein)
        } else {
            None
        }
    }
}

impl TryFrom<&Utf8Path> for SourceKind {
    type Error = SketchError;

    fn try_from(path: &Utf8Path) -> Result<Self, Self::Error> {
        Self::classify(path).ok_or_else(|| SketchError::UnclassifiedSource(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn classify_by_suffix() {
        assert_eq!(
            SourceKind::classify(Utf8Path::new("dir/GCA_1_x.fna.gz")),
            Some(SourceKind::Genome)
        );
        assert_eq!(
            SourceKind::classify(Utf8Path::new("GCA_1_x.faa")),
            Some(SourceKind::Protein)
        );
        let err = SourceKind::try_from(Utf8Path::new("GCA_1_x.fasta")).unwrap_err();
        assert_matches!(err, SketchError::UnclassifiedSource(_));
    }

    #[test]
    fn protein_ksize_reported_in_amino_acids() {
        let spec = SketchSpec {
            moltype: MoleculeType::Protein,
            ksize: 30,
            size: SketchSize::Scaled(200),
            track_abundance: false,
        };
        assert_eq!(spec.alphabet_ksize(), 10);
        assert_eq!(spec.to_string(), "protein,k=10,scaled=200,noabund");
    }

    #[test]
    fn manifest_moltypes() {
        assert_eq!(MoleculeType::from_manifest_str("DNA"), Some(MoleculeType::Dna));
        assert_eq!(
            MoleculeType::from_manifest_str("dayhoff"),
            Some(MoleculeType::Dayhoff)
        );
        assert_eq!(MoleculeType::from_manifest_str("hp"), Some(MoleculeType::Hp));
        assert_eq!(MoleculeType::from_manifest_str("skipm2n3"), None);
        assert_eq!(MoleculeType::from_manifest_str("rna"), None);
    }
}
