//! Sketching through sourmash signatures.
//!
//! Each [`SignatureSketch`] wraps a sourmash [`Signature`] built from
//! [`ComputeParameters`] for exactly one [`SketchSpec`]. DNA input goes through
//! `add_sequence`, amino-acid input through `add_protein`; sourmash handles
//! canonical k-mers, the dayhoff and hp encodings and the hashing.

use std::sync::LazyLock;

use regex::bytes::Regex;
use sourmash::cmd::ComputeParameters;
use sourmash::signature::SigsTrait;

pub use sourmash::signature::Signature;

use crate::domain::{MoleculeType, SketchSpec};
use crate::error::SketchError;

static PROTEIN_ALPHABET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z*]*$").unwrap());

pub trait SketchEngine: Send + Sync {
    type Sketch: Sketch;

    fn create(&self, spec: &SketchSpec) -> Self::Sketch;
}

pub trait Sketch: Send {
    fn spec(&self) -> &SketchSpec;

    fn add_sequence(
        &mut self,
        sequence: &[u8],
        input_is_protein: bool,
        check_sequence: bool,
    ) -> Result<(), SketchError>;

    /// Name the sketch and turn it into a signature.
    fn finish(self, name: &str, filename: &str) -> Signature;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MinHashEngine;

impl SketchEngine for MinHashEngine {
    type Sketch = SignatureSketch;

    fn create(&self, spec: &SketchSpec) -> SignatureSketch {
        SignatureSketch::new(*spec)
    }
}

/// One in-progress sourmash signature holding a single MinHash.
#[derive(Debug, Clone)]
pub struct SignatureSketch {
    spec: SketchSpec,
    signature: Signature,
}

impl SignatureSketch {
    pub fn new(spec: SketchSpec) -> Self {
        // ksizes are nucleotide units; sourmash divides by 3 for amino acids.
        let params = ComputeParameters::builder()
            .ksizes(vec![spec.ksize])
            .scaled(spec.size.scaled())
            .num_hashes(spec.size.num())
            .dna(spec.moltype == MoleculeType::Dna)
            .protein(spec.moltype == MoleculeType::Protein)
            .dayhoff(spec.moltype == MoleculeType::Dayhoff)
            .hp(spec.moltype == MoleculeType::Hp)
            .track_abundance(spec.track_abundance)
            .build();
        Self {
            spec,
            signature: Signature::from_params(&params),
        }
    }
}

impl Sketch for SignatureSketch {
    fn spec(&self) -> &SketchSpec {
        &self.spec
    }

    fn add_sequence(
        &mut self,
        sequence: &[u8],
        input_is_protein: bool,
        check_sequence: bool,
    ) -> Result<(), SketchError> {
        match (self.spec.moltype.is_dna(), input_is_protein) {
            // force=true skips k-mers with non-ACGT bases instead of failing.
            (true, false) => self
                .signature
                .add_sequence(sequence, !check_sequence)
                .map_err(|err| SketchError::InvalidSequence(err.to_string())),
            (false, true) => {
                if check_sequence && !PROTEIN_ALPHABET.is_match(sequence) {
                    return Err(SketchError::InvalidSequence(
                        "protein sequence contains non-alphabetic characters".to_string(),
                    ));
                }
                self.signature
                    .add_protein(sequence)
                    .map_err(|err| SketchError::InvalidSequence(err.to_string()))
            }
            (true, true) => Err(SketchError::InvalidSequence(
                "cannot add protein input to a DNA sketch".to_string(),
            )),
            (false, false) => Err(SketchError::InvalidSequence(format!(
                "{} sketches need protein input; translation is not supported",
                self.spec.moltype
            ))),
        }
    }

    fn finish(self, name: &str, filename: &str) -> Signature {
        let mut signature = self.signature;
        signature.set_name(name);
        signature.set_filename(filename);
        signature
    }
}
