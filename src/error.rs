use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SketchError {
    #[error("invalid parameter string: {0}")]
    #[diagnostic(help("param strings look like `dna,k=21,k=31,scaled=1000,abund`"))]
    Configuration(String),

    #[error("unrecognized molecule type '{moltype}' in manifest row for '{name}'")]
    MoleculeType { name: String, moltype: String },

    #[error("cannot derive an identifier from filename: {0}")]
    #[diagnostic(help("file names must start with two '_'-separated tokens, e.g. GCA_000005845.2_genomic.fna.gz"))]
    Identifier(String),

    #[error("duplicate {kind} file for '{ident}': {existing} and {incoming}")]
    DuplicateSource {
        ident: String,
        kind: &'static str,
        existing: Utf8PathBuf,
        incoming: Utf8PathBuf,
    },

    #[error("entries for '{ident}' disagree on name: '{left}' vs '{right}'")]
    EntityMismatch {
        ident: String,
        left: String,
        right: String,
    },

    #[error("invalid entity: {0}")]
    InvalidEntity(String),

    #[error("cannot classify source file {0} (expected .fna, .fna.gz, .faa or .faa.gz)")]
    UnclassifiedSource(Utf8PathBuf),

    #[error("no sequences found in {0}")]
    EmptySource(Utf8PathBuf),

    #[error("'{name}' needs a {kind} file for {moltype} sketches but has none")]
    MissingSourceFile {
        name: String,
        kind: &'static str,
        moltype: String,
    },

    #[error("work item for {0} mixes DNA and protein sketch parameters")]
    MixedMoleculeGroup(Utf8PathBuf),

    #[error("output location '{0}' already exists")]
    #[diagnostic(help("use --force-output-already-exists to overwrite it"))]
    OutputConflict(Utf8PathBuf),

    #[error("invalid sequence in {0}")]
    InvalidSequence(String),

    #[error("failed to read manifest {path}: {message}")]
    Manifest { path: Utf8PathBuf, message: String },

    #[error("manifest record for '{name}' is out of range: {message}")]
    ManifestRecord { name: String, message: String },

    #[error("failed to parse sequences: {0}")]
    SequenceParse(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
