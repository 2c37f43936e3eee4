use camino::Utf8Path;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::SketchError;
use crate::planner::WorkItem;
use crate::sequence::SequenceSource;
use crate::sketch::{Signature, Sketch, SketchEngine};
use crate::sink::SignatureSink;

const PROGRESS_EVERY: usize = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct AccumulateOptions {
    pub check_sequence: bool,
    pub jobs: usize,
}

impl Default for AccumulateOptions {
    fn default() -> Self {
        Self {
            check_sequence: false,
            jobs: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccumulateStats {
    pub files_read: usize,
    pub files_skipped: usize,
    pub sequences: usize,
    pub signatures: usize,
}

/// Outcome of sketching one work item.
#[derive(Debug)]
pub enum ItemOutcome {
    Built {
        signatures: Vec<Signature>,
        sequences: usize,
    },
    Empty,
    /// The file could not be opened or parsed; partial sketches were dropped.
    Unreadable(String),
}

pub struct SketchAccumulator<'a, S: SequenceSource, E: SketchEngine> {
    source: &'a S,
    engine: &'a E,
    options: AccumulateOptions,
}

impl<'a, S: SequenceSource, E: SketchEngine> SketchAccumulator<'a, S, E> {
    pub fn new(source: &'a S, engine: &'a E, options: AccumulateOptions) -> Self {
        Self {
            source,
            engine,
            options,
        }
    }

    /// Read the item's file once, feeding every record to every sketch.
    pub fn build_item(&self, item: &WorkItem) -> Result<ItemOutcome, SketchError> {
        let filename: &Utf8Path = &item.key.filename;
        let Some(first) = item.specs.first() else {
            return Ok(ItemOutcome::Empty);
        };
        let is_dna = first.moltype.is_dna();
        if item.specs.iter().any(|spec| spec.moltype.is_dna() != is_dna) {
            return Err(SketchError::MixedMoleculeGroup(filename.to_path_buf()));
        }

        let mut records = match self.source.records(filename) {
            Ok(records) => records.peekable(),
            Err(SketchError::SequenceParse(reason)) => {
                warn!("skipping '{filename}': {reason}");
                return Ok(ItemOutcome::Unreadable(reason));
            }
            Err(err) => return Err(err),
        };
        if records.peek().is_none() {
            warn!("no sequences found in '{filename}'?!");
            return Ok(ItemOutcome::Empty);
        }

        let mut sketches: Vec<E::Sketch> =
            item.specs.iter().map(|spec| self.engine.create(spec)).collect();
        let input_is_protein = !is_dna;

        info!("... reading sequences from {filename}");
        let mut sequences = 0usize;
        for record in records {
            let record = match record {
                Ok(record) => record,
                Err(SketchError::SequenceParse(reason)) => {
                    warn!("skipping '{filename}' after {sequences} sequences: {reason}");
                    return Ok(ItemOutcome::Unreadable(reason));
                }
                Err(err) => return Err(err),
            };
            if sequences > 0 && sequences % PROGRESS_EVERY == 0 {
                debug!("...{filename} {sequences}");
            }
            for sketch in sketches.iter_mut() {
                sketch
                    .add_sequence(&record.sequence, input_is_protein, self.options.check_sequence)
                    .map_err(|err| match err {
                        SketchError::InvalidSequence(message) => {
                            SketchError::InvalidSequence(format!(
                                "{filename} record '{}' ({}): {message}",
                                record.name,
                                sketch.spec()
                            ))
                        }
                        other => other,
                    })?;
            }
            sequences += 1;
        }

        let signatures: Vec<Signature> = sketches
            .into_iter()
            .map(|sketch| sketch.finish(&item.key.name, filename.as_str()))
            .collect();
        info!(
            "calculated {} signatures for {sequences} sequences in {filename}",
            signatures.len()
        );
        Ok(ItemOutcome::Built {
            signatures,
            sequences,
        })
    }

    /// Sketch every item and hand the results to `sink` in plan order.
    pub fn run(
        &self,
        items: &[WorkItem],
        sink: &mut dyn SignatureSink,
    ) -> Result<AccumulateStats, SketchError> {
        let mut stats = AccumulateStats::default();
        if self.options.jobs <= 1 {
            for item in items {
                let outcome = self.build_item(item)?;
                record_outcome(&mut stats, outcome, sink)?;
            }
            return Ok(stats);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.jobs)
            .build()
            .map_err(|err| SketchError::Configuration(format!("thread pool: {err}")))?;
        let outcomes: Vec<Result<ItemOutcome, SketchError>> =
            pool.install(|| items.par_iter().map(|item| self.build_item(item)).collect());
        for outcome in outcomes {
            record_outcome(&mut stats, outcome?, sink)?;
        }
        Ok(stats)
    }
}

fn record_outcome(
    stats: &mut AccumulateStats,
    outcome: ItemOutcome,
    sink: &mut dyn SignatureSink,
) -> Result<(), SketchError> {
    match outcome {
        ItemOutcome::Built {
            signatures,
            sequences,
        } => {
            stats.files_read += 1;
            stats.sequences += sequences;
            stats.signatures += signatures.len();
            for signature in signatures {
                sink.add(signature)?;
            }
        }
        ItemOutcome::Empty | ItemOutcome::Unreadable(_) => stats.files_skipped += 1,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use camino::Utf8PathBuf;

    use super::*;
    use crate::domain::{MoleculeType, SketchSize, SketchSpec};
    use crate::planner::WorkKey;
    use crate::sequence::FastxSource;
    use crate::sketch::MinHashEngine;

    fn spec(moltype: MoleculeType, ksize: u32) -> SketchSpec {
        SketchSpec {
            moltype,
            ksize,
            size: SketchSize::Scaled(1),
            track_abundance: false,
        }
    }

    #[test]
    fn mixed_groups_are_rejected() {
        let item = WorkItem {
            key: WorkKey {
                name: "x".to_string(),
                filename: Utf8PathBuf::from("x.fna"),
            },
            specs: vec![spec(MoleculeType::Dna, 21), spec(MoleculeType::Protein, 30)],
        };
        let accumulator =
            SketchAccumulator::new(&FastxSource, &MinHashEngine, AccumulateOptions::default());
        assert_matches!(
            accumulator.build_item(&item),
            Err(SketchError::MixedMoleculeGroup(_))
        );
    }

    #[test]
    fn unreadable_files_are_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let garbage = Utf8PathBuf::from_path_buf(temp.path().join("bad.fna")).unwrap();
        std::fs::write(&garbage, "this is not a sequence file\n").unwrap();
        let missing = Utf8PathBuf::from_path_buf(temp.path().join("missing.fna")).unwrap();

        let accumulator =
            SketchAccumulator::new(&FastxSource, &MinHashEngine, AccumulateOptions::default());
        for filename in [garbage, missing] {
            let item = WorkItem {
                key: WorkKey {
                    name: "x".to_string(),
                    filename,
                },
                specs: vec![spec(MoleculeType::Dna, 21)],
            };
            assert_matches!(accumulator.build_item(&item), Ok(ItemOutcome::Unreadable(_)));
        }
    }

    #[test]
    fn one_pass_feeds_every_spec() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("x.fna")).unwrap();
        std::fs::write(&path, ">a\nACGTTGCAAGGCTTAACCGT\n>b\nTTGACCAGGTAC\n").unwrap();

        let item = WorkItem {
            key: WorkKey {
                name: "x".to_string(),
                filename: path,
            },
            specs: vec![spec(MoleculeType::Dna, 5), spec(MoleculeType::Dna, 7)],
        };
        let accumulator =
            SketchAccumulator::new(&FastxSource, &MinHashEngine, AccumulateOptions::default());
        let outcome = accumulator.build_item(&item).unwrap();
        assert_matches!(outcome, ItemOutcome::Built { ref signatures, sequences: 2 } if signatures.len() == 2);
    }
}
