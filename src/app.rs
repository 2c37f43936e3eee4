use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::accumulate::{AccumulateOptions, SketchAccumulator};
use crate::error::SketchError;
use crate::fs_util::{check_destination, persist, temp_file_beside};
use crate::manifest::ManifestLoader;
use crate::params::expand_param_strings;
use crate::planner::{BuildPlan, plan_builds};
use crate::reconcile::DoneIndex;
use crate::registry::{EntityRegistry, IdentMode, RegistryBuilder};
use crate::sequence::SequenceSource;
use crate::sink::{check_sink_location, open_sink};
use crate::sketch::SketchEngine;

#[derive(Debug, Clone)]
pub struct SourcesOptions {
    pub output: Utf8PathBuf,
    pub ident_mode: IdentMode,
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourcesResult {
    pub output: Utf8PathBuf,
    pub entries: usize,
    pub genomes: usize,
    pub proteins: usize,
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub output: Utf8PathBuf,
    pub param_strings: Vec<String>,
    pub already_done: Vec<Utf8PathBuf>,
    pub force: bool,
    pub check_sequence: bool,
    pub jobs: usize,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildResult {
    pub total: usize,
    pub skipped: usize,
    pub to_build: usize,
    pub files: usize,
    pub files_skipped: usize,
    pub signatures_written: usize,
    pub output: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App<S: SequenceSource, E: SketchEngine, L: ManifestLoader> {
    source: S,
    engine: E,
    loader: L,
}

impl<S: SequenceSource, E: SketchEngine, L: ManifestLoader> App<S, E, L> {
    pub fn new(source: S, engine: E, loader: L) -> Self {
        Self {
            source,
            engine,
            loader,
        }
    }

    /// Build the source list for `filenames` and write it as CSV.
    pub fn sources<P: AsRef<Utf8Path>>(
        &self,
        filenames: &[P],
        options: &SourcesOptions,
        sink: &dyn ProgressSink,
    ) -> Result<SourcesResult, SketchError> {
        check_destination(&options.output, options.force)?;

        let started = Instant::now();
        sink.event(ProgressEvent {
            message: format!("phase=Scan; {} file(s)", filenames.len()),
            elapsed: None,
        });
        let registry = RegistryBuilder::new(&self.source, options.ident_mode).build(filenames)?;

        let mut temp = temp_file_beside(&options.output)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            registry.write_csv(&mut writer)?;
            writer
                .flush()
                .map_err(|err| SketchError::Filesystem(err.to_string()))?;
        }
        persist(temp, &options.output)?;

        sink.event(ProgressEvent {
            message: format!(
                "phase=Write; wrote {} entries to '{}'",
                registry.len(),
                options.output
            ),
            elapsed: Some(started.elapsed()),
        });

        Ok(SourcesResult {
            output: options.output.clone(),
            entries: registry.len(),
            genomes: registry
                .iter()
                .filter(|entry| entry.genome_filename.is_some())
                .count(),
            proteins: registry
                .iter()
                .filter(|entry| entry.protein_filename.is_some())
                .count(),
        })
    }

    /// Work out what `build` would sketch, without reading sequence files.
    pub fn plan(
        &self,
        source_list: &Utf8Path,
        options: &BuildOptions,
        sink: &dyn ProgressSink,
    ) -> Result<BuildPlan, SketchError> {
        sink.event(ProgressEvent {
            message: format!(
                "phase=Resolve; loading {} manifest(s)",
                options.already_done.len()
            ),
            elapsed: None,
        });
        let done = DoneIndex::load(&self.loader, &options.already_done)?;

        // seed is not tracked by manifests; the expander only accepts the default.
        let specs = expand_param_strings(&options.param_strings, true)?;
        for spec in &specs {
            tracing::debug!("requested {spec}");
        }

        let file = File::open(source_list.as_std_path())
            .map_err(|err| SketchError::Filesystem(format!("open {source_list}: {err}")))?;
        let registry = EntityRegistry::read_csv(BufReader::new(file))?;

        sink.event(ProgressEvent {
            message: format!(
                "phase=Plan; {} entities x {} sketch types",
                registry.len(),
                specs.len()
            ),
            elapsed: None,
        });
        plan_builds(registry.iter(), &specs, &done)
    }

    pub fn build(
        &self,
        source_list: &Utf8Path,
        options: &BuildOptions,
        sink: &dyn ProgressSink,
    ) -> Result<BuildResult, SketchError> {
        check_sink_location(&options.output)?;
        if !options.dry_run {
            check_destination(&options.output, options.force)?;
        }

        let started = Instant::now();
        let plan = self.plan(source_list, options, sink)?;
        let mut result = BuildResult {
            total: plan.total,
            skipped: plan.skipped,
            to_build: plan.to_build(),
            files: plan.items.len(),
            files_skipped: 0,
            signatures_written: 0,
            output: None,
        };

        if options.dry_run || plan.is_empty() {
            sink.event(ProgressEvent {
                message: format!(
                    "phase=Done; of {} total requested in cross-product, skipped {}, nothing written",
                    plan.total, plan.skipped
                ),
                elapsed: Some(started.elapsed()),
            });
            return Ok(result);
        }

        sink.event(ProgressEvent {
            message: format!(
                "phase=Sketch; building {} sketches for {} files",
                plan.to_build(),
                plan.items.len()
            ),
            elapsed: None,
        });

        let accumulator = SketchAccumulator::new(
            &self.source,
            &self.engine,
            AccumulateOptions {
                check_sequence: options.check_sequence,
                jobs: options.jobs,
            },
        );
        let mut signatures = open_sink(&options.output)?;
        let stats = accumulator.run(&plan.items, signatures.as_mut())?;
        let summary = signatures.close()?;

        result.files_skipped = stats.files_skipped;
        result.signatures_written = summary.count;
        result.output = Some(summary.location);

        sink.event(ProgressEvent {
            message: format!(
                "phase=Done; of {} total requested in cross-product, skipped {}, built {}",
                plan.total,
                plan.skipped,
                plan.to_build()
            ),
            elapsed: Some(started.elapsed()),
        });
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert_matches::assert_matches;

    use super::*;
    use crate::manifest::FileManifestLoader;
    use crate::sequence::FastxSource;
    use crate::sketch::MinHashEngine;

    #[derive(Default)]
    struct Recorder {
        messages: Mutex<Vec<String>>,
    }

    impl ProgressSink for Recorder {
        fn event(&self, event: ProgressEvent) {
            self.messages.lock().unwrap().push(event.message);
        }
    }

    #[test]
    fn build_refuses_existing_output_before_reading_inputs() {
        let temp = tempfile::tempdir().unwrap();
        let output = Utf8PathBuf::from_path_buf(temp.path().join("out.zip")).unwrap();
        std::fs::write(&output, b"existing").unwrap();

        let app = App::new(FastxSource, MinHashEngine, FileManifestLoader);
        let options = BuildOptions {
            output,
            param_strings: vec!["dna".to_string()],
            already_done: Vec::new(),
            force: false,
            check_sequence: false,
            jobs: 1,
            dry_run: false,
        };
        let recorder = Recorder::default();
        // The source list does not exist; the conflict must be reported first.
        let err = app
            .build(Utf8Path::new("missing.csv"), &options, &recorder)
            .unwrap_err();
        assert_matches!(err, SketchError::OutputConflict(_));
        assert!(recorder.messages.lock().unwrap().is_empty());
    }
}
