use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use sketch_from::app::{App, BuildOptions, BuildResult, SourcesOptions, SourcesResult};
use sketch_from::config::ConfigLoader;
use sketch_from::error::SketchError;
use sketch_from::manifest::FileManifestLoader;
use sketch_from::output::{JsonOutput, LogProgress, OutputMode};
use sketch_from::registry::IdentMode;
use sketch_from::sequence::FastxSource;
use sketch_from::sketch::MinHashEngine;

#[derive(Parser)]
#[command(name = "sketch-from")]
#[command(about = "Build genome/proteome sketches, skipping everything already in prior manifests")]
#[command(version)]
struct Cli {
    /// Print results as JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Collect genome/protein files into a source list CSV")]
    Sources(SourcesArgs),
    #[command(about = "Sketch every source-list entry not already present in prior manifests")]
    Build(BuildArgs),
}

#[derive(Args)]
struct SourcesArgs {
    #[arg(required = true)]
    filenames: Vec<Utf8PathBuf>,

    #[arg(short, long)]
    output_csv: Utf8PathBuf,

    /// Take identifier and name from the first record header instead of the file name.
    #[arg(long)]
    ident_from_header: bool,

    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct BuildArgs {
    /// Source list written by `sketch-from sources`.
    csv: Utf8PathBuf,

    #[arg(short, long)]
    output: Utf8PathBuf,

    /// Sketch parameters, e.g. `dna,k=21,k=31,scaled=1000`. Repeatable.
    #[arg(short = 'p', long = "param-string")]
    param_strings: Vec<String>,

    /// Signature collections or manifests whose sketches need not be rebuilt.
    #[arg(long, num_args = 1..)]
    already_done: Vec<Utf8PathBuf>,

    #[arg(long)]
    force_output_already_exists: bool,

    #[arg(long)]
    check_sequence: bool,

    #[arg(short, long)]
    jobs: Option<usize>,

    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Report what would be built without sketching.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<SketchError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SketchError) -> u8 {
    match error {
        SketchError::OutputConflict(_)
        | SketchError::Configuration(_)
        | SketchError::ConfigRead(_)
        | SketchError::ConfigParse(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };
    let app = App::new(FastxSource, MinHashEngine, FileManifestLoader);

    match cli.command {
        Commands::Sources(args) => {
            let options = SourcesOptions {
                output: args.output_csv,
                ident_mode: if args.ident_from_header {
                    IdentMode::FromHeader
                } else {
                    IdentMode::FromFilename
                },
                force: args.force,
            };
            let result = app.sources(&args.filenames, &options, &LogProgress)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_sources(&result).into_diagnostic(),
                OutputMode::Text => {
                    print_sources_summary(&result);
                    Ok(())
                }
            }
        }
        Commands::Build(args) => {
            let resolved = ConfigLoader::resolve(args.config.as_deref())?;
            let mut param_strings = resolved.param_strings;
            param_strings.extend(args.param_strings);
            let mut already_done = resolved.already_done;
            already_done.extend(args.already_done);

            let options = BuildOptions {
                output: args.output,
                param_strings,
                already_done,
                force: args.force_output_already_exists,
                check_sequence: args.check_sequence || resolved.check_sequence,
                jobs: args.jobs.unwrap_or(resolved.jobs).max(1),
                dry_run: args.dry_run,
            };
            let result = app.build(&args.csv, &options, &LogProgress)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_build(&result).into_diagnostic(),
                OutputMode::Text => {
                    print_build_summary(&result);
                    Ok(())
                }
            }
        }
    }
}

fn print_sources_summary(result: &SourcesResult) {
    println!("---");
    println!(
        "wrote {} entries to '{}' ({} with genome, {} with proteome)",
        result.entries, result.output, result.genomes, result.proteins
    );
}

fn print_build_summary(result: &BuildResult) {
    println!(
        "** Of {} total requested in cross-product, skipped {}, built {}",
        result.total, result.skipped, result.to_build
    );
    if result.files_skipped > 0 {
        println!("** {} file(s) had no sequences", result.files_skipped);
    }
    match &result.output {
        Some(output) => println!(
            "** saved {} signature(s) to '{output}'",
            result.signatures_written
        ),
        None => println!("** nothing written"),
    }
}
