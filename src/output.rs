use std::io::{self, Write};

use serde::Serialize;
use tracing::info;

use crate::app::{BuildResult, ProgressEvent, ProgressSink, SourcesResult};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_sources(result: &SourcesResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_build(result: &BuildResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Forwards progress to the tracing subscriber.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!("{} ({:.1}s)", event.message, elapsed.as_secs_f64()),
            None => info!("{}", event.message),
        }
    }
}
