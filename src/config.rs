use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::MoleculeType;
use crate::error::SketchError;

pub const DEFAULT_CONFIG: &str = "sketch-from.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub params: Vec<ParamEntry>,
    #[serde(default)]
    pub already_done: Vec<Utf8PathBuf>,
    #[serde(default)]
    pub check_sequence: Option<bool>,
    #[serde(default)]
    pub jobs: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ParamEntry {
    Shorthand(String),
    Detailed(ParamEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ParamEntryObject {
    pub moltype: MoleculeType,
    #[serde(default)]
    pub ksizes: Vec<u32>,
    #[serde(default)]
    pub scaled: Option<u32>,
    #[serde(default)]
    pub num: Option<u32>,
    #[serde(default)]
    pub abund: Option<bool>,
}

impl ParamEntryObject {
    /// Render as a parameter string so both forms share one parser.
    pub fn to_param_string(&self) -> String {
        let mut parts = vec![self.moltype.to_string()];
        parts.extend(self.ksizes.iter().map(|k| format!("k={k}")));
        if let Some(scaled) = self.scaled {
            parts.push(format!("scaled={scaled}"));
        }
        if let Some(num) = self.num {
            parts.push(format!("num={num}"));
        }
        match self.abund {
            Some(true) => parts.push("abund".to_string()),
            Some(false) => parts.push("noabund".to_string()),
            None => {}
        }
        parts.join(",")
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub param_strings: Vec<String>,
    pub already_done: Vec<Utf8PathBuf>,
    pub check_sequence: bool,
    pub jobs: usize,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            param_strings: Vec::new(),
            already_done: Vec::new(),
            check_sequence: false,
            jobs: 1,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load an explicit config file, or `sketch-from.json` when present.
    /// A missing default file resolves to the defaults.
    pub fn resolve(path: Option<&Utf8Path>) -> Result<ResolvedConfig, SketchError> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Utf8PathBuf::from(DEFAULT_CONFIG),
        };

        if path.is_none() && !config_path.as_std_path().exists() {
            return Ok(ResolvedConfig::default());
        }

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| SketchError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| SketchError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, SketchError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if schema_version != 1 {
            return Err(SketchError::ConfigParse(format!(
                "unsupported schema_version {schema_version}"
            )));
        }

        let param_strings = config
            .params
            .into_iter()
            .map(|entry| match entry {
                ParamEntry::Shorthand(value) => value,
                ParamEntry::Detailed(obj) => obj.to_param_string(),
            })
            .collect();

        let jobs = config.jobs.unwrap_or(1);
        if jobs == 0 {
            return Err(SketchError::ConfigParse("jobs must be at least 1".to_string()));
        }

        Ok(ResolvedConfig {
            schema_version,
            param_strings,
            already_done: config.already_done,
            check_sequence: config.check_sequence.unwrap_or(false),
            jobs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_config_shorthand_and_detailed() {
        let config: Config = serde_json::from_str(
            r#"{
                "params": [
                    "dna,k=21,scaled=1000",
                    {"moltype": "protein", "ksizes": [10], "abund": true}
                ],
                "already_done": ["prior.zip"]
            }"#,
        )
        .unwrap();

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(
            resolved.param_strings,
            vec!["dna,k=21,scaled=1000", "protein,k=10,abund"]
        );
        assert_eq!(resolved.already_done, vec![Utf8PathBuf::from("prior.zip")]);
        assert_eq!(resolved.jobs, 1);
        assert!(!resolved.check_sequence);
    }
}
