//! Parameter-string grammar.
//!
//! A parameter string is a comma-separated list of components, for example
//! `dna,k=21,k=31,scaled=1000,abund` or `protein,k=10,num=500`. Exactly one
//! molecule component is required; every other component is optional and falls
//! back to the molecule's default.

use std::collections::HashSet;

use crate::domain::{DEFAULT_SEED, MoleculeType, SketchSize, SketchSpec};
use crate::error::SketchError;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParamSet {
    moltype: MoleculeType,
    ksizes: Vec<u32>,
    size: SketchSize,
    track_abundance: bool,
}

fn defaults(moltype: MoleculeType) -> (u32, u32) {
    match moltype {
        MoleculeType::Dna => (31, 1000),
        MoleculeType::Protein => (10, 200),
        MoleculeType::Dayhoff => (16, 200),
        MoleculeType::Hp => (42, 200),
    }
}

/// Expand parameter strings into the de-duplicated set of sketch specs.
///
/// With `split_ksizes` every k value becomes its own spec. Without it each
/// string must name a single k value.
pub fn expand_param_strings<S: AsRef<str>>(
    param_strings: &[S],
    split_ksizes: bool,
) -> Result<Vec<SketchSpec>, SketchError> {
    if param_strings.is_empty() {
        return Err(SketchError::Configuration(
            "no parameter strings given; a molecule type must be provided".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut specs = Vec::new();
    for p_str in param_strings {
        let params = parse_params(p_str.as_ref())?;
        if !split_ksizes && params.ksizes.len() > 1 {
            return Err(SketchError::Configuration(format!(
                "'{}' names {} ksizes but ksize splitting is disabled",
                p_str.as_ref(),
                params.ksizes.len()
            )));
        }
        for k in &params.ksizes {
            let ksize = k
                .checked_mul(params.moltype.ksize_multiplier())
                .ok_or_else(|| {
                    SketchError::Configuration(format!("'{}': k={k} is too large", p_str.as_ref()))
                })?;
            let spec = SketchSpec {
                moltype: params.moltype,
                ksize,
                size: params.size,
                track_abundance: params.track_abundance,
            };
            if seen.insert(spec) {
                specs.push(spec);
            }
        }
    }
    Ok(specs)
}

fn parse_params(p_str: &str) -> Result<ParamSet, SketchError> {
    let err = |msg: String| SketchError::Configuration(format!("'{p_str}': {msg}"));

    if p_str.trim().is_empty() {
        return Err(err("parameter string cannot be empty".to_string()));
    }

    let mut ksizes: Vec<u32> = Vec::new();
    let mut moltype: Option<MoleculeType> = None;
    let mut abundance: Option<bool> = None;
    let mut num: Option<u32> = None;
    let mut scaled: Option<u32> = None;
    let mut seed: Option<u64> = None;

    for item in p_str.split(',').map(str::trim) {
        if let Some(value) = item.strip_prefix("k=") {
            let k = parse_int::<u32>(value, "k").map_err(err)?;
            if k == 0 {
                return Err(err("k must be greater than zero".to_string()));
            }
            if !ksizes.contains(&k) {
                ksizes.push(k);
            }
        } else if let Some(value) = item.strip_prefix("num=") {
            set_once(&mut num, parse_int(value, "num").map_err(err)?, "num").map_err(err)?;
        } else if let Some(value) = item.strip_prefix("scaled=") {
            set_once(&mut scaled, parse_int(value, "scaled").map_err(err)?, "scaled")
                .map_err(err)?;
        } else if let Some(value) = item.strip_prefix("seed=") {
            set_once(&mut seed, parse_int(value, "seed").map_err(err)?, "seed").map_err(err)?;
        } else if item == "abund" || item == "noabund" {
            set_once(&mut abundance, item == "abund", "abundance").map_err(err)?;
        } else if let Ok(parsed) = item.parse::<MoleculeType>() {
            set_once(&mut moltype, parsed, "moltype").map_err(err)?;
        } else {
            return Err(err(format!("unknown component '{item}'")));
        }
    }

    let moltype = moltype.ok_or_else(|| err("no moltype provided".to_string()))?;
    let (default_k, default_scaled) = defaults(moltype);

    if let Some(seed) = seed {
        // Seed is not recorded in manifests, so a non-default seed could not be
        // told apart from already-built sketches.
        if seed != DEFAULT_SEED {
            return Err(err(format!(
                "only seed={DEFAULT_SEED} is supported, got seed={seed}"
            )));
        }
    }

    let size = match (num, scaled) {
        (Some(n), Some(_)) if n != 0 => {
            return Err(err("cannot specify both non-zero 'num' and 'scaled'".to_string()));
        }
        (_, Some(0)) => return Err(err("scaled must be greater than zero".to_string())),
        (_, Some(s)) => SketchSize::Scaled(s),
        (Some(n), None) if n != 0 => SketchSize::Num(n),
        (Some(_), None) => {
            return Err(err("num=0 requires an explicit scaled value".to_string()));
        }
        (None, None) => SketchSize::Scaled(default_scaled),
    };

    if ksizes.is_empty() {
        ksizes.push(default_k);
    }

    Ok(ParamSet {
        moltype,
        ksizes,
        size,
        track_abundance: abundance.unwrap_or(false),
    })
}

fn parse_int<T: std::str::FromStr>(value: &str, field: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("cannot parse {field}='{value}' as a valid integer"))
}

fn set_once<T: PartialEq + std::fmt::Debug>(
    slot: &mut Option<T>,
    value: T,
    field: &str,
) -> Result<(), String> {
    match slot {
        Some(existing) if *existing != value => Err(format!(
            "conflicting values for {field}: {existing:?} and {value:?}"
        )),
        Some(_) => Ok(()),
        None => {
            *slot = Some(value);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults_per_moltype() {
        let specs = expand_param_strings(&["dna", "protein", "dayhoff", "hp"], true).unwrap();
        let ksizes: Vec<u32> = specs.iter().map(|s| s.ksize).collect();
        assert_eq!(ksizes, vec![31, 30, 48, 126]);
        assert_eq!(specs[0].size, SketchSize::Scaled(1000));
        assert_eq!(specs[1].size, SketchSize::Scaled(200));
    }

    #[test]
    fn repeated_values_collapse() {
        let specs = expand_param_strings(&["dna,k=21,k=21,scaled=1,scaled=1"], true).unwrap();
        assert_eq!(specs.len(), 1);
    }

    #[test]
    fn num_zero_with_scaled_is_scaled() {
        let specs = expand_param_strings(&["dna,num=0,scaled=100"], true).unwrap();
        assert_eq!(specs[0].size, SketchSize::Scaled(100));
    }

    #[test]
    fn huge_amino_acid_k_is_an_error() {
        let err = expand_param_strings(&["protein,k=2000000000"], true).unwrap_err();
        assert_matches!(err, SketchError::Configuration(_));
        assert!(expand_param_strings(&["dna,k=2000000000"], true).is_ok());
    }

    #[test]
    fn default_seed_is_accepted() {
        assert!(expand_param_strings(&["dna,seed=42"], true).is_ok());
        let err = expand_param_strings(&["dna,seed=7"], true).unwrap_err();
        assert_matches!(err, SketchError::Configuration(_));
    }
}
