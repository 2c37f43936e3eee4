use std::collections::HashMap;

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::info;

use crate::domain::SketchSpec;
use crate::error::SketchError;
use crate::reconcile::DoneIndex;
use crate::registry::EntityDescriptor;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WorkKey {
    pub name: String,
    pub filename: Utf8PathBuf,
}

/// The outstanding specs for one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkItem {
    pub key: WorkKey,
    pub specs: Vec<SketchSpec>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildPlan {
    pub items: Vec<WorkItem>,
    pub total: usize,
    pub skipped: usize,
}

impl BuildPlan {
    pub fn to_build(&self) -> usize {
        self.total - self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Cross every entity with every spec, drop what `done` already has, and
/// group the rest by (name, source file).
pub fn plan_builds<'a, I>(
    entities: I,
    specs: &[SketchSpec],
    done: &DoneIndex,
) -> Result<BuildPlan, SketchError>
where
    I: IntoIterator<Item = &'a EntityDescriptor>,
{
    let mut plan = BuildPlan::default();
    let mut positions: HashMap<WorkKey, usize> = HashMap::new();

    for entity in entities {
        for spec in specs {
            plan.total += 1;
            if done.contains(&entity.name, spec) {
                plan.skipped += 1;
                continue;
            }

            let kind = spec.moltype.source_kind();
            let filename = entity
                .filename(kind)
                .filter(|path| !path.as_str().is_empty())
                .ok_or_else(|| SketchError::MissingSourceFile {
                    name: entity.name.clone(),
                    kind: kind.as_str(),
                    moltype: spec.moltype.to_string(),
                })?;

            let key = WorkKey {
                name: entity.name.clone(),
                filename: filename.to_path_buf(),
            };
            match positions.get(&key) {
                Some(&pos) => plan.items[pos].specs.push(*spec),
                None => {
                    positions.insert(key.clone(), plan.items.len());
                    plan.items.push(WorkItem {
                        key,
                        specs: vec![*spec],
                    });
                }
            }
        }
    }

    info!(
        "Of {} total requested in cross-product, skipping {}, building {} across {} files",
        plan.total,
        plan.skipped,
        plan.to_build(),
        plan.items.len()
    );
    Ok(plan)
}
