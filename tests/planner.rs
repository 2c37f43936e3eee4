use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use sketch_from::domain::{MoleculeType, SketchSize, SketchSpec, SourceKind};
use sketch_from::error::SketchError;
use sketch_from::params::expand_param_strings;
use sketch_from::planner::plan_builds;
use sketch_from::reconcile::DoneIndex;
use sketch_from::registry::{EntityDescriptor, EntityRegistry};

fn sp001() -> EntityRegistry {
    let mut registry = EntityRegistry::new();
    registry
        .insert(EntityDescriptor::new(
            "SP_001".into(),
            "SP_001".into(),
            SourceKind::Genome,
            "a.fna".into(),
        ))
        .unwrap();
    registry
        .insert(EntityDescriptor::new(
            "SP_001".into(),
            "SP_001".into(),
            SourceKind::Protein,
            "a.faa".into(),
        ))
        .unwrap();
    registry
}

#[test]
fn one_work_item_per_source_file() {
    let registry = sp001();
    assert_eq!(registry.len(), 1);

    let specs = expand_param_strings(&["dna,k=21", "protein,k=10"], true).unwrap();
    let plan = plan_builds(registry.iter(), &specs, &DoneIndex::new()).unwrap();

    assert_eq!(plan.items.len(), 2);
    assert_eq!(plan.total, 2);
    assert_eq!(plan.skipped, 0);
    assert_eq!(plan.items[0].key.filename, Utf8PathBuf::from("a.fna"));
    assert_eq!(plan.items[0].specs, vec![specs[0]]);
    assert_eq!(plan.items[1].key.filename, Utf8PathBuf::from("a.faa"));
    assert_eq!(plan.items[1].specs, vec![specs[1]]);
}

#[test]
fn cross_product_is_complete() {
    let mut registry = EntityRegistry::new();
    for i in 0..4 {
        let ident = format!("GCA_{i}");
        registry
            .insert(EntityDescriptor::new(
                ident.clone(),
                ident.clone(),
                SourceKind::Genome,
                format!("{ident}_genomic.fna").into(),
            ))
            .unwrap();
    }
    let specs = expand_param_strings(&["dna,k=21,k=31,k=51", "dna,k=31,abund"], true).unwrap();
    assert_eq!(specs.len(), 4);

    let plan = plan_builds(registry.iter(), &specs, &DoneIndex::new()).unwrap();
    assert_eq!(plan.total, 16);
    assert_eq!(plan.skipped, 0);
    assert_eq!(plan.to_build(), 16);
    assert_eq!(plan.items.len(), 4);
    let pairs: usize = plan.items.iter().map(|item| item.specs.len()).sum();
    assert_eq!(pairs, 16);
}

#[test]
fn done_pairs_are_skipped() {
    let registry = sp001();
    let specs = expand_param_strings(&["dna,k=21", "protein,k=10"], true).unwrap();

    let mut done = DoneIndex::new();
    done.insert("SP_001".to_string(), specs[1]);
    let plan = plan_builds(registry.iter(), &specs, &done).unwrap();

    assert_eq!(plan.total, 2);
    assert_eq!(plan.skipped, 1);
    assert_eq!(plan.items.len(), 1);
    assert_eq!(plan.items[0].key.filename, Utf8PathBuf::from("a.fna"));
}

#[test]
fn replanning_with_own_output_is_empty() {
    let registry = sp001();
    let specs = expand_param_strings(&["dna,k=21,k=31", "protein,k=10", "hp"], true).unwrap();

    let first = plan_builds(registry.iter(), &specs, &DoneIndex::new()).unwrap();
    let mut done = DoneIndex::new();
    for item in &first.items {
        for spec in &item.specs {
            done.insert(item.key.name.clone(), *spec);
        }
    }

    let second = plan_builds(registry.iter(), &specs, &done).unwrap();
    assert!(second.is_empty());
    assert_eq!(second.skipped, second.total);
}

#[test]
fn protein_spec_without_proteome_fails() {
    let mut registry = EntityRegistry::new();
    registry
        .insert(EntityDescriptor::new(
            "GCA_1".into(),
            "GCA_1".into(),
            SourceKind::Genome,
            "GCA_1_genomic.fna".into(),
        ))
        .unwrap();
    let specs = vec![SketchSpec {
        moltype: MoleculeType::Dayhoff,
        ksize: 48,
        size: SketchSize::Scaled(200),
        track_abundance: false,
    }];
    let err = plan_builds(registry.iter(), &specs, &DoneIndex::new()).unwrap_err();
    assert_matches!(err, SketchError::MissingSourceFile { kind: "protein", .. });
}
