use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use sketch_from::config::{Config, ConfigLoader};
use sketch_from::error::SketchError;

#[test]
fn explicit_config_file_is_read() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("sketch-from.json")).unwrap();
    std::fs::write(
        &path,
        r#"{
            "schema_version": 1,
            "params": [{"moltype": "dayhoff", "ksizes": [16], "scaled": 100}],
            "check_sequence": true,
            "jobs": 4
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(Some(&path)).unwrap();
    assert_eq!(resolved.param_strings, vec!["dayhoff,k=16,scaled=100"]);
    assert!(resolved.check_sequence);
    assert_eq!(resolved.jobs, 4);
}

#[test]
fn missing_explicit_config_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("absent.json")).unwrap();
    let err = ConfigLoader::resolve(Some(&path)).unwrap_err();
    assert_matches!(err, SketchError::ConfigRead(_));
}

#[test]
fn rejects_bad_values() {
    let config: Config = serde_json::from_str(r#"{"schema_version": 2}"#).unwrap();
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(SketchError::ConfigParse(_))
    );

    let config: Config = serde_json::from_str(r#"{"jobs": 0}"#).unwrap();
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(SketchError::ConfigParse(_))
    );

    assert!(serde_json::from_str::<Config>(r#"{"params": [{"moltype": "rna"}]}"#).is_err());
}
