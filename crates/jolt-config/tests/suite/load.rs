use std::path::PathBuf;

use jolt_config::{ConcurrentBuildPolicy, ConfigError, JoltConfig};

#[test]
fn loads_config_from_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("jolt.toml");
    std::fs::write(
        &path,
        r#"
[cache]
root = "cache"

[build]
concurrent_builds = "reject"

[globals]
path_variables = { MAVEN_REPOSITORY = "/m2" }
"#,
    )
    .unwrap();

    let config = JoltConfig::load_from_path(&path).unwrap();
    assert_eq!(config.cache.root, Some(PathBuf::from("cache")));
    assert_eq!(config.build.concurrent_builds, ConcurrentBuildPolicy::Reject);
    assert_eq!(config.globals.path_variables.len(), 1);
    assert!(config.globals.libraries.is_empty());
}

#[test]
fn missing_file_is_an_io_error() {
    let tmp = tempfile::tempdir().unwrap();
    let err = JoltConfig::load_from_path(tmp.path().join("missing.toml")).unwrap_err();
    match err {
        ConfigError::Io { path, source } => {
            assert!(path.ends_with("missing.toml"), "{path}");
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn sdk_entries_require_a_home() {
    let err = JoltConfig::load_from_str(
        r#"
[[globals.libraries]]
kind = "sdk"
name = "17"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)), "{err:?}");
}
