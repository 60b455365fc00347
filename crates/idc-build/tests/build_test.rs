use std::path::Path;

use idc_build::dockerfile::{GENERATED_DOCKERFILE, LANG_DOCKERFILE, USER_DOCKERFILE};
use idc_build::{DockerfileError, DockerfileSet, WatchedFiles};
use idc_core::{IdcConfig, fingerprint};
use tempfile::TempDir;

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

struct Layout {
    _tmp: TempDir,
    artifacts: std::path::PathBuf,
    app: std::path::PathBuf,
}

fn layout() -> Layout {
    let tmp = TempDir::new().unwrap();
    let artifacts = tmp.path().join("artifacts");
    let app = tmp.path().join("app");
    std::fs::create_dir_all(&app).unwrap();
    write(&artifacts.join("Dockerfile"), "FROM open-liberty\n");
    Layout {
        _tmp: tmp,
        artifacts,
        app,
    }
}

// ── DockerfileSet ──

#[test]
fn resolve_requires_master() {
    let tmp = TempDir::new().unwrap();
    let result = DockerfileSet::resolve(&tmp.path().join("artifacts"), tmp.path());

    assert!(matches!(result, Err(DockerfileError::MissingMaster(_))));
}

#[test]
fn set_order_is_master_lang_user() {
    let l = layout();
    let set = DockerfileSet::resolve(&l.artifacts, &l.app).unwrap();

    assert_eq!(
        set.files(),
        &[
            l.artifacts.join("Dockerfile"),
            l.app.join(LANG_DOCKERFILE),
            l.app.join(USER_DOCKERFILE),
        ]
    );
    assert_eq!(set.existing().count(), 1);
}

#[test]
fn compose_concatenates_existing_members_in_order() {
    let l = layout();
    write(&l.app.join(USER_DOCKERFILE), "RUN echo user");
    write(&l.app.join(LANG_DOCKERFILE), "COPY target /app\n");
    let set = DockerfileSet::resolve(&l.artifacts, &l.app).unwrap();

    assert_eq!(
        set.compose().unwrap(),
        "FROM open-liberty\nCOPY target /app\nRUN echo user\n"
    );
}

#[test]
fn write_composed_creates_generated_file() {
    let l = layout();
    let state = l.app.join(".idc");
    let set = DockerfileSet::resolve(&l.artifacts, &l.app).unwrap();

    let path = set.write_composed(&state).unwrap();
    assert_eq!(path, state.join(GENERATED_DOCKERFILE));
    assert_eq!(
        std::fs::read_to_string(path).unwrap(),
        "FROM open-liberty\n"
    );
}

#[test]
fn user_layer_changes_set_fingerprint() {
    let l = layout();
    let set = DockerfileSet::resolve(&l.artifacts, &l.app).unwrap();
    let before = fingerprint(set.files()).unwrap();

    write(&l.app.join(USER_DOCKERFILE), "RUN echo user\n");
    let after = fingerprint(set.files()).unwrap();

    assert!(before.is_some());
    assert_ne!(before, after);
}

// ── WatchedFiles ──

#[test]
fn discover_uses_configured_paths() {
    let l = layout();
    write(&l.app.join("pom.xml"), "<project/>");
    write(&l.app.join("src/main/liberty/config/server.xml"), "<server/>");
    write(&l.app.join("chart/values.yaml"), "replicas: 1");
    write(&l.app.join("chart/templates/deploy.yaml"), "kind: Deployment");

    let watched = WatchedFiles::discover(&l.app, &IdcConfig::default()).unwrap();

    assert!(watched.has_build_descriptor());
    assert_eq!(
        watched.config_files,
        vec![l.app.join("src/main/liberty/config/server.xml")]
    );
    assert_eq!(
        watched.chart_files,
        vec![
            l.app.join("chart/templates/deploy.yaml"),
            l.app.join("chart/values.yaml"),
        ]
    );
}

#[test]
fn discover_tolerates_missing_directories() {
    let l = layout();
    let watched = WatchedFiles::discover(&l.app, &IdcConfig::default()).unwrap();

    assert!(!watched.has_build_descriptor());
    assert!(watched.config_files.is_empty());
    assert!(watched.chart_files.is_empty());
}
