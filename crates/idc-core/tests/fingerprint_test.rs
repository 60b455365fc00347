use idc_core::fingerprint::directory_files;
use idc_core::{KeyValueStore, fingerprint, new_fingerprint_if_changed};
use proptest::prelude::*;
use tempfile::TempDir;

fn write(dir: &std::path::Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn empty_list_has_no_fingerprint() {
    let files: [&std::path::Path; 0] = [];
    assert!(fingerprint(&files).unwrap().is_none());
}

#[test]
fn missing_file_is_skipped() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("missing");
    let a = write(tmp.path(), "a", "alpha");

    assert!(fingerprint(&[&missing]).unwrap().is_none());
    assert_eq!(
        fingerprint(&[&missing, &a]).unwrap(),
        fingerprint(&[&a]).unwrap()
    );
}

#[test]
fn single_file_is_plain_sha256() {
    let tmp = TempDir::new().unwrap();
    let a = write(tmp.path(), "a", "abc");

    let fp = fingerprint(&[&a]).unwrap().unwrap();
    assert_eq!(
        fp.as_str(),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn order_matters() {
    let tmp = TempDir::new().unwrap();
    let a = write(tmp.path(), "a", "alpha");
    let b = write(tmp.path(), "b", "beta");

    assert_ne!(fingerprint(&[&a, &b]).unwrap(), fingerprint(&[&b, &a]).unwrap());
}

#[test]
fn content_change_changes_fingerprint() {
    let tmp = TempDir::new().unwrap();
    let a = write(tmp.path(), "a", "alpha");
    let before = fingerprint(&[&a]).unwrap();
    write(tmp.path(), "a", "alpha2");

    assert_ne!(before, fingerprint(&[&a]).unwrap());
}

#[test]
fn first_run_always_reports_change() {
    let tmp = TempDir::new().unwrap();
    let a = write(tmp.path(), "a", "alpha");
    let store = KeyValueStore::open(&tmp.path().join("state"), "app");

    let fp = new_fingerprint_if_changed(&store, "dockerfile-hash", &[&a]).unwrap();
    assert!(fp.is_some());
}

#[test]
fn unchanged_after_recording_returns_none() {
    let tmp = TempDir::new().unwrap();
    let a = write(tmp.path(), "a", "alpha");
    let mut store = KeyValueStore::open(&tmp.path().join("state"), "app");

    let fp = new_fingerprint_if_changed(&store, "dockerfile-hash", &[&a])
        .unwrap()
        .unwrap();
    store.set("dockerfile-hash", fp.as_str()).unwrap();

    assert!(
        new_fingerprint_if_changed(&store, "dockerfile-hash", &[&a])
            .unwrap()
            .is_none()
    );

    write(tmp.path(), "a", "changed");
    assert!(
        new_fingerprint_if_changed(&store, "dockerfile-hash", &[&a])
            .unwrap()
            .is_some()
    );
}

#[test]
fn no_existing_files_reports_unchanged() {
    let tmp = TempDir::new().unwrap();
    let store = KeyValueStore::open(tmp.path(), "app");
    let missing = tmp.path().join("nope");

    assert!(
        new_fingerprint_if_changed(&store, "k", &[&missing])
            .unwrap()
            .is_none()
    );
}

#[test]
fn directory_files_are_sorted_and_recursive() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "cfg/z.xml", "z");
    write(tmp.path(), "cfg/a.xml", "a");
    write(tmp.path(), "cfg/sub/m.xml", "m");

    let files = directory_files(&tmp.path().join("cfg")).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| {
            p.strip_prefix(tmp.path().join("cfg"))
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    assert_eq!(names, vec!["a.xml", "sub/m.xml", "z.xml"]);
}

#[test]
fn directory_files_of_missing_dir_is_empty() {
    let tmp = TempDir::new().unwrap();
    assert!(directory_files(&tmp.path().join("nope")).unwrap().is_empty());
}

proptest! {
    #[test]
    fn swapping_distinct_files_changes_fingerprint(
        a in "[a-z]{1,32}",
        b in "[a-z]{1,32}",
    ) {
        prop_assume!(a != b);
        let tmp = TempDir::new().unwrap();
        let fa = write(tmp.path(), "a", &a);
        let fb = write(tmp.path(), "b", &b);

        prop_assert_ne!(
            fingerprint(&[&fa, &fb]).unwrap(),
            fingerprint(&[&fb, &fa]).unwrap()
        );
    }
}
