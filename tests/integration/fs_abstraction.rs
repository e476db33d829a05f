// tests/integration/fs_abstraction.rs

use std::path::PathBuf;

use replit::fs::mock::MockFileSystem;
use replit::fs::FileSystem;
use replit::types::DirectoryScan;
use replit::watch::hash::{compute_file_hash, compute_hash_for_paths};
use replit::watch::{build_exclude_set, list_directory, WatchSet};

fn project() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/main.py", b"print('hi')");
    fs.add_file("/proj/lib/util.py", b"X = 1");
    fs.add_file("/proj/.git/HEAD", b"ref: refs/heads/main");
    fs.add_file("/proj/.git/objects/ab/cdef", b"blob");
    fs
}

#[test]
fn test_mock_fs_hashing() {
    let fs = MockFileSystem::new();
    fs.add_file("/test.txt", b"hello world");

    let hash = compute_file_hash(&fs, &PathBuf::from("/test.txt")).unwrap();
    // blake3 hash of "hello world"
    assert_eq!(hash, "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24");
}

#[test]
fn aggregate_hash_ignores_path_order_but_not_content() {
    let fs = project();
    let a = PathBuf::from("/proj/main.py");
    let b = PathBuf::from("/proj/lib/util.py");

    let h1 = compute_hash_for_paths(&fs, &[a.clone(), b.clone()]).unwrap();
    let h2 = compute_hash_for_paths(&fs, &[b.clone(), a.clone()]).unwrap();
    assert_eq!(h1, h2);

    fs.add_file("/proj/lib/util.py", b"X = 2");
    let h3 = compute_hash_for_paths(&fs, &[a, b]).unwrap();
    assert_ne!(h1, h3);
}

#[test]
fn directory_listing_is_recursive_sorted_and_honours_excludes() {
    let fs = project();
    let exclude = build_exclude_set(&[".git/**".to_string()]).unwrap();

    let files = list_directory(&fs, &PathBuf::from("/proj"), &exclude).unwrap();

    assert_eq!(
        files,
        vec![
            PathBuf::from("/proj/lib/util.py"),
            PathBuf::from("/proj/main.py"),
        ]
    );
}

#[test]
fn invalid_exclude_glob_is_rejected() {
    assert!(build_exclude_set(&["a/[".to_string()]).is_err());
}

#[test]
fn file_watch_set_is_just_the_file() {
    let fs = MockFileSystem::new();
    let set = WatchSet::file("/tmp/replit123");

    assert_eq!(set.paths(&fs).unwrap(), vec![PathBuf::from("/tmp/replit123")]);
}

#[test]
fn rescan_picks_up_files_created_after_startup() {
    let fs = project();
    let set = WatchSet::directory(
        &fs,
        "/proj",
        "/proj/main.py",
        &[".git/**".to_string()],
        DirectoryScan::Rescan,
    )
    .unwrap();

    fs.add_file("/proj/new_module.py", b"");

    let paths = set.paths(&fs).unwrap();
    assert!(paths.contains(&PathBuf::from("/proj/new_module.py")));
}

#[test]
fn snapshot_keeps_the_startup_listing() {
    let fs = project();
    let set = WatchSet::directory(
        &fs,
        "/proj",
        "/proj/main.py",
        &[".git/**".to_string()],
        DirectoryScan::Snapshot,
    )
    .unwrap();

    fs.add_file("/proj/new_module.py", b"");

    let paths = set.paths(&fs).unwrap();
    assert!(!paths.contains(&PathBuf::from("/proj/new_module.py")));
    assert_eq!(paths.len(), 2);
}

#[test]
fn target_outside_the_directory_is_still_watched() {
    let fs = project();
    fs.add_file("/elsewhere/script.py", b"print(0)");

    let set = WatchSet::directory(&fs, "/proj", "/elsewhere/script.py", &[], DirectoryScan::Rescan)
        .unwrap();

    let paths = set.paths(&fs).unwrap();
    assert!(paths.contains(&PathBuf::from("/elsewhere/script.py")));
}

#[test]
fn mock_remove_file_reports_missing_files() {
    let fs = project();
    let path = PathBuf::from("/proj/main.py");

    fs.remove_file(&path).unwrap();
    assert!(!fs.exists(&path));

    let err = fs.remove_file(&path).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
}
