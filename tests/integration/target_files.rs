// tests/integration/target_files.rs

use replit::errors::ReplitError;
use replit::target::{resolve_target, resolve_target_in, shebang_for, TEMP_PREFIX};

#[test]
fn temporary_target_gets_a_shebang() {
    let dir = tempfile::tempdir().unwrap();

    let target = resolve_target_in(None, "python3", dir.path()).unwrap();

    assert!(target.is_temporary());
    assert!(target.path().starts_with(dir.path()));
    let name = target.path().file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with(TEMP_PREFIX), "unexpected name {name}");

    let contents = std::fs::read_to_string(target.path()).unwrap();
    assert_eq!(contents, "#!/usr/bin/env python3\n");
}

#[test]
fn temporary_target_outlives_the_handle() {
    let dir = tempfile::tempdir().unwrap();
    let target = resolve_target_in(None, "node", dir.path()).unwrap();

    let (path, is_temporary) = target.into_parts();

    assert!(is_temporary);
    assert!(path.exists(), "removal happens at shutdown, not on drop");
}

#[test]
fn existing_file_is_used_as_is() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.py");
    std::fs::write(&path, "print('hi')\n").unwrap();

    let target = resolve_target(Some(path.as_path()), "python3").unwrap();

    assert!(!target.is_temporary());
    assert_eq!(target.path(), path);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "print('hi')\n");
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.py");

    match resolve_target(Some(path.as_path()), "python3") {
        Err(ReplitError::TargetNotFound(p)) => assert_eq!(p, path),
        other => panic!("expected TargetNotFound, got {other:?}"),
    }
}

#[test]
fn directory_is_not_a_valid_target() {
    let dir = tempfile::tempdir().unwrap();

    assert!(matches!(
        resolve_target(Some(dir.path()), "sh"),
        Err(ReplitError::TargetNotFound(_))
    ));
}

#[test]
fn shebang_names_the_language() {
    assert_eq!(shebang_for("ruby"), "#!/usr/bin/env ruby\n");
}
