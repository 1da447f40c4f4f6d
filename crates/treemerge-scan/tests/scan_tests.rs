use std::fs;

use tempfile::TempDir;
use treemerge_scan::{JwalkScanner, ScanConfig, ScanError, WarningKind};

fn sample_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("docs/old")).unwrap();
    fs::create_dir_all(root.join(".git")).unwrap();
    fs::write(root.join("readme.md"), "hello").unwrap();
    fs::write(root.join("docs/guide.md"), "guide!").unwrap();
    fs::write(root.join("docs/old/notes.txt"), "n").unwrap();
    fs::write(root.join(".git/HEAD"), "ref").unwrap();
    fs::write(root.join(".hidden"), "h").unwrap();
    temp
}

#[test]
fn test_listing_counts_files_and_bytes() {
    let temp = sample_tree();
    let listing = JwalkScanner::new().scan(&ScanConfig::new(temp.path())).unwrap();

    assert_eq!(listing.len(), 5);
    assert_eq!(listing.total_size(), 5 + 6 + 1 + 3 + 1);
    assert!(listing.dir_count >= 3);
    assert!(!listing.is_partial());
}

#[test]
fn test_hidden_files_can_be_skipped() {
    let temp = sample_tree();
    let config = ScanConfig::builder()
        .root(temp.path())
        .include_hidden(false)
        .build()
        .unwrap();

    let listing = JwalkScanner::new().scan(&config).unwrap();
    let names: Vec<&str> = listing.entries.iter().map(|e| e.name.as_str()).collect();

    assert_eq!(names.len(), 3);
    assert!(!names.contains(&"HEAD"));
    assert!(!names.contains(&".hidden"));
}

#[test]
fn test_max_depth_limits_walk() {
    let temp = sample_tree();
    let config = ScanConfig::builder()
        .root(temp.path())
        .max_depth(Some(1u32))
        .build()
        .unwrap();

    let listing = JwalkScanner::new().scan(&config).unwrap();

    assert!(listing.entries.iter().all(|e| e.path.parent() == Some(listing.root.as_path())));
    assert_eq!(listing.len(), 2);
}

#[test]
fn test_entries_are_in_path_order() {
    let temp = sample_tree();
    let listing = JwalkScanner::new().scan(&ScanConfig::new(temp.path())).unwrap();

    let paths: Vec<_> = listing.entries.iter().map(|e| e.path.clone()).collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);
}

#[cfg(unix)]
#[test]
fn test_unreadable_subdirectory_gives_partial_listing() {
    use std::os::unix::fs::PermissionsExt;

    let temp = sample_tree();
    let locked = temp.path().join("docs/old");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(&locked).is_ok() {
        // Running as root; permissions are not enforced.
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let listing = JwalkScanner::new().scan(&ScanConfig::new(temp.path()));
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    let listing = listing.unwrap();

    assert!(listing.is_partial());
    assert!(
        listing
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::PermissionDenied || w.kind == WarningKind::ReadError)
    );
    assert!(listing.entries.iter().any(|e| e.name == "guide.md"));
}

#[test]
fn test_missing_root_is_not_found() {
    let temp = TempDir::new().unwrap();
    let err = JwalkScanner::new()
        .scan(&ScanConfig::new(temp.path().join("nope")))
        .unwrap_err();

    assert!(matches!(err, ScanError::NotFound { .. }));
}
