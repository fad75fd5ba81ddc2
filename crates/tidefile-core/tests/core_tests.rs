use std::collections::HashSet;
use std::fs;

use tempfile::TempDir;
use tidefile_core::{
    EngineConfig, FileKind, FsError, InodeInfo, LinkOption, Path, PathError, Progress, Target,
    fs as tfs, list, lstat, stat,
};

#[test]
fn test_path_round_trip_through_bytes_and_strings() {
    for s in ["", "/", "a", "/a/b", "a/./../b", "/é/ü", "x y/z "] {
        let p = Path::from(s);
        assert_eq!(Path::from_bytes(p.to_bytes()), p);
        assert_eq!(Path::from(p.to_string()), p);
    }
}

#[test]
fn test_path_equality_and_hashing() {
    let mut set = HashSet::new();
    set.insert(Path::from("/a//b/"));
    assert!(set.contains(&Path::from("/a/b")));
    assert!(!set.contains(&Path::from("a/b")));
    assert!(!set.contains(&Path::from("/a/./b")));
}

#[test]
fn test_path_serde_round_trip() {
    let p = Path::from("/tmp/a b/c");
    let json = serde_json::to_string(&p).unwrap();
    assert_eq!(json, r#""/tmp/a b/c""#);
    assert_eq!(serde_json::from_str::<Path>(&json).unwrap(), p);

    let raw = Path::from_bytes([b'/', 0xff, 0xfe]);
    let json = serde_json::to_string(&raw).unwrap();
    assert_eq!(serde_json::from_str::<Path>(&json).unwrap(), raw);
}

#[test]
fn test_rebase_substitutes_prefix() {
    let p = Path::from("/src/dir/file.txt");
    let rebased = p.rebase(&Path::from("/src"), &Path::from("/dst/x")).unwrap();
    assert_eq!(rebased, Path::from("/dst/x/dir/file.txt"));

    let err = p.rebase(&Path::from("/other"), &Path::from("/dst")).unwrap_err();
    assert!(matches!(err, PathError::IllegalRebase { .. }));
}

#[test]
fn test_relative_path_to_absolute() {
    let abs = Path::from("x/y").to_absolute().unwrap();
    assert!(abs.is_absolute());
    assert!(abs.to_string().ends_with("/x/y"));
}

#[test]
fn test_stat_identity_across_hardlinks() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, b"data").unwrap();
    fs::hard_link(&a, &b).unwrap();

    let sa = stat(&Path::from(a.as_path())).unwrap();
    let sb = stat(&Path::from(b.as_path())).unwrap();
    assert!(sa.same_file(&sb));
    assert_eq!(sa.nlink, 2);
    assert_eq!(sa.inode(), InodeInfo::new(sb.inode, sb.device));
}

#[test]
fn test_stat_reports_kinds() {
    let dir = TempDir::new().unwrap();
    let root = Path::from(dir.path());
    fs::create_dir(dir.path().join("d")).unwrap();
    tfs::symlink(&Path::from("d"), &root.child("l")).unwrap();

    assert_eq!(stat(&root.child("d")).unwrap().kind, FileKind::Directory);
    assert_eq!(lstat(&root.child("l")).unwrap().kind, FileKind::Symlink);
    assert_eq!(
        tidefile_core::FileStat::of(&root.child("l"), LinkOption::Follow)
            .unwrap()
            .kind,
        FileKind::Directory
    );
}

#[test]
fn test_stat_through_file_is_not_a_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("f"), b"").unwrap();
    let err = stat(&Path::from(dir.path()).child("f/x")).unwrap_err();
    assert!(matches!(err, FsError::NotADirectory { .. }));
}

#[test]
fn test_non_recursive_delete_vs_recursive() {
    let dir = TempDir::new().unwrap();
    let root = Path::from(dir.path());
    fs::create_dir_all(dir.path().join("t/u")).unwrap();
    fs::write(dir.path().join("t/u/f"), b"x").unwrap();

    let err = tfs::delete(&root.child("t")).unwrap_err();
    assert!(matches!(err, FsError::DirectoryNotEmpty { .. }));

    tfs::delete_recursive(&root.child("t")).unwrap();
    assert!(list(&root).unwrap().is_empty());
}

#[test]
fn test_listing_non_utf8_names() {
    use std::os::unix::ffi::OsStrExt;

    let dir = TempDir::new().unwrap();
    let name = std::ffi::OsStr::from_bytes(&[b'n', 0xff]);
    fs::write(dir.path().join(name), b"").unwrap();

    let entries = list(&Path::from(dir.path())).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, vec![b'n', 0xff]);
    let child = Path::from(dir.path()).child(&entries[0].name);
    assert!(stat(&child).unwrap().is_regular_file());
}

#[test]
fn test_target_resolution() {
    let dir = TempDir::new().unwrap();
    let root = Path::from(dir.path());
    fs::create_dir(dir.path().join("dst")).unwrap();
    assert!(Target::new([root.child("src")], root.child("dst")).resolve().is_ok());
}

#[test]
fn test_progress_contract() {
    assert!(Progress::new(1, 2).is_err());
    assert!(Progress::from_signed(-1, -1).is_err());
    assert_eq!(Progress::normalize(0, 3), Progress::new(3, 3).unwrap());
}

#[test]
fn test_engine_config_defaults() {
    let config = EngineConfig::default();
    assert_eq!(config.copy_buffer_size, 8192);
    assert_eq!(config.max_workers, 0);
}
