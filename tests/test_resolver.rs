mod common;

use std::path::PathBuf;
use sws::content::resolver::{EntryKind, Namespace, PathResolver, ResolveError};

use common::TempDir;

#[test]
fn test_mapped_paths_stay_under_root() {
    let resolver = PathResolver::new("/srv/www", "/home");
    let inputs = [
        "/", "/a", "/a/b/c", "/a/../b", "/./x/./y", "///a//b///", "/a/b/../../c",
    ];

    for input in inputs {
        let mapped = resolver.map(input).unwrap();
        assert!(
            mapped.path.starts_with("/srv/www"),
            "{} mapped to {}",
            input,
            mapped.path.display()
        );
        let text = mapped.path.to_string_lossy().into_owned();
        assert!(!text.contains("//"), "{}", text);
        assert!(!text.split('/').any(|s| s == "." || s == ".."), "{}", text);
    }
}

#[test]
fn test_mapping_is_idempotent() {
    let resolver = PathResolver::new("/srv/www", "/home");

    for input in ["/a/./b/../c//d", "/~bob/x/../y", "/"] {
        let once = resolver.map(input).unwrap();
        let again = resolver.map(&once.url_path(false)).unwrap();
        assert_eq!(once, again);
    }
}

#[test]
fn test_any_escape_is_forbidden() {
    let resolver = PathResolver::new("/srv/www", "/home");

    for input in ["/..", "/../etc/passwd", "/a/../..", "/a/../../a", "/~bob/../x", "/~.."] {
        let err = resolver.map(input).unwrap_err();
        assert!(matches!(err, ResolveError::SandboxViolation), "{}", input);
        assert_eq!(err.status().as_u16(), 403);
    }
}

#[test]
fn test_empty_user_name_is_not_found() {
    let resolver = PathResolver::new("/srv/www", "/home");
    let err = resolver.map("/~/x").unwrap_err();

    assert!(matches!(err, ResolveError::NotFound));
}

#[test]
fn test_user_namespace_roots_under_home_base() {
    let resolver = PathResolver::new("/srv/www", "/home");

    let mapped = resolver.map("/~carol").unwrap();
    assert_eq!(mapped.namespace, Namespace::User("carol".to_string()));
    assert_eq!(mapped.path, PathBuf::from("/home/carol/sws"));
    assert!(mapped.is_namespace_root());
    assert_eq!(mapped.url_path(true), "/~carol/");
}

#[test]
fn test_resolve_marks_directories_with_trailing_slash() {
    let root = TempDir::new("resolve-kind");
    root.mkdir("docs");
    root.write("docs/readme.txt", "hi");
    let resolver = PathResolver::new(root.path(), "/home");

    let dir = resolver.resolve("/docs").unwrap();
    assert_eq!(dir.kind, EntryKind::Directory);
    assert!(dir.path.to_string_lossy().ends_with("/docs/"));

    let file = resolver.resolve("/docs/readme.txt/").unwrap();
    assert_eq!(file.kind, EntryKind::File);
    assert!(file.path.to_string_lossy().ends_with("/docs/readme.txt"));

    let top = resolver.resolve("/").unwrap();
    assert_eq!(top.kind, EntryKind::Directory);
    assert_eq!(top.path, PathBuf::from(format!("{}/", root.path().display())));
}

#[test]
fn test_resolve_missing_path_is_not_found() {
    let root = TempDir::new("resolve-missing");
    root.write("file.txt", "x");
    let resolver = PathResolver::new(root.path(), "/home");

    assert!(matches!(resolver.resolve("/nothing"), Err(ResolveError::NotFound)));
    assert!(matches!(
        resolver.resolve("/file.txt/below"),
        Err(ResolveError::NotFound)
    ));
}

#[test]
fn test_resolve_user_directory() {
    let home = TempDir::new("resolve-home");
    home.write("dave/sws/index.html", "<p>dave</p>");
    let root = TempDir::new("resolve-root");
    let resolver = PathResolver::new(root.path(), home.path());

    let resolved = resolver.resolve("/~dave/index.html").unwrap();
    assert_eq!(resolved.kind, EntryKind::File);
    assert_eq!(resolved.path, home.path().join("dave/sws/index.html"));

    assert!(matches!(
        resolver.resolve("/~nobody/"),
        Err(ResolveError::NotFound)
    ));
}
