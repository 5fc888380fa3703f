use extman_fs::{NormalizedPath, encode_segment};
use rstest::rstest;

#[rstest]
#[case("foo/bar/baz", "foo/bar/baz")]
#[case("foo\\bar\\baz", "foo/bar/baz")]
#[case("foo/bar\\baz", "foo/bar/baz")]
fn test_separators_normalized(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(NormalizedPath::new(input).as_str(), expected);
}

#[test]
fn test_join_paths() {
    let base = NormalizedPath::new("repo/");
    assert_eq!(base.join("app").as_str(), "repo/app");
    assert_eq!(NormalizedPath::new("repo").join("/app").as_str(), "repo/app");
}

#[test]
fn test_parent_and_file_name() {
    let path = NormalizedPath::new("/repo/app/1.0/app-1.0.toml");
    assert_eq!(path.file_name(), Some("app-1.0.toml"));
    assert_eq!(path.parent().unwrap().as_str(), "/repo/app/1.0");
    assert_eq!(NormalizedPath::new("/repo").parent().unwrap().as_str(), "/");
    assert!(NormalizedPath::new("repo").parent().is_none());
}

#[rstest]
#[case("app-1.0.toml", Some("toml"))]
#[case("app-1.0.jar", Some("jar"))]
#[case(".hidden", None)]
#[case("noext", None)]
fn test_extension(#[case] name: &str, #[case] expected: Option<&str>) {
    let path = NormalizedPath::new("repo").join(name);
    assert_eq!(path.extension(), expected);
}

#[test]
fn test_encoded_segment_never_escapes_parent() {
    let root = NormalizedPath::new("/repo");
    let joined = root.join(&encode_segment("../../etc"));
    assert_eq!(joined.parent().unwrap(), root);
}
