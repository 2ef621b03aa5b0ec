use std::borrow::Cow;

/// Percent-encode each segment of a `/`-separated path, keeping the slashes.
pub fn url_encode_path(path: &str) -> String {
    path.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<Cow<'_, str>>>()
        .join("/")
}

/// Join a base URL and a relative path with exactly one slash between them,
/// encoding the path part.
pub fn join_url(base: &str, rel_path: &str) -> String {
    let rel_path = rel_path.trim_start_matches('/');
    format!("{}/{}", base.trim_end_matches('/'), url_encode_path(rel_path))
}

#[test]
fn test_url_encode_path() {
    assert_eq!(url_encode_path("Callbacks/un.onInit.md"), "Callbacks/un.onInit.md");
    assert_eq!(
        url_encode_path("Variables/${NSISDIR} notes.md"),
        "Variables/%24%7BNSISDIR%7D%20notes.md"
    );
}

#[test]
fn test_join_url() {
    assert_eq!(
        join_url("https://github.com/NSIS-Dev/Documentation/edit/main/docs/", "Commands/File/WriteFile.md"),
        "https://github.com/NSIS-Dev/Documentation/edit/main/docs/Commands/File/WriteFile.md"
    );
}
