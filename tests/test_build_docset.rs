use std::path::Path;

use docset::classify::RuleSet;
use docset::logging::init_logging;
use docset::{build_docset, BuildConfig, Category, ErrorStage};
use rusqlite::Connection;

fn write_doc(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// A small tree with one document per rule, plus a README that must be
/// skipped.
fn fixture_docs(root: &Path) {
    write_doc(root, "README.md", "# Docs\n");
    write_doc(root, "Callbacks/onInit.md", "# .onInit\n\nCalled at startup.\n");
    write_doc(root, "Callbacks/un.onInit.md", "# un.onInit\n");
    write_doc(
        root,
        "Commands/File/WriteFile.md",
        "# WriteFile\n\nSee [Delete](Delete.md#syntax).\n\n```\nWriteFile \"$INSTDIR\\a.txt\"\n```\n",
    );
    write_doc(root, "Includes/WinVer/WinVer.md", "# WinVer\n");
    write_doc(root, "Plugins/nsDialogs.md", "# nsDialogs\n");
    write_doc(root, "Variables/INSTDIR.md", "# $INSTDIR\n");
    write_doc(root, "Variables/NSISDIR.md", "# ${NSISDIR}\n");
    write_doc(root, "Variables/__FILE__.md", "# ${__FILE__}\n");
}

fn index_rows(db: &Path) -> String {
    let conn = Connection::open(db).unwrap();
    let mut stmt = conn
        .prepare("SELECT name, type, path FROM searchIndex ORDER BY name")
        .unwrap();
    let rows = stmt
        .query_map([], |row| {
            Ok(format!(
                "{} | {} | {}",
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?
            ))
        })
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    rows.join("\n")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_full_build() {
    init_logging(0);

    let dir = tempfile::tempdir().unwrap();
    let docs = dir.path().join("docs");
    fixture_docs(&docs);

    let config = BuildConfig {
        docs_root: docs,
        output_dir: dir.path().join(".build"),
        version: "3.10".to_string(),
        ..BuildConfig::default()
    };
    let report = build_docset(&config).await.unwrap();

    assert_eq!(report.documents, 8);
    assert_eq!(report.pages_written, 8);
    assert!(report.skipped.is_empty());
    assert!(report.unknown_bucket.is_empty());
    assert_eq!(report.index.inserted, 8);

    let docset = dir.path().join(".build/NSIS.docset");
    let resources = docset.join("Contents/Resources");
    let documents = resources.join("Documents");

    insta::assert_snapshot!(index_rows(&resources.join("docSet.dsidx")), @r###"
    $INSTDIR | Variable | html/Variables/INSTDIR.html
    ${NSISDIR} | Constant | html/Variables/NSISDIR.html
    ${WinVer} | Library | html/Includes/WinVer/WinVer.html
    ${__FILE__} | Constant | html/Variables/__FILE__.html
    .onInit | Function | html/Callbacks/onInit.html
    WriteFile | Command | html/Commands/File/WriteFile.html
    nsDialogs | Command | html/Plugins/nsDialogs.html
    un.onInit | Function | html/Callbacks/un.onInit.html
    "###);

    assert!(docset.join("Contents/Info.plist").is_file());
    assert!(documents.join("index.html").is_file());
    assert!(documents.join("css/docset.css").is_file());
    assert!(!documents.join("html/README.html").exists());

    let write_file = std::fs::read_to_string(documents.join("html/Commands/File/WriteFile.html")).unwrap();
    assert!(write_file.contains("<title>WriteFile | Core</title>"), "{}", write_file);
    assert!(write_file.contains("href=\"Delete.html#syntax\""), "{}", write_file);
    assert!(write_file.contains("class=\"hljs language-nsis\""), "{}", write_file);
    assert!(write_file.contains("v3.10"), "{}", write_file);

    let win_ver = std::fs::read_to_string(documents.join("html/Includes/WinVer/WinVer.html")).unwrap();
    assert!(win_ver.contains("<title>${WinVer} | WinVer.nsh</title>"), "{}", win_ver);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rebuild_replaces_index() {
    let dir = tempfile::tempdir().unwrap();
    let docs = dir.path().join("docs");
    write_doc(&docs, "Commands/Abort.md", "# Abort\n");
    write_doc(&docs, "Commands/Quit.md", "# Quit\n");

    let config = BuildConfig {
        docs_root: docs.clone(),
        output_dir: dir.path().join("out"),
        ..BuildConfig::default()
    };
    build_docset(&config).await.unwrap();

    std::fs::remove_file(docs.join("Commands/Quit.md")).unwrap();
    let report = build_docset(&config).await.unwrap();
    assert_eq!(report.index.inserted, 1);

    let db = dir.path().join("out/NSIS.docset/Contents/Resources/docSet.dsidx");
    insta::assert_snapshot!(index_rows(&db), @"Abort | Command | html/Commands/Abort.html");
    assert!(!dir
        .path()
        .join("out/NSIS.docset/Contents/Resources/Documents/html/Commands/Quit.html")
        .exists());

    // The uniqueness constraint Dash relies on is in place.
    let conn = Connection::open(&db).unwrap();
    let dup = conn.execute(
        "INSERT INTO searchIndex(name, type, path) VALUES ('Abort', 'Command', 'html/Commands/Abort.html')",
        [],
    );
    assert!(dup.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_docs_root_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = BuildConfig {
        docs_root: dir.path().join("nope"),
        output_dir: dir.path().join("out"),
        ..BuildConfig::default()
    };
    let err = build_docset(&config).await.unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.stage(), ErrorStage::Setup);
}

#[test]
fn test_classification_table() {
    let rules = RuleSet::default();
    let table: Vec<String> = [
        "Callbacks/onGUIInit.md",
        "Callbacks/un.onUninstSuccess.md",
        "Commands/Section/SectionSetText.md",
        "Includes/StrFunc/StrLoc.md",
        "Variables/NSIS_MAX_STRLEN.md",
        "Variables/__LINE__.md",
        "Variables/OUTDIR.md",
        "Plugins/__misc__.md",
    ]
    .iter()
    .map(|p| {
        let c = rules.classify_path(Path::new(p));
        format!("{} -> {} {} [{}]", p, c.category, c.canonical_name, c.bundle)
    })
    .collect();

    insta::assert_snapshot!(table.join("\n"), @r###"
    Callbacks/onGUIInit.md -> Function .onGUIInit [Core]
    Callbacks/un.onUninstSuccess.md -> Function un.onUninstSuccess [Core]
    Commands/Section/SectionSetText.md -> Command SectionSetText [Core]
    Includes/StrFunc/StrLoc.md -> Library ${StrLoc} [StrFunc.nsh]
    Variables/NSIS_MAX_STRLEN.md -> Constant ${NSIS_MAX_STRLEN} [Core]
    Variables/__LINE__.md -> Constant ${__LINE__} [Core]
    Variables/OUTDIR.md -> Variable $OUTDIR [Core]
    Plugins/__misc__.md -> Constant ${__misc__} [Core]
    "###);

    assert_eq!(
        rules.classify_path(Path::new("Variables/OUTDIR.md")).category,
        Category::Variable
    );
}
