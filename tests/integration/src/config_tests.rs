//! Configuration files loaded from disk and run against the fixture tree

use copy_core::{
    AssetRegistry, Assets, CopyConfig, CopyPlugin, CopyReport, Error, Host, PatternEntry,
};
use copy_fs::{EscapePolicy, NormalizedPath};
use copy_test_utils::Fixture;

async fn run_config(fixture: &Fixture, file: &str, content: &str) -> (Assets, CopyReport) {
    fixture.write(file, content);
    let plugin = CopyPlugin::load(&NormalizedPath::new(fixture.path(file))).unwrap();
    let mut assets = Assets::new();
    let report = plugin.run(&Host::native(fixture.root()), &mut assets).await;
    (assets, report)
}

// ============================================================================
// Formats
// ============================================================================

#[tokio::test]
async fn toml_shorthand_and_full_entries() {
    let fixture = Fixture::new();
    let (assets, report) = run_config(
        &fixture,
        "copy.toml",
        r#"
patterns = [
    "file.txt",
    { from = "directory/nested", to = "nested" },
]
"#,
    )
    .await;

    assert!(report.is_success());
    assert_eq!(
        assets.names(),
        vec![
            "file.txt",
            "nested/deep-nested/deepnested.txt",
            "nested/nestedfile.txt",
        ]
    );
}

#[tokio::test]
async fn json_glob_object_with_dot() {
    let fixture = Fixture::new();
    let (assets, report) = run_config(
        &fixture,
        "copy.json",
        r#"{
  "patterns": [
    { "from": { "glob": "directory/*", "dot": true }, "to": "out" }
  ]
}"#,
    )
    .await;

    assert!(report.is_success());
    assert_eq!(
        assets.names(),
        vec!["out/directory/.dottedfile", "out/directory/directoryfile.txt"]
    );
}

#[tokio::test]
async fn yaml_options_apply_to_every_pattern() {
    let fixture = Fixture::new();
    let (assets, report) = run_config(
        &fixture,
        "copy.yml",
        r#"
patterns:
  - from: directory
    globOptions:
      ignore: ["**/.dottedfile"]
  - from: "[!]"
    to: bang
options:
  concurrency: 1
  escape: character-class
  ignore: ["**/deep-nested/**"]
"#,
    )
    .await;

    assert!(report.is_success(), "{:?}", report.errors);
    assert_eq!(
        assets.names(),
        vec![
            "bang/hello.txt",
            "directoryfile.txt",
            "nested/nestedfile.txt",
        ]
    );
}

#[tokio::test]
async fn template_and_force_from_config() {
    let fixture = Fixture::new();
    let (assets, report) = run_config(
        &fixture,
        "copy.toml",
        r#"
[[patterns]]
from = "file.txt"
to = "[name].[contenthash:6].[ext]"

[[patterns]]
from = "directory/directoryfile.txt"
to = "file.22af64.txt"
toType = "file"
force = true
"#,
    )
    .await;

    assert!(report.is_success());
    let asset = assets.get_asset("file.22af64.txt").unwrap();
    assert_eq!(asset.source.bytes(), b"new");
    assert!(asset.info.copied);
    assert_eq!(report.outcomes.len(), 2);
}

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn config_keeps_entry_forms_and_options() {
    let fixture = Fixture::empty();
    fixture.write(
        "copy.toml",
        r#"
patterns = ["a.txt", { from = { glob = "src/**/*.css" }, noErrorOnMissing = true }]

[options]
concurrency = 8
escape = "character-class"
"#,
    );

    let config = CopyConfig::load(&NormalizedPath::new(fixture.path("copy.toml"))).unwrap();
    assert!(matches!(config.patterns[0], PatternEntry::Shorthand(ref from) if from == "a.txt"));
    assert!(matches!(config.patterns[1], PatternEntry::Full(_)));
    assert_eq!(config.options.concurrency, 8);
    assert_eq!(config.options.escape, EscapePolicy::CharacterClass);
    assert!(config.options.ignore.is_empty());

    let patterns = config.to_patterns().unwrap();
    assert!(patterns[1].no_error_on_missing);
}

#[test]
fn invalid_test_regex_is_an_option_error() {
    let fixture = Fixture::empty();
    fixture.write(
        "copy.toml",
        "patterns = [{ from = \"a\", to = \"[1]\", test = \"(unclosed\" }]\n",
    );

    let err = CopyPlugin::load(&NormalizedPath::new(fixture.path("copy.toml"))).unwrap_err();
    assert!(matches!(err, Error::InvalidOption { ref option, .. } if option == "test"));
}

#[test]
fn zero_concurrency_is_rejected() {
    let fixture = Fixture::empty();
    fixture.write("copy.json", r#"{ "patterns": ["a"], "options": { "concurrency": 0 } }"#);

    let err = CopyPlugin::load(&NormalizedPath::new(fixture.path("copy.json"))).unwrap_err();
    assert!(matches!(err, Error::InvalidOption { .. }));
}

#[test]
fn unknown_fields_and_formats_are_rejected() {
    let fixture = Fixture::empty();
    fixture.write("copy.toml", "patterns = [{ from = \"a\", bogus = 1 }]\n");
    fixture.write("copy.ini", "patterns = a\n");

    let err = CopyConfig::load(&NormalizedPath::new(fixture.path("copy.toml"))).unwrap_err();
    assert!(matches!(err, Error::Fs(_)));

    let err = CopyConfig::load(&NormalizedPath::new(fixture.path("copy.ini"))).unwrap_err();
    assert!(err.to_string().contains("ini"));
}
