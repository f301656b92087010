//! End-to-end scenarios against the real filesystem
//!
//! Every test builds the standard fixture tree in a temporary directory and
//! runs the plugin through a native host, the same way a build would.

use copy_cache::{DiskStore, FsSnapshotter};
use copy_core::{
    AssetAction, AssetRegistry, Assets, CacheSetting, CopyPlugin, CopyReport, Error, FromKind,
    GlobSpec, Host, Pattern, PluginOptions, Source, transform_fn,
};
use copy_fs::{EscapePolicy, NativeFs};
use copy_test_utils::{CountingFs, Fixture};
use regex::Regex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

async fn run_with(
    fixture: &Fixture,
    patterns: Vec<Pattern>,
    options: PluginOptions,
) -> (Assets, CopyReport) {
    let host = Host::native(fixture.root());
    let plugin = CopyPlugin::new(patterns, options).unwrap();
    let mut assets = Assets::new();
    let report = plugin.run(&host, &mut assets).await;
    (assets, report)
}

async fn run(fixture: &Fixture, patterns: Vec<Pattern>) -> (Assets, CopyReport) {
    run_with(fixture, patterns, PluginOptions::default()).await
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn scenario_a_single_file() {
    let fixture = Fixture::new();
    let (assets, report) = run(&fixture, vec![Pattern::new("file.txt")]).await;

    assert!(report.is_success());
    assert_eq!(assets.names(), vec!["file.txt"]);
    let asset = assets.get_asset("file.txt").unwrap();
    assert_eq!(asset.source.bytes(), b"new");
    assert!(asset.info.copied);
}

#[tokio::test]
async fn scenario_b_hashed_glob() {
    let fixture = Fixture::empty();
    fixture.write("a/x.txt", "hi");
    let (assets, report) = run(
        &fixture,
        vec![Pattern::new("a/**/*").to("out/[name]-[contenthash:6].[ext]")],
    )
    .await;

    assert!(report.is_success());
    assert_eq!(assets.names(), vec!["out/x-49f68a.txt"]);
    assert!(assets.get_asset("out/x-49f68a.txt").unwrap().info.immutable);
}

#[tokio::test]
async fn scenario_c_missing_source() {
    let fixture = Fixture::new();
    let (assets, report) = run(&fixture, vec![Pattern::new("missing.txt")]).await;

    assert!(assets.is_empty());
    assert_eq!(report.errors.len(), 1);
    match &report.errors[0].error {
        Error::SourceNotFound {
            from,
            absolute_from,
        } => {
            assert_eq!(from, "missing.txt");
            assert_eq!(absolute_from, &fixture.path("missing.txt"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn scenario_d_forced_collision() {
    let fixture = Fixture::new();
    // The first pattern rewrites its source once it has been read
    let rewrite = transform_fn("rewrite-source", |content: Vec<u8>, path| async move {
        std::fs::write(&path, "second").unwrap();
        Ok(content)
    });
    let options = PluginOptions {
        concurrency: 1,
        ..PluginOptions::default()
    };
    let (assets, report) = run_with(
        &fixture,
        vec![
            Pattern::new("file.txt").to("dest.txt").transform(rewrite),
            Pattern::new("file.txt").to("dest.txt").force(true),
        ],
        options,
    )
    .await;

    assert!(report.is_success());
    assert_eq!(
        report.outcomes.iter().map(|o| o.action).collect::<Vec<_>>(),
        vec![AssetAction::Emitted, AssetAction::Updated]
    );
    let asset = assets.get_asset("dest.txt").unwrap();
    assert_eq!(asset.source.bytes(), b"second");
    assert!(asset.info.copied);
    fixture.assert_file_content("file.txt", "second");
}

#[tokio::test]
async fn scenario_e_panicking_transform() {
    let fixture = Fixture::new();
    let (assets, report) = run(
        &fixture,
        vec![
            Pattern::new("file.txt").transform(transform_fn("throws", |_c: Vec<u8>, _| async move {
                if true {
                    std::panic::panic_any(());
                }
                Ok(Vec::new())
            })),
            Pattern::new("noextension"),
        ],
    )
    .await;

    assert_eq!(assets.names(), vec!["noextension"]);
    assert_eq!(report.errors.len(), 1);
    assert!(matches!(report.errors[0].error, Error::Transform { .. }));
}

// ============================================================================
// Testable properties
// ============================================================================

#[tokio::test]
async fn idempotent_with_disk_cache() {
    let fixture = Fixture::new();
    let cache = tempfile::TempDir::new().unwrap();
    let counting = Arc::new(CountingFs::new(Arc::new(NativeFs)));
    let host = Host::new(fixture.root(), counting.clone())
        .with_cache(Arc::new(DiskStore::new(cache.path())))
        .with_snapshotter(Arc::new(FsSnapshotter::new(Arc::new(NativeFs))));

    let transforms = Arc::new(AtomicUsize::new(0));
    let calls = transforms.clone();
    let plugin = CopyPlugin::new(
        vec![
            Pattern::new("directory").to("out"),
            Pattern::new("file.txt")
                .to("[name].[contenthash:8].[ext]")
                .cache(CacheSetting::Enabled)
                .transform(transform_fn("append-v1", move |mut c: Vec<u8>, _| {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        c.extend_from_slice(b"!");
                        Ok(c)
                    }
                })),
        ],
        PluginOptions::default(),
    )
    .unwrap();

    let mut first = Assets::new();
    assert!(plugin.run(&host, &mut first).await.is_success());
    let reads = counting.reads();

    let mut second = Assets::new();
    assert!(plugin.run(&host, &mut second).await.is_success());

    assert_eq!(counting.reads(), reads);
    assert_eq!(transforms.load(Ordering::SeqCst), 1);
    assert_eq!(second.names(), first.names());
    let transformed = second
        .iter()
        .find(|a| a.name.starts_with("file."))
        .unwrap();
    assert_eq!(transformed.source.bytes(), b"new!");
}

#[tokio::test]
async fn modified_source_invalidates_the_cache() {
    let fixture = Fixture::new();
    let cache = tempfile::TempDir::new().unwrap();
    let host = Host::native(fixture.root())
        .with_cache(Arc::new(DiskStore::new(cache.path())))
        .with_snapshotter(Arc::new(FsSnapshotter::new(Arc::new(NativeFs))));
    let plugin = CopyPlugin::new(vec![Pattern::new("file.txt")], PluginOptions::default()).unwrap();

    let mut first = Assets::new();
    plugin.run(&host, &mut first).await;

    fixture.write("file.txt", "changed content");
    let mut second = Assets::new();
    plugin.run(&host, &mut second).await;

    assert_eq!(
        second.get_asset("file.txt").unwrap().source.bytes(),
        b"changed content"
    );
}

#[tokio::test]
async fn classification_matches_the_disk() {
    let fixture = Fixture::new();
    let host = Host::native(fixture.root());

    for (from, expected) in [
        ("file.txt", Some(FromKind::File)),
        ("directory", Some(FromKind::Dir)),
        ("directory/nested", Some(FromKind::Dir)),
        ("directory/**/*", None),
    ] {
        let resolved = copy_core::normalize::normalize(0, &Pattern::new(from), &host).await;
        assert_eq!(resolved.from_kind, expected, "classification of '{from}'");
    }
}

// ============================================================================
// Pattern features
// ============================================================================

#[tokio::test]
async fn directory_copy_includes_dotfiles() {
    let fixture = Fixture::new();
    let (assets, _) = run(&fixture, vec![Pattern::new("directory")]).await;

    assert_eq!(
        assets.names(),
        vec![
            ".dottedfile",
            "directoryfile.txt",
            "nested/deep-nested/deepnested.txt",
            "nested/nestedfile.txt",
        ]
    );
}

#[tokio::test]
async fn glob_skips_dotfiles_unless_asked() {
    let fixture = Fixture::new();
    let (assets, _) = run(&fixture, vec![Pattern::new("directory/*")]).await;
    assert_eq!(assets.names(), vec!["directory/directoryfile.txt"]);

    let dotted = Pattern::from_source(Source::Glob(GlobSpec {
        pattern: "directory/*".into(),
        dot: Some(true),
    }));
    let (assets, _) = run(&fixture, vec![dotted]).await;
    assert_eq!(
        assets.names(),
        vec!["directory/.dottedfile", "directory/directoryfile.txt"]
    );
}

#[tokio::test]
async fn ignore_lists_are_merged() {
    let fixture = Fixture::new();
    let options = PluginOptions {
        ignore: vec!["**/deep-nested/**".into()],
        ..PluginOptions::default()
    };
    let (assets, _) = run_with(
        &fixture,
        vec![
            Pattern::new("directory")
                .glob_ignore("**/.dottedfile")
                .ignore("directoryfile.txt"),
        ],
        options,
    )
    .await;

    assert_eq!(assets.names(), vec!["nested/nestedfile.txt"]);
}

#[tokio::test]
async fn flatten_and_context() {
    let fixture = Fixture::new();
    let (assets, _) = run(
        &fixture,
        vec![
            Pattern::new("nested/**/*.txt")
                .context("directory")
                .to("flat")
                .flatten(true),
        ],
    )
    .await;

    assert_eq!(
        assets.names(),
        vec!["flat/deepnested.txt", "flat/nestedfile.txt"]
    );
}

#[tokio::test]
async fn absolute_from_is_used_verbatim() {
    let fixture = Fixture::new();
    let from = fixture.path("directory/directoryfile.txt");
    let (assets, report) = run(
        &fixture,
        vec![Pattern::new(from.to_string_lossy().into_owned()).to("abs/")],
    )
    .await;

    assert!(report.is_success());
    assert_eq!(assets.names(), vec!["abs/directoryfile.txt"]);
}

#[tokio::test]
async fn absolute_to_needs_the_output_path() {
    let fixture = Fixture::new();
    let output = fixture.path("dist");
    let pattern = Pattern::new("file.txt").to(output.join("copied.txt").to_string_lossy().into_owned());

    let (_, report) = run(&fixture, vec![pattern.clone()]).await;
    assert!(matches!(
        report.errors[0].error,
        Error::UndefinedOutputPath { .. }
    ));

    let host = Host::native(fixture.root()).with_output_path(&output);
    let plugin = CopyPlugin::new(vec![pattern], PluginOptions::default()).unwrap();
    let mut assets = Assets::new();
    plugin.run(&host, &mut assets).await;
    assert_eq!(assets.names(), vec!["copied.txt"]);
}

#[tokio::test]
async fn metacharacter_directories_under_both_escape_policies() {
    let fixture = Fixture::new();
    for escape in [EscapePolicy::Backslash, EscapePolicy::CharacterClass] {
        let options = PluginOptions {
            escape,
            ..PluginOptions::default()
        };
        let (assets, report) = run_with(
            &fixture,
            vec![Pattern::new("dir (86)").to("86"), Pattern::new("[!]").to("bang")],
            options,
        )
        .await;

        assert!(report.is_success(), "{escape:?}: {:?}", report.errors);
        assert_eq!(
            assets.names(),
            vec![
                "86/file.txt",
                "86/nesteddir/deepnesteddir/deepnesteddir.txt",
                "86/nesteddir/nestedfile.txt",
                "bang/hello.txt",
            ],
            "{escape:?}"
        );
    }
}

#[tokio::test]
async fn templates_with_capture_groups_and_folders() {
    let fixture = Fixture::new();
    let (assets, _) = run(
        &fixture,
        vec![
            Pattern::new("directory/**/*.txt")
                .to("[1]/[folder]-[name].[ext]")
                .test(Regex::new(r"(directory)").unwrap()),
        ],
    )
    .await;

    assert_eq!(
        assets.names(),
        vec![
            "directory/deep-nested-deepnested.txt",
            "directory/directory-directoryfile.txt",
            "directory/nested-nestedfile.txt",
        ]
    );
}

#[tokio::test]
async fn no_error_on_missing_is_silent() {
    let fixture = Fixture::new();
    let (assets, report) = run(
        &fixture,
        vec![Pattern::new("nothing/**/*").no_error_on_missing(true)],
    )
    .await;

    assert!(assets.is_empty());
    assert!(report.is_success());
}

#[tokio::test]
async fn dependencies_are_reported() {
    let fixture = Fixture::new();
    let host = Host::native(fixture.root());
    let plugin = CopyPlugin::new(
        vec![Pattern::new("file.txt"), Pattern::new("directory/nested/*.txt")],
        PluginOptions::default(),
    )
    .unwrap();
    let mut assets = Assets::new();
    plugin.run(&host, &mut assets).await;

    let files = host.dependencies.file_dependencies();
    assert!(files.contains(&fixture.path("file.txt")));
    assert!(files.contains(&fixture.path("directory/nested/nestedfile.txt")));
    assert_eq!(
        host.dependencies.context_dependencies(),
        vec![fixture.path("directory/nested")]
    );
}
