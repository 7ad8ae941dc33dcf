//! End-to-end tests for the build pipeline: fixture source trees in a temp
//! directory, built into real snapshot files, verified through the query
//! layer.

use std::fs;
use std::path::Path;

use plughub_build::{BuildOptions, build};
use plughub_store_db::{DefaultVariant, PluginType, SettingKind, StoreDb};

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// A small but complete catalog: two plugin types, maintainer profiles,
/// settings inheritance, and a cross-plugin superseded-by reference that is
/// only resolvable after the whole tree has been walked.
fn write_fixture_tree(root: &Path) {
    write(
        root,
        "maintainers.yml",
        "acme:\n  name: Acme Corp\n  url: https://acme.example\n",
    );
    write(
        root,
        "extractors/tap-csv/plugin.yml",
        "description: CSV extractor\nkeywords: [csv, files]\nmaintainer: acme\ndefault_variant: acme\n",
    );
    write(
        root,
        "extractors/tap-csv/acme.yml",
        concat!(
            "repo_url: https://github.com/acme/tap-csv\n",
            "pip_url: acme-tap-csv\n",
            "capabilities: [catalog, discover]\n",
            "env_vars: TAP_CSV_PATH\n",
            "superseded_by: loaders.target-pg.acme\n",
            "settings:\n",
            "  - name: path\n",
            "  - name: delimiter\n",
            "    value: ','\n",
        ),
    );
    write(
        root,
        "extractors/tap-csv/umbrella.yml",
        concat!(
            "repo_url: https://github.com/umbrella/tap-csv\n",
            "maintainer: umbrella\n",
            "extends: acme\n",
            "settings:\n",
            "  - name: path\n",
            "    kind: file\n",
        ),
    );
    write(
        root,
        "loaders/target-pg/plugin.yml",
        "description: Postgres loader\npick_first: yes\n",
    );
    write(
        root,
        "loaders/target-pg/acme.yml",
        "repo_url: https://github.com/acme/target-pg\npin: '^2.1'\n",
    );
    write(
        root,
        "loaders/target-pg/beta.yml",
        "repo_url: https://github.com/beta/target-pg\n",
    );
}

fn build_fixture(root: &Path, db_path: &Path) -> plughub_build::BuildReport {
    build(&BuildOptions {
        source_root: root.to_owned(),
        db_path: db_path.to_owned(),
        git_ref: Some("main".into()),
    })
    .unwrap()
}

#[test]
fn test_full_build_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("src");
    write_fixture_tree(&root);
    let db_path = dir.path().join("plugins.db");

    let report = build_fixture(&root, &db_path);
    assert!(
        !report.has_errors(),
        "unexpected errors: {:?}",
        report.errors
    );
    assert_eq!(report.counts.plugins, 2);
    assert_eq!(report.counts.variants, 4);

    let db = StoreDb::open_snapshot(&db_path).unwrap();
    assert_eq!(db.get_meta("git_ref").unwrap().as_deref(), Some("main"));

    let plugins = db.list_plugins(None).unwrap();
    let names: Vec<_> = plugins.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["tap-csv", "target-pg"]);

    // Scalar shorthand coerced to a list; forward reference resolved.
    let acme = db
        .get_variant(PluginType::Extractors, "tap-csv", "acme")
        .unwrap()
        .unwrap();
    assert_eq!(acme.env_vars, vec!["TAP_CSV_PATH"]);
    assert_eq!(
        acme.superseded_by.as_deref(),
        Some("loaders.target-pg.acme")
    );
    assert_eq!(acme.pin, None);
    assert_eq!(
        acme.settings[1].value,
        Some(serde_json::Value::String(",".into()))
    );

    // Maintainer profile merged from maintainers.yml; stub created for the
    // slug that only appears inline.
    assert_eq!(
        acme.maintainer.as_ref().unwrap().name.as_deref(),
        Some("Acme Corp")
    );
    let maintainer_ids: Vec<_> = db
        .list_maintainers()
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(maintainer_ids, vec!["acme", "umbrella"]);
}

#[test]
fn test_settings_inheritance_order() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("src");
    write_fixture_tree(&root);
    let db_path = dir.path().join("plugins.db");
    build_fixture(&root, &db_path);

    let db = StoreDb::open_snapshot(&db_path).unwrap();
    let umbrella = db
        .get_variant(PluginType::Extractors, "tap-csv", "umbrella")
        .unwrap()
        .unwrap();

    // Own declaration first (with its own kind), inherited settings after,
    // never duplicated.
    let names: Vec<_> = umbrella.settings.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["path", "delimiter"]);
    assert_eq!(umbrella.settings[0].kind, SettingKind::File);
    assert_eq!(umbrella.settings[0].position, 0);
    assert_eq!(umbrella.settings[1].position, 1);
}

#[test]
fn test_default_variant_pick_first() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("src");
    write_fixture_tree(&root);
    let db_path = dir.path().join("plugins.db");
    build_fixture(&root, &db_path);

    let db = StoreDb::open_snapshot(&db_path).unwrap();
    match db
        .resolve_default_variant(PluginType::Loaders, "target-pg")
        .unwrap()
        .unwrap()
    {
        DefaultVariant::Resolved { variant, .. } => assert_eq!(variant, "acme"),
        other => panic!("expected resolved default, got {other:?}"),
    }
}

#[test]
fn test_partial_failure_tolerance() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("src");
    write_fixture_tree(&root);
    // One malformed document among many.
    write(&root, "loaders/target-pg/broken.yml", "settings: ][\n");
    let db_path = dir.path().join("plugins.db");

    let report = build_fixture(&root, &db_path);
    assert_eq!(report.errors.len(), 1);
    assert!(
        report.errors[0]
            .path
            .ends_with("loaders/target-pg/broken.yml")
    );
    assert!(report.errors[0].message.contains("parse"));

    // Everything else still made it into the snapshot.
    assert_eq!(report.counts.variants, 4);
    let db = StoreDb::open_snapshot(&db_path).unwrap();
    assert!(
        db.get_variant(PluginType::Loaders, "target-pg", "broken")
            .unwrap()
            .is_none()
    );
    assert!(
        db.get_variant(PluginType::Loaders, "target-pg", "beta")
            .unwrap()
            .is_some()
    );
}

#[test]
fn test_unresolved_superseded_by_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("src");
    write_fixture_tree(&root);
    write(
        &root,
        "extractors/tap-csv/stale.yml",
        "repo_url: https://github.com/stale/tap-csv\nsuperseded_by: ghost\n",
    );
    let db_path = dir.path().join("plugins.db");

    let report = build_fixture(&root, &db_path);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].message.contains("superseded_by"));

    // The variant survives without the dangling reference.
    let db = StoreDb::open_snapshot(&db_path).unwrap();
    let stale = db
        .get_variant(PluginType::Extractors, "tap-csv", "stale")
        .unwrap()
        .unwrap();
    assert_eq!(stale.superseded_by, None);
}

#[test]
fn test_unresolved_extends_excludes_variant() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("src");
    write_fixture_tree(&root);
    write(
        &root,
        "extractors/tap-csv/orphan.yml",
        "repo_url: https://github.com/orphan/tap-csv\nextends: ghost\n",
    );
    let db_path = dir.path().join("plugins.db");

    let report = build_fixture(&root, &db_path);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].message.contains("extends"));

    let db = StoreDb::open_snapshot(&db_path).unwrap();
    assert!(
        db.get_variant(PluginType::Extractors, "tap-csv", "orphan")
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_validation_errors_exclude_variant() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("src");
    write_fixture_tree(&root);
    write(
        &root,
        "loaders/target-pg/dodgy.yml",
        concat!(
            "repo_url: https://github.com/dodgy/target-pg\n",
            "pin: not a version\n",
            "capabilities: [teleportation]\n",
        ),
    );
    let db_path = dir.path().join("plugins.db");

    let report = build_fixture(&root, &db_path);
    let messages: Vec<_> = report.errors.iter().map(|e| e.message.as_str()).collect();
    assert!(messages.iter().any(|m| m.contains("version pin")));
    assert!(messages.iter().any(|m| m.contains("unknown capability")));

    let db = StoreDb::open_snapshot(&db_path).unwrap();
    assert!(
        db.get_variant(PluginType::Loaders, "target-pg", "dodgy")
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_variants_without_base_document() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("src");
    write_fixture_tree(&root);
    write(
        &root,
        "mappers/map-gpt/acme.yml",
        "repo_url: https://github.com/acme/map-gpt\n",
    );
    let db_path = dir.path().join("plugins.db");

    let report = build_fixture(&root, &db_path);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].message.contains("plugin.yml"));

    let db = StoreDb::open_snapshot(&db_path).unwrap();
    assert!(
        db.get_plugin(PluginType::Mappers, "map-gpt")
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_rebuild_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("src");
    write_fixture_tree(&root);

    let first = dir.path().join("first.db");
    let second = dir.path().join("second.db");
    build_fixture(&root, &first);
    build_fixture(&root, &second);

    assert_eq!(
        fs::read(&first).unwrap(),
        fs::read(&second).unwrap(),
        "two builds from unchanged sources must be byte-identical"
    );
}

#[test]
fn test_atomic_handoff() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("src");
    write_fixture_tree(&root);
    let db_path = dir.path().join("plugins.db");
    build_fixture(&root, &db_path);

    // A reader pins the snapshot it opened.
    let old = StoreDb::open_snapshot(&db_path).unwrap();
    assert_eq!(old.list_plugins(None).unwrap().len(), 2);

    write(
        &root,
        "utilities/sqlfluff/plugin.yml",
        "description: SQL linter\n",
    );
    write(
        &root,
        "utilities/sqlfluff/acme.yml",
        "repo_url: https://github.com/acme/sqlfluff\n",
    );
    build_fixture(&root, &db_path);

    // The open handle keeps serving the prior snapshot; a fresh open sees
    // only the new one.
    assert_eq!(old.list_plugins(None).unwrap().len(), 2);
    let new = StoreDb::open_snapshot(&db_path).unwrap();
    assert_eq!(new.list_plugins(None).unwrap().len(), 3);
}

#[test]
fn test_missing_source_root_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let result = build(&BuildOptions {
        source_root: dir.path().join("nowhere"),
        db_path: dir.path().join("plugins.db"),
        git_ref: None,
    });
    assert!(result.is_err());
    assert!(!dir.path().join("plugins.db").exists());
}

#[test]
fn test_malformed_maintainers_document() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("src");
    write_fixture_tree(&root);
    write(&root, "maintainers.yml", "{ not yaml ][\n");
    let db_path = dir.path().join("plugins.db");

    let report = build_fixture(&root, &db_path);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].path.ends_with("maintainers.yml"));

    // Inline references still produce stub maintainer rows.
    let db = StoreDb::open_snapshot(&db_path).unwrap();
    let ids: Vec<_> = db
        .list_maintainers()
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec!["acme", "umbrella"]);
}
