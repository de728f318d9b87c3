use super::*;
use skillmgr_core::{
    DependencyKind, Locality, PackageIdentity, RevisionSelector, SkillError, SkillResult,
    TransportStage,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::git_ops::{derive_snapshot_id_from_full_git_sha, parse_ls_remote_head};

#[test]
fn source_store_add_rejects_duplicate_name() {
    let root = test_registry_root();
    let store = SkillSourceStore::new(&root);

    store
        .add_source(source_record("official", 10))
        .expect("must add source");
    let err = store
        .add_source(source_record("official", 5))
        .expect_err("must reject duplicate source name");
    assert!(err.to_string().contains("already exists"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn source_store_add_rejects_invalid_names() {
    let root = test_registry_root();
    let store = SkillSourceStore::new(&root);

    let too_long = "a".repeat(65);
    for name in ["bad name", "-bad", "_bad", "Upper", too_long.as_str()] {
        let err = store
            .add_source(source_record(name, 10))
            .expect_err("must reject invalid source name");
        assert!(
            err.to_string().contains("invalid source name"),
            "unexpected error for '{name}': {err}"
        );
    }

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn source_store_add_rejects_empty_location() {
    let root = test_registry_root();
    let store = SkillSourceStore::new(&root);

    let mut record = source_record("official", 1);
    record.location = "  ".to_string();
    store
        .add_source(record)
        .expect_err("must reject empty location");

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn source_store_list_sorts_by_priority_then_name() {
    let root = test_registry_root();
    let store = SkillSourceStore::new(&root);

    store
        .add_source(source_record("zeta", 10))
        .expect("must add source");
    store
        .add_source(source_record("alpha", 1))
        .expect("must add source");
    store
        .add_source(source_record("beta", 10))
        .expect("must add source");

    let listed = store.list_sources().expect("must list sources");
    let names: Vec<&str> = listed.iter().map(|record| record.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta", "zeta"]);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn source_store_rejects_unsupported_state_version() {
    let root = test_registry_root();
    fs::create_dir_all(&root).expect("must create root");
    fs::write(root.join("sources.toml"), "version = 7\n").expect("must write state");

    let err = SkillSourceStore::new(&root)
        .list_sources()
        .expect_err("must reject unknown version");
    assert!(format!("{err:#}").contains("unsupported source state version"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn source_store_remove_purges_cache_when_requested() {
    let root = test_registry_root();
    let fixture = filesystem_source_fixture(&[("weather", "mycroftai")]);
    let store = SkillSourceStore::new(&root);
    store
        .add_source(filesystem_source_record("local", &fixture, 1))
        .expect("must add source");
    store.update_sources(&[]).expect("must update sources");
    assert!(root.join("cache").join("local").join("snapshot.json").exists());

    store
        .remove_source("local", true)
        .expect("must remove source");
    assert!(!root.join("cache").join("local").exists());
    assert!(store.list_sources().expect("must list").is_empty());

    let err = store
        .remove_source("local", false)
        .expect_err("must fail for unknown source");
    assert!(err.to_string().contains("not found"));

    let _ = fs::remove_dir_all(&root);
    let _ = fs::remove_dir_all(&fixture);
}

#[test]
fn update_filesystem_source_reports_updated_then_up_to_date() {
    let root = test_registry_root();
    let fixture = filesystem_source_fixture(&[("weather", "mycroftai"), ("joke", "someone")]);
    let store = SkillSourceStore::new(&root);
    store
        .add_source(filesystem_source_record("local", &fixture, 1))
        .expect("must add source");

    let first = store.update_sources(&[]).expect("must update");
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].status, SourceUpdateStatus::Updated);
    assert!(first[0].snapshot_id.starts_with("fs:"));

    let second = store.update_sources(&[]).expect("must update");
    assert_eq!(second[0].status, SourceUpdateStatus::UpToDate);
    assert_eq!(second[0].snapshot_id, first[0].snapshot_id);

    let states = store
        .list_sources_with_snapshot_state()
        .expect("must list states");
    match &states[0].snapshot {
        SkillSourceSnapshotState::Ready {
            snapshot_id,
            listing_count,
            ..
        } => {
            assert_eq!(snapshot_id, &first[0].snapshot_id);
            assert_eq!(*listing_count, 2);
        }
        other => panic!("expected ready snapshot, got {other:?}"),
    }

    let _ = fs::remove_dir_all(&root);
    let _ = fs::remove_dir_all(&fixture);
}

#[test]
fn update_with_mismatched_listing_name_keeps_previous_cache() {
    let root = test_registry_root();
    let fixture = filesystem_source_fixture(&[("weather", "mycroftai")]);
    let store = SkillSourceStore::new(&root);
    store
        .add_source(filesystem_source_record("local", &fixture, 1))
        .expect("must add source");
    let first = store.update_sources(&[]).expect("must update");

    fs::write(
        fixture.join("index").join("timer.toml"),
        listing_toml("alarm", "someone"),
    )
    .expect("must write mismatched listing");

    let results = store.update_sources(&[]).expect("update must report");
    assert_eq!(results[0].status, SourceUpdateStatus::Failed);
    let reason = results[0].error.as_deref().expect("failure must carry reason");
    assert!(reason.contains("source-metadata-invalid"), "{reason}");

    assert_eq!(
        read_snapshot_id(&root.join("cache").join("local")).as_deref(),
        Some(first[0].snapshot_id.as_str())
    );
    assert!(root
        .join("cache")
        .join("local")
        .join("index")
        .join("weather.toml")
        .exists());

    let _ = fs::remove_dir_all(&root);
    let _ = fs::remove_dir_all(&fixture);
}

#[test]
fn update_skips_sources_with_fresh_snapshots() {
    let root = test_registry_root();
    let fixture = filesystem_source_fixture(&[("weather", "mycroftai")]);
    let store = SkillSourceStore::new(&root);
    store
        .add_source(filesystem_source_record("local", &fixture, 1))
        .expect("must add source");
    store.update_sources(&[]).expect("must update");

    let results = store
        .update_sources_older_than(&[], 3600)
        .expect("must refresh");
    assert_eq!(results[0].status, SourceUpdateStatus::Fresh);
    assert!(results[0].snapshot_id.starts_with("fs:"));

    let _ = fs::remove_dir_all(&root);
    let _ = fs::remove_dir_all(&fixture);
}

#[test]
fn update_rejects_unknown_target_source() {
    let root = test_registry_root();
    let store = SkillSourceStore::new(&root);
    store
        .add_source(source_record("official", 1))
        .expect("must add source");

    let err = store
        .update_sources(&["missing".to_string()])
        .expect_err("must reject unknown source");
    assert!(err.to_string().contains("source-not-found"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn configured_index_prefers_higher_priority_source_for_duplicate_names() {
    let root = test_registry_root();
    write_ready_snapshot_cache(&root, "primary", &[("weather", "mycroftai")]);
    write_ready_snapshot_cache(&root, "mirror", &[("weather", "someone"), ("joke", "someone")]);
    write_sources_file(&root, &[("primary", 1), ("mirror", 5)]);

    let index = ConfiguredListingIndex::open(&root).expect("must open index");
    assert_eq!(index.source_names(), vec!["primary", "mirror"]);
    let listings = index.listings().expect("must load listings");
    let pairs: Vec<(&str, &str)> = listings
        .iter()
        .map(|listing| (listing.name.as_str(), listing.author.as_str()))
        .collect();
    assert_eq!(pairs, vec![("joke", "someone"), ("weather", "mycroftai")]);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn configured_index_fails_when_no_ready_snapshot_exists() {
    let root = test_registry_root();
    write_sources_file(&root, &[("official", 1)]);

    let err = ConfiguredListingIndex::open(&root).expect_err("must fail without snapshots");
    assert!(err.to_string().contains("no ready snapshot"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn configured_index_is_empty_without_sources_file() {
    let root = test_registry_root();

    let index = ConfiguredListingIndex::open(&root).expect("must open index");
    assert!(index.listings().expect("must list").is_empty());
}

#[test]
fn ls_remote_head_parsing() {
    let stdout = "0123456789abcdef0123456789abcdef01234567\tHEAD\n\
                  fedcba9876543210fedcba9876543210fedcba98\trefs/heads/main\n";
    assert_eq!(
        parse_ls_remote_head(stdout).expect("must find HEAD"),
        "0123456789abcdef0123456789abcdef01234567"
    );
    parse_ls_remote_head("fedcba98\trefs/heads/main\n").expect_err("must require HEAD");
    parse_ls_remote_head("zzzzzzzz\tHEAD\n").expect_err("must require hex sha");
}

#[test]
fn git_snapshot_id_uses_sixteen_hex_characters() {
    assert_eq!(
        derive_snapshot_id_from_full_git_sha("0123456789abcdef0123456789abcdef01234567\n")
            .expect("must derive"),
        "git:0123456789abcdef"
    );
    derive_snapshot_id_from_full_git_sha("abc").expect_err("short sha must fail");
}

#[test]
fn handle_locality_is_derived_from_the_skills_directory() {
    let root = test_registry_root();
    let handle = PackageHandle::new(
        PackageIdentity::new("weather", "mycroftai"),
        root.join("weather"),
        Arc::new(CountingTransport::default()),
    );
    assert!(!handle.is_local());

    fs::create_dir_all(root.join("weather")).expect("must create skill dir");
    assert!(handle.is_local());

    fs::remove_dir_all(root.join("weather")).expect("must remove skill dir");
    assert!(!handle.is_local());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn pre_release_handles_look_up_the_latest_revision_on_every_call() {
    let transport = Arc::new(CountingTransport::default());
    let identity = PackageIdentity::new("weather", "mycroftai").with_stable_revision("abc123");

    let stable = PackageHandle::new(identity.clone(), "/nonexistent/weather", transport.clone());
    assert_eq!(
        stable.target_revision().expect("must resolve").as_deref(),
        Some("abc123")
    );
    assert_eq!(transport.lookups.load(Ordering::SeqCst), 0);

    let latest =
        PackageHandle::new(identity, "/nonexistent/weather", transport.clone()).with_selector(None);
    assert!(latest.is_pre_release());
    assert_eq!(
        latest.target_revision().expect("must resolve").as_deref(),
        Some("rev-1")
    );
    assert_eq!(
        latest.target_revision().expect("must resolve").as_deref(),
        Some("rev-2")
    );

    latest.fetch().expect("fetch must succeed");
    assert_eq!(
        transport.fetched.lock().expect("must lock").as_slice(),
        &[Some("rev-3".to_string())]
    );
}

#[test]
fn git_transport_requires_a_remote_url() {
    let root = test_registry_root();
    let transport = GitTransport::default();
    let err = transport
        .fetch(&PackageIdentity::new("orphan", ""), &root.join("orphan"), None)
        .expect_err("must fail without url");
    assert!(matches!(
        err,
        SkillError::TransportFailure {
            stage: TransportStage::Lookup,
            ..
        }
    ));
    assert!(!root.join("orphan").exists());
}

#[test]
fn git_transport_erase_tolerates_missing_directory() {
    let root = test_registry_root();
    let skill_dir = root.join("weather");
    fs::create_dir_all(skill_dir.join("nested")).expect("must create skill dir");

    let transport = GitTransport::default();
    transport.erase(&skill_dir).expect("must erase");
    assert!(!skill_dir.exists());
    transport.erase(&skill_dir).expect("second erase must succeed");

    let _ = fs::remove_dir_all(&root);
}

#[cfg(unix)]
#[test]
fn dependency_steps_classify_runtime_and_system_failures() {
    let root = test_registry_root();
    fs::create_dir_all(&root).expect("must create skill dir");
    fs::write(root.join(RUNTIME_REQUIREMENTS_FILE), "requests\n").expect("must write");

    let failing_runtime = GitTransport::new(
        vec![
            "sh".to_string(),
            "-c".to_string(),
            "exit 3".to_string(),
            "runtime".to_string(),
        ],
        Vec::new(),
    );
    let err = failing_runtime
        .install_dependencies(&root)
        .expect_err("runtime step must fail");
    assert!(matches!(
        err,
        SkillError::DependencyFailure {
            kind: DependencyKind::Runtime,
            ..
        }
    ));

    let passing_runtime = vec!["sh".to_string(), "-c".to_string(), "exit 0".to_string()];
    fs::write(root.join(SYSTEM_REQUIREMENTS_FILE), "exit 4\n").expect("must write");
    let err = GitTransport::new(passing_runtime.clone(), Vec::new())
        .install_dependencies(&root)
        .expect_err("system step must fail");
    assert!(matches!(
        err,
        SkillError::DependencyFailure {
            kind: DependencyKind::System,
            ..
        }
    ));

    fs::write(root.join(SYSTEM_REQUIREMENTS_FILE), "exit 0\n").expect("must write");
    GitTransport::new(passing_runtime, Vec::new())
        .install_dependencies(&root)
        .expect("both steps must pass");

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn catalog_lists_source_skills_and_local_only_directories() {
    let (root, fixture, catalog) = catalog_fixture(&[("weather", "mycroftai"), ("joke", "someone")]);
    fs::create_dir_all(root.join("skills").join("weather")).expect("must create skill");
    fs::create_dir_all(root.join("skills").join("homemade")).expect("must create skill");
    fs::create_dir_all(root.join("skills").join(".cache")).expect("must create hidden dir");

    let handles = catalog.list().expect("must list catalog");
    let summary: Vec<(&str, bool)> = handles
        .iter()
        .map(|handle| (handle.name(), handle.is_local()))
        .collect();
    assert_eq!(
        summary,
        vec![("homemade", true), ("joke", false), ("weather", true)]
    );
    assert_eq!(handles[0].identity().url, None);

    let _ = fs::remove_dir_all(&root);
    let _ = fs::remove_dir_all(&fixture);
}

#[test]
fn catalog_falls_back_to_cached_listings_when_refresh_fails() {
    let (root, fixture, catalog) = catalog_fixture(&[("weather", "mycroftai")]);
    catalog.list().expect("first listing must populate cache");

    fs::remove_dir_all(&fixture).expect("must remove source");
    let handles = catalog.list().expect("cached listing must be used");
    assert_eq!(handles.len(), 1);
    assert_eq!(handles[0].name(), "weather");

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn catalog_without_any_cache_is_unavailable() {
    let root = test_registry_root();
    let state_root = root.join("state").join("sources");
    let store = SkillSourceStore::new(&state_root);
    store
        .add_source(filesystem_source_record(
            "local",
            &root.join("missing-source"),
            1,
        ))
        .expect("must add source");

    let catalog = PackageCatalog::new(
        &state_root,
        root.join("skills"),
        Arc::new(CountingTransport::default()),
        0,
    );
    let err = catalog.list().expect_err("must be unavailable");
    assert!(matches!(err, SkillError::CatalogUnavailable(_)));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn catalog_resolves_exact_and_ambiguous_queries() {
    let (root, fixture, catalog) = catalog_fixture(&[
        ("weather", "mycroftai"),
        ("daily-news-author1", "author1"),
        ("daily-news-author2", "author2"),
    ]);

    let handle = catalog.resolve("weather").expect("must resolve");
    assert_eq!(handle.name(), "weather");

    let err = catalog.resolve("news").expect_err("must be ambiguous");
    assert_eq!(
        err,
        SkillError::Ambiguous(vec![
            "daily-news-author1".to_string(),
            "daily-news-author2".to_string()
        ])
    );

    let handle = catalog
        .resolve_among(
            "author2",
            &["daily-news-author1".to_string(), "daily-news-author2".to_string()],
        )
        .expect("narrowing must resolve");
    assert_eq!(handle.name(), "daily-news-author2");

    let err = catalog.resolve("calendar").expect_err("must not resolve");
    assert_eq!(err, SkillError::NotFound("calendar".to_string()));

    let _ = fs::remove_dir_all(&root);
    let _ = fs::remove_dir_all(&fixture);
}

#[test]
fn catalog_locality_filter_narrows_ambiguous_candidates() {
    let (root, fixture, catalog) = catalog_fixture(&[
        ("daily-news-author1", "author1"),
        ("daily-news-author2", "author2"),
    ]);
    fs::create_dir_all(root.join("skills").join("daily-news-author1")).expect("must install");

    let local = catalog
        .resolve_with_locality("news", Some(Locality::LocalOnly))
        .expect("local filter must leave one");
    assert_eq!(local.name(), "daily-news-author1");

    let remote = catalog
        .resolve_with_locality("news", Some(Locality::RemoteOnly))
        .expect("remote filter must leave one");
    assert_eq!(remote.name(), "daily-news-author2");

    fs::create_dir_all(root.join("skills").join("daily-news-author2")).expect("must install");
    let err = catalog
        .resolve_with_locality("news", Some(Locality::RemoteOnly))
        .expect_err("nothing remote remains");
    assert_eq!(err, SkillError::NotFound("news".to_string()));

    let _ = fs::remove_dir_all(&root);
    let _ = fs::remove_dir_all(&fixture);
}

#[test]
fn catalog_reports_too_many_matches_at_ten_candidates() {
    let skills: Vec<(String, String)> = (0..10)
        .map(|index| (format!("news-feed-{index}"), format!("author{index}")))
        .collect();
    let borrowed: Vec<(&str, &str)> = skills
        .iter()
        .map(|(name, author)| (name.as_str(), author.as_str()))
        .collect();
    let (root, fixture, catalog) = catalog_fixture(&borrowed);

    let err = catalog
        .resolve_with_locality("news", Some(Locality::RemoteOnly))
        .expect_err("must refuse to prompt");
    assert_eq!(err, SkillError::TooManyMatches(10));

    let _ = fs::remove_dir_all(&root);
    let _ = fs::remove_dir_all(&fixture);
}

#[test]
fn catalog_handles_carry_the_stable_selector() {
    let (root, fixture, catalog) = catalog_fixture(&[("weather", "mycroftai")]);

    let handle = catalog.resolve("weather").expect("must resolve");
    assert_eq!(handle.selector(), Some(RevisionSelector::Stable));
    assert_eq!(handle.skill_dir(), root.join("skills").join("weather"));

    let _ = fs::remove_dir_all(&root);
    let _ = fs::remove_dir_all(&fixture);
}

#[derive(Default)]
struct CountingTransport {
    lookups: AtomicUsize,
    fetched: std::sync::Mutex<Vec<Option<String>>>,
}

impl Transport for CountingTransport {
    fn latest_revision(&self, _identity: &PackageIdentity) -> SkillResult<String> {
        let count = self.lookups.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("rev-{count}"))
    }

    fn fetch(
        &self,
        _identity: &PackageIdentity,
        _destination: &Path,
        revision: Option<&str>,
    ) -> SkillResult<()> {
        self.fetched
            .lock()
            .expect("must lock")
            .push(revision.map(str::to_string));
        Ok(())
    }

    fn update(
        &self,
        _identity: &PackageIdentity,
        _skill_dir: &Path,
        _revision: Option<&str>,
    ) -> SkillResult<()> {
        Ok(())
    }

    fn erase(&self, _skill_dir: &Path) -> SkillResult<()> {
        Ok(())
    }
}

fn catalog_fixture(skills: &[(&str, &str)]) -> (PathBuf, PathBuf, PackageCatalog) {
    let root = test_registry_root();
    let fixture = filesystem_source_fixture(skills);
    let state_root = root.join("state").join("sources");
    SkillSourceStore::new(&state_root)
        .add_source(filesystem_source_record("local", &fixture, 1))
        .expect("must add source");

    let catalog = PackageCatalog::new(
        &state_root,
        root.join("skills"),
        Arc::new(CountingTransport::default()),
        0,
    );
    (root, fixture, catalog)
}

fn source_record(name: &str, priority: u32) -> SkillSourceRecord {
    SkillSourceRecord {
        name: name.to_string(),
        kind: SkillSourceKind::Git,
        location: format!("https://example.com/{name}.git"),
        enabled: true,
        priority,
    }
}

fn filesystem_source_record(name: &str, location: &Path, priority: u32) -> SkillSourceRecord {
    SkillSourceRecord {
        name: name.to_string(),
        kind: SkillSourceKind::Filesystem,
        location: location.to_string_lossy().to_string(),
        enabled: true,
        priority,
    }
}

fn listing_toml(name: &str, author: &str) -> String {
    format!(
        "name = \"{name}\"\nauthor = \"{author}\"\nurl = \"https://example.com/{author}/{name}.git\"\n"
    )
}

fn filesystem_source_fixture(skills: &[(&str, &str)]) -> PathBuf {
    let root = test_registry_root();
    let index_dir = root.join("index");
    fs::create_dir_all(&index_dir).expect("must create index dir");
    for (name, author) in skills {
        fs::write(
            index_dir.join(format!("{name}.toml")),
            listing_toml(name, author),
        )
        .expect("must write listing");
    }
    root
}

fn write_ready_snapshot_cache(state_root: &Path, source_name: &str, skills: &[(&str, &str)]) {
    let cache_root = state_root.join("cache").join(source_name);
    let index_dir = cache_root.join("index");
    fs::create_dir_all(&index_dir).expect("must create index directory in cache");
    for (name, author) in skills {
        fs::write(
            index_dir.join(format!("{name}.toml")),
            listing_toml(name, author),
        )
        .expect("must write cached listing");
    }

    let snapshot = serde_json::json!({
        "version": 1,
        "source": source_name,
        "snapshot_id": format!("fs:{source_name}"),
        "updated_at_unix": 1,
        "listing_count": skills.len(),
        "status": "ready"
    });
    fs::write(
        cache_root.join("snapshot.json"),
        serde_json::to_string_pretty(&snapshot).expect("must serialize snapshot"),
    )
    .expect("must write snapshot metadata");
}

fn write_sources_file(state_root: &Path, sources: &[(&str, u32)]) {
    fs::create_dir_all(state_root).expect("must create state root");
    let mut content = String::from("version = 1\n");
    for (name, priority) in sources {
        content.push_str(&format!(
            "\n[[sources]]\nname = \"{name}\"\nkind = \"filesystem\"\nlocation = \"/unused/{name}\"\npriority = {priority}\n"
        ));
    }
    fs::write(state_root.join("sources.toml"), content).expect("must write sources file");
}

static TEST_REGISTRY_ROOT_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_registry_root() -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let counter = TEST_REGISTRY_ROOT_COUNTER.fetch_add(1, Ordering::SeqCst);
    path.push(format!(
        "skillmgr-registry-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        counter
    ));
    path
}
