use serde_json::json;

use super::*;

#[test]
fn parse_listing() {
    let content = r#"
name = "weather"
author = "mycroftai"
url = "https://github.com/mycroftai/skill-weather"
revision = "5f1b3d8a1f2a4d0e"
description = "Forecasts and current conditions"
"#;

    let listing = SkillListing::from_toml_str(content).expect("listing must parse");
    assert_eq!(listing.name, "weather");
    assert_eq!(listing.author, "mycroftai");
    let identity = listing.identity();
    assert_eq!(identity.qualified_name(), "weather.mycroftai");
    assert_eq!(identity.stable_revision.as_deref(), Some("5f1b3d8a1f2a4d0e"));
    assert_eq!(
        identity.url.as_deref(),
        Some("https://github.com/mycroftai/skill-weather")
    );
}

#[test]
fn parse_listing_without_author_or_revision() {
    let listing = SkillListing::from_toml_str(
        r#"
name = "joke"
url = "https://example.test/joke.git"
"#,
    )
    .expect("listing must parse");
    assert!(listing.author.is_empty());
    assert!(listing.revision.is_none());
    assert_eq!(listing.identity().qualified_name(), "joke");
}

#[test]
fn parse_listing_rejects_dotted_name() {
    let err = SkillListing::from_toml_str(
        r#"
name = "weather.mycroftai"
url = "https://example.test/weather.git"
"#,
    )
    .expect_err("dotted names must be rejected");
    assert!(err.to_string().contains("invalid character"));
}

#[test]
fn parse_listing_rejects_non_hex_revision() {
    let err = SkillListing::from_toml_str(
        r#"
name = "weather"
url = "https://example.test/weather.git"
revision = "main"
"#,
    )
    .expect_err("branch names are not pinned revisions");
    assert!(err.to_string().contains("hex commit id"));
}

#[test]
fn parse_listing_rejects_empty_url() {
    let err = SkillListing::from_toml_str(
        r#"
name = "weather"
url = " "
"#,
    )
    .expect_err("empty url must be rejected");
    assert!(err.to_string().contains("empty url"));
}

#[test]
fn extract_repo_name_handles_common_url_shapes() {
    assert_eq!(
        extract_repo_name("https://github.com/someone/skill-timer.git").as_deref(),
        Some("skill-timer")
    );
    assert_eq!(
        extract_repo_name("https://github.com/someone/skill-timer/").as_deref(),
        Some("skill-timer")
    );
    assert_eq!(
        extract_repo_name("git@github.com:someone/skill-timer.git").as_deref(),
        Some("skill-timer")
    );
    assert_eq!(extract_repo_name(""), None);
}

#[test]
fn base_name_strips_author_suffix() {
    assert_eq!(base_name("weather.mycroftai"), "weather");
    assert_eq!(base_name("weather"), "weather");
    assert_eq!(base_name("  joke.someone.extra "), "joke");
}

#[test]
fn delta_entry_scope_filter_matches_device_list() {
    let scoped = DeltaEntry::for_devices("weather", &["uuid1"]);
    assert!(scoped.applies_to("uuid1"));
    assert!(!scoped.applies_to("uuid2"));

    let empty = DeltaEntry::for_devices("weather", &[]);
    assert!(empty.applies_to("uuid2"));

    let absent = DeltaEntry::new("weather");
    assert!(absent.applies_to("uuid2"));
}

#[test]
fn scoped_delta_breaks_ties_toward_removal() {
    let delta = DesiredStateDelta::new(
        vec![DeltaEntry::new("weather.mycroftai"), DeltaEntry::new("joke")],
        vec![DeltaEntry::new("weather")],
    );

    let scoped = delta.scoped("uuid1");
    assert_eq!(
        scoped.to_install.iter().collect::<Vec<_>>(),
        vec!["joke"],
        "a name in both sets must only survive in the remove set"
    );
    assert_eq!(scoped.to_remove.iter().collect::<Vec<_>>(), vec!["weather"]);
}

#[test]
fn scoped_delta_drops_entries_for_other_devices() {
    let delta = DesiredStateDelta::new(
        vec![
            DeltaEntry::for_devices("timer", &["uuid1"]),
            DeltaEntry::for_devices("alarm", &["uuid2"]),
            DeltaEntry::for_devices("joke", &[]),
        ],
        Vec::new(),
    );

    let scoped = delta.scoped("uuid2");
    assert_eq!(
        scoped.to_install.iter().collect::<Vec<_>>(),
        vec!["alarm", "joke"]
    );
    assert_eq!(scoped.out_of_scope, vec!["timer"]);
}

#[test]
fn parse_delta_entries_accepts_array_and_json_string() {
    let array = json!([
        {"name": "weather.mycroftai", "devices": ["uuid1"]},
        {"name": "joke", "devices": null},
        "timer"
    ]);
    let entries = parse_delta_entries(&array).expect("array must parse");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].devices.as_deref(), Some(&["uuid1".to_string()][..]));
    assert_eq!(entries[1].devices, None);
    assert_eq!(entries[2].name, "timer");

    let stringly = json!(r#"[{"name": "joke", "devices": []}]"#);
    let entries = parse_delta_entries(&stringly).expect("string payload must parse");
    assert_eq!(entries, vec![DeltaEntry { name: "joke".to_string(), devices: Some(Vec::new()) }]);

    assert!(parse_delta_entries(&json!(null)).expect("null is empty").is_empty());
    assert!(parse_delta_entries(&json!("")).expect("empty string is empty").is_empty());
}

#[test]
fn parse_delta_entries_rejects_scalars() {
    let err = parse_delta_entries(&json!(42)).expect_err("numbers are not delta lists");
    assert!(err.to_string().contains("must be an array"));

    let err = parse_delta_entries(&json!([true])).expect_err("booleans are not entries");
    assert!(err.to_string().contains("invalid delta entry"));
}

#[test]
fn notice_kind_mapping_distinguishes_dependency_kinds() {
    assert_eq!(
        SkillError::dependency(DependencyKind::Runtime, "pip exited 1").notice_kind(),
        NoticeKind::RuntimeRequirements
    );
    assert_eq!(
        SkillError::dependency(DependencyKind::System, "apt missing").notice_kind(),
        NoticeKind::SystemRequirements
    );
    assert_eq!(
        SkillError::transport(TransportStage::Clone, "network down").notice_kind(),
        NoticeKind::Filesystem
    );
    assert_eq!(SkillError::Cancelled.notice_kind(), NoticeKind::Cancelled);
    assert_eq!(
        SkillError::StateUnavailable("lock busy".to_string()).notice_kind(),
        NoticeKind::Other
    );
    assert_eq!(
        SkillError::Ambiguous(vec!["a".to_string(), "b".to_string()]).notice_kind(),
        NoticeKind::MultipleMatches
    );
}

#[test]
fn skill_error_subject_only_for_named_errors() {
    assert_eq!(
        SkillError::AlreadyInstalled("weather".to_string()).subject(),
        Some("weather")
    );
    assert_eq!(SkillError::TooManyMatches(12).subject(), None);
}

#[test]
fn skill_error_messages_include_stage_and_kind() {
    let err = SkillError::transport(TransportStage::Pull, "remote hung up");
    assert_eq!(err.to_string(), "pull failed: remote hung up");
    let err = SkillError::dependency(DependencyKind::System, "exit status 2");
    assert_eq!(
        err.to_string(),
        "system dependency installation failed: exit status 2"
    );
}

#[test]
fn failed_record_always_carries_a_message() {
    let record = InstallationRecord::failed(InstallOrigin::Marketplace, false, "  ", 10);
    assert_eq!(record.installation_status, InstallationStatus::Failed);
    assert_eq!(record.installed_at_epoch, 0);
    assert!(!record.last_failure_message.trim().is_empty());
}

#[test]
fn record_serializes_with_lowercase_enums() {
    let record = InstallationRecord::installed(InstallOrigin::Voice, true, 42);
    let value = serde_json::to_value(&record).expect("must serialize");
    assert_eq!(value["origin"], "voice");
    assert_eq!(value["installation_status"], "installed");
    assert_eq!(value["is_pre_release"], true);
    assert_eq!(value["installed_at_epoch"], 42);
}

#[test]
fn batch_result_correlates_by_name() {
    let mut result = BatchResult::default();
    result.push("b", BatchOutcome::Failure("boom".to_string()));
    result.push("a", BatchOutcome::Success);

    assert_eq!(result.outcome("a"), Some(&BatchOutcome::Success));
    assert_eq!(
        result.failed().collect::<Vec<_>>(),
        vec![("b", "boom")]
    );
    assert_eq!(result.succeeded().collect::<Vec<_>>(), vec!["a"]);
    assert_eq!(result.outcome("c"), None);
}

#[test]
fn revision_selector_none_means_pre_release() {
    assert!(RevisionSelector::is_pre_release(None));
    assert!(RevisionSelector::is_pre_release(Some(RevisionSelector::PreRelease)));
    assert!(!RevisionSelector::is_pre_release(Some(RevisionSelector::Stable)));
}

#[test]
fn locality_admits_matching_flag() {
    assert!(Locality::LocalOnly.admits(true));
    assert!(!Locality::LocalOnly.admits(false));
    assert!(Locality::RemoteOnly.admits(false));
}
