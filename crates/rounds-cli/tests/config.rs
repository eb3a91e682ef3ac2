use rounds_cli::config::{
    CredentialSource, RoundsConfig, config_info, load_config_from, migrate, redact_access_key,
    save_config_to,
};

#[test]
fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config_from(&dir.path().join("config.json")).unwrap();
    assert_eq!(config, RoundsConfig::default());
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rounds").join("config.json");
    let config = RoundsConfig {
        region: "eu-west-1".to_string(),
        max_tokens: Some(2048),
        credentials: CredentialSource::Profile {
            profile_name: "teaching".to_string(),
        },
        ..RoundsConfig::default()
    };

    save_config_to(&config, &path).unwrap();
    let loaded = load_config_from(&path).unwrap();

    assert_eq!(loaded, config);
    assert!(!path.with_extension("json.tmp").exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[test]
fn unversioned_config_reads_as_current_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "region": "us-west-2",
            "model_id": "anthropic.claude-3-haiku",
            "cases_dir": "cases",
            "prompts_dir": "prompts",
            "credentials": {"type": "default_chain"}
        }"#,
    )
    .unwrap();

    let config = load_config_from(&path).unwrap();

    assert_eq!(config.config_version, 1);
    assert_eq!(config.region, "us-west-2");
    assert!((config.temperature - 0.7).abs() < 1e-6);
    assert!(!config.sessions_dir.as_os_str().is_empty());
}

#[test]
fn current_version_passes_through_unchanged() {
    let json = serde_json::json!({"config_version": 1, "region": "eu-west-1"});
    assert_eq!(migrate(json.clone(), 1).unwrap(), json);
}

#[test]
fn newer_version_on_disk_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"config_version": 2, "region": "us-east-1"}"#).unwrap();

    assert!(load_config_from(&path).is_err());
}

#[test]
fn newer_version_is_rejected() {
    let err = migrate(serde_json::json!({"config_version": 9}), 9).unwrap_err();
    assert!(err.to_string().contains("newer than this build supports"));
}

#[test]
fn info_redacts_inline_keys() {
    let config = RoundsConfig {
        credentials: CredentialSource::Inline {
            access_key_id: "AKIAABCDEFGHIJKL".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: None,
        },
        ..RoundsConfig::default()
    };

    let info = config_info(&config, std::path::Path::new("/tmp/config.json"));

    assert_eq!(info.credential_type, "inline");
    assert_eq!(info.access_key_hint.as_deref(), Some("AKIA...IJKL"));
    assert!(!serde_json::to_string(&info).unwrap().contains("secret"));
    assert_eq!(redact_access_key("short"), "****");
}
