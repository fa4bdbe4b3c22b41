//! Integration tests for command-level operations: init, import and
//! legacy profile conversion.

use serde_json::{Value, json};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use teamcfg::config::{Layer, PathResolver};
use teamcfg::error::{ConfigError, ErrorKind, Result};
use teamcfg::fetch::Fetcher;
use teamcfg::prompt::{NoPrompter, ScriptedPrompter};
use teamcfg::service::{ConfigService, ImportOptions, InitOptions, InitStatus};
use teamcfg::vault::{CredentialStore, MemoryStore, SECURE_ACCOUNT, SecureVault};
use tempfile::TempDir;

/// Serves fixed bodies by URL; anything else is a 404.
#[derive(Default)]
struct StubFetcher {
    bodies: HashMap<String, String>,
}

impl StubFetcher {
    fn serve(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }
}

impl Fetcher for StubFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        match self.bodies.get(url) {
            Some(body) => Ok(body.as_bytes().to_vec()),
            None => Err(ConfigError::fetch(url, Some(404), "HTTP 404")),
        }
    }
}

struct Sandbox {
    _temp: TempDir,
    project: PathBuf,
    home: PathBuf,
    store: Arc<MemoryStore>,
}

impl Sandbox {
    fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let project = temp.path().join("project");
        let home = temp.path().join("home");
        fs::create_dir_all(&project).unwrap();
        fs::create_dir_all(&home).unwrap();
        Self {
            _temp: temp,
            project,
            home,
            store: Arc::new(MemoryStore::new()),
        }
    }

    fn service_with(&self, fetcher: StubFetcher) -> ConfigService {
        let resolver = PathResolver::new("app", &self.project, &self.home);
        let vault = SecureVault::new(self.store.clone(), "app");
        ConfigService::open(resolver, vault, Box::new(fetcher)).expect("Failed to open service")
    }

    fn service(&self) -> ConfigService {
        self.service_with(StubFetcher::default())
    }

    fn write_legacy(&self, rel: &str, text: &str) {
        let path = self.home.join("profiles").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_init_twice_leaves_file_unchanged() {
    let sandbox = Sandbox::new();
    let opts = InitOptions {
        target: Layer::Project,
        prompt: false,
        ..Default::default()
    };

    let first = sandbox.service().init(opts, &mut NoPrompter).unwrap();
    assert_eq!(first.status, InitStatus::Created);
    let config = sandbox.project.join("app.config.json");
    let before = fs::read(&config).unwrap();

    let second = sandbox.service().init(opts, &mut NoPrompter).unwrap();
    assert_eq!(second.status, InitStatus::Skipped);
    assert_eq!(second.path, first.path);
    assert_eq!(fs::read(&config).unwrap(), before);
}

#[test]
fn test_init_overwrite_replaces_content() {
    let sandbox = Sandbox::new();
    let config = sandbox.project.join("app.config.json");
    fs::write(&config, r#"{"profiles": {"old": {"properties": {"a": 1}}}}"#).unwrap();

    let outcome = sandbox
        .service()
        .init(
            InitOptions {
                target: Layer::Project,
                prompt: false,
                overwrite: true,
                ..Default::default()
            },
            &mut NoPrompter,
        )
        .unwrap();
    assert_eq!(outcome.status, InitStatus::Overwritten);

    let written = read_json(&config);
    assert!(written["profiles"].get("old").is_none());
    assert_eq!(written["defaults"], json!({"base": "base"}));
    assert_eq!(written["$schema"], json!("./app.schema.json"));
    assert!(sandbox.project.join("app.schema.json").is_file());
}

#[test]
fn test_import_404_writes_nothing() {
    let sandbox = Sandbox::new();
    let mut service = sandbox.service();

    let err = service
        .import(&ImportOptions {
            location: "https://example.com/missing/app.config.json".to_string(),
            target: Layer::Project,
            overwrite: false,
        })
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RemoteFetchFailure);
    assert!(matches!(err, ConfigError::RemoteFetchFailure { status: Some(404), .. }));
    assert!(!sandbox.project.join("app.config.json").exists());
    assert!(!sandbox.project.join("app.schema.json").exists());
}

#[test]
fn test_import_missing_schema_writes_nothing() {
    let sandbox = Sandbox::new();
    let fetcher = StubFetcher::default().serve(
        "https://example.com/team/app.config.json",
        r#"{"$schema": "./app.schema.json", "profiles": {}}"#,
    );
    let mut service = sandbox.service_with(fetcher);

    let err = service
        .import(&ImportOptions {
            location: "https://example.com/team/app.config.json".to_string(),
            target: Layer::Project,
            overwrite: false,
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteFetchFailure);
    assert!(!sandbox.project.join("app.config.json").exists());
}

#[test]
fn test_import_non_object_body_writes_nothing() {
    let sandbox = Sandbox::new();
    let fetcher = StubFetcher::default().serve("https://example.com/team/app.config.json", "[1,2]");
    let mut service = sandbox.service_with(fetcher);

    let err = service
        .import(&ImportOptions {
            location: "https://example.com/team/app.config.json".to_string(),
            target: Layer::Project,
            overwrite: false,
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
    assert!(!sandbox.project.join("app.config.json").exists());
}

#[test]
fn test_import_fetches_config_and_relative_schema() {
    let sandbox = Sandbox::new();
    let fetcher = StubFetcher::default()
        .serve(
            "https://example.com/team/app.config.json",
            r#"{"$schema": "./app.schema.json", "profiles": {"lpar": {"type": "base", "properties": {"host": "lpar.example.com"}}}, "defaults": {"base": "lpar"}}"#,
        )
        .serve("https://example.com/team/app.schema.json", r#"{"type": "object"}"#);
    let mut service = sandbox.service_with(fetcher);

    let outcome = service
        .import(&ImportOptions {
            location: "https://example.com/team/app.config.json".to_string(),
            target: Layer::Project,
            overwrite: false,
        })
        .unwrap();

    assert!(outcome.imported);
    assert_eq!(outcome.schema_path, Some(sandbox.project.join("app.schema.json")));
    assert_eq!(read_json(&sandbox.project.join("app.schema.json")), json!({"type": "object"}));
    let config = read_json(&sandbox.project.join("app.config.json"));
    assert_eq!(config["profiles"]["lpar"]["properties"]["host"], json!("lpar.example.com"));
    assert_eq!(
        service.get("profiles.lpar.properties.host", false),
        Some(json!("lpar.example.com"))
    );
}

#[test]
fn test_import_local_file() {
    let sandbox = Sandbox::new();
    let shared = sandbox.home.join("shared");
    fs::create_dir_all(&shared).unwrap();
    fs::write(shared.join("team.config.json"), r#"{"profiles": {"a": {"properties": {"x": 1}}}}"#).unwrap();

    let mut service = sandbox.service();
    service
        .import(&ImportOptions {
            location: shared.join("team.config.json").display().to_string(),
            target: Layer::ProjectUser,
            overwrite: false,
        })
        .unwrap();

    let config = read_json(&sandbox.project.join("app.config.user.json"));
    assert_eq!(config["profiles"]["a"]["properties"]["x"], json!(1));
}

#[test]
fn test_convert_legacy_profiles() {
    let sandbox = Sandbox::new();
    sandbox.write_legacy(
        "secured/prod.yaml",
        "host: prod.example.com\nport: 443\npassword: managed by app\n",
    );
    sandbox.write_legacy("secured/secured_meta.yaml", "defaultProfile: prod\n");
    sandbox.write_legacy("base/shared.yaml", "hostname: mainframe.example.com\nrejectUnauthorized: false\n");
    sandbox.write_legacy("base/base_meta.yaml", "defaultProfile: shared\n");
    sandbox
        .store
        .set_secret("app", "secured_prod_password", "\"pr0d\"")
        .unwrap();

    let mut service = sandbox.service();
    let report = service.convert_profiles(false, false, &mut NoPrompter).unwrap();

    assert_eq!(report.profiles_found, 2);
    assert_eq!(report.converted["secured"], vec!["prod"]);
    assert_eq!(report.converted["base"], vec!["shared"]);
    assert!(report.messages.iter().any(|m| m == "Converted base profiles: shared"));

    let global = read_json(&sandbox.home.join("app.config.json"));
    assert_eq!(
        global["defaults"],
        json!({"secured": "secured_prod", "base": "base_shared"})
    );
    assert_eq!(global["profiles"].as_object().unwrap().len(), 2);
    assert_eq!(global["autoStore"], json!(true));
    assert_eq!(
        global["profiles"]["base_shared"]["properties"]["host"],
        json!("mainframe.example.com")
    );
    assert_eq!(global["profiles"]["secured_prod"]["secure"], json!(["password"]));
    assert!(global["profiles"]["secured_prod"]["properties"].get("password").is_none());

    assert_eq!(
        service.get("profiles.secured_prod.properties.password", true),
        Some(json!("pr0d"))
    );
    assert_eq!(sandbox.store.get_secret("app", "secured_prod_password").unwrap(), None);
    assert!(!sandbox.home.join("profiles").exists());
    assert!(sandbox.home.join("profiles-old/secured/prod.yaml").is_file());

    let rerun = sandbox.service().convert_profiles(false, false, &mut NoPrompter).unwrap();
    assert_eq!(rerun.profiles_found, 0);
    assert!(rerun.converted.is_empty());
}

#[test]
fn test_convert_declined_leaves_everything_in_place() {
    let sandbox = Sandbox::new();
    sandbox.write_legacy("base/one.yaml", "host: one\n");
    let config = sandbox.home.join("app.config.json");
    fs::write(&config, r#"{"profiles": {"mine": {"properties": {"host": "keep"}}}}"#).unwrap();
    let before = fs::read(&config).unwrap();

    let mut prompter = ScriptedPrompter::new().confirm_with(false);
    let err = sandbox
        .service()
        .convert_profiles(false, false, &mut prompter)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(prompter.asked.len(), 1);
    assert_eq!(fs::read(&config).unwrap(), before);
    assert!(sandbox.home.join("profiles/base/one.yaml").is_file());
}

#[test]
fn test_convert_rolls_back_new_layer_when_rename_fails() {
    let sandbox = Sandbox::new();
    sandbox.write_legacy("base/one.yaml", "host: one\npassword: managed by app\n");
    sandbox.store.set_secret("app", "base_one_password", "\"pw\"").unwrap();
    // A non-empty directory cannot be replaced by a rename.
    let blocker = sandbox.home.join("profiles-old/keep");
    fs::create_dir_all(&blocker).unwrap();

    let err = sandbox
        .service()
        .convert_profiles(false, false, &mut NoPrompter)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(!sandbox.home.join("app.config.json").exists());
    assert_eq!(sandbox.store.get_secret("app", SECURE_ACCOUNT).unwrap(), None);
    assert!(sandbox.home.join("profiles/base/one.yaml").is_file());
    assert!(blocker.is_dir());
    assert_eq!(
        sandbox.store.get_secret("app", "base_one_password").unwrap(),
        Some("\"pw\"".to_string())
    );
}

#[test]
fn test_convert_rolls_back_existing_layer_when_rename_fails() {
    let sandbox = Sandbox::new();
    sandbox.write_legacy("base/one.yaml", "host: one\n");
    let config = sandbox.home.join("app.config.json");
    fs::write(&config, r#"{"profiles": {"mine": {"properties": {"host": "keep"}}}}"#).unwrap();
    fs::create_dir_all(sandbox.home.join("profiles-old/keep")).unwrap();

    let err = sandbox
        .service()
        .convert_profiles(true, false, &mut NoPrompter)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Io);
    let restored = read_json(&config);
    assert_eq!(
        restored["profiles"],
        json!({"mine": {"properties": {"host": "keep"}}})
    );
    assert!(restored.get("autoStore").is_none());
    assert!(sandbox.home.join("profiles/base/one.yaml").is_file());
}

#[test]
fn test_convert_then_delete_old_profiles() {
    let sandbox = Sandbox::new();
    sandbox.write_legacy("base/one.yaml", "host: one\npassword: managed by app\n");
    sandbox.store.set_secret("app", "base_one_password", "\"pw\"").unwrap();

    let report = sandbox
        .service()
        .convert_profiles(true, true, &mut NoPrompter)
        .unwrap();

    assert!(report.deleted);
    assert!(!sandbox.home.join("profiles").exists());
    assert!(!sandbox.home.join("profiles-old").exists());
    assert_eq!(sandbox.store.get_secret("app", "base_one_password").unwrap(), None);
}
