use std::io::Write;

use reldigest_core::config::AppConfig;

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[model]
provider = "gemini"
model_id = "gemini-2.0-flash"
api_key = "test-key"
max_tokens = 4096
temperature = 0.5

[workflow]
step_timeout_secs = 60
max_internal_steps = 5
report_window_days = 14

[[services]]
id = "cline"
name = "Cline"
url = "https://github.com/cline/cline/releases"

[[services]]
id = "roo"
name = "Roo Code"
url = "https://github.com/RooVetGit/Roo-Code/releases"

[cron]
schedule = "0 0 9 * * Mon *"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.model.provider, "gemini");
    assert_eq!(config.model.model_id, "gemini-2.0-flash");
    assert_eq!(config.model.api_key, Some("test-key".to_string()));
    assert_eq!(config.model.max_tokens, 4096);

    assert_eq!(config.workflow.step_timeout_secs, 60);
    assert_eq!(config.workflow.max_internal_steps, 5);
    assert_eq!(config.workflow.report_window_days, 14);

    assert_eq!(config.services.len(), 2);
    assert_eq!(config.services[0].id, "cline");
    assert_eq!(config.services[1].name, "Roo Code");

    let cron = config.cron.expect("cron present");
    assert_eq!(cron.schedule, "0 0 9 * * Mon *");
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("RELDIGEST_TEST_API_KEY", "expanded-key-value");

    let toml_content = r#"
[model]
model_id = "gemini-2.0-flash"
api_key = "${RELDIGEST_TEST_API_KEY}"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.model.api_key, Some("expanded-key-value".to_string()));

    std::env::remove_var("RELDIGEST_TEST_API_KEY");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let toml_content = r#"
[model]
model_id = "gemini-2.0-flash"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.workflow.step_timeout_secs, 120);
    assert_eq!(config.workflow.max_internal_steps, 10);
    assert_eq!(config.workflow.report_window_days, 7);
    assert!(config.cron.is_none());

    // Default registry: the known services, in report order.
    assert_eq!(config.services.len(), 2);
    assert_eq!(config.services[0].id, "releaseFetchCline");
    assert_eq!(config.services[1].id, "releaseFetchRooCode");
}
