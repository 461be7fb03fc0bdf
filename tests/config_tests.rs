//! Integration tests for configuration loading and validation.

use sanctl::test_support::EnvGuard;
use sanctl::{ApiConfig, ConfigError};

#[tokio::test]
async fn load_merges_environment_values_over_defaults() {
    let _guard = EnvGuard::set_vars(&[
        ("SANCTL_USERNAME", "acct-user"),
        ("SANCTL_API_KEY", "secret"),
    ])
    .await;

    let config = ApiConfig::load_without_cli_args().expect("load from environment");

    assert_eq!(config.username, "acct-user");
    assert_eq!(config.api_key, "secret");
    assert_eq!(config.api_url, "https://api.storage.example.com/rest/v3");
    assert!(config.validate().is_ok());
}

#[tokio::test]
async fn load_honours_an_endpoint_override() {
    let _guard = EnvGuard::set_vars(&[
        ("SANCTL_USERNAME", "acct-user"),
        ("SANCTL_API_KEY", "secret"),
        ("SANCTL_API_URL", "https://private-endpoint.example.com/rest/v3"),
    ])
    .await;

    let config = ApiConfig::load_without_cli_args().expect("load from environment");

    assert_eq!(
        config.api_url,
        "https://private-endpoint.example.com/rest/v3"
    );
}

#[test]
fn validation_message_names_the_environment_variable() {
    let config = ApiConfig {
        api_url: String::from("https://api.storage.example.com/rest/v3"),
        username: String::from("acct-user"),
        api_key: String::new(),
        default_datacenter: None,
    };

    let err = config.validate().expect_err("empty api key");
    let ConfigError::MissingField(message) = err else {
        panic!("expected MissingField, got {err:?}");
    };
    assert!(message.contains("SANCTL_API_KEY"), "message: {message}");
    assert!(message.contains("sanctl.toml"), "message: {message}");
}
