use mech_domain::config::{AuthConfig, AuthMode, Config, ProviderConfig, ProviderKind};

#[test]
fn default_config_has_no_providers() {
    let config = Config::default();
    assert!(config.llm.providers.is_empty());
    assert!(config.agents.is_empty());
}

#[test]
fn default_mech_config_matches_spec_constants() {
    let config = Config::default();
    assert_eq!(config.mech.default_meta_frequency, 5);
    assert_eq!(config.mech.default_thought_delay_secs, 0);
    assert_eq!(config.mech.inactivity_timeout_secs, 300);
}

#[test]
fn provider_list_parses_from_toml() {
    let toml_str = r#"
[[llm.providers]]
id = "openai"
kind = "openai_compat"
base_url = "https://api.openai.com/v1"

[llm.providers.auth]
mode = "api_key"
env = "OPENAI_API_KEY"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.llm.providers.len(), 1);
    assert_eq!(config.llm.providers[0].id, "openai");
    assert_eq!(config.llm.providers[0].kind, ProviderKind::OpenaiCompat);
}

#[test]
fn explicit_provider_roundtrips_through_json() {
    let config = Config {
        llm: mech_domain::config::LlmConfig {
            providers: vec![ProviderConfig {
                id: "venice".into(),
                kind: ProviderKind::OpenaiCompat,
                base_url: "https://api.venice.ai/api/v1".into(),
                auth: AuthConfig {
                    mode: AuthMode::ApiKey,
                    env: Some("VENICE_API_KEY".into()),
                    key: None,
                },
                default_model: Some("llama-3.3-70b".into()),
                rate_limit_fallback: Default::default(),
            }],
            ..Default::default()
        },
        ..Default::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    let roundtripped: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(roundtripped.llm.providers[0].id, "venice");
    assert_eq!(
        roundtripped.llm.providers[0].default_model.as_deref(),
        Some("llama-3.3-70b")
    );
}
