use agent_samples_rs::config::{
    ANTHROPIC_API_KEY, AZURE_AI_SEARCH_CONNECTION_ID, AZURE_AI_SEARCH_INDEX_NAME,
    AZURE_FOUNDRY_ACCESS_TOKEN, AZURE_FOUNDRY_PROJECT_DEPLOYMENT_NAME,
    AZURE_FOUNDRY_PROJECT_ENDPOINT, AZURE_OPENAI_API_KEY, AZURE_OPENAI_DEPLOYMENT_NAME,
    AZURE_OPENAI_ENDPOINT, OPENAI_API_KEY, OPENAI_BASE_URL,
};
use agent_samples_rs::{
    AnthropicModelConfig, ConfigurationError, EnvConfig, FoundryConfig, HostedTool, OpenAiConfig,
};
use wiremock::MockServer;

fn missing(key: &str) -> ConfigurationError {
    ConfigurationError::MissingVar(key.to_string())
}

#[tokio::test]
async fn missing_api_key_fails_before_any_request() {
    let server = MockServer::start().await;
    let config = EnvConfig::from_iter([(OPENAI_BASE_URL, server.uri())]);

    let err = OpenAiConfig::from_config(&config).expect_err("must fail");
    assert_eq!(err, missing(OPENAI_API_KEY));

    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.is_empty());
}

#[test]
fn each_backend_names_its_first_missing_key() {
    let empty = EnvConfig::default();

    assert_eq!(
        OpenAiConfig::azure_from_config(&empty).expect_err("must fail"),
        missing(AZURE_OPENAI_ENDPOINT)
    );
    assert_eq!(
        FoundryConfig::from_config(&empty).expect_err("must fail"),
        missing(AZURE_FOUNDRY_PROJECT_ENDPOINT)
    );
    assert_eq!(
        AnthropicModelConfig::from_config(&empty).expect_err("must fail"),
        missing(ANTHROPIC_API_KEY)
    );
}

#[test]
fn blank_values_count_as_missing() {
    let config = EnvConfig::from_iter([
        (AZURE_OPENAI_ENDPOINT, "https://res.openai.azure.com"),
        (AZURE_OPENAI_DEPLOYMENT_NAME, "gpt-4o"),
        (AZURE_OPENAI_API_KEY, "   "),
    ]);

    assert_eq!(
        OpenAiConfig::azure_from_config(&config).expect_err("must fail"),
        missing(AZURE_OPENAI_API_KEY)
    );
}

#[test]
fn foundry_config_resolves_with_all_required_keys() {
    let config = EnvConfig::from_iter([
        (
            AZURE_FOUNDRY_PROJECT_ENDPOINT,
            "https://res.services.ai.azure.com/api/projects/demo",
        ),
        (AZURE_FOUNDRY_PROJECT_DEPLOYMENT_NAME, "gpt-4o"),
        (AZURE_FOUNDRY_ACCESS_TOKEN, "token"),
    ]);

    let resolved = FoundryConfig::from_config(&config).expect("resolves");
    assert_eq!(resolved.deployment, "gpt-4o");
}

#[test]
fn search_connection_without_index_is_rejected() {
    let config = EnvConfig::from_iter([(AZURE_AI_SEARCH_CONNECTION_ID, "conn-search")]);

    assert_eq!(
        HostedTool::from_config(&config, "user").expect_err("must fail"),
        missing(AZURE_AI_SEARCH_INDEX_NAME)
    );
}

#[test]
fn endpoint_must_be_an_http_url() {
    let config = EnvConfig::from_iter([
        (AZURE_FOUNDRY_PROJECT_ENDPOINT, "res.services.ai.azure.com"),
        (AZURE_FOUNDRY_PROJECT_DEPLOYMENT_NAME, "gpt-4o"),
        (AZURE_FOUNDRY_ACCESS_TOKEN, "token"),
    ]);

    assert!(matches!(
        FoundryConfig::from_config(&config),
        Err(ConfigurationError::Invalid { ref key, .. }) if key == AZURE_FOUNDRY_PROJECT_ENDPOINT
    ));
}
