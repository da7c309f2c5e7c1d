//! Prompt hub loading against a mocked hub.

use serde_json::{Value, json};
use std::time::Duration;
use study_rag::{
    rag::prompt::{PromptTemplate, RAG_PROMPT_TEMPLATE, pull_from_hub},
    types::{AppError, MessageRole},
    utils::toml_config::{PromptConfig, PromptSource},
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LATEST: &str = "/commits/rlm/rag-prompt/latest";
const TIMEOUT: Duration = Duration::from_secs(5);

/// Commit body as served for `rlm/rag-prompt`.
fn rag_prompt_commit() -> Value {
    json!({
        "commit_hash": "50442af1",
        "manifest": {
            "lc": 1,
            "type": "constructor",
            "id": ["langchain", "prompts", "chat", "ChatPromptTemplate"],
            "kwargs": {
                "input_variables": ["context", "question"],
                "messages": [{
                    "lc": 1,
                    "type": "constructor",
                    "id": ["langchain", "prompts", "chat", "HumanMessagePromptTemplate"],
                    "kwargs": {
                        "prompt": {
                            "lc": 1,
                            "type": "constructor",
                            "id": ["langchain", "prompts", "prompt", "PromptTemplate"],
                            "kwargs": {
                                "input_variables": ["context", "question"],
                                "template": RAG_PROMPT_TEMPLATE,
                                "template_format": "f-string"
                            }
                        }
                    }
                }]
            }
        }
    })
}

fn hub_config(server: &MockServer) -> PromptConfig {
    PromptConfig {
        source: PromptSource::Hub,
        hub_url: server.uri(),
        timeout_secs: 5,
        ..PromptConfig::default()
    }
}

#[tokio::test]
async fn test_pull_rag_prompt() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(ResponseTemplate::new(200).set_body_json(rag_prompt_commit()))
        .expect(1)
        .mount(&server)
        .await;

    let template = pull_from_hub(&server.uri(), "rlm/rag-prompt", None, TIMEOUT)
        .await
        .unwrap();

    assert_eq!(template.name(), "rlm/rag-prompt");
    assert_eq!(template.message_count(), 1);

    // Same text as the compiled-in copy.
    let question = "What is the capital of France?";
    let context = "Paris is the capital of France.";
    assert_eq!(
        template.render(question, context),
        PromptTemplate::builtin().render(question, context)
    );
}

#[tokio::test]
async fn test_pull_sends_api_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LATEST))
        .and(header("x-api-key", "lsv2-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rag_prompt_commit()))
        .expect(1)
        .mount(&server)
        .await;

    let template = PromptTemplate::from_config(&hub_config(&server), Some("lsv2-test".to_string()))
        .await
        .unwrap();

    let messages = template.render("q", "c");
    assert_eq!(messages[0].role, MessageRole::User);
    assert!(messages[0].content.contains("Question: q"));
    assert!(messages[0].content.contains("Context: c"));
}

#[tokio::test]
async fn test_pull_chat_prompt_with_system_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/commits/acme/support/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "manifest": {
                "id": ["langchain", "prompts", "chat", "ChatPromptTemplate"],
                "kwargs": {
                    "messages": [
                        {
                            "id": ["langchain", "prompts", "chat", "SystemMessagePromptTemplate"],
                            "kwargs": { "prompt": { "kwargs": {
                                "template": "Answer from this context only:\n{context}"
                            } } }
                        },
                        {
                            "id": ["langchain", "prompts", "chat", "HumanMessagePromptTemplate"],
                            "kwargs": { "prompt": { "kwargs": { "template": "{question}" } } }
                        }
                    ]
                }
            }
        })))
        .mount(&server)
        .await;

    let template = pull_from_hub(&server.uri(), "acme/support", None, TIMEOUT)
        .await
        .unwrap();

    let messages = template.render("Capital of France?", "Paris is the capital of France.");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::System);
    assert_eq!(
        messages[0].content,
        "Answer from this context only:\nParis is the capital of France."
    );
    assert_eq!(messages[1].role, MessageRole::User);
    assert_eq!(messages[1].content, "Capital of France?");
}

#[tokio::test]
async fn test_pull_missing_prompt_is_configuration_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let err = pull_from_hub(&server.uri(), "rlm/rag-prompt", None, TIMEOUT)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Configuration(ref msg) if msg.contains("404")));
}

#[tokio::test]
async fn test_pull_invalid_body_is_configuration_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = pull_from_hub(&server.uri(), "rlm/rag-prompt", None, TIMEOUT)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Configuration(_)));
}

#[tokio::test]
async fn test_bad_prompt_name_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rag_prompt_commit()))
        .expect(0)
        .mount(&server)
        .await;

    for name in ["rag-prompt", "/rag-prompt", "rlm/"] {
        let err = pull_from_hub(&server.uri(), name, None, TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)), "{}", name);
    }
}

#[tokio::test]
async fn test_builtin_source_skips_hub() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let config = PromptConfig {
        source: PromptSource::Builtin,
        ..hub_config(&server)
    };
    let template = PromptTemplate::from_config(&config, None).await.unwrap();
    assert_eq!(template.message_count(), 1);
}
