//! Chat prompt templates.
//!
//! A [`PromptTemplate`] is an ordered list of role-tagged f-string templates
//! over two variables, `question` and `context`. Templates are compiled when
//! loaded, so rendering per request cannot fail. `{{` and `}}` render as
//! literal braces.
//!
//! Templates come either from the LangSmith prompt hub (pulled once at
//! startup) or from the built-in copy of `rlm/rag-prompt`.

use crate::llm::gemini::truncate_body;
use crate::types::{AppError, ChatMessage, MessageRole, Result};
use crate::utils::toml_config::{PromptConfig, PromptSource};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// The `rlm/rag-prompt` human message as published on the hub.
pub const RAG_PROMPT_TEMPLATE: &str = "You are an assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, just say that you don't know. \
Use three sentences maximum and keep the answer concise.\n\
Question: {question} \nContext: {context} \nAnswer:";

const RAG_PROMPT_PREAMBLE: &str = "You are an assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, just say that you don't know. \
Use three sentences maximum and keep the answer concise.\n\
Question: ";

const BUILTIN_NAME: &str = "rlm/rag-prompt (builtin)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variable {
    Question,
    Context,
}

impl Variable {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "question" => Some(Variable::Question),
            "context" => Some(Variable::Context),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Var(Variable),
}

#[derive(Debug, Clone)]
struct MessageTemplate {
    role: MessageRole,
    segments: Vec<Segment>,
}

impl MessageTemplate {
    fn render(&self, question: &str, context: &str) -> ChatMessage {
        let mut content = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => content.push_str(text),
                Segment::Var(Variable::Question) => content.push_str(question),
                Segment::Var(Variable::Context) => content.push_str(context),
            }
        }
        ChatMessage {
            role: self.role,
            content,
        }
    }
}

/// Compile an f-string template into literal and variable segments.
fn compile(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    return Err(AppError::Configuration(
                        "Prompt template has an unclosed '{'".to_string(),
                    ));
                }
                let var = Variable::parse(name.trim()).ok_or_else(|| {
                    AppError::Configuration(format!(
                        "Prompt template uses unknown variable '{}'",
                        name.trim()
                    ))
                })?;
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Var(var));
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '}' => {
                return Err(AppError::Configuration(
                    "Prompt template has an unmatched '}'".to_string(),
                ));
            }
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Ordered chat message templates shared read-only across requests.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    name: String,
    messages: Vec<MessageTemplate>,
}

impl PromptTemplate {
    /// Compile a template from `(role, f-string)` pairs.
    ///
    /// # Errors
    ///
    /// Fails with [`AppError::Configuration`] on unknown variables, unbalanced
    /// braces, or an empty message list.
    pub fn new<I, S>(name: impl Into<String>, messages: I) -> Result<Self>
    where
        I: IntoIterator<Item = (MessageRole, S)>,
        S: AsRef<str>,
    {
        let messages = messages
            .into_iter()
            .map(|(role, template)| {
                Ok(MessageTemplate {
                    role,
                    segments: compile(template.as_ref())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if messages.is_empty() {
            return Err(AppError::Configuration(
                "Prompt template has no messages".to_string(),
            ));
        }

        Ok(Self {
            name: name.into(),
            messages,
        })
    }

    /// The `rlm/rag-prompt` template compiled into the binary.
    pub fn builtin() -> Self {
        Self {
            name: BUILTIN_NAME.to_string(),
            messages: vec![MessageTemplate {
                role: MessageRole::User,
                segments: vec![
                    Segment::Literal(RAG_PROMPT_PREAMBLE.to_string()),
                    Segment::Var(Variable::Question),
                    Segment::Literal(" \nContext: ".to_string()),
                    Segment::Var(Variable::Context),
                    Segment::Literal(" \nAnswer:".to_string()),
                ],
            }],
        }
    }

    /// Load the template selected by the `[prompt]` section.
    pub async fn from_config(config: &PromptConfig, api_key: Option<String>) -> Result<Self> {
        match config.source {
            PromptSource::Builtin => Ok(Self::builtin()),
            PromptSource::Hub => {
                pull_from_hub(
                    &config.hub_url,
                    &config.name,
                    api_key.as_deref(),
                    Duration::from_secs(config.timeout_secs),
                )
                .await
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Fill in both variables.
    pub fn render(&self, question: &str, context: &str) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .map(|m| m.render(question, context))
            .collect()
    }
}

// ============================================================================
// Prompt hub
// ============================================================================

#[derive(Debug, Deserialize)]
struct CommitResponse {
    manifest: Value,
}

/// Map a serialized LangChain message template class to a chat role.
fn role_for_class(class: &str) -> Option<MessageRole> {
    match class {
        "SystemMessagePromptTemplate" => Some(MessageRole::System),
        "HumanMessagePromptTemplate" => Some(MessageRole::User),
        "AIMessagePromptTemplate" => Some(MessageRole::Assistant),
        _ => None,
    }
}

fn class_name(node: &Value) -> Option<&str> {
    node.get("id")?.as_array()?.last()?.as_str()
}

/// Extract the f-string from a serialized `PromptTemplate` node.
fn template_text(node: &Value) -> Result<&str> {
    let kwargs = node.get("kwargs").ok_or_else(|| {
        AppError::Configuration("Prompt manifest entry has no kwargs".to_string())
    })?;

    if let Some(format) = kwargs.get("template_format").and_then(Value::as_str) {
        if format != "f-string" {
            return Err(AppError::Configuration(format!(
                "Unsupported prompt template format '{}'",
                format
            )));
        }
    }

    kwargs
        .get("template")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Configuration("Prompt manifest entry has no template".to_string()))
}

/// Build a template from a hub manifest.
///
/// Accepts a `ChatPromptTemplate` (one entry per message) or a bare
/// `PromptTemplate`, which becomes a single user message.
pub fn parse_manifest(name: &str, manifest: &Value) -> Result<PromptTemplate> {
    match class_name(manifest) {
        Some("PromptTemplate") => {
            PromptTemplate::new(name, [(MessageRole::User, template_text(manifest)?)])
        }
        _ => {
            let messages = manifest
                .pointer("/kwargs/messages")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    AppError::Configuration(format!("Prompt '{}' has no messages", name))
                })?;

            let pairs = messages
                .iter()
                .map(|message| {
                    let class = class_name(message).unwrap_or_default();
                    let role = role_for_class(class).ok_or_else(|| {
                        AppError::Configuration(format!(
                            "Unsupported message template '{}' in prompt '{}'",
                            class, name
                        ))
                    })?;
                    let prompt = message.pointer("/kwargs/prompt").ok_or_else(|| {
                        AppError::Configuration(format!(
                            "Message template in prompt '{}' has no prompt",
                            name
                        ))
                    })?;
                    Ok((role, template_text(prompt)?))
                })
                .collect::<Result<Vec<_>>>()?;

            PromptTemplate::new(name, pairs)
        }
    }
}

/// Pull `owner/repo` from the prompt hub at `hub_url`.
///
/// # Errors
///
/// Any transport, status, or manifest problem is reported as
/// [`AppError::Configuration`]; the server does not start without a prompt.
pub async fn pull_from_hub(
    hub_url: &str,
    name: &str,
    api_key: Option<&str>,
    timeout: Duration,
) -> Result<PromptTemplate> {
    let (owner, repo) = name
        .split_once('/')
        .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty())
        .ok_or_else(|| {
            AppError::Configuration(format!("Prompt name '{}' is not 'owner/repo'", name))
        })?;

    let url = format!(
        "{}/commits/{}/{}/latest",
        hub_url.trim_end_matches('/'),
        owner,
        repo
    );

    let http = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

    let mut request = http.get(&url);
    if let Some(key) = api_key {
        request = request.header("x-api-key", key);
    }

    tracing::info!(prompt = name, authenticated = api_key.is_some(), "Pulling prompt from hub");

    let response = request
        .send()
        .await
        .map_err(|e| AppError::Configuration(format!("Prompt hub request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(AppError::Configuration(format!(
            "Prompt hub returned {} for '{}': {}",
            status,
            name,
            truncate_body(&text)
        )));
    }

    let body: CommitResponse = response
        .json()
        .await
        .map_err(|e| AppError::Configuration(format!("Invalid prompt hub response: {}", e)))?;

    let template = parse_manifest(name, &body.manifest)?;
    tracing::info!(
        prompt = name,
        messages = template.message_count(),
        "Loaded prompt template"
    );
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compile_segments() {
        let segments = compile("Q: {question}\nC: {context}").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Literal("Q: ".to_string()),
                Segment::Var(Variable::Question),
                Segment::Literal("\nC: ".to_string()),
                Segment::Var(Variable::Context),
            ]
        );
    }

    #[test]
    fn test_escaped_braces() {
        let template =
            PromptTemplate::new("t", [(MessageRole::User, "{{\"q\": \"{question}\"}}")]).unwrap();
        let messages = template.render("hi", "");
        assert_eq!(messages[0].content, "{\"q\": \"hi\"}");
    }

    #[test]
    fn test_unknown_variable_rejected() {
        let err = PromptTemplate::new("t", [(MessageRole::User, "{history}")]).unwrap_err();
        assert!(err.to_string().contains("history"));
    }

    #[test]
    fn test_unbalanced_braces_rejected() {
        assert!(PromptTemplate::new("t", [(MessageRole::User, "{question")]).is_err());
        assert!(PromptTemplate::new("t", [(MessageRole::User, "oops }")]).is_err());
    }

    #[test]
    fn test_empty_message_list_rejected() {
        let empty: Vec<(MessageRole, &str)> = Vec::new();
        assert!(PromptTemplate::new("t", empty).is_err());
    }

    #[test]
    fn test_builtin_matches_compiled_text() {
        let compiled = PromptTemplate::new("t", [(MessageRole::User, RAG_PROMPT_TEMPLATE)]).unwrap();
        let builtin = PromptTemplate::builtin();

        let question = "What is the capital of France?";
        let context = "Paris is the capital of France.";
        assert_eq!(
            builtin.render(question, context),
            compiled.render(question, context)
        );

        let rendered = &builtin.render(question, context)[0];
        assert_eq!(rendered.role, MessageRole::User);
        assert!(rendered.content.starts_with("You are an assistant"));
        assert!(rendered.content.contains("Question: What is the capital of France? \n"));
        assert!(rendered.content.ends_with("Context: Paris is the capital of France. \nAnswer:"));
    }

    #[test]
    fn test_render_preserves_question_verbatim() {
        let template = PromptTemplate::builtin();
        let messages = template.render("  {weird} question  ", "");
        assert!(messages[0].content.contains("  {weird} question  "));
    }

    #[test]
    fn test_parse_chat_manifest() {
        let manifest = json!({
            "lc": 1,
            "type": "constructor",
            "id": ["langchain", "prompts", "chat", "ChatPromptTemplate"],
            "kwargs": {
                "input_variables": ["context", "question"],
                "messages": [
                    {
                        "id": ["langchain", "prompts", "chat", "SystemMessagePromptTemplate"],
                        "kwargs": {"prompt": {"kwargs": {"template": "Answer briefly.", "template_format": "f-string"}}}
                    },
                    {
                        "id": ["langchain", "prompts", "chat", "HumanMessagePromptTemplate"],
                        "kwargs": {"prompt": {"kwargs": {"template": "{question}\n{context}"}}}
                    }
                ]
            }
        });

        let template = parse_manifest("me/custom", &manifest).unwrap();
        let messages = template.render("Q", "C");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChatMessage::system("Answer briefly."));
        assert_eq!(messages[1], ChatMessage::user("Q\nC"));
    }

    #[test]
    fn test_parse_plain_prompt_manifest() {
        let manifest = json!({
            "id": ["langchain", "prompts", "prompt", "PromptTemplate"],
            "kwargs": {"template": "Context: {context}"}
        });
        let template = parse_manifest("me/plain", &manifest).unwrap();
        assert_eq!(template.render("", "X")[0], ChatMessage::user("Context: X"));
    }

    #[test]
    fn test_parse_manifest_rejects_mustache() {
        let manifest = json!({
            "id": ["langchain", "prompts", "prompt", "PromptTemplate"],
            "kwargs": {"template": "{{question}}", "template_format": "mustache"}
        });
        assert!(parse_manifest("me/m", &manifest).is_err());
    }

    #[tokio::test]
    async fn test_builtin_from_config() {
        let config = PromptConfig {
            source: PromptSource::Builtin,
            ..Default::default()
        };
        let template = PromptTemplate::from_config(&config, None).await.unwrap();
        assert_eq!(template.name(), BUILTIN_NAME);
    }
}
