//! OpenAI compatible client for embeddings and chat completions

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::embedding::{EmbeddingProvider, Embeddings};
use super::llm::{Completion, LlmProvider};
use super::retry::RetryPolicy;
use super::usage::TokenUsage;
use crate::config::{ENV_API_KEY, RagConfig};
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;

/// Longest upstream error body kept in error messages
const MAX_ERROR_BODY: usize = 500;

/// Client for an OpenAI compatible API with automatic retry
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    embedding_model: String,
    dimensions: usize,
    temperature: f32,
    batch_size: usize,
    retry: RetryPolicy,
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .field("dimensions", &self.dimensions)
            .field("temperature", &self.temperature)
            .field("batch_size", &self.batch_size)
            .field("retry", &self.retry)
            .finish()
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ApiMessage<'a>; 1],
    temperature: f32,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

impl From<ApiUsage> for TokenUsage {
    fn from(usage: ApiUsage) -> Self {
        TokenUsage::new(usage.prompt_tokens, usage.completion_tokens)
    }
}

impl OpenAiClient {
    /// Create a client from configuration; the API key must be set
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let api_key = config
            .llm
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config(format!("{} is required", ENV_API_KEY)))?;

        let client = Client::builder()
            .timeout(config.llm.timeout())
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.llm.base_url.trim_end_matches('/').to_string(),
            chat_model: config.llm.model.clone(),
            embedding_model: config.embeddings.model.clone(),
            dimensions: config.embeddings.dimensions,
            temperature: config.llm.temperature,
            batch_size: config.embeddings.batch_size.max(1),
            retry: RetryPolicy::from_config(&config.retry),
        })
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Send one embeddings request for a batch of inputs
    async fn request_embeddings(&self, batch: &[String]) -> Result<Embeddings> {
        let url = format!("{}/embeddings", self.base_url);
        let request = EmbeddingRequest {
            input: batch,
            model: &self.embedding_model,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;

        if body.data.len() != batch.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                batch.len(),
                body.data.len()
            )));
        }

        let mut data = body.data;
        data.sort_by_key(|d| d.index);

        Ok(Embeddings {
            vectors: data.into_iter().map(|d| d.embedding).collect(),
            usage: body.usage.map(TokenUsage::from).unwrap_or_default(),
        })
    }

    /// Send one chat completion request
    async fn request_completion(&self, prompt: &str) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.chat_model,
            messages: [ApiMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::llm(format!("Failed to parse chat response: {}", e)))?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::llm("Empty response from model"))?;

        Ok(Completion {
            text,
            usage: body.usage.map(TokenUsage::from).unwrap_or_default(),
        })
    }
}

/// Turn a non-success response into `Error::Upstream`
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message: String = body.chars().take(MAX_ERROR_BODY).collect();
    Err(Error::Upstream {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Embeddings> {
        let mut result = Embeddings {
            vectors: Vec::with_capacity(texts.len()),
            usage: TokenUsage::default(),
        };

        for batch in texts.chunks(self.batch_size) {
            let embeddings = self
                .retry
                .run("embeddings", || self.request_embeddings(batch))
                .await?;
            result.vectors.extend(embeddings.vectors);
            result.usage += embeddings.usage;
        }

        Ok(result)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.embedding_model
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    async fn generate_answer(&self, question: &str, context: &str) -> Result<Completion> {
        let prompt = PromptBuilder::build_qa_prompt(question, context);
        self.retry
            .run("chat_completion", || self.request_completion(&prompt))
            .await
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.chat_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAiClient {
        let mut config = RagConfig::default();
        config.llm.api_key = Some("sk-test".into());
        config.llm.base_url = format!("{}/v1/", server.uri());
        config.embeddings.batch_size = 2;
        OpenAiClient::from_config(&config).unwrap().with_retry(RetryPolicy::from_config(
            &RetryConfig {
                max_attempts: 3,
                multiplier: 0.001,
                min_delay_ms: 1,
                max_delay_ms: 5,
            },
        ))
    }

    /// Embeds each input as `[len, position]`, returning data in reverse order
    fn echo_embeddings(req: &Request) -> ResponseTemplate {
        let body: Value = req.body_json().unwrap();
        let inputs = body["input"].as_array().unwrap().clone();
        let data: Vec<Value> = inputs
            .iter()
            .enumerate()
            .rev()
            .map(|(i, text)| {
                json!({
                    "object": "embedding",
                    "index": i,
                    "embedding": [text.as_str().unwrap().len() as f32, i as f32],
                })
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": data,
            "usage": {"prompt_tokens": 3, "total_tokens": 3},
        }))
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = RagConfig::default();
        config.llm.api_key = Some("sk-secret".into());
        let client = OpenAiClient::from_config(&config).unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("sk-secret"));
    }

    #[test]
    fn test_missing_api_key() {
        let err = OpenAiClient::from_config(&RagConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_embed_batch_keeps_input_order_across_batches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "text-embedding-3-large"})))
            .respond_with(echo_embeddings)
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let texts: Vec<String> = vec!["a".into(), "bb".into(), "ccc".into()];
        let embeddings = client.embed_batch(&texts).await.unwrap();

        assert_eq!(
            embeddings.vectors,
            vec![vec![1.0, 0.0], vec![2.0, 1.0], vec![3.0, 0.0]]
        );
        assert_eq!(embeddings.usage.prompt_tokens, 6);
    }

    #[tokio::test]
    async fn test_embed_single() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(echo_embeddings)
            .mount(&server)
            .await;

        let vector = client_for(&server).embed("four").await.unwrap();
        assert_eq!(vector, vec![4.0, 0.0]);
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).embed("text").await.unwrap_err();
        match err {
            Error::Upstream { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid api key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Yes."}}],
                "usage": {"prompt_tokens": 120, "completion_tokens": 3, "total_tokens": 123},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let completion = client_for(&server)
            .generate_answer("Is MFA enforced?", "(source=a.pdf, page=1)\nMFA is enforced.")
            .await
            .unwrap();
        assert_eq!(completion.text, "Yes.");
        assert_eq!(completion.usage.total_tokens, 123);
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate_answer("q", "ctx")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_chat_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"model": "gpt-4o-mini", "temperature": 0.0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Not found in the provided document."}}],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let completion = client_for(&server)
            .generate_answer("Who is the CEO?", "(source=a.pdf, page=1)\nNothing relevant.")
            .await
            .unwrap();
        assert_eq!(completion.text, "Not found in the provided document.");
        assert_eq!(completion.usage, TokenUsage::default());

        let requests = server.received_requests().await.unwrap();
        let body: Value = requests[0].body_json().unwrap();
        let prompt = body["messages"][0]["content"].as_str().unwrap();
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(prompt.contains("Question:\nWho is the CEO?"));
        assert!(prompt.contains("Nothing relevant."));
    }

    #[tokio::test]
    async fn test_empty_choices_is_llm_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).generate_answer("q", "c").await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
    }
}
