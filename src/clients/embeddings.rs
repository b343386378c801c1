use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::error::PipelineError;

/// Maps text to a fixed-length vector.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

/// OpenAI-compatible `/embeddings` endpoint.
pub struct HttpEmbeddingClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpEmbeddingClient {
    pub fn new(cfg: &EmbeddingConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
        }
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            input: &'a str,
        }

        #[derive(Deserialize)]
        struct Response {
            #[serde(default)]
            data: Vec<EmbeddingData>,
        }

        #[derive(Deserialize)]
        struct EmbeddingData {
            embedding: Vec<f32>,
        }

        let mut req = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .json(&Request {
                model: &self.model,
                input: text,
            });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let res = req.send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(PipelineError::dependency("embedding", format!("{status}: {body}")).into());
        }

        let body: Response = res.json().await?;
        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| PipelineError::dependency("embedding", "invalid embedding response").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(uri: String) -> HttpEmbeddingClient {
        HttpEmbeddingClient::new(&EmbeddingConfig {
            base_url: uri,
            api_key: None,
            model: "embed-small".into(),
        })
    }

    #[tokio::test]
    async fn returns_first_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [0.25, 0.5, 1.0]}]
            })))
            .mount(&server)
            .await;

        let v = client(server.uri()).embed("egg").await.unwrap();
        assert_eq!(v, vec![0.25, 0.5, 1.0]);
    }

    #[tokio::test]
    async fn empty_payload_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        let err = client(server.uri()).embed("egg").await.unwrap_err();
        assert!(err.to_string().contains("invalid embedding response"));
    }
}
