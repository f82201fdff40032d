//! Kubo (go-ipfs) RPC API client.

use super::ContentNetwork;
use crate::error::NetworkError;
use crate::types::{ContentHash, NodeId};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct IdResponse {
    #[serde(rename = "ID")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

#[derive(Debug, Deserialize)]
struct PublishResponse {
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ResolveResponse {
    #[serde(rename = "Path")]
    path: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(rename = "Message")]
    message: String,
}

/// Blocking client for a local Kubo daemon.
///
/// Requests run on an owned tokio runtime so callers stay synchronous.
pub struct KuboClient {
    base_url: String,
    http: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl KuboClient {
    pub fn new(api_url: &str) -> Result<Self, NetworkError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(NetworkError::Runtime)?;
        Ok(Self {
            base_url: api_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            runtime,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, command: &str) -> String {
        format!("{}/api/v0/{}", self.base_url, command)
    }

    fn call<T: DeserializeOwned>(
        &self,
        command: &str,
        query: &[(&str, &str)],
        form: Option<Form>,
    ) -> Result<T, NetworkError> {
        let endpoint = self.endpoint(command);
        let mut request = self.http.post(&endpoint).query(query);
        if let Some(form) = form {
            request = request.multipart(form);
        }

        self.runtime.block_on(async {
            let response = request.send().await.map_err(|source| NetworkError::Request {
                endpoint: endpoint.clone(),
                source,
            })?;
            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|source| NetworkError::Request {
                    endpoint: endpoint.clone(),
                    source,
                })?;

            if !status.is_success() {
                let message = serde_json::from_slice::<ErrorResponse>(&body)
                    .map(|e| e.message)
                    .unwrap_or_else(|_| String::from_utf8_lossy(&body).trim().to_string());
                return Err(NetworkError::Api {
                    endpoint: endpoint.clone(),
                    status: status.as_u16(),
                    message,
                });
            }

            decode(&endpoint, &body)
        })
    }
}

/// Decode a Kubo response body.
///
/// Streaming commands such as `add` may emit several JSON objects, one per
/// line; the last one carries the final result.
fn decode<T: DeserializeOwned>(endpoint: &str, body: &[u8]) -> Result<T, NetworkError> {
    let text = String::from_utf8_lossy(body);
    let last = text
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| NetworkError::Decode {
            endpoint: endpoint.to_string(),
            message: "empty response".to_string(),
        })?;
    serde_json::from_str(last).map_err(|e| NetworkError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

impl ContentNetwork for KuboClient {
    fn identity(&self) -> Result<NodeId, NetworkError> {
        let response: IdResponse = self.call("id", &[], None)?;
        Ok(NodeId::new(response.id))
    }

    fn add(&self, content: &mut dyn Read) -> Result<ContentHash, NetworkError> {
        let mut bytes = Vec::new();
        content.read_to_end(&mut bytes).map_err(NetworkError::Body)?;
        let form = Form::new().part("file", Part::bytes(bytes).file_name("file"));
        let response: AddResponse = self.call("add", &[], Some(form))?;
        Ok(ContentHash::new(response.hash))
    }

    fn pin(&self, hash: &ContentHash) -> Result<(), NetworkError> {
        let _: serde_json::Value = self.call("pin/add", &[("arg", hash.as_str())], None)?;
        Ok(())
    }

    fn publish(&self, key: Option<&str>, hash: &ContentHash) -> Result<String, NetworkError> {
        let target = format!("/ipfs/{}", hash);
        let mut query = vec![("arg", target.as_str())];
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            query.push(("key", key));
        }
        let response: PublishResponse = self.call("name/publish", &query, None)?;
        Ok(response.name)
    }

    fn resolve(&self, node: &NodeId) -> Result<String, NetworkError> {
        let response: ResolveResponse =
            self.call("name/resolve", &[("arg", node.as_str())], None)?;
        Ok(response.path)
    }
}
