//! HTTP Remote
//!
//! Talks to the stripe-pay server's method and resource endpoints. One
//! client serves both as the [`RemoteMethods`] seam and as the
//! [`DocumentStore`] the status poller writes back through.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url, header::AUTHORIZATION};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use stripe_pay_core::{DocumentKind, DocumentStore, PayError, RemoteMethods, Result};

use crate::config::DeskConfig;

/// `{"message": ...}` reply of a method call
#[derive(Debug, Deserialize)]
struct MethodEnvelope {
    #[serde(default)]
    message: Option<Value>,
}

/// `{"data": ...}` reply of a resource call
#[derive(Debug, Deserialize)]
struct ResourceEnvelope<T> {
    data: T,
}

/// reqwest-backed remote
pub struct HttpRemote {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpRemote {
    pub fn new(config: &DeskConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| PayError::Config(format!("Invalid server URL {}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(PayError::Config(format!("Invalid server URL {}", config.base_url)));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PayError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            token: config.token.clone(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(&DeskConfig::from_env())
    }

    /// `{base}/api/{segments...}`, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| PayError::Config(format!("Invalid server URL {}", self.base_url)))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    fn method_url(&self, method: &str) -> Result<Url> {
        self.endpoint(&["method", method])
    }

    fn resource_url(&self, kind: DocumentKind, name: Option<&str>) -> Result<Url> {
        match name {
            Some(name) => self.endpoint(&["resource", kind.doctype(), name]),
            None => self.endpoint(&["resource", kind.doctype()]),
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("token {token}")),
            None => request,
        }
    }
}

/// Body of a failed response, for the error message
async fn failure(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format!("{status}: {body}")
}

fn store_error(e: &reqwest::Error) -> PayError {
    PayError::Store(e.to_string())
}

#[async_trait]
impl RemoteMethods for HttpRemote {
    async fn call(&self, method: &str, args: Value) -> Result<Option<Value>> {
        let url = self.method_url(method)?;
        tracing::debug!(method = %method, url = %url, "Calling server method");

        let response = self
            .authorize(self.client.post(url).json(&args))
            .send()
            .await
            .map_err(|e| PayError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PayError::Transport(format!("{method} failed with {}", failure(response).await)));
        }

        let envelope: MethodEnvelope = response
            .json()
            .await
            .map_err(|e| PayError::Transport(e.to_string()))?;

        Ok(envelope.message.filter(|m| !m.is_null()))
    }
}

#[async_trait]
impl DocumentStore for HttpRemote {
    async fn get(&self, kind: DocumentKind, name: &str) -> Result<Option<Value>> {
        let url = self.resource_url(kind, Some(name))?;

        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| store_error(&e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(PayError::Store(format!("GET {kind} {name} failed with {}", failure(response).await)));
        }

        let envelope: ResourceEnvelope<Value> = response.json().await.map_err(|e| store_error(&e))?;
        Ok(Some(envelope.data))
    }

    async fn put(&self, kind: DocumentKind, name: &str, doc: Value) -> Result<()> {
        let url = self.resource_url(kind, Some(name))?;

        let response = self
            .authorize(self.client.put(url).json(&doc))
            .send()
            .await
            .map_err(|e| store_error(&e))?;

        if !response.status().is_success() {
            return Err(PayError::Store(format!("PUT {kind} {name} failed with {}", failure(response).await)));
        }

        tracing::debug!(doctype = %kind, name = %name, "Saved document");
        Ok(())
    }

    async fn find(&self, kind: DocumentKind, field: &str, value: &str) -> Result<Vec<String>> {
        let url = self.resource_url(kind, None)?;

        let response = self
            .authorize(self.client.get(url).query(&[("field", field), ("value", value)]))
            .send()
            .await
            .map_err(|e| store_error(&e))?;

        if !response.status().is_success() {
            return Err(PayError::Store(format!("Listing {kind} failed with {}", failure(response).await)));
        }

        let envelope: ResourceEnvelope<Vec<String>> = response.json().await.map_err(|e| store_error(&e))?;
        Ok(envelope.data)
    }
}
