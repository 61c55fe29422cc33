//! JSON-RPC record store transport.
//!
//! Speaks the backend's `execute_kw` protocol over `POST {url}/jsonrpc`.
//! Authentication happens lazily on the first call and the resulting user id
//! is reused for the life of the process. Calls are never retried.

use async_trait::async_trait;
use decilo_core::{RecordId, RecordStoreError};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::record_store::{Domain, ReadOptions, Record, RecordStore, SearchOptions, StoreResult};

/// Default per-call timeout.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`JsonRpcRecordStore`].
#[derive(Clone)]
pub struct JsonRpcConfig {
    pub url: String,
    pub database: String,
    pub username: String,
    pub api_key: SecretString,
    pub timeout: Duration,
}

impl JsonRpcConfig {
    pub fn new(
        url: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            database: database.into(),
            username: username.into(),
            api_key: SecretString::from(api_key.into()),
            timeout: DEFAULT_RPC_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/jsonrpc", self.url)
    }
}

impl std::fmt::Debug for JsonRpcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcConfig")
            .field("url", &self.url)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ============================================================================
// WIRE ENVELOPE
// ============================================================================

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'static str,
    params: RpcParams<'a>,
    id: u64,
}

#[derive(Debug, Serialize)]
struct RpcParams<'a> {
    service: &'a str,
    method: &'a str,
    args: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    message: String,
    #[serde(default)]
    data: Option<RpcErrorData>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorData {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn build_request<'a>(id: u64, service: &'a str, method: &'a str, args: Vec<Value>) -> RpcRequest<'a> {
    RpcRequest {
        jsonrpc: "2.0",
        method: "call",
        params: RpcParams {
            service,
            method,
            args,
        },
        id,
    }
}

/// Unwrap a response envelope into its `result`, or a fault for `collection.method`.
fn parse_response(body: Value, collection: &str, method: &str) -> StoreResult<Value> {
    let response: RpcResponse =
        serde_json::from_value(body).map_err(|e| RecordStoreError::Transport {
            reason: format!("malformed JSON-RPC envelope: {}", e),
        })?;

    if let Some(error) = response.error {
        let detail = error
            .data
            .map(|data| match (data.name, data.message) {
                (Some(name), Some(message)) => format!("{}: {}", name, message),
                (None, Some(message)) => message,
                (Some(name), None) => name,
                (None, None) => String::new(),
            })
            .filter(|detail| !detail.is_empty());
        return Err(RecordStoreError::Fault {
            collection: collection.to_string(),
            method: method.to_string(),
            message: detail.unwrap_or(error.message),
        });
    }

    response.result.ok_or_else(|| RecordStoreError::Fault {
        collection: collection.to_string(),
        method: method.to_string(),
        message: "response carried neither result nor error".to_string(),
    })
}

fn decode_result<T: DeserializeOwned>(value: Value, collection: &str) -> StoreResult<T> {
    serde_json::from_value(value).map_err(|e| RecordStoreError::Decode {
        collection: collection.to_string(),
        field: "result".to_string(),
        reason: e.to_string(),
    })
}

fn search_kwargs(options: &SearchOptions) -> Map<String, Value> {
    let mut kwargs = Map::new();
    kwargs.insert("offset".to_string(), Value::from(options.offset));
    if let Some(limit) = options.limit {
        kwargs.insert("limit".to_string(), Value::from(limit));
    }
    if let Some(order) = &options.order {
        kwargs.insert("order".to_string(), Value::from(order.clone()));
    }
    kwargs
}

fn read_kwargs(options: &ReadOptions) -> Map<String, Value> {
    let mut kwargs = Map::new();
    kwargs.insert("fields".to_string(), json!(options.fields));
    if let Some(lang) = &options.lang {
        kwargs.insert("context".to_string(), json!({ "lang": lang }));
    }
    kwargs
}

// ============================================================================
// TRANSPORT
// ============================================================================

/// Record store reached over HTTP JSON-RPC.
pub struct JsonRpcRecordStore {
    client: Client,
    config: JsonRpcConfig,
    uid: OnceCell<i64>,
    next_id: AtomicU64,
}

impl JsonRpcRecordStore {
    pub fn new(config: JsonRpcConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RecordStoreError::Transport {
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            config,
            uid: OnceCell::new(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call(
        &self,
        service: &str,
        method: &str,
        args: Vec<Value>,
        context: (&str, &str),
    ) -> StoreResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = build_request(id, service, method, args);
        let (collection, operation) = context;

        let response = self
            .client
            .post(self.config.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecordStoreError::Transport {
                reason: format!("HTTP {} from {}", status.as_u16(), self.config.endpoint()),
            });
        }

        let body: Value = response.json().await.map_err(|e| self.transport_error(e))?;
        parse_response(body, collection, operation).inspect_err(|e| {
            tracing::warn!(collection, method = operation, error = %e, "Record store call failed");
        })
    }

    fn transport_error(&self, error: reqwest::Error) -> RecordStoreError {
        if error.is_timeout() {
            RecordStoreError::Timeout {
                after: self.config.timeout,
            }
        } else {
            RecordStoreError::Transport {
                reason: error.to_string(),
            }
        }
    }

    async fn uid(&self) -> StoreResult<i64> {
        self.uid
            .get_or_try_init(|| async {
                let result = self
                    .call(
                        "common",
                        "authenticate",
                        vec![
                            Value::from(self.config.database.clone()),
                            Value::from(self.config.username.clone()),
                            Value::from(self.config.api_key.expose_secret()),
                            json!({}),
                        ],
                        ("common", "authenticate"),
                    )
                    .await?;
                // A rejected login answers `false` rather than an error.
                let uid = result.as_i64().ok_or(RecordStoreError::AuthenticationFailed)?;
                tracing::info!(
                    database = %self.config.database,
                    username = %self.config.username,
                    uid,
                    "Authenticated with record store"
                );
                Ok(uid)
            })
            .await
            .copied()
    }

    async fn execute_kw(
        &self,
        collection: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> StoreResult<Value> {
        let uid = self.uid().await?;
        tracing::trace!(collection, method, "execute_kw");
        self.call(
            "object",
            "execute_kw",
            vec![
                Value::from(self.config.database.clone()),
                Value::from(uid),
                Value::from(self.config.api_key.expose_secret()),
                Value::from(collection),
                Value::from(method),
                Value::Array(args),
                Value::Object(kwargs),
            ],
            (collection, method),
        )
        .await
    }
}

impl std::fmt::Debug for JsonRpcRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcRecordStore")
            .field("config", &self.config)
            .field("authenticated", &self.uid.initialized())
            .finish()
    }
}

fn domain_value(domain: &Domain, collection: &str) -> StoreResult<Value> {
    serde_json::to_value(domain).map_err(|e| RecordStoreError::Decode {
        collection: collection.to_string(),
        field: "domain".to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl RecordStore for JsonRpcRecordStore {
    async fn search(
        &self,
        collection: &str,
        domain: &Domain,
        options: SearchOptions,
    ) -> StoreResult<Vec<RecordId>> {
        let result = self
            .execute_kw(
                collection,
                "search",
                vec![domain_value(domain, collection)?],
                search_kwargs(&options),
            )
            .await?;
        decode_result(result, collection)
    }

    async fn read(
        &self,
        collection: &str,
        ids: &[RecordId],
        options: ReadOptions,
    ) -> StoreResult<Vec<Record>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let result = self
            .execute_kw(
                collection,
                "read",
                vec![Value::from(ids.to_vec())],
                read_kwargs(&options),
            )
            .await?;
        decode_result(result, collection)
    }

    async fn search_count(&self, collection: &str, domain: &Domain) -> StoreResult<usize> {
        let result = self
            .execute_kw(
                collection,
                "search_count",
                vec![domain_value(domain, collection)?],
                Map::new(),
            )
            .await?;
        decode_result(result, collection)
    }

    async fn search_read(
        &self,
        collection: &str,
        domain: &Domain,
        search: SearchOptions,
        read: ReadOptions,
    ) -> StoreResult<Vec<Record>> {
        let mut kwargs = search_kwargs(&search);
        kwargs.extend(read_kwargs(&read));
        let result = self
            .execute_kw(
                collection,
                "search_read",
                vec![domain_value(domain, collection)?],
                kwargs,
            )
            .await?;
        decode_result(result, collection)
    }
}
