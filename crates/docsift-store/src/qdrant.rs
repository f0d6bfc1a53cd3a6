//! Qdrant backend over the REST API.

use async_trait::async_trait;
use docsift_core::{
    CollectionInfo, DistanceMetric, DocumentRecord, ScoredRecord, ScrollPage, StoreError,
    VectorPoint, VectorStore,
};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Connection settings for [`QdrantStore`].
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    /// Base URL, e.g. `http://localhost:6333`
    pub url: String,
    /// Value for the `api-key` header
    pub api_key: Option<String>,
    pub timeout: Duration,
    /// Total attempts per request on connect and timeout errors
    pub max_retries: usize,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            api_key: None,
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }
}

/// Vector store backed by a Qdrant server.
pub struct QdrantStore {
    client: Client,
    base_url: String,
    max_retries: usize,
}

impl QdrantStore {
    /// Build the HTTP client. No request is made until first use.
    ///
    /// # Errors
    ///
    /// Fails when the URL is not http(s), the API key is not a valid header
    /// value, or the client cannot be built.
    pub fn new(config: QdrantConfig) -> Result<Self, StoreError> {
        let url = config.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(StoreError::Collection(format!(
                "Qdrant URL must be http(s): {url}"
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = config.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(key)
                .map_err(|_| StoreError::Collection("invalid Qdrant API key".to_string()))?;
            headers.insert("api-key", value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Collection(format!("failed to build Qdrant client: {e}")))?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries.max(1),
        })
    }

    /// Send a request and unwrap the `result` field of the response.
    /// Connect and timeout errors are retried; HTTP errors are not.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        fail: fn(String) -> StoreError,
    ) -> Result<T, StoreError> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0usize;
        loop {
            let mut request = self.client.request(method.clone(), &url);
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if !status.is_success() {
                        let text = resp
                            .text()
                            .await
                            .unwrap_or_else(|_| "<body unavailable>".to_string());
                        return Err(fail(format!("{method} {path} returned {status}: {text}")));
                    }
                    let envelope: Envelope<T> = resp
                        .json()
                        .await
                        .map_err(|e| StoreError::Decode(format!("{method} {path}: {e}")))?;
                    return Ok(envelope.result);
                }
                Err(err) => {
                    if (err.is_connect() || err.is_timeout()) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!("Qdrant {} {} failed: {}, retrying ({})", method, path, err, attempt);
                        tokio::time::sleep(Duration::from_millis(200 * attempt as u64)).await;
                        continue;
                    }
                    return Err(fail(format!("{method} {path}: {err}")));
                }
            }
        }
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Deserialize)]
struct CollectionsList {
    collections: Vec<CollectionName>,
}

#[derive(Deserialize)]
struct CollectionName {
    name: String,
}

#[derive(Deserialize)]
struct RawPoint {
    id: Value,
    #[serde(default)]
    payload: Option<Value>,
    #[serde(default)]
    vector: Option<Value>,
    #[serde(default)]
    score: Option<f32>,
}

#[derive(Deserialize)]
struct RawScroll {
    points: Vec<RawPoint>,
    #[serde(default)]
    next_page_offset: Option<Value>,
}

#[derive(Deserialize)]
struct RawCount {
    count: u64,
}

fn distance_name(distance: DistanceMetric) -> &'static str {
    match distance {
        DistanceMetric::Cosine => "Cosine",
        DistanceMetric::Euclid => "Euclid",
        DistanceMetric::Dot => "Dot",
    }
}

fn parse_distance(name: &str) -> DistanceMetric {
    match name {
        "Euclid" => DistanceMetric::Euclid,
        "Dot" => DistanceMetric::Dot,
        _ => DistanceMetric::Cosine,
    }
}

fn parse_id(id: &Value) -> Result<Uuid, StoreError> {
    id.as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| StoreError::Decode(format!("point id {id} is not a UUID")))
}

fn point_payload(point: &VectorPoint) -> Result<Value, StoreError> {
    Ok(json!({
        "id": point.id.to_string(),
        "vector": point.vector,
        "payload": serde_json::to_value(&point.record)
            .map_err(|e| StoreError::Insert(format!("payload encoding failed: {e}")))?,
    }))
}

fn decode_record(raw: &RawPoint) -> Result<DocumentRecord, StoreError> {
    let id = parse_id(&raw.id)?;
    let payload = raw
        .payload
        .clone()
        .ok_or_else(|| StoreError::Decode(format!("point {id} has no payload")))?;
    let mut record: DocumentRecord = serde_json::from_value(payload)
        .map_err(|e| StoreError::Decode(format!("point {id}: {e}")))?;
    record.id = id;
    Ok(record)
}

fn decode_vector(raw: &RawPoint) -> Vec<f32> {
    raw.vector
        .as_ref()
        .and_then(|v| serde_json::from_value::<Vec<f32>>(v.clone()).ok())
        .unwrap_or_default()
}

fn decode_collection_info(name: &str, raw: &Value) -> CollectionInfo {
    let vectors = &raw["config"]["params"]["vectors"];
    CollectionInfo {
        name: name.to_string(),
        points_count: raw["points_count"].as_u64().unwrap_or(0),
        dimension: vectors["size"].as_u64().unwrap_or(0) as usize,
        distance: parse_distance(vectors["distance"].as_str().unwrap_or("Cosine")),
        status: raw["status"].as_str().unwrap_or("unknown").to_string(),
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn name(&self) -> &str {
        "qdrant"
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let list: CollectionsList = self
            .call(Method::GET, "/collections", None, StoreError::Collection)
            .await?;
        Ok(list.collections.into_iter().map(|c| c.name).collect())
    }

    async fn create_collection(
        &self,
        collection: &str,
        dimension: usize,
        distance: DistanceMetric,
    ) -> Result<(), StoreError> {
        let body = json!({
            "vectors": { "size": dimension, "distance": distance_name(distance) }
        });
        let _: Value = self
            .call(
                Method::PUT,
                &format!("/collections/{collection}"),
                Some(&body),
                StoreError::Collection,
            )
            .await?;
        debug!("Created Qdrant collection {} ({} dims)", collection, dimension);
        Ok(())
    }

    async fn collection_info(&self, collection: &str) -> Result<CollectionInfo, StoreError> {
        let raw: Value = self
            .call(
                Method::GET,
                &format!("/collections/{collection}"),
                None,
                StoreError::Collection,
            )
            .await?;
        Ok(decode_collection_info(collection, &raw))
    }

    async fn upsert(
        &self,
        collection: &str,
        points: &[VectorPoint],
        wait: bool,
    ) -> Result<(), StoreError> {
        let points = points
            .iter()
            .map(point_payload)
            .collect::<Result<Vec<_>, _>>()?;
        let body = json!({ "points": points });
        let _: Value = self
            .call(
                Method::PUT,
                &format!("/collections/{collection}/points?wait={wait}"),
                Some(&body),
                StoreError::Insert,
            )
            .await?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredRecord>, StoreError> {
        let body = json!({ "vector": vector, "limit": limit, "with_payload": true });
        let hits: Vec<RawPoint> = self
            .call(
                Method::POST,
                &format!("/collections/{collection}/points/search"),
                Some(&body),
                StoreError::Query,
            )
            .await?;
        hits.iter()
            .map(|hit| {
                Ok(ScoredRecord {
                    record: decode_record(hit)?,
                    score: hit.score.unwrap_or(0.0),
                })
            })
            .collect()
    }

    async fn scroll(
        &self,
        collection: &str,
        limit: usize,
        offset: Option<Uuid>,
    ) -> Result<ScrollPage, StoreError> {
        let mut body = json!({ "limit": limit, "with_payload": true, "with_vector": false });
        if let Some(offset) = offset {
            body["offset"] = Value::String(offset.to_string());
        }
        let raw: RawScroll = self
            .call(
                Method::POST,
                &format!("/collections/{collection}/points/scroll"),
                Some(&body),
                StoreError::Query,
            )
            .await?;

        let records = raw
            .points
            .iter()
            .map(decode_record)
            .collect::<Result<Vec<_>, _>>()?;
        let next_offset = match raw.next_page_offset {
            Some(Value::Null) | None => None,
            Some(id) => Some(parse_id(&id)?),
        };
        Ok(ScrollPage {
            records,
            next_offset,
        })
    }

    async fn retrieve(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<VectorPoint>, StoreError> {
        let body = json!({ "ids": [id.to_string()], "with_payload": true, "with_vector": true });
        let points: Vec<RawPoint> = self
            .call(
                Method::POST,
                &format!("/collections/{collection}/points"),
                Some(&body),
                StoreError::Query,
            )
            .await?;

        points
            .first()
            .map(|raw| {
                Ok(VectorPoint {
                    id: parse_id(&raw.id)?,
                    vector: decode_vector(raw),
                    record: decode_record(raw)?,
                })
            })
            .transpose()
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        let body = json!({ "exact": true });
        let raw: RawCount = self
            .call(
                Method::POST,
                &format!("/collections/{collection}/points/count"),
                Some(&body),
                StoreError::Query,
            )
            .await?;
        Ok(raw.count)
    }
}
