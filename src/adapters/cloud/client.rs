use super::classify::{failure, transport};
use super::signature::sign;
use crate::config::CloudConfig;
use crate::domain::tiers::{DeliveryStrategy, MB};
use crate::error::{DeliveryErrorKind, DeliveryFailure};
use crate::ports::storage::{RemoteAsset, RemoteStorage, UploadRequest, UploadedAsset};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_CHUNK_SIZE: u64 = 20 * MB;

/// Eager transformation requested by the async-eager strategy.
const EAGER_TRANSFORMATION: &str = "q_auto:good,f_mp4";

/// Remote storage backed by a Cloudinary-compatible REST API.
#[derive(Clone, Debug)]
pub struct CloudStorage {
    client: Client,
    config: CloudConfig,
    chunk_size: u64,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
    #[serde(default)]
    bytes: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResourcePage {
    #[serde(default)]
    resources: Vec<Resource>,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    public_id: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    bytes: u64,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudStorage {
    pub fn new(client: Client, config: CloudConfig) -> Self {
        Self {
            client,
            config,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/v1_1/{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name,
            action
        )
    }

    /// Adds `timestamp`, `api_key` and `signature` to `params`.
    fn signed(&self, mut params: BTreeMap<String, String>) -> BTreeMap<String, String> {
        params.insert("timestamp".into(), Utc::now().timestamp().to_string());
        let signature = sign(&params, &self.config.api_secret);
        params.insert("api_key".into(), self.config.api_key.clone());
        params.insert("signature".into(), signature);
        params.insert("signature_algorithm".into(), "sha256".into());
        params
    }

    /// Upload parameters for `request` under `strategy`, before signing.
    fn upload_params(&self, request: &UploadRequest) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("folder".to_string(), request.folder.clone());
        params.insert("public_id".to_string(), request.public_id.clone());

        match request.strategy {
            DeliveryStrategy::Direct | DeliveryStrategy::Chunked | DeliveryStrategy::Streamed => {
                params.insert("overwrite".into(), "true".into());
            }
            DeliveryStrategy::AsyncEager => {
                params.insert("overwrite".into(), "true".into());
                params.insert("eager".into(), EAGER_TRANSFORMATION.into());
                params.insert("eager_async".into(), "true".into());
            }
            DeliveryStrategy::RawFallback => {}
            DeliveryStrategy::UnsignedFallback => {
                params.insert("upload_preset".into(), self.config.upload_preset.clone());
                return params;
            }
        }
        self.signed(params)
    }

    fn form(params: &BTreeMap<String, String>) -> Form {
        params
            .iter()
            .fold(Form::new(), |form, (key, value)| {
                form.text(key.clone(), value.clone())
            })
    }

    fn file_name(request: &UploadRequest) -> String {
        format!("{}.mp4", request.public_id)
    }

    async fn parse_upload(response: Response) -> Result<UploadedAsset, DeliveryFailure> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_from(response).await);
        }
        let body: UploadResponse = response.json().await.map_err(transport)?;
        Ok(UploadedAsset {
            public_id: body.public_id,
            url: body.secure_url,
            bytes: body.bytes,
        })
    }

    async fn error_from(response: Response) -> DeliveryFailure {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error.message)
            .unwrap_or(text);
        failure(status, message)
    }

    /// One multipart POST whose file part is read from disk as it is sent.
    async fn upload_single(
        &self,
        local_path: &Path,
        request: &UploadRequest,
    ) -> Result<UploadedAsset, DeliveryFailure> {
        let params = self.upload_params(request);
        let file = tokio::fs::File::open(local_path).await?;
        let length = file.metadata().await?.len();
        let body = Body::wrap_stream(ReaderStream::new(file));
        let form = Self::form(&params).part(
            "file",
            Part::stream_with_length(body, length).file_name(Self::file_name(request)),
        );

        let response = self
            .client
            .post(self.endpoint("video/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        Self::parse_upload(response).await
    }

    /// Sequential `Content-Range` chunks sharing one upload id. The service
    /// answers every chunk; the last answer describes the finished asset.
    async fn upload_chunked(
        &self,
        local_path: &Path,
        request: &UploadRequest,
        upload_id: &str,
    ) -> Result<UploadedAsset, DeliveryFailure> {
        let params = self.upload_params(request);
        let mut file = tokio::fs::File::open(local_path).await?;
        let total = file.metadata().await?.len();

        let mut offset = 0u64;
        loop {
            let remaining = total - offset;
            let this_chunk = remaining.min(self.chunk_size);
            let mut buffer = vec![0u8; this_chunk as usize];
            file.read_exact(&mut buffer).await?;

            let end = offset + this_chunk;
            let range = format!("bytes {}-{}/{}", offset, end.saturating_sub(1), total);
            debug!(upload_id = %upload_id, range = %range, "Uploading chunk");

            let form = Self::form(&params).part(
                "file",
                Part::bytes(buffer).file_name(Self::file_name(request)),
            );
            let response = self
                .client
                .post(self.endpoint("video/upload"))
                .header("X-Unique-Upload-Id", upload_id)
                .header("Content-Range", range)
                .multipart(form)
                .send()
                .await
                .map_err(transport)?;

            if end >= total {
                return Self::parse_upload(response).await;
            }
            if !response.status().is_success() {
                return Err(Self::error_from(response).await);
            }
            offset = end;
        }
    }
}

#[async_trait]
impl RemoteStorage for CloudStorage {
    async fn upload(
        &self,
        local_path: &Path,
        request: &UploadRequest,
    ) -> Result<UploadedAsset, DeliveryFailure> {
        info!(
            strategy = %request.strategy,
            bytes = request.size,
            public_id = %request.public_id,
            "Uploading to remote storage"
        );
        match request.strategy {
            DeliveryStrategy::Chunked => {
                let upload_id = Uuid::new_v4().simple().to_string();
                self.upload_chunked(local_path, request, &upload_id).await
            }
            DeliveryStrategy::Direct
            | DeliveryStrategy::AsyncEager
            | DeliveryStrategy::Streamed
            | DeliveryStrategy::RawFallback
            | DeliveryStrategy::UnsignedFallback => self.upload_single(local_path, request).await,
        }
    }

    async fn list_assets(
        &self,
        folder: &str,
    ) -> Result<Vec<RemoteAsset>, Box<dyn Error + Send + Sync>> {
        let prefix = format!("{}/", folder.trim_end_matches('/'));
        let mut assets = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query = vec![
                ("type", "upload".to_string()),
                ("prefix", prefix.clone()),
                ("max_results", "500".to_string()),
            ];
            if let Some(cursor) = &cursor {
                query.push(("next_cursor", cursor.clone()));
            }

            let response = self
                .client
                .get(self.endpoint("resources/video/upload"))
                .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
                .query(&query)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(Box::new(Self::error_from(response).await));
            }

            let page: ResourcePage = response.json().await?;
            assets.extend(page.resources.into_iter().map(|r| RemoteAsset {
                public_id: r.public_id,
                created_at: r.created_at,
                bytes: r.bytes,
            }));

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        Ok(assets)
    }

    async fn delete(&self, public_id: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut params = BTreeMap::new();
        params.insert("public_id".to_string(), public_id.to_string());
        params.insert("invalidate".to_string(), "true".to_string());
        let params = self.signed(params);

        let response = self
            .client
            .post(self.endpoint("video/destroy"))
            .form(&params)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Box::new(Self::error_from(response).await));
        }

        let body: DestroyResponse = response.json().await?;
        match body.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(Box::new(DeliveryFailure::new(
                DeliveryErrorKind::Rejected,
                format!("destroy {} returned {}", public_id, other),
            ))),
        }
    }
}
