//! Chunked video upload to an ad account's `advideos` edge.
//!
//! The upload runs in three phases against the video host:
//! `start` announces the file size and opens a session, `transfer` sends the
//! byte range the server asks for until it reports nothing left, and
//! `finish` closes the session. Optionally the uploader then polls the video
//! until encoding is done.

use std::path::{Path, PathBuf};
use std::time::Duration;

use http_transport::{FilePart, HttpMethod};
use serde_json::{Map, Value, json};
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tracing::{debug, info};

use crate::api::{ApiPath, CallOptions, GraphApi};
use crate::errors::{GraphApiError, GraphApiResult};
use crate::params::{Params, params_from};

/// Host that accepts video uploads.
pub const DEFAULT_VIDEO_BASE_URL: &str = "https://graph-video.facebook.com";

const CHUNK_FIELD: &str = "video_file_chunk";

/// Uploads one local video file to an ad account.
#[derive(Debug, Clone)]
pub struct VideoUploader {
    api: GraphApi,
    video_base_url: String,
    wait_for_encoding: bool,
    poll_interval: Duration,
    encoding_timeout: Duration,
}

impl VideoUploader {
    pub fn new(api: GraphApi) -> Self {
        Self {
            api,
            video_base_url: DEFAULT_VIDEO_BASE_URL.to_string(),
            wait_for_encoding: false,
            poll_interval: Duration::from_secs(3),
            encoding_timeout: Duration::from_secs(180),
        }
    }

    pub fn with_video_base_url(mut self, url: impl Into<String>) -> Self {
        self.video_base_url = url.into();
        self
    }

    /// After `finish`, poll the video until its status leaves `processing`.
    pub fn wait_for_encoding(mut self, interval: Duration, timeout: Duration) -> Self {
        self.wait_for_encoding = true;
        self.poll_interval = interval;
        self.encoding_timeout = timeout;
        self
    }

    /// Runs the whole upload and returns the `finish` reply with `id` set to
    /// the new video id.
    pub async fn upload(
        &self,
        account_id: &str,
        path: impl AsRef<Path>,
    ) -> GraphApiResult<Map<String, Value>> {
        let path = path.as_ref();
        let file_size = tokio::fs::metadata(path).await?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                GraphApiError::BadParameter(format!("{} is not a file path", path.display()))
            })?;

        info!(account_id, file = %path.display(), file_size, "video upload started");
        let start = self
            .send(
                account_id,
                params_from([("upload_phase", json!("start")), ("file_size", json!(file_size))]),
                Vec::new(),
            )
            .await?;

        let session = UploadSession {
            account_id: account_id.to_string(),
            path: path.to_path_buf(),
            file_name,
            session_id: string_field(&start, "upload_session_id")?,
            video_id: string_field(&start, "video_id")?,
        };
        let range = (offset(&start, "start_offset")?, offset(&start, "end_offset")?);
        self.transfer(&session, range).await?;

        let finished = self
            .send(
                account_id,
                params_from([
                    ("upload_phase", json!("finish")),
                    ("upload_session_id", json!(session.session_id)),
                    ("title", json!(session.file_name)),
                ]),
                Vec::new(),
            )
            .await?;

        if self.wait_for_encoding {
            self.wait_until_ready(&session.video_id).await?;
        }

        let mut video = match finished {
            Value::Object(map) => map,
            other => {
                return Err(GraphApiError::BadObject(format!(
                    "unexpected upload finish reply: {other}"
                )));
            }
        };
        video.remove("success");
        video.insert("id".into(), Value::String(session.video_id));
        info!(account_id, video_id = ?video.get("id"), "video upload finished");
        Ok(video)
    }

    /// Sends the ranges the server asks for until it reports none left.
    async fn transfer(&self, session: &UploadSession, range: (u64, u64)) -> GraphApiResult<()> {
        let (mut start, mut end) = range;
        let mut file = tokio::fs::File::open(&session.path).await?;

        while start != end {
            if end < start {
                return Err(GraphApiError::BadObject(format!(
                    "upload range {start}..{end} is inverted"
                )));
            }
            let len = usize::try_from(end - start).map_err(|_| {
                GraphApiError::BadObject(format!("upload range {start}..{end} is too large"))
            })?;
            let mut chunk = vec![0u8; len];
            file.seek(SeekFrom::Start(start)).await?;
            file.read_exact(&mut chunk).await?;
            debug!(video_id = %session.video_id, start, end, "sending video chunk");

            let reply = self
                .send(
                    &session.account_id,
                    params_from([
                        ("upload_phase", json!("transfer")),
                        ("start_offset", json!(start)),
                        ("upload_session_id", json!(session.session_id)),
                    ]),
                    vec![FilePart {
                        field: CHUNK_FIELD.to_string(),
                        file_name: session.file_name.clone(),
                        bytes: chunk,
                    }],
                )
                .await?;
            start = offset(&reply, "start_offset")?;
            end = offset(&reply, "end_offset")?;
        }
        Ok(())
    }

    async fn send(
        &self,
        account_id: &str,
        params: Params,
        file_parts: Vec<FilePart>,
    ) -> GraphApiResult<Value> {
        let opts = CallOptions {
            file_parts,
            url_override: Some(self.video_base_url.clone()),
            ..Default::default()
        };
        let response = self
            .api
            .call(
                HttpMethod::Post,
                ApiPath::segments([account_id, "advideos"]),
                &params,
                opts,
            )
            .await?;
        Ok(response.json())
    }

    async fn wait_until_ready(&self, video_id: &str) -> GraphApiResult<()> {
        let started = tokio::time::Instant::now();
        loop {
            let status = self.video_status(video_id).await?;
            if status != "processing" {
                return match status.as_str() {
                    "ready" => Ok(()),
                    other => Err(GraphApiError::BadObject(format!(
                        "video encoding status: {other}"
                    ))),
                };
            }
            if started.elapsed() >= self.encoding_timeout {
                return Err(GraphApiError::BadObject(format!(
                    "video encoding timeout: {}s",
                    self.encoding_timeout.as_secs()
                )));
            }
            debug!(video_id, "video still processing");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn video_status(&self, video_id: &str) -> GraphApiResult<String> {
        let params = params_from([("fields", json!("status"))]);
        let reply = self
            .api
            .request(HttpMethod::Get, ApiPath::segments([video_id]), &params)
            .await?
            .json();
        reply
            .pointer("/status/video_status")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| GraphApiError::BadObject(format!("video status missing: {reply}")))
    }
}

#[derive(Debug)]
struct UploadSession {
    account_id: String,
    path: PathBuf,
    file_name: String,
    session_id: String,
    video_id: String,
}

/// Offsets come back as decimal strings or as numbers.
fn offset(reply: &Value, key: &str) -> GraphApiResult<u64> {
    match reply.get(key) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| GraphApiError::BadObject(format!("upload reply has no valid {key}: {reply}")))
}

fn string_field(reply: &Value, key: &str) -> GraphApiResult<String> {
    match reply.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(GraphApiError::BadObject(format!(
            "upload reply has no {key}: {reply}"
        ))),
    }
}
