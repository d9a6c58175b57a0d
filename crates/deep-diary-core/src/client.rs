use std::time::Duration;

use reqwest::{multipart, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{DiaryError, Result};

pub const UPLOAD_FILE_NAME: &str = "uploaded_image.png";

#[derive(Serialize)]
struct FollowupRequest<'a> {
    user_answer: &'a str,
}

#[derive(Deserialize)]
struct CaptionResponse {
    #[serde(default)]
    caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InitialQuestion {
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Followup {
    pub emotion: String,
    pub followup_question: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiarySummary {
    pub diary_summary: String,
    pub final_emotion: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Song {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub lyrics: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SongRecommendation {
    #[serde(default)]
    pub recommended_song: Option<Song>,
}

/// Thin wrapper over the diary backend's five endpoints.
///
/// Only HTTP 200 counts as success. Anything else becomes
/// [`DiaryError::Status`] carrying the raw body.
#[derive(Clone)]
pub struct DiaryClient {
    client: Client,
    base_url: String,
}

impl DiaryClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Upload the PNG-encoded photo. Returns the caption if the backend sent one.
    pub async fn generate_caption(&self, png: Vec<u8>) -> Result<Option<String>> {
        let part = multipart::Part::bytes(png)
            .file_name(UPLOAD_FILE_NAME)
            .mime_str("image/png")?;
        let form = multipart::Form::new().part("file", part);

        debug!(path = "/generate_caption", "POST");
        let response = self
            .client
            .post(self.url("/generate_caption"))
            .multipart(form)
            .send()
            .await?;

        let body = success_body(response, "/generate_caption").await?;
        // The caption isn't part of the diary flow; a non-JSON 200 is still a success.
        Ok(serde_json::from_str::<CaptionResponse>(&body)
            .ok()
            .and_then(|c| c.caption))
    }

    pub async fn initial_question(&self) -> Result<InitialQuestion> {
        self.get_json("/initial_question").await
    }

    pub async fn followup_question(&self, user_answer: &str) -> Result<Followup> {
        debug!(path = "/followup_question", "POST");
        let response = self
            .client
            .post(self.url("/followup_question"))
            .json(&FollowupRequest { user_answer })
            .send()
            .await?;

        let body = success_body(response, "/followup_question").await?;
        decode(body)
    }

    pub async fn summarize_conversation(&self) -> Result<DiarySummary> {
        self.get_json("/summarize_conversation").await
    }

    pub async fn recommend_song(&self) -> Result<SongRecommendation> {
        self.get_json("/recommend_song").await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!(path, "GET");
        let response = self.client.get(self.url(path)).send().await?;
        let body = success_body(response, path).await?;
        decode(body)
    }
}

async fn success_body(response: Response, path: &str) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;

    if status != StatusCode::OK {
        warn!(path, status = status.as_u16(), "backend request failed");
        return Err(DiaryError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(body)
}

fn decode<T: DeserializeOwned>(body: String) -> Result<T> {
    match serde_json::from_str(&body) {
        Ok(value) => Ok(value),
        Err(source) => {
            warn!(error = %source, "backend response did not match the expected shape");
            Err(DiaryError::Decode { body, source })
        }
    }
}
