//! HTTP client helpers for tests.

#![allow(dead_code)]

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TestClient {
    client: reqwest::Client,
    base_url: String,
}

/// One `POST /verify` submission.
pub struct Submission<'a> {
    pub image: Option<&'a [u8]>,
    pub challenge_code: Option<&'a str>,
    pub challenge_title: Option<&'a str>,
    pub member_id: Option<&'a str>,
}

impl<'a> Submission<'a> {
    pub fn new(image: &'a [u8], code: &'a str, title: &'a str) -> Self {
        Self {
            image: Some(image),
            challenge_code: Some(code),
            challenge_title: Some(title),
            member_id: None,
        }
    }

    pub fn member(mut self, member_id: &'a str) -> Self {
        self.member_id = Some(member_id);
        self
    }

    fn into_form(self) -> Form {
        let mut form = Form::new();
        if let Some(image) = self.image {
            let part = Part::bytes(image.to_vec())
                .file_name("photo.jpg")
                .mime_str("image/jpeg")
                .expect("valid mime");
            form = form.part("image", part);
        }
        if let Some(code) = self.challenge_code {
            form = form.text("challengeCode", code.to_string());
        }
        if let Some(title) = self.challenge_title {
            form = form.text("challengeTitle", title.to_string());
        }
        if let Some(member) = self.member_id {
            form = form.text("memberId", member.to_string());
        }
        form
    }
}

impl TestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url, path)
    }

    /// Returns the status code and the JSON body.
    pub async fn verify(
        &self,
        submission: Submission<'_>,
    ) -> Result<(u16, serde_json::Value), TestClientError> {
        let resp = self
            .client
            .post(self.url("/verify"))
            .multipart(submission.into_form())
            .send()
            .await?;

        let status = resp.status().as_u16();
        Ok((status, resp.json().await?))
    }

    pub async fn health(&self) -> Result<HealthResponse, TestClientError> {
        self.get_json("/healthz").await
    }

    pub async fn challenges(&self) -> Result<Vec<ChallengeRow>, TestClientError> {
        self.get_json("/challenges").await
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, TestClientError> {
        let resp = self.client.get(self.url(path)).send().await?;

        if resp.status().is_success() {
            Ok(resp.json().await?)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(TestClientError::UnexpectedStatus(status, body))
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeRow {
    pub code: String,
    pub title: String,
    pub similarity_threshold: f32,
    pub keyword_match_threshold: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum TestClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0} - Body: {1}")]
    UnexpectedStatus(u16, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_url_building() {
        let client = TestClient::new("http://localhost:8080");
        assert_eq!(client.url("/healthz"), "http://localhost:8080/healthz");
        assert_eq!(client.url("healthz"), "http://localhost:8080/healthz");
    }
}
