// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use localize_app::{
    Attributor, CommittedString, MISSING_MACHINE_TRANSLATION, MachineTranslation, SegmentId,
    Snapshot, TranslationBackend,
};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Blocking HTTP client for the translation server's editor endpoints.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            bail!("backend.base_url must not be empty");
        }

        // Relative edit URLs resolve beneath the base path only when it ends
        // with a slash.
        let normalized = format!("{}/", trimmed.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .with_context(|| format!("parse backend.base_url {trimmed:?}"))?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn resolve(&self, endpoint: &str) -> Result<Url> {
        self.base_url
            .join(endpoint.trim())
            .with_context(|| format!("resolve endpoint {endpoint:?} against {}", self.base_url))
    }

    pub fn fetch_snapshot(&self, endpoint: &str) -> Result<Snapshot> {
        let url = self.resolve(endpoint)?;
        debug!(%url, "fetching snapshot");
        let response = self
            .http
            .get(url.clone())
            .send()
            .map_err(|error| connection_error(&url, error))?;

        let status = response.status();
        let body = response.text().context("read snapshot body")?;
        if !status.is_success() {
            return Err(clean_error_response(status, &body));
        }
        Snapshot::from_json(&body)
    }

    fn post_json<B, R>(&self, endpoint: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.resolve(endpoint)?;
        debug!(%url, "POST");
        let response = self
            .http
            .post(url.clone())
            .json(body)
            .send()
            .map_err(|error| connection_error(&url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        response
            .json()
            .map_err(|error| anyhow!("unreadable response from {url}: {error}"))
    }
}

impl TranslationBackend for Client {
    fn save_string(&self, edit_url: &str, value: &str) -> Result<CommittedString> {
        let parsed: StringSaveResponse = self.post_json(edit_url, &SaveRequest { value })?;
        if let Some(error) = parsed.error.filter(|error| !error.is_empty()) {
            bail!("{error}");
        }
        Ok(CommittedString {
            value: parsed.data.unwrap_or_else(|| value.to_owned()),
            translated_by: parsed.last_translated_by,
        })
    }

    fn save_override(&self, edit_url: &str, value: &Value) -> Result<Value> {
        let parsed: OverrideSaveResponse = self.post_json(edit_url, &SaveRequest { value })?;
        if let Some(error) = parsed.error.filter(|error| !error.is_empty()) {
            bail!("{error}");
        }
        Ok(parsed.data.unwrap_or_else(|| value.clone()))
    }

    fn machine_translate(
        &self,
        url: &str,
        segment_ids: &[SegmentId],
    ) -> Result<Vec<MachineTranslation>> {
        let parsed: MachineTranslateResponse =
            self.post_json(url, &MachineTranslateRequest { segment_ids })?;
        Ok(parsed
            .translations
            .into_iter()
            .map(MachineTranslationRow::into_translation)
            .collect())
    }
}

fn connection_error(url: &Url, error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("Network error: request to {url} timed out");
    }
    anyhow!("Network error: cannot reach {url} ({error})")
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.is_empty()
    {
        return anyhow!("{error}");
    }

    if !body.is_empty() && body.len() < 100 && !body.contains('<') && !body.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Serialize)]
struct SaveRequest<'a, T: ?Sized> {
    value: &'a T,
}

#[derive(Debug, Serialize)]
struct MachineTranslateRequest<'a> {
    segment_ids: &'a [SegmentId],
}

#[derive(Debug, Deserialize)]
struct StringSaveResponse {
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    last_translated_by: Option<Attributor>,
}

#[derive(Debug, Deserialize)]
struct OverrideSaveResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MachineTranslateResponse {
    translations: Vec<MachineTranslationRow>,
}

#[derive(Debug, Deserialize)]
struct MachineTranslationRow {
    segment_id: SegmentId,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl MachineTranslationRow {
    fn into_translation(self) -> MachineTranslation {
        match (self.data, self.error) {
            (_, Some(message)) if !message.is_empty() => MachineTranslation::Failed {
                segment_id: self.segment_id,
                message,
            },
            (Some(value), _) => MachineTranslation::Translated {
                segment_id: self.segment_id,
                value,
            },
            _ => MachineTranslation::Failed {
                segment_id: self.segment_id,
                message: MISSING_MACHINE_TRANSLATION.to_owned(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
}
