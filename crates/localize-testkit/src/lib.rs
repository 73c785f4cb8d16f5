// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use localize_app::{
    Attributor, CommittedString, EditorSession, MachineTranslation, SegmentId, Snapshot,
    TranslationBackend,
};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Two `string` segments on "content" and one `synchronised_value` on
/// "meta", with no prior translations.
pub const SCENARIO_SNAPSHOT_JSON: &str = r#"{
    "tabs": [
        {"label": "Content", "slug": "content"},
        {"label": "Meta", "slug": "meta"},
        {"label": "Settings", "slug": "settings"}
    ],
    "segments": [
        {
            "type": "string",
            "id": 1,
            "contentPath": "title",
            "location": {"tab": "content", "field": "Title", "helpText": "", "widget": {"type": "text"}},
            "source": "Hello",
            "editUrl": "/translate/7/strings/1/edit/"
        },
        {
            "type": "string",
            "id": 2,
            "contentPath": "body.0a1b.heading",
            "location": {"tab": "content", "field": "Body", "blockId": "0a1b", "subField": "heading", "helpText": "", "widget": {"type": "text"}},
            "source": "Welcome",
            "editUrl": "/translate/7/strings/2/edit/"
        },
        {
            "type": "synchronised_value",
            "id": 3,
            "contentPath": "feed_image",
            "location": {"tab": "meta", "field": "Feed image", "helpText": "Shown in listings", "widget": {"type": "image_chooser"}},
            "value": 12,
            "editUrl": "/translate/7/overrides/3/edit/"
        }
    ],
    "stringTranslations": [],
    "overrides": [],
    "machineTranslateUrl": "/translate/7/machine_translate/"
}"#;

pub const TRANSLATOR_NAME: &str = "Test Translator";

pub fn scenario_snapshot() -> Result<Snapshot> {
    Snapshot::from_json(SCENARIO_SNAPSHOT_JSON)
}

pub fn scenario_session() -> Result<EditorSession> {
    let snapshot = scenario_snapshot()?;
    EditorSession::from_snapshot(&snapshot).context("build scenario session")
}

/// Writes a snapshot document into a fresh temp dir. Keep the `TempDir`
/// alive for as long as the path is used.
pub fn write_snapshot_file(raw: &str) -> Result<(TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("snapshot.json");
    fs::write(&path, raw).with_context(|| format!("write {}", path.display()))?;
    Ok((dir, path))
}

/// Backend that answers immediately: strings are committed as sent unless
/// listed in `failing`, overrides are echoed, and machine translation
/// prefixes the segment id.
#[derive(Debug, Default)]
pub struct EchoBackend {
    failing: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
}

impl EchoBackend {
    pub fn failing_on(values: &[&str]) -> Self {
        Self {
            failing: Mutex::new(values.iter().map(|value| (*value).to_owned()).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl TranslationBackend for EchoBackend {
    fn save_string(&self, edit_url: &str, value: &str) -> Result<CommittedString> {
        self.record(format!("string {edit_url} {value}"));
        let failing = self
            .failing
            .lock()
            .map_err(|_| anyhow!("echo backend lock poisoned"))?;
        if failing.iter().any(|candidate| candidate == value) {
            return Err(anyhow!("Network error"));
        }
        Ok(CommittedString {
            value: value.to_owned(),
            translated_by: Some(Attributor::named(TRANSLATOR_NAME)),
        })
    }

    fn save_override(&self, edit_url: &str, value: &Value) -> Result<Value> {
        self.record(format!("override {edit_url} {value}"));
        Ok(value.clone())
    }

    fn machine_translate(
        &self,
        url: &str,
        segment_ids: &[SegmentId],
    ) -> Result<Vec<MachineTranslation>> {
        self.record(format!("machine {url} {}", segment_ids.len()));
        Ok(segment_ids
            .iter()
            .map(|segment_id| MachineTranslation::Translated {
                segment_id: *segment_id,
                value: format!("mt {segment_id}"),
            })
            .collect())
    }
}

pub type Reply<T> = std::result::Result<T, String>;

/// One request observed by a [`ChannelBackend`]. The worker thread blocks
/// until the test sends a reply.
#[derive(Debug)]
pub enum BackendCall {
    SaveString {
        edit_url: String,
        value: String,
        reply: Sender<Reply<CommittedString>>,
    },
    SaveOverride {
        edit_url: String,
        value: Value,
        reply: Sender<Reply<Value>>,
    },
    MachineTranslate {
        url: String,
        segment_ids: Vec<SegmentId>,
        reply: Sender<Reply<Vec<MachineTranslation>>>,
    },
}

/// Backend that hands every request to the test, so replies can be held
/// back or delivered out of order.
#[derive(Debug)]
pub struct ChannelBackend {
    calls: Mutex<Sender<BackendCall>>,
}

pub fn channel_backend() -> (Arc<ChannelBackend>, Receiver<BackendCall>) {
    let (tx, rx) = mpsc::channel();
    (
        Arc::new(ChannelBackend {
            calls: Mutex::new(tx),
        }),
        rx,
    )
}

impl ChannelBackend {
    fn round_trip<T>(&self, build: impl FnOnce(Sender<Reply<T>>) -> BackendCall) -> Result<T> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.calls
            .lock()
            .map_err(|_| anyhow!("channel backend lock poisoned"))?
            .send(build(reply_tx))
            .map_err(|_| anyhow!("test stopped listening for backend calls"))?;
        reply_rx
            .recv()
            .map_err(|_| anyhow!("backend call dropped without a reply"))?
            .map_err(|message| anyhow!(message))
    }
}

impl TranslationBackend for ChannelBackend {
    fn save_string(&self, edit_url: &str, value: &str) -> Result<CommittedString> {
        self.round_trip(|reply| BackendCall::SaveString {
            edit_url: edit_url.to_owned(),
            value: value.to_owned(),
            reply,
        })
    }

    fn save_override(&self, edit_url: &str, value: &Value) -> Result<Value> {
        self.round_trip(|reply| BackendCall::SaveOverride {
            edit_url: edit_url.to_owned(),
            value: value.clone(),
            reply,
        })
    }

    fn machine_translate(
        &self,
        url: &str,
        segment_ids: &[SegmentId],
    ) -> Result<Vec<MachineTranslation>> {
        self.round_trip(|reply| BackendCall::MachineTranslate {
            url: url.to_owned(),
            segment_ids: segment_ids.to_vec(),
            reply,
        })
    }
}

/// Waits for the next call a [`ChannelBackend`] receives.
pub fn next_call(calls: &Receiver<BackendCall>) -> Result<BackendCall> {
    calls
        .recv_timeout(Duration::from_secs(5))
        .context("no backend call arrived within 5s")
}

#[cfg(test)]
mod tests {
    use super::{SCENARIO_SNAPSHOT_JSON, scenario_session, write_snapshot_file};
    use anyhow::Result;
    use std::fs;

    #[test]
    fn scenario_session_builds() -> Result<()> {
        let session = scenario_session()?;
        assert_eq!(session.segments().len(), 3);
        assert_eq!(session.tabs().tabs.len(), 2);
        Ok(())
    }

    #[test]
    fn snapshot_file_round_trips() -> Result<()> {
        let (_dir, path) = write_snapshot_file(SCENARIO_SNAPSHOT_JSON)?;
        assert_eq!(fs::read_to_string(path)?, SCENARIO_SNAPSHOT_JSON);
        Ok(())
    }
}
