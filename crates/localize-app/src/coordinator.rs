// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use crate::ids::SegmentId;
use crate::model::{Attributor, SegmentKind};
use crate::session::EditorSession;
use crate::state::{EditorAction, EditorEvent, IgnoreReason};

pub const MISSING_MACHINE_TRANSLATION: &str = "no machine translation returned";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedString {
    pub value: String,
    pub translated_by: Option<Attributor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineTranslation {
    Translated { segment_id: SegmentId, value: String },
    Failed { segment_id: SegmentId, message: String },
}

impl MachineTranslation {
    pub const fn segment_id(&self) -> SegmentId {
        match self {
            Self::Translated { segment_id, .. } | Self::Failed { segment_id, .. } => *segment_id,
        }
    }
}

/// Persistence collaborator. Errors are shown to the translator, so their
/// top-level message should read as a user-facing explanation.
pub trait TranslationBackend: Send + Sync {
    fn save_string(&self, edit_url: &str, value: &str) -> Result<CommittedString>;
    fn save_override(&self, edit_url: &str, value: &Value) -> Result<Value>;
    fn machine_translate(
        &self,
        url: &str,
        segment_ids: &[SegmentId],
    ) -> Result<Vec<MachineTranslation>>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveValue {
    String(String),
    Override(Value),
}

impl SaveValue {
    const fn kind(&self) -> SegmentKind {
        match self {
            Self::String(_) => SegmentKind::String,
            Self::Override(_) => SegmentKind::SynchronisedValue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveRequestOutcome {
    Issued,
    /// Held until the in-flight save is reconciled, replacing any value
    /// queued earlier.
    Queued,
    Rejected(IgnoreReason),
}

#[derive(Debug)]
enum Completion {
    String {
        segment_id: SegmentId,
        result: std::result::Result<CommittedString, String>,
    },
    Override {
        segment_id: SegmentId,
        result: std::result::Result<Value, String>,
    },
    MachineTranslation {
        segment_ids: Vec<SegmentId>,
        result: std::result::Result<Vec<MachineTranslation>, String>,
    },
}

/// Issues per-segment saves on worker threads and reconciles the replies
/// into the session on the caller's thread.
///
/// At most one save per segment is in flight. Requests made meanwhile are
/// queued, and only the latest queued value is sent.
pub struct SaveCoordinator {
    backend: Arc<dyn TranslationBackend>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    in_flight: HashSet<SegmentId>,
    pending: HashMap<SegmentId, SaveValue>,
    machine_batches: usize,
}

impl SaveCoordinator {
    pub fn new(backend: Arc<dyn TranslationBackend>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            backend,
            tx,
            rx,
            in_flight: HashSet::new(),
            pending: HashMap::new(),
            machine_batches: 0,
        }
    }

    pub fn is_in_flight(&self, segment_id: SegmentId) -> bool {
        self.in_flight.contains(&segment_id)
    }

    pub fn pending_value(&self, segment_id: SegmentId) -> Option<&SaveValue> {
        self.pending.get(&segment_id)
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty() && self.machine_batches == 0
    }

    pub fn request_save(
        &mut self,
        session: &mut EditorSession,
        segment_id: SegmentId,
        value: SaveValue,
    ) -> SaveRequestOutcome {
        let Some(kind) = session.segments().kind_of(segment_id) else {
            return SaveRequestOutcome::Rejected(IgnoreReason::UnknownSegment);
        };
        if kind != value.kind() {
            return SaveRequestOutcome::Rejected(IgnoreReason::WrongKind);
        }

        // A failed save leaves this value in state for `retry`.
        record_value(session, segment_id, &value);

        if self.in_flight.contains(&segment_id) {
            if self.pending.insert(segment_id, value).is_some() {
                info!(%segment_id, "superseded queued save");
            }
            return SaveRequestOutcome::Queued;
        }

        self.issue(session, segment_id, value, &mut Vec::new())
    }

    /// Re-sends the segment's current value, for example after a failure.
    pub fn retry(
        &mut self,
        session: &mut EditorSession,
        segment_id: SegmentId,
    ) -> SaveRequestOutcome {
        let value = match session.segments().kind_of(segment_id) {
            None => return SaveRequestOutcome::Rejected(IgnoreReason::UnknownSegment),
            Some(SegmentKind::String) => SaveValue::String(
                session
                    .state()
                    .translation(segment_id)
                    .map(|translation| translation.value.clone())
                    .unwrap_or_default(),
            ),
            Some(SegmentKind::SynchronisedValue) => SaveValue::Override(
                session
                    .state()
                    .segment_override(segment_id)
                    .map(|entry| entry.value.clone())
                    .unwrap_or(Value::Null),
            ),
        };
        self.request_save(session, segment_id, value)
    }

    pub fn request_machine_translation(
        &mut self,
        session: &EditorSession,
        segment_ids: Vec<SegmentId>,
    ) -> Result<()> {
        let url = session
            .machine_translate_url()
            .ok_or_else(|| anyhow!("snapshot has no machine translation endpoint"))?
            .to_owned();
        if segment_ids.is_empty() {
            return Ok(());
        }

        info!(count = segment_ids.len(), "requesting machine translation");
        self.machine_batches += 1;
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = backend
                .machine_translate(&url, &segment_ids)
                .map_err(|error| error.to_string());
            let _ = tx.send(Completion::MachineTranslation {
                segment_ids,
                result,
            });
        });
        Ok(())
    }

    /// Reconciles every reply that has already arrived, without blocking.
    pub fn pump(&mut self, session: &mut EditorSession) -> Vec<EditorEvent> {
        let mut events = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            events.extend(self.reconcile(session, completion));
        }
        events
    }

    /// Blocks for the next reply and reconciles it.
    pub fn wait_next(
        &mut self,
        session: &mut EditorSession,
        timeout: Duration,
    ) -> Result<Vec<EditorEvent>> {
        match self.rx.recv_timeout(timeout) {
            Ok(completion) => Ok(self.reconcile(session, completion)),
            Err(RecvTimeoutError::Timeout) => bail!(
                "timed out after {timeout:?} waiting for {} save(s) to finish",
                self.in_flight.len()
            ),
            Err(RecvTimeoutError::Disconnected) => bail!("save completion channel closed"),
        }
    }

    /// Blocks until every in-flight and queued request has been reconciled.
    /// `timeout` bounds the wait for each individual reply.
    pub fn drain(
        &mut self,
        session: &mut EditorSession,
        timeout: Duration,
    ) -> Result<Vec<EditorEvent>> {
        let mut events = Vec::new();
        while !self.is_idle() {
            events.extend(self.wait_next(session, timeout)?);
        }
        Ok(events)
    }

    fn issue(
        &mut self,
        session: &mut EditorSession,
        segment_id: SegmentId,
        value: SaveValue,
        events: &mut Vec<EditorEvent>,
    ) -> SaveRequestOutcome {
        let action = match value {
            SaveValue::String(_) => EditorAction::SaveRequested { segment_id },
            SaveValue::Override(_) => EditorAction::OverrideSaveRequested { segment_id },
        };
        let started = session.apply(action);
        if let Some(EditorEvent::Ignored { reason, .. }) = started.first() {
            return SaveRequestOutcome::Rejected(*reason);
        }
        events.extend(started);

        let Some(edit_url) = session
            .segments()
            .get(segment_id)
            .map(|segment| segment.edit_url.clone())
        else {
            return SaveRequestOutcome::Rejected(IgnoreReason::UnknownSegment);
        };

        info!(%segment_id, %edit_url, "issuing save");
        self.in_flight.insert(segment_id);
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let completion = match value {
                SaveValue::String(text) => Completion::String {
                    segment_id,
                    result: backend
                        .save_string(&edit_url, &text)
                        .map_err(|error| error.to_string()),
                },
                SaveValue::Override(value) => Completion::Override {
                    segment_id,
                    result: backend
                        .save_override(&edit_url, &value)
                        .map_err(|error| error.to_string()),
                },
            };
            // The receiver only disappears with the session itself.
            let _ = tx.send(completion);
        });
        SaveRequestOutcome::Issued
    }

    fn reconcile(
        &mut self,
        session: &mut EditorSession,
        completion: Completion,
    ) -> Vec<EditorEvent> {
        let (segment_id, action) = match completion {
            Completion::MachineTranslation {
                segment_ids,
                result,
            } => {
                self.machine_batches = self.machine_batches.saturating_sub(1);
                return apply_machine_translations(session, &segment_ids, result);
            }
            Completion::String { segment_id, result } => (
                segment_id,
                match result {
                    Ok(committed) => {
                        info!(%segment_id, "save succeeded");
                        EditorAction::SaveSucceeded {
                            segment_id,
                            value: committed.value,
                            translated_by: committed.translated_by,
                        }
                    }
                    Err(message) => {
                        warn!(%segment_id, %message, "save failed");
                        EditorAction::SaveFailed {
                            segment_id,
                            message,
                        }
                    }
                },
            ),
            Completion::Override { segment_id, result } => (
                segment_id,
                match result {
                    Ok(value) => EditorAction::OverrideSaveSucceeded { segment_id, value },
                    Err(message) => EditorAction::OverrideSaveFailed {
                        segment_id,
                        message,
                    },
                },
            ),
        };

        self.in_flight.remove(&segment_id);
        let mut events = session.apply(action);
        if let Some(next) = self.pending.remove(&segment_id) {
            let outcome = self.issue(session, segment_id, next, &mut events);
            if outcome != SaveRequestOutcome::Issued {
                warn!(%segment_id, ?outcome, "queued save was not issued");
            }
        }
        events
    }
}

fn record_value(session: &mut EditorSession, segment_id: SegmentId, value: &SaveValue) {
    let state = session.state();
    let action = match value {
        SaveValue::String(text) => {
            if state
                .translation(segment_id)
                .is_some_and(|translation| translation.value == *text)
            {
                return;
            }
            EditorAction::Edit {
                segment_id,
                value: text.clone(),
            }
        }
        SaveValue::Override(value) => {
            if state
                .segment_override(segment_id)
                .is_some_and(|entry| entry.value == *value)
            {
                return;
            }
            EditorAction::EditOverride {
                segment_id,
                value: value.clone(),
            }
        }
    };
    session.apply(action);
}

fn apply_machine_translations(
    session: &mut EditorSession,
    requested: &[SegmentId],
    result: std::result::Result<Vec<MachineTranslation>, String>,
) -> Vec<EditorEvent> {
    let translations = match result {
        Ok(translations) => translations,
        Err(message) => {
            warn!(%message, "machine translation batch failed");
            return requested
                .iter()
                .flat_map(|segment_id| {
                    session.apply(EditorAction::MachineTranslationFailed {
                        segment_id: *segment_id,
                        message: message.clone(),
                    })
                })
                .collect();
        }
    };

    let mut answered = HashSet::new();
    let mut events = Vec::new();
    for translation in translations {
        let segment_id = translation.segment_id();
        if !requested.contains(&segment_id) || !answered.insert(segment_id) {
            warn!(%segment_id, "dropping unrequested machine translation");
            continue;
        }
        let action = match translation {
            MachineTranslation::Translated { segment_id, value } => {
                EditorAction::MachineTranslationApplied { segment_id, value }
            }
            MachineTranslation::Failed {
                segment_id,
                message,
            } => EditorAction::MachineTranslationFailed {
                segment_id,
                message,
            },
        };
        events.extend(session.apply(action));
    }

    for segment_id in requested.iter().filter(|id| !answered.contains(*id)) {
        events.extend(session.apply(EditorAction::MachineTranslationFailed {
            segment_id: *segment_id,
            message: MISSING_MACHINE_TRANSLATION.to_owned(),
        }));
    }
    events
}
