// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use localize_app::{
    EditOrigin, EditorEvent, EditorSession, SaveCoordinator, SaveRequestOutcome, SaveValue,
    SegmentId, SegmentKind, TranslationBackend,
};
use serde_json::Value;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Drives one editing session headlessly: applies edits, waits for the
/// backend, and reports the resulting tab state.
pub struct EditorRuntime {
    session: EditorSession,
    coordinator: SaveCoordinator,
    timeout: Duration,
}

impl EditorRuntime {
    pub fn new(
        session: EditorSession,
        backend: Arc<dyn TranslationBackend>,
        timeout: Duration,
    ) -> Self {
        Self {
            session,
            coordinator: SaveCoordinator::new(backend),
            timeout,
        }
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    /// Edits a segment and requests a save. Synchronised values take JSON;
    /// anything that does not parse is saved as a JSON string.
    pub fn apply_edit(&mut self, segment_id: SegmentId, raw: &str) -> Result<()> {
        let Some(kind) = self.session.segments().kind_of(segment_id) else {
            bail!("segment {segment_id} is not part of this snapshot");
        };

        let value = match kind {
            SegmentKind::String => SaveValue::String(raw.to_owned()),
            SegmentKind::SynchronisedValue => SaveValue::Override(
                serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw)),
            ),
        };

        match self.coordinator.request_save(&mut self.session, segment_id, value) {
            SaveRequestOutcome::Rejected(reason) => {
                bail!("cannot save segment {segment_id}: {}", reason.as_str())
            }
            outcome => {
                debug!(%segment_id, ?outcome, "save requested");
                Ok(())
            }
        }
    }

    /// Machine translates every string without a value and saves each
    /// suggestion that comes back.
    pub fn machine_translate_missing(&mut self) -> Result<usize> {
        let missing = self.session.untranslated_strings();
        if missing.is_empty() {
            return Ok(0);
        }

        info!(count = missing.len(), "machine translating untranslated strings");
        self.coordinator.request_machine_translation(&self.session, missing)?;
        let events = self.coordinator.drain(&mut self.session, self.timeout)?;

        let mut saved = 0;
        for event in events {
            let EditorEvent::ValueChanged {
                segment_id,
                origin: EditOrigin::Machine,
            } = event
            else {
                continue;
            };
            let value = self
                .session
                .state()
                .translation(segment_id)
                .map(|translation| translation.value.clone())
                .unwrap_or_default();
            let outcome = self.coordinator.request_save(
                &mut self.session,
                segment_id,
                SaveValue::String(value),
            );
            if matches!(outcome, SaveRequestOutcome::Issued | SaveRequestOutcome::Queued) {
                saved += 1;
            }
        }
        Ok(saved)
    }

    /// Waits for every outstanding save.
    pub fn finish(&mut self) -> Result<Vec<EditorEvent>> {
        self.coordinator.drain(&mut self.session, self.timeout)
    }

    pub fn error_count(&self) -> usize {
        self.session.tabs().total_errors()
    }

    pub fn report(&self) -> String {
        let layout = self.session.tabs();
        let mut out = String::new();
        for tab in &layout.tabs {
            let _ = write!(out, "{} ({} segments", tab.label, tab.entries.len());
            if tab.num_errors > 0 {
                let _ = write!(out, ", {} errors", tab.num_errors);
            }
            out.push_str(")\n");

            for entry in tab.entries.iter().filter(|entry| entry.is_errored()) {
                let message = entry
                    .translation
                    .and_then(|translation| translation.error_message())
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "  #{} {}: {}",
                    entry.segment.id, entry.segment.location.field, message
                );
            }
        }
        let _ = writeln!(out, "{}", self.session.progress().summary());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::EditorRuntime;
    use anyhow::Result;
    use localize_app::{SegmentId, TranslationStatus};
    use localize_testkit::{EchoBackend, scenario_session};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn edits_are_saved_and_reported() -> Result<()> {
        let backend = Arc::new(EchoBackend::default());
        let mut runtime = EditorRuntime::new(scenario_session()?, backend.clone(), WAIT);

        runtime.apply_edit(SegmentId::new(1), "Bonjour")?;
        runtime.apply_edit(SegmentId::new(3), "13")?;
        runtime.finish()?;

        let state = runtime.session().state();
        assert_eq!(
            state.translation_status(SegmentId::new(1)),
            TranslationStatus::Saved
        );
        assert_eq!(
            state
                .segment_override(SegmentId::new(3))
                .map(|entry| entry.value.clone()),
            Some(json!(13))
        );
        // Saves run on separate workers, so arrival order is not fixed.
        let mut calls = backend.calls();
        calls.sort();
        assert_eq!(
            calls,
            vec![
                "override /translate/7/overrides/3/edit/ 13".to_owned(),
                "string /translate/7/strings/1/edit/ Bonjour".to_owned(),
            ]
        );
        assert_eq!(
            runtime.report(),
            "Content (2 segments)\nMeta (1 segments)\n1 of 2 strings translated\n"
        );
        Ok(())
    }

    #[test]
    fn failed_saves_are_listed_under_their_tab() -> Result<()> {
        let backend = Arc::new(EchoBackend::failing_on(&["Bienvenue"]));
        let mut runtime = EditorRuntime::new(scenario_session()?, backend, WAIT);

        runtime.apply_edit(SegmentId::new(2), "Bienvenue")?;
        runtime.finish()?;

        assert_eq!(runtime.error_count(), 1);
        assert_eq!(
            runtime.report(),
            "Content (2 segments, 1 errors)\n  #2 Body: Network error\nMeta (1 segments)\n1 of 2 strings translated, 1 errored\n"
        );
        Ok(())
    }

    #[test]
    fn unknown_segment_is_an_error() -> Result<()> {
        let mut runtime =
            EditorRuntime::new(scenario_session()?, Arc::new(EchoBackend::default()), WAIT);
        let error = runtime
            .apply_edit(SegmentId::new(99), "x")
            .expect_err("unknown segment should fail");
        assert!(error.to_string().contains("not part of this snapshot"));
        Ok(())
    }

    #[test]
    fn non_json_override_is_saved_as_string() -> Result<()> {
        let backend = Arc::new(EchoBackend::default());
        let mut runtime = EditorRuntime::new(scenario_session()?, backend.clone(), WAIT);

        runtime.apply_edit(SegmentId::new(3), "hero.png")?;
        runtime.finish()?;

        assert_eq!(
            runtime
                .session()
                .state()
                .segment_override(SegmentId::new(3))
                .map(|entry| entry.value.clone()),
            Some(json!("hero.png"))
        );
        Ok(())
    }

    #[test]
    fn machine_translation_fills_and_saves_missing_strings() -> Result<()> {
        let backend = Arc::new(EchoBackend::default());
        let mut runtime = EditorRuntime::new(scenario_session()?, backend.clone(), WAIT);

        runtime.apply_edit(SegmentId::new(1), "Bonjour")?;
        runtime.finish()?;
        let saved = runtime.machine_translate_missing()?;
        runtime.finish()?;

        assert_eq!(saved, 1);
        let state = runtime.session().state();
        assert_eq!(
            state
                .translation(SegmentId::new(2))
                .map(|translation| translation.value.as_str()),
            Some("mt 2")
        );
        assert_eq!(
            state.translation_status(SegmentId::new(2)),
            TranslationStatus::Saved
        );
        assert_eq!(
            backend.calls().last().map(String::as_str),
            Some("string /translate/7/strings/2/edit/ mt 2")
        );
        assert_eq!(runtime.machine_translate_missing()?, 0);
        Ok(())
    }
}
