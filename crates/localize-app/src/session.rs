// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::warn;

use crate::ids::SegmentId;
use crate::model::{SegmentKind, Snapshot};
use crate::segments::{SegmentSet, SnapshotResult};
use crate::state::{EditorAction, EditorEvent, IgnoreReason};
use crate::store::EditorState;
use crate::tabs::{EditorProgress, TabLayout, derive_progress, derive_tabs};

/// One translator's editing session over a single snapshot.
///
/// Owns the segments and the state; every derivation and the save
/// coordinator go through it.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSession {
    segments: SegmentSet,
    state: EditorState,
    machine_translate_url: Option<String>,
}

impl EditorSession {
    pub fn from_snapshot(snapshot: &Snapshot) -> SnapshotResult<Self> {
        let segments = SegmentSet::from_snapshot(snapshot)?;
        let state = EditorState::from_snapshot(snapshot, &segments)?;
        Ok(Self {
            segments,
            state,
            machine_translate_url: snapshot
                .machine_translate_url
                .clone()
                .filter(|url| !url.trim().is_empty()),
        })
    }

    pub fn segments(&self) -> &SegmentSet {
        &self.segments
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn machine_translate_url(&self) -> Option<&str> {
        self.machine_translate_url.as_deref()
    }

    /// Applies an edit or machine-translation action after checking it
    /// targets a segment of the right variant in this snapshot. Save
    /// requests and results are refused; use
    /// [`SaveCoordinator`](crate::SaveCoordinator) for those.
    pub fn dispatch(&mut self, action: EditorAction) -> Vec<EditorEvent> {
        if action.is_save_lifecycle() {
            return reject(action.segment_id(), IgnoreReason::CoordinatorOwned);
        }
        self.apply(action)
    }

    pub(crate) fn apply(&mut self, action: EditorAction) -> Vec<EditorEvent> {
        let segment_id = action.segment_id();
        match self.segments.kind_of(segment_id) {
            None => reject(segment_id, IgnoreReason::UnknownSegment),
            Some(kind) if kind != action.target_kind() => {
                reject(segment_id, IgnoreReason::WrongKind)
            }
            Some(_) => self.state.dispatch(action),
        }
    }

    pub fn tabs(&self) -> TabLayout<'_> {
        derive_tabs(&self.segments, &self.state)
    }

    pub fn progress(&self) -> EditorProgress {
        derive_progress(&self.segments, &self.state)
    }

    /// String segments with no saved value, in snapshot order.
    pub fn untranslated_strings(&self) -> Vec<SegmentId> {
        self.segments
            .iter()
            .filter(|segment| segment.kind() == SegmentKind::String)
            .filter(|segment| {
                self.state
                    .translation(segment.id)
                    .is_none_or(|translation| translation.value.is_empty())
            })
            .map(|segment| segment.id)
            .collect()
    }
}

fn reject(segment_id: SegmentId, reason: IgnoreReason) -> Vec<EditorEvent> {
    warn!(%segment_id, reason = reason.as_str(), "rejecting action");
    vec![EditorEvent::Ignored { segment_id, reason }]
}
