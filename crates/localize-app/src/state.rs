// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::Value;
use tracing::{debug, warn};

use crate::ids::SegmentId;
use crate::model::{Attributor, SegmentKind};
use crate::store::{EditorState, SegmentOverride, StringTranslation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOrigin {
    Translator,
    Machine,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    Edit {
        segment_id: SegmentId,
        value: String,
    },
    SaveRequested {
        segment_id: SegmentId,
    },
    SaveSucceeded {
        segment_id: SegmentId,
        value: String,
        translated_by: Option<Attributor>,
    },
    SaveFailed {
        segment_id: SegmentId,
        message: String,
    },
    MachineTranslationApplied {
        segment_id: SegmentId,
        value: String,
    },
    MachineTranslationFailed {
        segment_id: SegmentId,
        message: String,
    },
    EditOverride {
        segment_id: SegmentId,
        value: Value,
    },
    OverrideSaveRequested {
        segment_id: SegmentId,
    },
    OverrideSaveSucceeded {
        segment_id: SegmentId,
        value: Value,
    },
    OverrideSaveFailed {
        segment_id: SegmentId,
        message: String,
    },
}

impl EditorAction {
    pub const fn segment_id(&self) -> SegmentId {
        match self {
            Self::Edit { segment_id, .. }
            | Self::SaveRequested { segment_id }
            | Self::SaveSucceeded { segment_id, .. }
            | Self::SaveFailed { segment_id, .. }
            | Self::MachineTranslationApplied { segment_id, .. }
            | Self::MachineTranslationFailed { segment_id, .. }
            | Self::EditOverride { segment_id, .. }
            | Self::OverrideSaveRequested { segment_id }
            | Self::OverrideSaveSucceeded { segment_id, .. }
            | Self::OverrideSaveFailed { segment_id, .. } => *segment_id,
        }
    }

    /// Save requests and results. Only the save coordinator may issue these
    /// against a session, so its in-flight bookkeeping matches the state.
    pub const fn is_save_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::SaveRequested { .. }
                | Self::SaveSucceeded { .. }
                | Self::SaveFailed { .. }
                | Self::OverrideSaveRequested { .. }
                | Self::OverrideSaveSucceeded { .. }
                | Self::OverrideSaveFailed { .. }
        )
    }

    /// The segment variant this action is valid for.
    pub const fn target_kind(&self) -> SegmentKind {
        match self {
            Self::Edit { .. }
            | Self::SaveRequested { .. }
            | Self::SaveSucceeded { .. }
            | Self::SaveFailed { .. }
            | Self::MachineTranslationApplied { .. }
            | Self::MachineTranslationFailed { .. } => SegmentKind::String,
            Self::EditOverride { .. }
            | Self::OverrideSaveRequested { .. }
            | Self::OverrideSaveSucceeded { .. }
            | Self::OverrideSaveFailed { .. } => SegmentKind::SynchronisedValue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    AlreadySaving,
    UnknownSegment,
    WrongKind,
    CoordinatorOwned,
}

impl IgnoreReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlreadySaving => "a save is already in flight",
            Self::UnknownSegment => "segment is not part of this snapshot",
            Self::WrongKind => "action does not apply to this segment type",
            Self::CoordinatorOwned => "saves must go through the save coordinator",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    ValueChanged {
        segment_id: SegmentId,
        origin: EditOrigin,
    },
    ErrorCleared {
        segment_id: SegmentId,
    },
    SaveStarted {
        segment_id: SegmentId,
    },
    Saved {
        segment_id: SegmentId,
    },
    SaveFailed {
        segment_id: SegmentId,
        message: String,
    },
    OverrideChanged {
        segment_id: SegmentId,
    },
    OverrideSaveStarted {
        segment_id: SegmentId,
    },
    OverrideSaved {
        segment_id: SegmentId,
    },
    OverrideSaveFailed {
        segment_id: SegmentId,
        message: String,
    },
    Ignored {
        segment_id: SegmentId,
        reason: IgnoreReason,
    },
}

/// Pure form of [`EditorState::dispatch`].
pub fn reduce(mut state: EditorState, action: EditorAction) -> EditorState {
    state.dispatch(action);
    state
}

impl EditorState {
    pub fn dispatch(&mut self, action: EditorAction) -> Vec<EditorEvent> {
        debug!(?action, "dispatch");
        match action {
            EditorAction::Edit { segment_id, value } => {
                self.edit(segment_id, value, EditOrigin::Translator)
            }
            EditorAction::MachineTranslationApplied { segment_id, value } => {
                self.edit(segment_id, value, EditOrigin::Machine)
            }
            EditorAction::SaveRequested { segment_id } => {
                let translation = self.translations.entry(segment_id).or_default();
                if translation.is_saving {
                    return ignored(segment_id, IgnoreReason::AlreadySaving);
                }
                translation.is_saving = true;
                translation.is_errored = false;
                translation.has_unsaved_changes = false;
                vec![EditorEvent::SaveStarted { segment_id }]
            }
            EditorAction::SaveSucceeded {
                segment_id,
                value,
                translated_by,
            } => {
                let translation = self.translations.entry(segment_id).or_default();
                translation.is_saving = false;
                translation.is_errored = false;
                // Edits made while the request was in flight stay local until
                // their own save confirms them.
                if !translation.has_unsaved_changes {
                    translation.value = value;
                }
                translation.translated_by = translated_by;
                vec![EditorEvent::Saved { segment_id }]
            }
            EditorAction::SaveFailed {
                segment_id,
                message,
            } => {
                let translation = self.translations.entry(segment_id).or_default();
                translation.is_saving = false;
                mark_errored(translation, &message);
                vec![EditorEvent::SaveFailed {
                    segment_id,
                    message,
                }]
            }
            EditorAction::MachineTranslationFailed {
                segment_id,
                message,
            } => {
                let translation = self.translations.entry(segment_id).or_default();
                if translation.is_saving {
                    return ignored(segment_id, IgnoreReason::AlreadySaving);
                }
                mark_errored(translation, &message);
                vec![EditorEvent::SaveFailed {
                    segment_id,
                    message,
                }]
            }
            EditorAction::EditOverride { segment_id, value } => {
                self.overrides.entry(segment_id).or_default().value = value;
                vec![EditorEvent::OverrideChanged { segment_id }]
            }
            EditorAction::OverrideSaveRequested { segment_id } => {
                let entry = self.overrides.entry(segment_id).or_default();
                if entry.is_saving {
                    return ignored(segment_id, IgnoreReason::AlreadySaving);
                }
                entry.is_saving = true;
                vec![EditorEvent::OverrideSaveStarted { segment_id }]
            }
            EditorAction::OverrideSaveSucceeded { segment_id, value } => {
                *self.overrides.entry(segment_id).or_default() = SegmentOverride {
                    value,
                    is_saving: false,
                };
                vec![EditorEvent::OverrideSaved { segment_id }]
            }
            EditorAction::OverrideSaveFailed {
                segment_id,
                message,
            } => {
                self.overrides.entry(segment_id).or_default().is_saving = false;
                warn!(%segment_id, %message, "override save failed");
                vec![EditorEvent::OverrideSaveFailed {
                    segment_id,
                    message,
                }]
            }
        }
    }

    fn edit(
        &mut self,
        segment_id: SegmentId,
        value: String,
        origin: EditOrigin,
    ) -> Vec<EditorEvent> {
        let translation = self.translations.entry(segment_id).or_default();
        translation.value = value;
        translation.has_unsaved_changes = true;

        let mut events = vec![EditorEvent::ValueChanged { segment_id, origin }];
        if translation.is_errored {
            // While errored the comment slot carries the server message.
            translation.is_errored = false;
            translation.comment = None;
            events.push(EditorEvent::ErrorCleared { segment_id });
        }
        events
    }
}

fn mark_errored(translation: &mut StringTranslation, message: &str) {
    translation.is_errored = true;
    translation.has_unsaved_changes = true;
    translation.comment = Some(message.to_owned());
}

fn ignored(segment_id: SegmentId, reason: IgnoreReason) -> Vec<EditorEvent> {
    warn!(%segment_id, reason = reason.as_str(), "ignoring action");
    vec![EditorEvent::Ignored { segment_id, reason }]
}
