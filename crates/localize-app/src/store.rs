// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::Value;
use std::collections::BTreeMap;

use crate::ids::SegmentId;
use crate::model::{Attributor, OverrideRecord, SegmentKind, Snapshot, StringTranslationRecord};
use crate::segments::{SegmentSet, SnapshotError, SnapshotResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationStatus {
    Untranslated,
    Editing,
    Saving,
    Saved,
    Errored,
}

impl TranslationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Untranslated => "untranslated",
            Self::Editing => "editing",
            Self::Saving => "saving",
            Self::Saved => "saved",
            Self::Errored => "errored",
        }
    }
}

/// Client-side record for one `string` segment.
///
/// `comment` holds the translator's note, or the server error while
/// `is_errored` is set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StringTranslation {
    pub value: String,
    pub is_saving: bool,
    pub is_errored: bool,
    pub comment: Option<String>,
    pub translated_by: Option<Attributor>,
    pub has_unsaved_changes: bool,
}

impl StringTranslation {
    pub fn from_record(record: &StringTranslationRecord) -> Self {
        let error = record
            .error
            .as_deref()
            .filter(|error| !error.is_empty())
            .map(str::to_owned);
        let is_errored = error.is_some();

        Self {
            value: record.data.clone(),
            is_saving: false,
            is_errored,
            comment: error.or_else(|| record.comment.clone()),
            translated_by: record.last_translated_by.clone(),
            has_unsaved_changes: false,
        }
    }

    pub const fn status(&self) -> TranslationStatus {
        if self.is_saving {
            TranslationStatus::Saving
        } else if self.is_errored {
            TranslationStatus::Errored
        } else if self.has_unsaved_changes {
            TranslationStatus::Editing
        } else {
            TranslationStatus::Saved
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        if self.is_errored {
            self.comment.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SegmentOverride {
    pub value: Value,
    pub is_saving: bool,
}

impl SegmentOverride {
    pub fn from_record(record: &OverrideRecord) -> Self {
        Self {
            value: record.data.clone(),
            is_saving: false,
        }
    }
}

/// Authoritative translation state for one editor session.
///
/// Mutated only through [`EditorState::dispatch`]. A segment with no entry
/// has never been translated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditorState {
    pub(crate) translations: BTreeMap<SegmentId, StringTranslation>,
    pub(crate) overrides: BTreeMap<SegmentId, SegmentOverride>,
}

impl EditorState {
    pub fn from_snapshot(snapshot: &Snapshot, segments: &SegmentSet) -> SnapshotResult<Self> {
        Self::from_records(segments, &snapshot.string_translations, &snapshot.overrides)
    }

    pub fn from_records(
        segments: &SegmentSet,
        translations: &[StringTranslationRecord],
        overrides: &[OverrideRecord],
    ) -> SnapshotResult<Self> {
        let mut state = Self::default();

        for record in translations {
            check_record_kind(segments, record.segment_id, SegmentKind::String)?;
            let previous = state
                .translations
                .insert(record.segment_id, StringTranslation::from_record(record));
            if previous.is_some() {
                return Err(SnapshotError::DuplicateRecord(record.segment_id));
            }
        }

        for record in overrides {
            check_record_kind(segments, record.segment_id, SegmentKind::SynchronisedValue)?;
            let previous = state
                .overrides
                .insert(record.segment_id, SegmentOverride::from_record(record));
            if previous.is_some() {
                return Err(SnapshotError::DuplicateRecord(record.segment_id));
            }
        }

        Ok(state)
    }

    pub fn translation(&self, id: SegmentId) -> Option<&StringTranslation> {
        self.translations.get(&id)
    }

    pub fn segment_override(&self, id: SegmentId) -> Option<&SegmentOverride> {
        self.overrides.get(&id)
    }

    pub fn translation_status(&self, id: SegmentId) -> TranslationStatus {
        self.translation(id)
            .map_or(TranslationStatus::Untranslated, StringTranslation::status)
    }

    pub fn translations(&self) -> impl Iterator<Item = (SegmentId, &StringTranslation)> {
        self.translations.iter().map(|(id, translation)| (*id, translation))
    }

    pub fn overrides(&self) -> impl Iterator<Item = (SegmentId, &SegmentOverride)> {
        self.overrides.iter().map(|(id, value)| (*id, value))
    }

    pub fn is_saving(&self, id: SegmentId) -> bool {
        self.translation(id).is_some_and(|translation| translation.is_saving)
            || self.segment_override(id).is_some_and(|value| value.is_saving)
    }
}

fn check_record_kind(
    segments: &SegmentSet,
    segment_id: SegmentId,
    expected: SegmentKind,
) -> SnapshotResult<()> {
    match segments.kind_of(segment_id) {
        None => Err(SnapshotError::UnknownSegment(segment_id)),
        Some(kind) if kind != expected => Err(SnapshotError::KindMismatch {
            segment_id,
            expected,
        }),
        Some(_) => Ok(()),
    }
}
