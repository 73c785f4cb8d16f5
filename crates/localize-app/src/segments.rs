// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::ids::SegmentId;
use crate::model::{SegmentKind, SegmentRecord, Snapshot, TabDefinition, WidgetKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    DuplicateSegment(SegmentId),
    MissingTab(SegmentId),
    MissingKind(SegmentId),
    UnknownKind {
        segment_id: SegmentId,
        kind: String,
    },
    MissingField {
        segment_id: SegmentId,
        field: &'static str,
    },
    EmptyTabSlug {
        label: String,
    },
    DuplicateTab(String),
    UnknownSegment(SegmentId),
    KindMismatch {
        segment_id: SegmentId,
        expected: SegmentKind,
    },
    DuplicateRecord(SegmentId),
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateSegment(id) => write!(f, "segment id {id} appears more than once"),
            Self::MissingTab(id) => write!(f, "segment {id} has an empty location.tab"),
            Self::MissingKind(id) => write!(f, "segment {id} has no type"),
            Self::UnknownKind { segment_id, kind } => {
                write!(f, "segment {segment_id} has unsupported type {kind:?}")
            }
            Self::MissingField { segment_id, field } => {
                write!(f, "segment {segment_id} is missing required field `{field}`")
            }
            Self::EmptyTabSlug { label } => write!(f, "tab {label:?} has an empty slug"),
            Self::DuplicateTab(slug) => write!(f, "tab slug {slug:?} appears more than once"),
            Self::UnknownSegment(id) => {
                write!(f, "prior record references unknown segment {id}")
            }
            Self::KindMismatch {
                segment_id,
                expected,
            } => write!(
                f,
                "prior record for segment {segment_id} expects a {} segment",
                expected.as_str()
            ),
            Self::DuplicateRecord(id) => {
                write!(f, "segment {id} has more than one prior record")
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

pub type SnapshotResult<T> = std::result::Result<T, SnapshotError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentLocation {
    pub tab: String,
    pub field: String,
    pub block_id: Option<String>,
    pub sub_field: Option<String>,
    pub help_text: String,
    pub widget: WidgetKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SegmentContent {
    String { source: String },
    SynchronisedValue { value: Value },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub id: SegmentId,
    pub content_path: String,
    pub location: SegmentLocation,
    pub content: SegmentContent,
    pub edit_url: String,
}

impl Segment {
    pub const fn kind(&self) -> SegmentKind {
        match self.content {
            SegmentContent::String { .. } => SegmentKind::String,
            SegmentContent::SynchronisedValue { .. } => SegmentKind::SynchronisedValue,
        }
    }

    pub fn source(&self) -> Option<&str> {
        match &self.content {
            SegmentContent::String { source } => Some(source),
            SegmentContent::SynchronisedValue { .. } => None,
        }
    }

    fn from_record(record: &SegmentRecord) -> SnapshotResult<Self> {
        let segment_id = record.id;
        let kind = record
            .kind
            .as_deref()
            .ok_or(SnapshotError::MissingKind(segment_id))?;
        let kind = SegmentKind::parse(kind).ok_or_else(|| SnapshotError::UnknownKind {
            segment_id,
            kind: kind.to_owned(),
        })?;

        if record.location.tab.trim().is_empty() {
            return Err(SnapshotError::MissingTab(segment_id));
        }

        let content = match kind {
            SegmentKind::String => SegmentContent::String {
                source: record.source.clone().ok_or(SnapshotError::MissingField {
                    segment_id,
                    field: "source",
                })?,
            },
            SegmentKind::SynchronisedValue => SegmentContent::SynchronisedValue {
                value: record.value.clone().ok_or(SnapshotError::MissingField {
                    segment_id,
                    field: "value",
                })?,
            },
        };

        let edit_url = record
            .edit_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or(SnapshotError::MissingField {
                segment_id,
                field: "editUrl",
            })?;

        let widget = record
            .location
            .widget
            .as_ref()
            .and_then(|widget| WidgetKind::parse(&widget.kind))
            .unwrap_or(WidgetKind::Unknown);

        Ok(Self {
            id: segment_id,
            content_path: record.content_path.clone(),
            location: SegmentLocation {
                tab: record.location.tab.clone(),
                field: record.location.field.clone(),
                block_id: record.location.block_id.clone(),
                sub_field: record.location.sub_field.clone(),
                help_text: record.location.help_text.clone(),
                widget,
            },
            content,
            edit_url,
        })
    }
}

/// Read-only, validated view over the segments of one snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SegmentSet {
    tabs: Vec<TabDefinition>,
    segments: Vec<Segment>,
    index: HashMap<SegmentId, usize>,
}

impl SegmentSet {
    pub fn from_snapshot(snapshot: &Snapshot) -> SnapshotResult<Self> {
        Self::from_records(&snapshot.tabs, &snapshot.segments)
    }

    pub fn from_records(tabs: &[TabDefinition], records: &[SegmentRecord]) -> SnapshotResult<Self> {
        let mut slugs = HashSet::new();
        for tab in tabs {
            if tab.slug.trim().is_empty() {
                return Err(SnapshotError::EmptyTabSlug {
                    label: tab.label.clone(),
                });
            }
            if !slugs.insert(tab.slug.as_str()) {
                return Err(SnapshotError::DuplicateTab(tab.slug.clone()));
            }
        }

        let mut segments = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());
        for record in records {
            if index.insert(record.id, segments.len()).is_some() {
                return Err(SnapshotError::DuplicateSegment(record.id));
            }
            segments.push(Segment::from_record(record)?);
        }

        Ok(Self {
            tabs: tabs.to_vec(),
            segments,
            index,
        })
    }

    pub fn get(&self, id: SegmentId) -> Option<&Segment> {
        self.index.get(&id).map(|position| &self.segments[*position])
    }

    pub fn kind_of(&self, id: SegmentId) -> Option<SegmentKind> {
        self.get(id).map(Segment::kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn tabs(&self) -> &[TabDefinition] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}
