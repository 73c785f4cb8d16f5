// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::ids::SegmentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WidgetKind {
    Text,
    PageChooser,
    ImageChooser,
    DocumentChooser,
    Unknown,
}

impl WidgetKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::PageChooser => "page_chooser",
            Self::ImageChooser => "image_chooser",
            Self::DocumentChooser => "document_chooser",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "page_chooser" => Some(Self::PageChooser),
            "image_chooser" => Some(Self::ImageChooser),
            "document_chooser" => Some(Self::DocumentChooser),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    String,
    SynchronisedValue,
}

impl SegmentKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::SynchronisedValue => "synchronised_value",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "string" => Some(Self::String),
            "synchronised_value" => Some(Self::SynchronisedValue),
            _ => None,
        }
    }
}

/// Who last saved a translation, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributor {
    pub full_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Attributor {
    pub fn named(full_name: &str) -> Self {
        Self {
            full_name: full_name.to_owned(),
            avatar_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabDefinition {
    pub label: String,
    pub slug: String,
}

impl TabDefinition {
    pub fn new(label: &str, slug: &str) -> Self {
        Self {
            label: label.to_owned(),
            slug: slug.to_owned(),
        }
    }
}

/// The point-in-time document the backend renders when an editor session
/// starts. Decoding is lenient; [`crate::SegmentSet::from_snapshot`] and
/// [`crate::EditorState::from_snapshot`] do the validation.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub tabs: Vec<TabDefinition>,
    #[serde(default)]
    pub segments: Vec<SegmentRecord>,
    #[serde(default)]
    pub string_translations: Vec<StringTranslationRecord>,
    #[serde(default)]
    pub overrides: Vec<OverrideRecord>,
    #[serde(default)]
    pub machine_translate_url: Option<String>,
}

impl Snapshot {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("decode editor snapshot")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRecord {
    pub id: SegmentId,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub content_path: String,
    #[serde(default)]
    pub location: LocationRecord,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub value: Option<Value>,
    #[serde(default)]
    pub edit_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    #[serde(default)]
    pub tab: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub block_id: Option<String>,
    #[serde(default)]
    pub sub_field: Option<String>,
    #[serde(default)]
    pub help_text: String,
    #[serde(default)]
    pub widget: Option<WidgetRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WidgetRecord {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StringTranslationRecord {
    pub segment_id: SegmentId,
    pub data: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub last_translated_by: Option<Attributor>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OverrideRecord {
    pub segment_id: SegmentId,
    pub data: Value,
    #[serde(default)]
    pub error: Option<String>,
}

// A synchronised value may legitimately be JSON null (an empty chooser), so
// only an absent field decodes to None.
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::{SegmentKind, Snapshot, WidgetKind};
    use anyhow::Result;
    use serde_json::Value;

    #[test]
    fn widget_kind_round_trips_wire_names() {
        for kind in [
            WidgetKind::Text,
            WidgetKind::PageChooser,
            WidgetKind::ImageChooser,
            WidgetKind::DocumentChooser,
            WidgetKind::Unknown,
        ] {
            assert_eq!(WidgetKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(WidgetKind::parse("snippet_chooser"), None);
    }

    #[test]
    fn segment_kind_rejects_unknown_tags() {
        assert_eq!(SegmentKind::parse("string"), Some(SegmentKind::String));
        assert_eq!(SegmentKind::parse("related_object"), None);
    }

    #[test]
    fn snapshot_distinguishes_null_value_from_missing_value() -> Result<()> {
        let snapshot = Snapshot::from_json(
            r#"{
                "segments": [
                    {"type": "synchronised_value", "id": 1, "value": null},
                    {"type": "synchronised_value", "id": 2}
                ]
            }"#,
        )?;
        assert_eq!(snapshot.segments[0].value, Some(Value::Null));
        assert_eq!(snapshot.segments[1].value, None);
        Ok(())
    }

    #[test]
    fn snapshot_decode_error_has_context() {
        let error = Snapshot::from_json("{").expect_err("truncated json should fail");
        assert!(error.to_string().contains("decode editor snapshot"));
    }
}
