// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::SegmentKind;
use crate::segments::{Segment, SegmentSet};
use crate::store::{EditorState, SegmentOverride, StringTranslation};

#[derive(Debug, Clone, PartialEq)]
pub struct TabEntry<'a> {
    pub segment: &'a Segment,
    pub translation: Option<&'a StringTranslation>,
    pub segment_override: Option<&'a SegmentOverride>,
}

impl TabEntry<'_> {
    pub fn is_errored(&self) -> bool {
        self.segment.kind() == SegmentKind::String
            && self.translation.is_some_and(|translation| translation.is_errored)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tab<'a> {
    pub label: &'a str,
    pub slug: &'a str,
    pub entries: Vec<TabEntry<'a>>,
    pub num_errors: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TabLayout<'a> {
    pub tabs: Vec<Tab<'a>>,
    /// False when a single tab remains; its content renders without tab chrome.
    pub show_tab_chrome: bool,
}

impl<'a> TabLayout<'a> {
    pub fn tab(&self, slug: &str) -> Option<&Tab<'a>> {
        self.tabs.iter().find(|tab| tab.slug == slug)
    }

    pub fn total_errors(&self) -> usize {
        self.tabs.iter().map(|tab| tab.num_errors).sum()
    }
}

/// Groups segments into the configured tabs, in tab definition order, and
/// drops tabs with no segments.
pub fn derive_tabs<'a>(segments: &'a SegmentSet, state: &'a EditorState) -> TabLayout<'a> {
    let tabs: Vec<Tab<'a>> = segments
        .tabs()
        .iter()
        .filter_map(|definition| {
            let entries: Vec<TabEntry<'a>> = segments
                .iter()
                .filter(|segment| segment.location.tab == definition.slug)
                .map(|segment| TabEntry {
                    segment,
                    translation: state.translation(segment.id),
                    segment_override: state.segment_override(segment.id),
                })
                .collect();
            if entries.is_empty() {
                return None;
            }

            let num_errors = entries.iter().filter(|entry| entry.is_errored()).count();
            Some(Tab {
                label: &definition.label,
                slug: &definition.slug,
                entries,
                num_errors,
            })
        })
        .collect();

    let show_tab_chrome = tabs.len() > 1;
    TabLayout {
        tabs,
        show_tab_chrome,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditorProgress {
    pub total_strings: usize,
    pub translated: usize,
    pub errored: usize,
    pub saving: usize,
}

impl EditorProgress {
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} of {} strings translated",
            self.translated, self.total_strings
        );
        if self.errored > 0 {
            line.push_str(&format!(", {} errored", self.errored));
        }
        if self.saving > 0 {
            line.push_str(&format!(", {} saving", self.saving));
        }
        line
    }
}

pub fn derive_progress(segments: &SegmentSet, state: &EditorState) -> EditorProgress {
    segments
        .iter()
        .filter(|segment| segment.kind() == SegmentKind::String)
        .fold(EditorProgress::default(), |mut progress, segment| {
            progress.total_strings += 1;
            if let Some(translation) = state.translation(segment.id) {
                if !translation.value.is_empty() {
                    progress.translated += 1;
                }
                if translation.is_errored {
                    progress.errored += 1;
                }
                if translation.is_saving {
                    progress.saving += 1;
                }
            }
            progress
        })
}

#[cfg(test)]
mod tests {
    use super::{EditorProgress, derive_progress, derive_tabs};
    use crate::{EditorAction, EditorState, SegmentId, SegmentSet, Snapshot};
    use anyhow::Result;

    const SNAPSHOT: &str = r#"{
        "tabs": [
            {"label": "Content", "slug": "content"},
            {"label": "Promote", "slug": "promote"},
            {"label": "Settings", "slug": "settings"}
        ],
        "segments": [
            {"type": "string", "id": 1, "location": {"tab": "content"}, "source": "Hello", "editUrl": "/s/1/"},
            {"type": "string", "id": 2, "location": {"tab": "content"}, "source": "World", "editUrl": "/s/2/"},
            {"type": "synchronised_value", "id": 3, "location": {"tab": "promote"}, "value": 5, "editUrl": "/o/3/"},
            {"type": "string", "id": 4, "location": {"tab": "promote"}, "source": "Slug", "editUrl": "/s/4/"}
        ]
    }"#;

    fn fixture() -> Result<(SegmentSet, EditorState)> {
        let snapshot = Snapshot::from_json(SNAPSHOT)?;
        let segments = SegmentSet::from_snapshot(&snapshot)?;
        let state = EditorState::from_snapshot(&snapshot, &segments)?;
        Ok((segments, state))
    }

    fn fail(state: &mut EditorState, id: i64) {
        let segment_id = SegmentId::new(id);
        state.dispatch(EditorAction::SaveRequested { segment_id });
        state.dispatch(EditorAction::SaveFailed {
            segment_id,
            message: "Server error".to_owned(),
        });
    }

    #[test]
    fn empty_tabs_are_dropped_and_order_is_kept() -> Result<()> {
        let (segments, state) = fixture()?;
        let layout = derive_tabs(&segments, &state);

        let slugs: Vec<_> = layout.tabs.iter().map(|tab| tab.slug).collect();
        assert_eq!(slugs, vec!["content", "promote"]);
        assert!(layout.show_tab_chrome);
        assert!(layout.tab("settings").is_none());
        Ok(())
    }

    #[test]
    fn error_counts_only_include_errored_strings() -> Result<()> {
        let (segments, mut state) = fixture()?;
        fail(&mut state, 2);
        fail(&mut state, 4);
        state.dispatch(EditorAction::OverrideSaveRequested {
            segment_id: SegmentId::new(3),
        });
        state.dispatch(EditorAction::OverrideSaveFailed {
            segment_id: SegmentId::new(3),
            message: "ignored".to_owned(),
        });

        let layout = derive_tabs(&segments, &state);
        assert_eq!(layout.tab("content").map(|tab| tab.num_errors), Some(1));
        assert_eq!(layout.tab("promote").map(|tab| tab.num_errors), Some(1));
        assert_eq!(layout.total_errors(), 2);
        Ok(())
    }

    #[test]
    fn single_remaining_tab_hides_chrome() -> Result<()> {
        let snapshot = Snapshot::from_json(
            r#"{
                "tabs": [{"label": "Content", "slug": "content"}, {"label": "Settings", "slug": "settings"}],
                "segments": [{"type": "string", "id": 1, "location": {"tab": "content"}, "source": "Hi", "editUrl": "/s/1/"}]
            }"#,
        )?;
        let segments = SegmentSet::from_snapshot(&snapshot)?;
        let state = EditorState::default();

        let layout = derive_tabs(&segments, &state);
        assert_eq!(layout.tabs.len(), 1);
        assert!(!layout.show_tab_chrome);
        Ok(())
    }

    #[test]
    fn progress_counts_string_segments() -> Result<()> {
        let (segments, mut state) = fixture()?;
        state.dispatch(EditorAction::Edit {
            segment_id: SegmentId::new(1),
            value: "Bonjour".to_owned(),
        });
        state.dispatch(EditorAction::SaveRequested {
            segment_id: SegmentId::new(1),
        });
        fail(&mut state, 4);

        let progress = derive_progress(&segments, &state);
        assert_eq!(
            progress,
            EditorProgress {
                total_strings: 3,
                translated: 1,
                errored: 1,
                saving: 1,
            }
        );
        assert_eq!(
            progress.summary(),
            "1 of 3 strings translated, 1 errored, 1 saving"
        );
        Ok(())
    }
}
