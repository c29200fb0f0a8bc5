//! In-progress item being authored, and the checks run before submitting it.

use crate::{Result, TerminalError};
use neudev_types::{Difficulty, ItemPayload, ItemScope, ItemType, TestCase};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The item form's working copy. Synthesized test cases are appended here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub item_desc: String,
    #[serde(default)]
    pub item_difficulty: Difficulty,
    #[serde(rename = "progLangIDs", default)]
    pub prog_lang_ids: Vec<u32>,
    /// Used only for items that are not graded by test cases.
    #[serde(default)]
    pub item_points: u32,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

impl ItemDraft {
    /// Load a draft from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load a draft, or start an empty one if the file does not exist yet.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Append a test case. Duplicates are kept; pruning them is up to the author.
    pub fn add_test_case(&mut self, test_case: TestCase) {
        self.test_cases.push(test_case);
    }

    pub fn remove_test_case(&mut self, index: usize) -> Option<TestCase> {
        (index < self.test_cases.len()).then(|| self.test_cases.remove(index))
    }

    /// Sum of test-case points; unset points count as zero.
    pub fn test_case_points(&self) -> u32 {
        self.test_cases.iter().filter_map(|tc| tc.points).sum()
    }

    /// Check the draft and build the create/update payload.
    ///
    /// `teacher_id` is attached only for personal-scope items.
    pub fn to_payload(
        &self,
        item_type: &ItemType,
        scope: ItemScope,
        teacher_id: Option<&str>,
    ) -> Result<ItemPayload> {
        if self.item_name.trim().is_empty()
            || self.item_desc.trim().is_empty()
            || self.prog_lang_ids.is_empty()
        {
            return Err(TerminalError::Validation(
                "name, description and at least one language are required".to_string(),
            ));
        }

        let console_app = item_type.is_console_app();
        if console_app {
            if self.test_cases.is_empty() {
                return Err(TerminalError::Validation(
                    "add at least one test case for this item".to_string(),
                ));
            }
            if let Some(index) = self.test_cases.iter().position(|tc| tc.points.is_none()) {
                return Err(TerminalError::Validation(format!(
                    "enter a valid points value for test case {}",
                    index + 1
                )));
            }
        }

        let (item_points, test_cases) = if console_app {
            let kept = self
                .test_cases
                .iter()
                .filter(|tc| !tc.expected_output.trim().is_empty())
                .cloned()
                .collect();
            (self.test_case_points(), kept)
        } else {
            (self.item_points, Vec::new())
        };

        Ok(ItemPayload {
            item_type_id: item_type.id,
            prog_lang_ids: self.prog_lang_ids.clone(),
            item_name: self.item_name.trim().to_string(),
            item_desc: self.item_desc.trim().to_string(),
            item_difficulty: self.item_difficulty,
            item_points,
            test_cases,
            teacher_id: match scope {
                ItemScope::Personal => teacher_id.map(str::to_string),
                ItemScope::Global => None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn console_app() -> ItemType {
        ItemType {
            id: 1,
            name: "Console App".to_string(),
        }
    }

    fn draft() -> ItemDraft {
        ItemDraft {
            item_name: " Sum ".to_string(),
            item_desc: "Add two numbers".to_string(),
            prog_lang_ids: vec![3],
            ..Default::default()
        }
    }

    fn scored(output: &str, points: u32) -> TestCase {
        TestCase {
            points: Some(points),
            ..TestCase::new(output)
        }
    }

    #[test]
    fn test_requires_basic_fields() {
        let draft = ItemDraft::default();
        assert!(matches!(
            draft.to_payload(&console_app(), ItemScope::Personal, None),
            Err(TerminalError::Validation(_))
        ));
    }

    #[test]
    fn test_console_app_requires_test_cases() {
        let err = draft()
            .to_payload(&console_app(), ItemScope::Personal, None)
            .unwrap_err();
        assert!(err.to_string().contains("at least one test case"));
    }

    #[test]
    fn test_console_app_requires_points() {
        let mut draft = draft();
        draft.add_test_case(scored("3", 5));
        draft.add_test_case(TestCase::new("7"));
        let err = draft
            .to_payload(&console_app(), ItemScope::Personal, None)
            .unwrap_err();
        assert!(err.to_string().contains("test case 2"));
    }

    #[test]
    fn test_console_app_points_are_summed_and_blank_outputs_dropped() {
        let mut draft = draft();
        draft.add_test_case(scored("3", 5));
        draft.add_test_case(scored("  ", 2));
        draft.add_test_case(scored("7", 10));
        let payload = draft
            .to_payload(&console_app(), ItemScope::Personal, Some("t-1"))
            .unwrap();
        assert_eq!(payload.item_points, 17);
        assert_eq!(payload.test_cases.len(), 2);
        assert_eq!(payload.item_name, "Sum");
        assert_eq!(payload.teacher_id.as_deref(), Some("t-1"));
    }

    #[test]
    fn test_other_item_types_use_item_points() {
        let mut draft = draft();
        draft.item_points = 20;
        draft.add_test_case(scored("ignored", 5));
        let essay = ItemType {
            id: 2,
            name: "Essay".to_string(),
        };
        let payload = draft.to_payload(&essay, ItemScope::Global, Some("t-1")).unwrap();
        assert_eq!(payload.item_points, 20);
        assert!(payload.test_cases.is_empty());
        assert!(payload.teacher_id.is_none());
    }

    #[test]
    fn test_remove_test_case() {
        let mut draft = draft();
        draft.add_test_case(TestCase::new("a"));
        assert!(draft.remove_test_case(3).is_none());
        assert_eq!(draft.remove_test_case(0).unwrap().expected_output, "a");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("draft.json");
        assert_eq!(ItemDraft::load_or_default(&path).unwrap(), ItemDraft::default());

        let mut draft = draft();
        draft.add_test_case(TestCase::new("Hello"));
        draft.save(&path).unwrap();
        assert_eq!(ItemDraft::load(&path).unwrap(), draft);
    }
}
