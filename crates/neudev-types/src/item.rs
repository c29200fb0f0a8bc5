//! Item-bank records exchanged with the persistence API.

use serde::{Deserialize, Serialize};

use crate::TestCase;

/// Name of the item type whose items are graded by test cases.
pub const CONSOLE_APP_ITEM_TYPE: &str = "Console App";

/// A language offered by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgrammingLanguage {
    #[serde(rename = "progLangID")]
    pub id: u32,
    #[serde(rename = "progLangName")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// An item type offered by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemType {
    #[serde(rename = "itemTypeID")]
    pub id: u32,
    #[serde(rename = "itemTypeName")]
    pub name: String,
}

impl ItemType {
    pub fn is_console_app(&self) -> bool {
        self.name == CONSOLE_APP_ITEM_TYPE
    }
}

/// Which pool of items a listing or creation targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemScope {
    /// Items created by the signed-in teacher.
    #[default]
    Personal,
    /// The shared pool.
    Global,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

/// Create/update payload for the item persistence API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPayload {
    #[serde(rename = "itemTypeID")]
    pub item_type_id: u32,
    #[serde(rename = "progLangIDs")]
    pub prog_lang_ids: Vec<u32>,
    pub item_name: String,
    pub item_desc: String,
    pub item_difficulty: Difficulty,
    pub item_points: u32,
    pub test_cases: Vec<TestCase>,
    #[serde(rename = "teacherID", default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
}
