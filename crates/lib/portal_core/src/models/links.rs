//! Application links shown to employees.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationLink {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub icon: String,
    pub is_active: bool,
    pub order: i32,
}

/// Seed entry, as read from a links file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplicationLink {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    pub icon: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub order: i32,
}

fn default_active() -> bool {
    true
}
