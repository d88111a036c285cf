//! Branch models

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Sales channel of a branch; selects which product threshold applies
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "branch_type", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum BranchType {
    #[default]
    Retail,
    Wholesale,
}

impl BranchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchType::Retail => "retail",
            BranchType::Wholesale => "wholesale",
        }
    }
}

/// A physical retail or wholesale location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Branch {
    pub id: i32,
    pub branch_name: String,
    pub location: String,
    pub is_active: bool,
    pub branch_type: BranchType,
}

/// Input for creating a branch
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBranchInput {
    #[validate(length(min = 1, max = 200))]
    pub branch_name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub branch_type: BranchType,
}

fn default_true() -> bool {
    true
}

/// Partial update of a branch; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BranchPatch {
    #[validate(length(min = 1, max = 200))]
    pub branch_name: Option<String>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
}

impl BranchPatch {
    pub fn apply(&self, branch: &mut Branch) {
        if let Some(name) = &self.branch_name {
            branch.branch_name = name.clone();
        }
        if let Some(location) = &self.location {
            branch.location = location.clone();
        }
        if let Some(is_active) = self.is_active {
            branch.is_active = is_active;
        }
    }
}
