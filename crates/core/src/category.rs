//! Catalog grouping; linked to mice many-to-many.

use serde::{Deserialize, Serialize};

use crate::error::{DomainResult, Violations};
use crate::id::CategoryId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewCategory {
    pub fn new(name: impl Into<String>, description: Option<&str>) -> Self {
        Self {
            name: name.into(),
            description: description.map(str::to_string),
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        let mut violations = Violations::default();
        if self.name.trim().is_empty() {
            violations.push("name must not be empty");
        }
        violations.into_result()
    }

    pub fn into_category(self, id: CategoryId) -> Category {
        Category {
            id,
            name: self.name.trim().to_string(),
            description: self.description,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CategoryPatch {
    pub fn validate(&self) -> DomainResult<()> {
        let mut violations = Violations::default();
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                violations.push("name must not be empty");
            }
        }
        violations.into_result()
    }

    pub fn apply_to(&self, category: &mut Category) {
        if let Some(name) = &self.name {
            category.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            category.description = Some(description.clone());
        }
    }
}

/// Case-insensitive name comparison used for the uniqueness rule.
pub fn same_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_rejected() {
        assert!(NewCategory::new(" ", None).validate().is_err());
        assert!(CategoryPatch { name: Some(String::new()), description: None }.validate().is_err());
        assert!(NewCategory::new("Gaming", None).validate().is_ok());
    }

    #[test]
    fn names_compare_case_insensitively() {
        assert!(same_name("Gaming", " gaming "));
        assert!(!same_name("Gaming", "Office"));
    }
}
