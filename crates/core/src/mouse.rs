//! Catalog entity: a gaming mouse.

use serde::{Deserialize, Serialize};

use crate::error::{DomainResult, Violations};
use crate::id::{CategoryId, MouseId};

/// Canonical, server-confirmed mouse record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mouse {
    pub id: MouseId,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_generated: bool,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
}

/// Payload for creating a mouse (no id yet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMouse {
    pub name: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub is_generated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_ids: Vec<CategoryId>,
}

impl NewMouse {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
            details: None,
            image: None,
            is_generated: false,
            category_ids: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn generated(mut self) -> Self {
        self.is_generated = true;
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        let mut violations = Violations::default();
        check_name(&self.name, &mut violations);
        check_price(self.price, &mut violations);
        violations.into_result()
    }

    /// Materialize the record once an id has been assigned.
    pub fn into_mouse(self, id: MouseId) -> Mouse {
        Mouse {
            id,
            name: self.name.trim().to_string(),
            price: self.price,
            details: self.details,
            image: self.image,
            is_generated: self.is_generated,
            category_ids: self.category_ids,
        }
    }
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MousePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_generated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_ids: Option<Vec<CategoryId>>,
}

impl MousePatch {
    pub fn price(price: f64) -> Self {
        Self {
            price: Some(price),
            ..Self::default()
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Validates only the fields that are present.
    pub fn validate(&self) -> DomainResult<()> {
        let mut violations = Violations::default();
        if let Some(name) = &self.name {
            check_name(name, &mut violations);
        }
        if let Some(price) = self.price {
            check_price(price, &mut violations);
        }
        violations.into_result()
    }

    /// Fold a newer patch into this one; fields set in `newer` win.
    pub fn merge(&mut self, newer: MousePatch) {
        if newer.name.is_some() {
            self.name = newer.name;
        }
        if newer.price.is_some() {
            self.price = newer.price;
        }
        if newer.details.is_some() {
            self.details = newer.details;
        }
        if newer.image.is_some() {
            self.image = newer.image;
        }
        if newer.is_generated.is_some() {
            self.is_generated = newer.is_generated;
        }
        if newer.category_ids.is_some() {
            self.category_ids = newer.category_ids;
        }
    }

    pub fn apply_to(&self, mouse: &mut Mouse) {
        if let Some(name) = &self.name {
            mouse.name = name.trim().to_string();
        }
        if let Some(price) = self.price {
            mouse.price = price;
        }
        if let Some(details) = &self.details {
            mouse.details = Some(details.clone());
        }
        if let Some(image) = &self.image {
            mouse.image = Some(image.clone());
        }
        if let Some(flag) = self.is_generated {
            mouse.is_generated = flag;
        }
        if let Some(ids) = &self.category_ids {
            mouse.category_ids = ids.clone();
        }
    }
}

fn check_name(name: &str, violations: &mut Violations) {
    if name.trim().is_empty() {
        violations.push("name must not be empty");
    }
}

fn check_price(price: f64, violations: &mut Violations) {
    if !price.is_finite() || price <= 0.0 {
        violations.push("price must be a positive number");
    }
}
