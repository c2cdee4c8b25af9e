//! Shopping cart kept by the storefront client.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::EntityId;
use crate::mouse::Mouse;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: EntityId,
    pub name: String,
    pub unit_price: f64,
    pub quantity: u32,
}

impl CartLine {
    /// Line price, `quantity * unit_price`, rounded to cents.
    pub fn price(&self) -> f64 {
        round_cents(self.unit_price * f64::from(self.quantity))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adds one unit, merging with an existing line for the same id and name.
    pub fn add(&mut self, id: EntityId, name: impl Into<String>, unit_price: f64) {
        let name = name.into();
        if let Some(line) = self.lines.iter_mut().find(|l| l.id == id && l.name == name) {
            line.quantity += 1;
            return;
        }
        self.lines.push(CartLine {
            id,
            name,
            unit_price,
            quantity: 1,
        });
    }

    pub fn add_mouse(&mut self, mouse: &Mouse) {
        self.add(EntityId::Server(mouse.id), mouse.name.clone(), mouse.price);
    }

    pub fn remove(&mut self, id: &EntityId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| &l.id != id);
        self.lines.len() != before
    }

    /// Sets the quantity of a line; zero removes it.
    pub fn update_quantity(&mut self, id: &EntityId, quantity: u32) -> DomainResult<()> {
        if quantity == 0 {
            return if self.remove(id) {
                Ok(())
            } else {
                Err(DomainError::NotFound("Cart line"))
            };
        }
        let line = self
            .lines
            .iter_mut()
            .find(|l| &l.id == id)
            .ok_or(DomainError::NotFound("Cart line"))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Follows a temp id to its server id once the record is confirmed.
    pub fn remap(&mut self, from: &EntityId, to: &EntityId) {
        for line in self.lines.iter_mut().filter(|l| &l.id == from) {
            line.id = to.clone();
        }
    }

    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn total(&self) -> f64 {
        round_cents(self.lines.iter().map(CartLine::price).sum())
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
