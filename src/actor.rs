//! The player-controlled actor.

use crate::geometry::Aabb;

/// Health an actor starts with and cannot exceed.
pub const DEFAULT_MAX_HEALTH: i32 = 100;

/// A stack of identical items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Item name, also its identity.
    pub name: String,
    /// Stack size.
    pub quantity: u32,
}

/// Position, size and the few stats the map can change.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    /// Left edge in world pixels.
    pub x: f64,
    /// Top edge in world pixels.
    pub y: f64,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
    /// Current health, `0..=max_health`.
    pub health: i32,
    /// Upper bound for `health`.
    pub max_health: i32,
    /// Experience points.
    pub xp: u32,
    /// Items in pickup order.
    pub inventory: Vec<Item>,
}

impl Actor {
    /// Actor at full health with an empty inventory.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            health: DEFAULT_MAX_HEALTH,
            max_health: DEFAULT_MAX_HEALTH,
            xp: 0,
            inventory: Vec::new(),
        }
    }

    /// Bounding box at the current position.
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.x, self.y, self.width, self.height)
    }

    /// Moves the top-left corner.
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Adds (or with a negative amount removes) health, clamped to
    /// `0..=max_health`.
    pub fn add_health(&mut self, amount: i32) {
        self.health = self.health.saturating_add(amount).clamp(0, self.max_health);
    }

    /// Adds experience.
    pub fn add_xp(&mut self, xp: u32) {
        self.xp = self.xp.saturating_add(xp);
    }

    /// Stacks `quantity` onto an existing item of the same name or appends
    /// a new one.
    pub fn add_item(&mut self, name: &str, quantity: u32) {
        match self.inventory.iter_mut().find(|i| i.name == name) {
            Some(item) => item.quantity += quantity,
            None => self.inventory.push(Item {
                name: name.to_owned(),
                quantity,
            }),
        }
    }

    /// Removes up to `quantity` items; empty stacks disappear. Returns the
    /// number actually removed.
    pub fn remove_item(&mut self, name: &str, quantity: u32) -> u32 {
        let Some(pos) = self.inventory.iter().position(|i| i.name == name) else {
            return 0;
        };
        let item = &mut self.inventory[pos];
        let taken = item.quantity.min(quantity);
        item.quantity -= taken;
        if item.quantity == 0 {
            self.inventory.remove(pos);
        }
        taken
    }

    /// Stack size of `name`, 0 when absent.
    pub fn item_count(&self, name: &str) -> u32 {
        self.inventory
            .iter()
            .find(|i| i.name == name)
            .map_or(0, |i| i.quantity)
    }
}
