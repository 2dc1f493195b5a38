use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::CodecError;

/// Schema version written into every persisted cart blob
pub const CART_SCHEMA_VERSION: u32 = 1;

/// A single line in a shopping cart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: i32,
    pub quantity: u32,
}

/// Ordered collection of cart lines owned by one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

/// Persisted layout of a cart, one JSON object per session key.
///
/// Blobs written before versioning carry no `schemaVersion` and are read as version 1.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCart {
    #[serde(default = "legacy_schema_version")]
    schema_version: u32,
    items: Vec<CartItem>,
}

fn legacy_schema_version() -> u32 {
    1
}

/// Cart rendered for the HTTP surface with catalog details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total_items: u32,
    pub total_price: Decimal,
}

/// One cart line enriched with catalog data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLineView {
    pub product_id: i32,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub is_available: bool,
}

impl CartItem {
    pub fn new(product_id: i32, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

impl Cart {
    /// Create a new empty cart
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from existing lines, dropping zero-quantity lines
    pub fn from_items(items: Vec<CartItem>) -> Self {
        Self {
            items: items.into_iter().filter(|item| item.quantity > 0).collect(),
        }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Append a line. Zero-quantity items are logically absent and are not stored.
    pub fn add_item(&mut self, item: CartItem) -> bool {
        if item.quantity == 0 {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Remove the first line referencing `product_id`
    pub fn remove_item(&mut self, product_id: i32) -> bool {
        match self
            .items
            .iter()
            .position(|item| item.product_id == product_id)
        {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of lines in the cart
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Sum of quantities over all lines
    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn contains_item(&self, product_id: i32) -> bool {
        self.items.iter().any(|item| item.product_id == product_id)
    }

    /// Total quantity of `product_id` across all of its lines
    pub fn quantity_of(&self, product_id: i32) -> u32 {
        self.items
            .iter()
            .filter(|item| item.product_id == product_id)
            .map(|item| item.quantity)
            .sum()
    }

    /// Serialize into the versioned persisted layout
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let stored = StoredCart {
            schema_version: CART_SCHEMA_VERSION,
            items: self.items.clone(),
        };
        Ok(serde_json::to_vec(&stored)?)
    }

    /// Decode a persisted blob, rejecting unknown schema versions
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let stored: StoredCart = serde_json::from_slice(bytes)?;
        if stored.schema_version != CART_SCHEMA_VERSION {
            return Err(CodecError::UnsupportedVersion {
                found: stored.schema_version,
            });
        }
        Ok(Self::from_items(stored.items))
    }
}
