use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A flower offered in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flower {
    pub id: i32,
    pub name: String,
    pub sale_price: Decimal,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl Flower {
    pub fn new(
        id: i32,
        name: impl Into<String>,
        sale_price: Decimal,
        unit_price: Decimal,
        quantity: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            sale_price,
            unit_price,
            quantity,
        }
    }

    /// Whether any stock is left
    pub fn is_in_stock(&self) -> bool {
        self.quantity > 0
    }

    /// Price of `quantity` units at the sale price
    pub fn price_for(&self, quantity: u32) -> Decimal {
        self.sale_price * Decimal::from(quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_for_quantity() {
        let flower = Flower::new(19, "Red Rose Beautiful Bunch", dec!(6.19), dec!(0.59), 252);

        assert_eq!(flower.price_for(3), dec!(18.57));
        assert_eq!(flower.price_for(0), dec!(0));
        assert!(flower.is_in_stock());
    }
}
