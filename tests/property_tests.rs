use proptest::prelude::*;
use sessioncart_rs::models::{validate_cart_quantity, Cart, CartItem, SessionKey};

prop_compose! {
    fn arb_cart_item()(
        product_id in 1i32..50,
        quantity in 1u32..=1000,
    ) -> CartItem {
        CartItem::new(product_id, quantity)
    }
}

prop_compose! {
    fn arb_cart()(items in prop::collection::vec(arb_cart_item(), 0..20)) -> Cart {
        Cart::from_items(items)
    }
}

proptest! {
    #[test]
    fn test_stored_cart_preserves_lines(cart in arb_cart()) {
        let bytes = cart.encode().unwrap();
        let decoded = Cart::decode(&bytes).unwrap();

        prop_assert_eq!(decoded.items(), cart.items());
    }

    #[test]
    fn test_remove_absent_product_is_noop(cart in arb_cart(), product_id in 100i32..200) {
        let mut updated = cart.clone();

        prop_assert!(!updated.remove_item(product_id));
        prop_assert_eq!(updated, cart);
    }

    #[test]
    fn test_add_then_remove_new_product_restores_cart(
        cart in arb_cart(),
        product_id in 100i32..200,
        quantity in 1u32..=1000,
    ) {
        let mut updated = cart.clone();
        updated.add_item(CartItem::new(product_id, quantity));
        prop_assert!(updated.remove_item(product_id));

        prop_assert_eq!(updated, cart);
    }

    #[test]
    fn test_add_then_remove_keeps_per_product_quantities(
        cart in arb_cart(),
        item in arb_cart_item(),
    ) {
        let mut updated = cart.clone();
        updated.add_item(item);
        updated.remove_item(item.product_id);

        prop_assert_eq!(updated.len(), cart.len());
        for product_id in 1i32..50 {
            if product_id != item.product_id {
                prop_assert_eq!(updated.quantity_of(product_id), cart.quantity_of(product_id));
            }
        }
    }

    #[test]
    fn test_decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = Cart::decode(&bytes);
    }

    #[test]
    fn test_quantity_validation(quantity in any::<u32>()) {
        let result = validate_cart_quantity(quantity);

        if quantity > 0 && quantity <= 1000 {
            prop_assert!(result.is_ok());
        } else {
            prop_assert!(result.is_err());
        }
    }

    #[test]
    fn test_session_key_validation(raw in ".{0,200}") {
        let valid = !raw.is_empty()
            && raw.len() <= 128
            && raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        prop_assert_eq!(SessionKey::parse(&raw).is_ok(), valid);
    }

    #[test]
    fn test_generated_session_keys_are_valid(_seed in any::<u8>()) {
        let key = SessionKey::generate();

        prop_assert!(SessionKey::parse(key.as_str()).is_ok());
    }
}
