//! Integration tests for cart payload validation and draft building

use serde_json::json;
use testresult::TestResult;

use bookcart::prelude::*;

#[test]
fn backend_cart_payload_satisfies_totals_invariant() -> TestResult {
    let cart: Cart = serde_json::from_value(json!({
        "items": [
            { "book_id": 1, "title": "Dune", "price": "100000.00", "quantity": 2, "subtotal": "200000.00" },
            { "book_id": 3, "title": "Emma", "price": 45000, "quantity": 1, "subtotal": 45000 }
        ],
        "total_items": 3,
        "total_amount": "245000.00"
    }))?;

    cart.verify_totals()?;

    let draft = OrderDraft::from_cart(&cart);

    assert_eq!(draft.total_quantity(), cart.total_items);
    assert_eq!(draft.lines().len(), cart.items.len());

    Ok(())
}

#[test]
fn empty_backend_cart_parses() -> TestResult {
    let cart: Cart = serde_json::from_value(json!({
        "items": [],
        "total_items": 0,
        "total_amount": "0.00"
    }))?;

    assert!(cart.is_empty(), "no lines expected");
    assert!(OrderDraft::from_cart(&cart).is_empty(), "draft should be empty");

    Ok(())
}
