//! Stock accounting rules.
//!
//! Everything the engine knows about how an order affects its product's
//! stock lives here: which states hold stock, how much an order holds, and
//! how much a revision of an order gives back.

use crate::domain::{Order, OrderState};

impl OrderState {
    /// Whether an order in this state counts against its product's stock.
    pub const fn is_stock_taken(self) -> bool {
        match self {
            OrderState::Confirmed
            | OrderState::Processing
            | OrderState::Shipped
            | OrderState::Delivered => true,
            OrderState::Pending | OrderState::Cancelled | OrderState::Returned => false,
        }
    }
}

impl Order {
    /// Units of stock this order currently holds.
    pub const fn taken_stock(&self) -> u32 {
        if self.state.is_stock_taken() {
            self.quantity
        } else {
            0
        }
    }
}

/// Stock to give back to the product when `before` is replaced by `after`.
///
/// Positive when the order now holds less stock, negative when it holds more.
/// Quantity and state changes are folded into a single figure.
pub fn stock_delta(before: &Order, after: &Order) -> i64 {
    i64::from(before.taken_stock()) - i64::from(after.taken_stock())
}
