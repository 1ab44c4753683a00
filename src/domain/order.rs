use std::fmt;

use serde::{Deserialize, Serialize};

use super::ProductId;

/// Storage-assigned identifier of an order row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of an order.
///
/// There is no transition graph: an update may move an order from any state
/// to any other. Stock accounting only looks at whether the state takes stock,
/// see [`OrderState::is_stock_taken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderState {
    pub const ALL: [OrderState; 7] = [
        OrderState::Pending,
        OrderState::Confirmed,
        OrderState::Processing,
        OrderState::Shipped,
        OrderState::Delivered,
        OrderState::Cancelled,
        OrderState::Returned,
    ];

    /// Integer code used in the `orders.state` column.
    pub const fn code(self) -> i64 {
        match self {
            OrderState::Pending => 0,
            OrderState::Confirmed => 1,
            OrderState::Processing => 2,
            OrderState::Shipped => 3,
            OrderState::Delivered => 4,
            OrderState::Cancelled => 5,
            OrderState::Returned => 6,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            OrderState::Pending => "pending",
            OrderState::Confirmed => "confirmed",
            OrderState::Processing => "processing",
            OrderState::Shipped => "shipped",
            OrderState::Delivered => "delivered",
            OrderState::Cancelled => "cancelled",
            OrderState::Returned => "returned",
        }
    }
}

impl TryFrom<i64> for OrderState {
    type Error = i64;

    /// Decodes a stored state code, handing back the raw value when it is not
    /// one of the seven known codes.
    fn try_from(code: i64) -> Result<Self, Self::Error> {
        OrderState::ALL
            .into_iter()
            .find(|state| state.code() == code)
            .ok_or(code)
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a customer order against a single product.
///
/// `product_id` is fixed at creation; updates may only change `quantity`
/// and `state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub state: OrderState,
}

/// Payload for creating a new order.
///
/// `state` is accepted so callers can forward whatever they received, but it
/// is always replaced by [`OrderState::Pending`] on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreate {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default = "pending")]
    pub state: OrderState,
}

fn pending() -> OrderState {
    OrderState::Pending
}

impl OrderCreate {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
            state: OrderState::Pending,
        }
    }

    pub fn with_state(mut self, state: OrderState) -> Self {
        self.state = state;
        self
    }
}

impl Order {
    pub fn from_create(id: OrderId, payload: OrderCreate) -> Self {
        Self {
            id,
            product_id: payload.product_id,
            quantity: payload.quantity,
            state: payload.state,
        }
    }

    /// Returns a copy of this order with a new quantity and state, the shape
    /// callers hand to `OrderClient::update`.
    pub fn revised(&self, quantity: u32, state: OrderState) -> Self {
        Self {
            quantity,
            state,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_codes_decode_back() {
        for state in OrderState::ALL {
            assert_eq!(OrderState::try_from(state.code()), Ok(state));
        }
    }

    #[test]
    fn unknown_state_code_is_rejected() {
        assert_eq!(OrderState::try_from(7), Err(7));
        assert_eq!(OrderState::try_from(-1), Err(-1));
    }

    #[test]
    fn state_serializes_in_snake_case() {
        let json = serde_json::to_string(&OrderState::Delivered).unwrap();
        assert_eq!(json, "\"delivered\"");
    }

    #[test]
    fn create_payload_defaults_to_pending() {
        let payload: OrderCreate = serde_json::from_str(r#"{"product_id":3,"quantity":2}"#).unwrap();
        assert_eq!(payload, OrderCreate::new(ProductId(3), 2));
    }
}
