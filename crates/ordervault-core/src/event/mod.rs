//! Inbound order events and the outbound summary event.
//!
//! Inbound queue messages wrap the order in a `payload` envelope:
//!
//! ```text
//! {"payload": {"status": "CLOSED", "user": {..}, "order": {..},
//!              "restaurant": {..}, "products": [..], "categories": [..]}}
//! ```
//!
//! Only the lifecycle status is read before filtering; the full payload is
//! deserialized and validated only for `CLOSED` orders.

pub mod summary;

pub use summary::SummaryEvent;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The only lifecycle status the loader materializes.
pub const CLOSED_STATUS: &str = "CLOSED";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a single inbound event cannot be decomposed.
#[derive(Debug, thiserror::Error)]
pub enum DecomposeError {
    /// The message has no `payload` object.
    #[error("message has no payload object")]
    MissingPayload,

    /// The payload has no string `status`.
    #[error("payload has no status")]
    MissingStatus,

    /// The payload does not match the order event shape.
    #[error("malformed order event: {0}")]
    Invalid(#[from] serde_json::Error),

    /// A natural business key is present but empty.
    #[error("order event has an empty natural key at {field}")]
    EmptyKey { field: String },
}

impl DecomposeError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> crate::error::ErrorCode {
        match self {
            Self::EmptyKey { .. } => crate::error::ErrorCode::MissingNaturalKey,
            Self::MissingPayload | Self::MissingStatus | Self::Invalid(_) => {
                crate::error::ErrorCode::MalformedEvent
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Event model
// ---------------------------------------------------------------------------

/// One order-lifecycle event as published by the order service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub status: String,
    pub user: UserRef,
    pub order: OrderRef,
    pub restaurant: RestaurantRef,
    pub products: Vec<ProductRef>,
    pub categories: Vec<CategoryRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    pub name: String,
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRef {
    pub id: String,
    pub date: String,
    pub cost: f64,
    pub payment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: String,
    /// Display name; the product id stands in when the producer omits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ProductRef {
    /// Name recorded in the product-names satellite.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub name: String,
}

impl OrderEvent {
    /// Parse the order carried in a queue message's `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`DecomposeError::MissingPayload`] if there is no payload,
    /// [`DecomposeError::Invalid`] if a required field is absent or mistyped,
    /// and [`DecomposeError::EmptyKey`] if a natural key is empty.
    pub fn from_message(message: &Value) -> Result<Self, DecomposeError> {
        let payload = message.get("payload").ok_or(DecomposeError::MissingPayload)?;
        let event = Self::deserialize(payload)?;
        event.validate()?;
        Ok(event)
    }

    /// Whether this order is in the `CLOSED` state.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status == CLOSED_STATUS
    }

    /// Reject events whose natural keys are empty.
    ///
    /// A key made only of whitespace counts as empty: every such key would
    /// derive its own surrogate id for what is really an absent value. Keys are
    /// otherwise kept verbatim, surrounding whitespace included.
    ///
    /// # Errors
    ///
    /// Returns [`DecomposeError::EmptyKey`] naming the first empty key.
    pub fn validate(&self) -> Result<(), DecomposeError> {
        fn require(value: &str, field: impl FnOnce() -> String) -> Result<(), DecomposeError> {
            if value.trim().is_empty() {
                Err(DecomposeError::EmptyKey { field: field() })
            } else {
                Ok(())
            }
        }

        require(&self.user.id, || "user.id".to_string())?;
        require(&self.order.id, || "order.id".to_string())?;
        require(&self.restaurant.id, || "restaurant.id".to_string())?;
        for (i, product) in self.products.iter().enumerate() {
            require(&product.id, || format!("products[{i}].id"))?;
        }
        for (i, category) in self.categories.iter().enumerate() {
            require(&category.name, || format!("categories[{i}].name"))?;
        }
        Ok(())
    }
}

/// Read the lifecycle status of a queue message without parsing the rest.
///
/// # Errors
///
/// Returns [`DecomposeError::MissingPayload`] or
/// [`DecomposeError::MissingStatus`] when the envelope is incomplete.
pub fn payload_status(message: &Value) -> Result<&str, DecomposeError> {
    message
        .get("payload")
        .ok_or(DecomposeError::MissingPayload)?
        .get("status")
        .and_then(Value::as_str)
        .ok_or(DecomposeError::MissingStatus)
}
