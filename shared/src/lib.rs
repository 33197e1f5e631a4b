//! Shared types for the POS server
//!
//! Wire-level types used by the server and its clients: the order model,
//! principal roles, request payloads and the unified API envelope.

pub mod models;
pub mod response;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use models::{
    Order, OrderCreate, OrderItem, OrderStatus, OrderStatusUpdate, PaymentComplete,
    PaymentMethod, PaymentMethodUpdate, Role,
};
pub use response::ApiResponse;
