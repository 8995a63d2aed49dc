//! SchoolHub event bus and outbound delivery.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the domain event envelope, scoped to a school.
//! - [`delivery`]: external delivery channels (SMTP email).

pub mod bus;
pub mod delivery;

pub use bus::{EventBus, PlatformEvent};
pub use delivery::email::{EmailConfig, EmailDelivery, EmailError};
