//! `astroline-delivery` — turns fired jobs into sent messages.
//!
//! The executor consumes fires from the scheduler engine, reads subscriber
//! state and cached content, renders a message and hands it to the
//! [`transport::Transport`] collaborator. Failures are isolated per
//! subscriber; a permanent rejection from the transport deactivates the
//! recipient and nothing else.

pub mod broadcast;
pub mod executor;
pub mod render;
pub mod transport;

pub use broadcast::{broadcast, BroadcastReport};
pub use executor::{DeliveryExecutor, FireOutcome};
pub use render::render;
pub use transport::{SendError, Transport};
