//! `astroline-telegram` — Telegram implementation of the delivery transport.

pub mod error;
pub mod transport;

pub use error::TelegramError;
pub use transport::TelegramTransport;
