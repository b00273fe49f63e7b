//! Subscription and delivery
//!
//! The subscriber registry and its store, the chat transport, the periodic
//! refresh loop and the bot command front end.

mod bot;
mod retry;
mod service;
mod store;
mod subscribers;
mod transport;

pub use bot::{command_from_callback, command_from_text, BotPoller};
pub use retry::RetryPolicy;
pub use service::{Command, CycleSummary, DeliveryOutcome, DeliveryService};
pub use store::{JsonFileStore, SubscriberStore};
pub use subscribers::{Subscriber, SubscriberRegistry};
pub use transport::{ChatTransport, TelegramTransport, TransportError, REFRESH_CALLBACK};
