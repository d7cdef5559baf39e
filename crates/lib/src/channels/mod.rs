//! Communication channels (Telegram, Messenger).
//!
//! Channel trait and registry so the dispatcher can route replies. Inbound messages are
//! sent to the dispatcher, which answers each one on its own task.

mod chunk;
mod inbound;
mod messenger;
mod registry;
mod telegram;

pub use chunk::split_message;
pub use inbound::InboundMessage;
pub use messenger::{MessengerChannel, MESSENGER_CHANNEL_ID};
pub use registry::{ChannelHandle, ChannelRegistry};
pub use telegram::{TelegramChannel, TelegramMessage, TelegramUpdate, TELEGRAM_CHANNEL_ID};
