//! Chat transport
//!
//! The dispatcher speaks to users through the [`Transport`] trait. The
//! Telegram Bot API implementation and its long-polling loop live here.

mod poller;
mod telegram;
mod traits;

pub use poller::{Decoded, decode_update, run_polling};
pub use telegram::{CallbackQuery, Chat, Message, TelegramClient, Update};
pub use traits::{
    AudioUpload, Command, InboundEvent, InlineMenu, MenuButton, Prompt, Transport, VideoUpload,
};
