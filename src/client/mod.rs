mod bot_client;
mod drive_client;
mod email_client;

pub use bot_client::{BotClient, Chat, Message, Update};
pub use drive_client::DriveClient;
pub use email_client::{Email, EmailAttachment, EmailClient, SenderIdentity};
