use std::collections::HashSet;
use std::time::Duration;

use sqlx::SqlitePool;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::{BotClient, Update};

use super::lookup::{lookup, LookupOutcome};
use super::replies;

const CHECK_BUTTON: &str = "Check certificate";
const HELP_BUTTON: &str = "Help";

/// Pause before re-polling after a transport error
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Spawn the verification bot loop
///
/// Long-polls the bot API and answers certificate checks until
/// `shutdown` changes.
pub fn spawn_bot(
    client: BotClient,
    pool: SqlitePool,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut offset: i64 = 0;
        let mut awaiting_number = HashSet::new();

        tracing::info!("Verification bot started");
        loop {
            tokio::select! {
                updates = client.get_updates(offset) => {
                    match updates {
                        Ok(updates) => {
                            for update in updates {
                                offset = offset.max(update.update_id + 1);
                                handle_update(&client, &pool, &mut awaiting_number, update).await;
                            }
                        }
                        Err(error) => {
                            tracing::warn!(error = %error, "Failed to poll bot updates");
                            tokio::time::sleep(POLL_RETRY_DELAY).await;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("Verification bot shutting down");
                    return;
                }
            }
        }
    })
}

async fn handle_update(
    client: &BotClient,
    pool: &SqlitePool,
    awaiting_number: &mut HashSet<i64>,
    update: Update,
) {
    let Some(message) = update.message else { return };
    let Some(text) = message.text else { return };
    let chat_id = message.chat.id;

    if let Err(error) = handle_message(client, pool, awaiting_number, chat_id, text.trim()).await {
        tracing::warn!(error = %error, chat_id, "Failed to handle bot message");
    }
}

/// React to one incoming message
///
/// After "Check certificate" the next message from that chat is
/// treated as a number to verify; anything else unprompted is ignored.
async fn handle_message(
    client: &BotClient,
    pool: &SqlitePool,
    awaiting_number: &mut HashSet<i64>,
    chat_id: i64,
    text: &str,
) -> anyhow::Result<()> {
    if text == "/start" {
        awaiting_number.remove(&chat_id);
        client
            .send_message_with_keyboard(chat_id, replies::START, &[&[CHECK_BUTTON], &[HELP_BUTTON]])
            .await
    } else if text == HELP_BUTTON {
        client.send_message(chat_id, replies::HELP).await
    } else if text == CHECK_BUTTON {
        awaiting_number.insert(chat_id);
        client.send_message(chat_id, replies::ENTER_NUMBER).await
    } else if awaiting_number.remove(&chat_id) {
        let reply = match lookup(pool, text).await? {
            LookupOutcome::ValidCourse => replies::COURSE_VALID,
            LookupOutcome::ValidGift => replies::GIFT_VALID,
            LookupOutcome::ExpiredGift => replies::GIFT_EXPIRED,
            LookupOutcome::NotFound => replies::NOT_FOUND,
        };
        client.send_message(chat_id, reply).await
    } else {
        Ok(())
    }
}
