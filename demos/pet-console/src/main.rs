//! Headless stand-in for the pet window.
//!
//! Connects, logs in, draws a card and prints whatever the server pushes
//! until Ctrl-C. When the server is unreachable the pet keeps running
//! offline, just as the desktop build does.
//!
//! ```text
//! JIGGER_TOKEN=abc cargo run -p pet-console -- ws://127.0.0.1:18080/ws
//! RUST_LOG=jigger=trace cargo run -p pet-console
//! ```

use std::env;

use jigger::DEFAULT_ENDPOINT;
use jigger::prelude::*;
use tracing_subscriber::EnvFilter;

const DEVICE_ID: &str = "pet-console";

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn dispatcher() -> MessageDispatcher {
    let mut dispatcher = MessageDispatcher::new();

    dispatcher.on(|resp: GetUserInfoResponse| {
        let Some(info) = resp.user_info.filter(|_| resp.ret.is_ok()) else {
            return Err(HandlerError::msg(format!("user info failed: {}", resp.ret)));
        };
        tracing::info!(
            name = %info.name,
            gold = info.gold,
            diamond = info.diamond,
            cards = info.backpack.cards.len(),
            "profile"
        );
        Ok(())
    });

    dispatcher.on(|resp: DrawCardResponse| {
        if !resp.ret.is_ok() {
            return Err(HandlerError::msg(format!("draw failed: {}", resp.ret)));
        }
        for card in &resp.cards {
            tracing::info!(id = card.id, name = %card.name, rarity = card.rarity, "drew card");
        }
        Ok(())
    });

    dispatcher.on(|resp: JoinRoomResponse| {
        tracing::info!(ret = %resp.ret, "join room answered");
        Ok(())
    });

    dispatcher.on(|note: GameNotification| {
        let fields = serde_json::Value::Object(note.fields);
        tracing::info!(kind = %note.kind, player = ?note.player_id, %fields, "notification");
        Ok(())
    });

    dispatcher
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let endpoint = env::args()
        .nth(1)
        .or_else(|| env::var("JIGGER_ENDPOINT").ok())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    let token = env::var("JIGGER_TOKEN").unwrap_or_default();
    let is_guest = token.is_empty();

    let config = ClientConfig::default().with_endpoint(endpoint);
    let (client, mut events) = Client::builder(config).dispatcher(dispatcher()).build();

    match client.connect().await {
        Ok(()) => {}
        Err(error @ ClientError::ConnectionFailed { .. }) => {
            tracing::warn!(%error, "server unreachable, running offline");
            return Ok(());
        }
        Err(error) => return Err(error),
    }

    let me = client
        .login(&client.auth_params(token, DEVICE_ID, is_guest))
        .await?;
    tracing::info!(uid = me.user_id, nickname = %me.nickname, guest = me.is_guest, "logged in");

    client.get_user_info().await?;
    client.draw_card(1).await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(ClientEvent::Disconnected(reason)) => {
                    tracing::warn!(%reason, "lost the server");
                    return Ok(());
                }
                Some(ClientEvent::DispatchFailed { kind, error, .. }) => {
                    tracing::warn!(%kind, %error, "message not handled");
                }
                Some(ClientEvent::MalformedFrame { len, reason }) => {
                    tracing::warn!(len, %reason, "bad frame from server");
                }
                Some(event) => tracing::debug!(?event, "client event"),
                None => break,
            },
        }
    }

    client.close().await
}
