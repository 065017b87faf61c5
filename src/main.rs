// external packages
use futures_util::StreamExt;
use tracing::{info, warn};

// reywen lib
use reywen::{
    client::Client,
    websocket::{data::WebSocketEvent, WebSocket},
};

use reywen_payday::plugins::payday;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let token = std::env::var("REVOLT_TOKEN").expect("REVOLT_TOKEN is not set");

    let client = Client::from_token(&token, true).expect("could not construct client");
    let websocket = WebSocket::from_token(&token);

    info!("booting...");

    loop {
        let (mut read, _write) = websocket.dual_async().await;
        info!("websocket established");

        while let Some(event) = read.next().await {
            if let WebSocketEvent::Message { message } = event {
                payday::on_message(&client, &message).await;
            }
        }

        warn!("websocket closed, reconnecting");
    }
}
