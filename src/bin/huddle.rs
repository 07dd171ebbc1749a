// Line-oriented chat over in-process collaborators and the Gemini summarizer.
//
// Plain lines are sent to the current channel. Commands:
//   /feed            print the current feed
//   /summarize       summarize the current feed
//   /channel <id>    switch channel
//   /quit            exit

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use huddle::core::config::AppConfig;
use huddle::core::models::{ChannelId, FeedSnapshot};
use huddle::identity::MemoryIdentityService;
use huddle::publisher::SendOutcome;
use huddle::session::{ChatSession, HuddleClient};
use huddle::store::MemoryStore;

const ECHO_WAIT: Duration = Duration::from_secs(2);

fn print_feed(snapshot: &FeedSnapshot) {
    if snapshot.is_empty() {
        println!("(no messages)");
    }
    for message in snapshot.iter() {
        println!("{}", message.transcript_line());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    huddle::setup_logging();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    let client = HuddleClient::from_config(
        &config,
        Arc::new(MemoryIdentityService::new()),
        Arc::new(MemoryStore::new()),
    )?;
    let channel = ChannelId::new(config.default_channel.clone())?;
    let mut session = ChatSession::start(&client, channel).await?;

    if let Some(identity) = session.identity() {
        println!("Your user id (for collaboration): {identity}");
    }
    info!("Chat ready on channel {}", session.channel());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "/quit" => break,
            "/feed" => print_feed(&session.snapshot()),
            "/summarize" => match session.summarize().await {
                Ok(result) => println!("Chat summary: {}", result.display_text()),
                Err(rejection) => println!("{rejection}"),
            },
            _ if line.starts_with("/channel ") => {
                let id = line.trim_start_matches("/channel ");
                match ChannelId::new(id) {
                    Ok(channel) => {
                        session.switch_channel(channel);
                        println!("Now in #{}", session.channel());
                    }
                    Err(e) => println!("{e}"),
                }
            }
            _ => {
                let before = session.snapshot().len();
                match session.send(line).await {
                    Ok(SendOutcome::Sent(_)) => {
                        // No local echo; wait for the store to push the message back.
                        if let Some(mut updates) = session.updates() {
                            let _ = tokio::time::timeout(
                                ECHO_WAIT,
                                updates.wait_for(|s| s.len() > before),
                            )
                            .await;
                        }
                        if let Some(message) = session.snapshot().messages().last() {
                            println!("{}", message.transcript_line());
                        }
                    }
                    Ok(SendOutcome::Skipped(_)) => {}
                    Err(e) => println!("Error sending message: {e}"),
                }
            }
        }
    }

    session.close();
    Ok(())
}
