use credit_literacy_bot::{conversation::ConversationEngine, state::InMemorySessionStore};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOCAL_USER: &str = "local";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Logs go to stderr so the conversation stays readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Credit Literacy Bot local chat starting");

    let engine = ConversationEngine::new(Arc::new(InMemorySessionStore::new()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    stdout
        .write_all(b"Type a message (for example *hola*). Ctrl-D to quit.\n\n> ")
        .await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let reply = engine.handle_message(LOCAL_USER, &line).await;
        stdout
            .write_all(format!("\n{}\n\n> ", reply).as_bytes())
            .await?;
        stdout.flush().await?;
    }

    stdout.write_all(b"\n").await?;
    Ok(())
}
