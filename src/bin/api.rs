use credit_literacy_bot::{
    api::{start_server, ApiState},
    config::BotConfig,
    conversation::ConversationEngine,
    state::InMemorySessionStore,
    whatsapp::{CloudApiSender, LogSender, MessageSender},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BotConfig::from_env().map_err(|e| {
        eprintln!("⚠️  {}", e);
        eprintln!("📌 Set VERIFY_TOKEN in .env before starting the webhook");
        e
    })?;

    info!("🚀 Credit Literacy Bot - Webhook Server");
    info!("📍 Port: {}", config.port);

    let sender: Arc<dyn MessageSender> = match &config.whatsapp {
        Some(whatsapp) => {
            info!("📤 Replies delivered through the WhatsApp Cloud API");
            Arc::new(CloudApiSender::new(whatsapp)?)
        }
        None => {
            info!("📝 No WhatsApp credentials, replies are only logged");
            Arc::new(LogSender)
        }
    };

    let store = Arc::new(InMemorySessionStore::new());
    let state = ApiState {
        engine: Arc::new(ConversationEngine::new(store)),
        sender,
        verify_token: Arc::from(config.verify_token.as_str()),
    };

    info!("✅ Conversation engine initialized");

    start_server(state, config.port).await?;

    Ok(())
}
