use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "freeroll_bot=info,freeroll_bot_lib=info,serenity=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = freeroll_bot_lib::run().await {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
}
