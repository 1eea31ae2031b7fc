use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use page_summarizer::{
    config::Config,
    api::routes::create_router,
    llm::GeminiClient,
    logging::setup_logging,
    pipeline::Pipeline,
    prompt::PromptTemplate,
    scraper::HttpFetcher,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logging();

    // Refuse to start without a usable credential
    let config = Config::load().inspect_err(|e| error!("Configuration error: {}", e))?;

    let fetcher = HttpFetcher::new(config.fetch_timeout)?;
    let summarizer = GeminiClient::new(&config.gemini)?;
    info!(model = summarizer.model(), "Using Gemini model");

    let pipeline = Pipeline::new(
        Arc::new(fetcher),
        Arc::new(summarizer),
        PromptTemplate::from(&config.summary),
    )
    .with_fetch_timeout(config.fetch_timeout)
    .with_summarize_timeout(config.gemini.timeout);

    let app_state = AppState {
        pipeline: Arc::new(pipeline),
    };
    let app = create_router(app_state, Some(config.static_dir.as_path()));

    let listener = TcpListener::bind(config.server_addr).await?;
    info!("Server running at http://{}", config.server_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
