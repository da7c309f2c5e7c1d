use anyhow::{Context, Result};
use study_rag::{
    AppConfig, AppState, RagPipeline,
    api::routes::create_router,
    cli::{Cli, Commands, output::Output},
    utils::logging,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    if let Err(err) = run(cli, &output).await {
        output.error(&format!("{:#}", err));
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    dotenvy::dotenv().ok();

    if !cli.config.exists() {
        output.warning(&format!(
            "No configuration file at {}, using defaults",
            cli.config.display()
        ));
    }

    let mut config = AppConfig::load_with_env(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    let log_level = cli
        .log_level_override()
        .unwrap_or(config.server.log_level.as_str())
        .to_string();

    match cli.subcommand() {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            logging::init(&log_level, config.server.log_format)?;
            serve(config, output).await
        }
        Commands::Ask { question } => {
            logging::init(&log_level, config.server.log_format)?;
            ask(&config, &question, output).await
        }
        Commands::Config { validate } => {
            if validate {
                output.success(&format!("{} is valid", cli.config.display()));
            } else {
                print_config(&config, output);
            }
            Ok(())
        }
    }
}

async fn serve(config: AppConfig, output: &Output) -> Result<()> {
    let address = config.bind_address();

    let state = AppState::from_config(config)
        .await
        .context("Failed to initialise the RAG pipeline")?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    output.banner(&address);
    tracing::info!(%address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn ask(config: &AppConfig, question: &str, output: &Output) -> Result<()> {
    let pipeline = RagPipeline::from_config(config)
        .await
        .context("Failed to initialise the RAG pipeline")?;

    let state = pipeline.invoke(question).await?;

    let fragments: Vec<&str> = state.context().iter().map(|d| d.content.as_str()).collect();
    output.sources(&fragments);
    output.answer(state.answer().unwrap_or_default());
    Ok(())
}

fn print_config(config: &AppConfig, output: &Output) {
    let key_status = |key: Option<String>| if key.is_some() { "set" } else { "not set" };

    output.header("Server");
    output.kv("address", &config.bind_address());
    output.kv("log", &format!("{} ({:?})", config.server.log_level, config.server.log_format));
    output.kv("max body bytes", &config.server.max_body_bytes.to_string());
    output.kv(
        "cors origins",
        &if config.server.cors_origins.is_empty() {
            "*".to_string()
        } else {
            config.server.cors_origins.join(", ")
        },
    );

    output.header("Chat model");
    output.kv("provider", &format!("{:?}", config.llm.provider));
    output.kv("model", &config.llm.model);
    output.kv("endpoint", config.llm.api_base());
    output.kv(
        &config.llm.api_key_env,
        key_status(config.llm_api_key()),
    );

    output.header("Embeddings");
    output.kv("provider", &format!("{:?}", config.embeddings.provider));
    output.kv("model", &config.embeddings.model);
    output.kv("endpoint", config.embeddings.api_base());
    output.kv(
        &config.embeddings.api_key_env,
        key_status(config.embeddings_api_key()),
    );

    output.header("Vector store");
    output.kv("provider", &format!("{:?}", config.vector_store.provider));
    output.kv("path", &config.vector_store.path);
    output.kv("collection", &config.vector_store.collection);
    output.kv("top_k", &config.vector_store.top_k.to_string());
    output.kv(
        "score threshold",
        &config
            .vector_store
            .score_threshold
            .map(|t| t.to_string())
            .unwrap_or_else(|| "none".to_string()),
    );

    output.header("Prompt");
    output.kv("source", &format!("{:?}", config.prompt.source));
    output.kv("name", &config.prompt.name);
    output.kv("hub", &config.prompt.hub_url);
    output.kv(&config.prompt.api_key_env, key_status(config.hub_api_key()));
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
