// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use llm_gateway_cli::{
    get_gateway_logo,
    server::{AppState, build_router},
};
use llm_gateway_core::{
    config::GatewayConfig,
    llm::{OpenRouterClient, OperationKind},
    utils::{is_data_uri, save_data_uri},
};
use owo_colors::OwoColorize;
use std::path::PathBuf;

fn show_welcome_message(address: &str) {
    println!("{}", get_gateway_logo());
    println!();
    println!(
        "🛰️  {} - Unified access to text, reasoning and image models",
        "LLM Gateway".bright_cyan()
    );
    println!("💡 Version: {}", env!("CARGO_PKG_VERSION").bright_green());
    println!("🌐 Listening on http://{}", address.bright_yellow());
    println!();
}

#[derive(Parser)]
#[command(
    name = "llm-gateway",
    about = "LLM Gateway - OpenRouter-backed text, reasoning and image generation",
    version = env!("CARGO_PKG_VERSION"),
    author = "ByteDance"
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Send one prompt to the text model
    Chat {
        prompt: String,

        #[arg(short, long)]
        model: Option<String>,
    },
    /// Send one prompt to the reasoning model
    Reason {
        prompt: String,

        #[arg(short, long)]
        model: Option<String>,
    },
    /// Generate one image
    Image {
        prompt: String,

        #[arg(short, long)]
        model: Option<String>,

        /// Write data URI images to the configured image directory
        #[arg(short, long)]
        save: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<GatewayConfig> {
    let config = match path {
        Some(path) => {
            let path = path.to_string_lossy();
            GatewayConfig::from_yaml(&path)
                .with_context(|| format!("failed to load configuration from {}", path))?
        }
        None => GatewayConfig::default(),
    };

    Ok(config.apply_process_env()?)
}

async fn run_once(
    client: &OpenRouterClient,
    kind: OperationKind,
    prompt: &str,
    model: Option<String>,
) -> Result<String> {
    let model = model.unwrap_or_else(|| client.default_model(kind).to_string());
    log::debug!("{} request with model {}", kind, model);

    let result = client.invoke(prompt, &model, kind, None).await?;
    Ok(result.into_inner())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let mut config = load_config(cli.config.as_ref())?;

    if let Commands::Serve { host, port } = &cli.command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
    }

    let client = OpenRouterClient::new(config).context("failed to initialize the OpenRouter client")?;

    match cli.command {
        Commands::Serve { .. } => {
            let server = &client.config().server;
            let address = format!("{}:{}", server.host, server.port);
            let image_dir = client.config().image.output_dir.clone();

            tokio::fs::create_dir_all(&image_dir)
                .await
                .with_context(|| format!("failed to create image directory {}", image_dir.display()))?;

            let listener = tokio::net::TcpListener::bind(&address)
                .await
                .with_context(|| format!("failed to bind {}", address))?;

            show_welcome_message(&address);
            axum::serve(listener, build_router(AppState::new(client))).await?;
        }
        Commands::Chat { prompt, model } => {
            let text = run_once(&client, OperationKind::Text, &prompt, model).await?;
            println!("{}", text);
        }
        Commands::Reason { prompt, model } => {
            let text = run_once(&client, OperationKind::Reasoning, &prompt, model).await?;
            println!("{}", text);
        }
        Commands::Image { prompt, model, save } => {
            let image = run_once(&client, OperationKind::Image, &prompt, model).await?;

            if save && is_data_uri(&image) {
                let path = save_data_uri(&image, &client.config().image.output_dir)?;
                println!("✅ Image saved to {}", path.display().bright_green());
            } else if is_data_uri(&image) {
                println!("✅ Received data URI ({} chars); pass --save to store it", image.len());
            } else {
                println!("✅ Image URL: {}", image.bright_green());
            }
        }
    }

    Ok(())
}
