// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

//! Upstream adapter demo
//!
//! Sends one call of each kind through the adapter and prints the normalized
//! results.
//!
//! Usage:
//! 1. Set your API key: export OPENROUTER_API_KEY="sk-or-v1-..."
//! 2. Optional: override models with MODEL_LLM, MODEL_REASONER and MODEL_IMAGE
//! 3. Optional: export GATEWAY_DEMO_SAVE_DIR="images" to write data URI images
//! 4. Run: cargo run --example gateway_demo

use std::path::PathBuf;
use llm_gateway_core::{
    config::GatewayConfig,
    llm::{LLMError, OpenRouterClient, OperationKind},
    utils::{is_data_uri, save_data_uri},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = GatewayConfig::default().apply_process_env()?;
    let client = match OpenRouterClient::new(config) {
        Ok(client) => client,
        Err(LLMError::ConfigError(message)) => {
            eprintln!("❌ {}. Please export OPENROUTER_API_KEY=your_key_here", message);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    println!("🧪 Text chat");
    match client.chat_llm("Write a haiku about data pipelines", None).await {
        Ok(text) => println!("{}\n", text),
        Err(e) => println!("❌ {} ({})\n", e, e.kind()),
    }

    println!("🧠 Reasoning chat");
    match client.chat_reasoner("Solve: 2x + 3 = 11. Show your steps.", None).await {
        Ok(text) => println!("{}\n", text),
        Err(e) => println!("❌ {} ({})\n", e, e.kind()),
    }

    println!("🎨 Image generation with {}", client.default_model(OperationKind::Image));
    match client.generate_image("A robot reading in a futuristic library", None).await {
        Ok(image) if is_data_uri(&image) => {
            println!("Received data URI ({} chars)", image.len());
            if let Ok(dir) = std::env::var("GATEWAY_DEMO_SAVE_DIR") {
                let path = save_data_uri(&image, &PathBuf::from(dir))?;
                println!("Saved to {}", path.display());
            }
        }
        Ok(url) => println!("Image URL: {}", url),
        Err(e) => println!("❌ {} ({})", e, e.kind()),
    }

    Ok(())
}
