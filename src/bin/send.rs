//! Minimal reference client for the execution service
//!
//! Uploads a program file as a JSON envelope and prints the raw HTTP
//! status and body. Exits non-zero only when the file is missing or the
//! request could not be sent at all; an error-status response from the
//! service is still reported and exits zero.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

/// Send a program file to the execution service and print the response
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Endpoint to POST to (e.g. http://localhost:5000/run)
    http_path: String,

    /// Path of the program file to send
    filepath: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if !args.filepath.exists() {
        eprintln!("Error: File '{}' does not exist", args.filepath.display());
        return ExitCode::FAILURE;
    }

    match send(&args.http_path, &args.filepath).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error sending request: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn send(http_path: &str, filepath: &Path) -> Result<()> {
    let program = std::fs::read_to_string(filepath)
        .with_context(|| format!("Failed to read '{}'", filepath.display()))?;

    let response = reqwest::Client::new()
        .post(http_path)
        .json(&serde_json::json!({ "program": program }))
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", http_path))?;

    println!("Response status code: {}", response.status().as_u16());
    println!("Response content:");
    println!(
        "{}",
        response
            .text()
            .await
            .context("Failed to read response body")?
    );

    Ok(())
}
