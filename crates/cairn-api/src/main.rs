//! Cairn API CLI
//!
//! Starts the HTTP server and the background hygiene/detector workers.

use cairn_api::{config::ServiceConfig, start_server, ApiError};
use std::env;
use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), ApiError> {
    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();

    let config = if args.len() > 2 && args[1] == "--config" {
        // Load from specified config file
        let config_path = &args[2];
        ServiceConfig::from_file(config_path)?
    } else if args.len() > 1 && args[1] == "--help" {
        print_help();
        process::exit(0);
    } else {
        // Use default test configuration
        eprintln!("Warning: No config file specified, using default test configuration");
        eprintln!("Usage: cairn-api --config <path-to-config.toml>");
        eprintln!();
        ServiceConfig::default_test_config()
    };

    // Start the server
    start_server(config).await?;

    Ok(())
}

fn print_help() {
    println!("Cairn API - Contamination-Prevention Layer");
    println!();
    println!("USAGE:");
    println!("    cairn-api --config <path-to-config.toml>");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>    Load configuration from TOML file");
    println!("    --help             Print this help message");
    println!();
    println!("EXAMPLE:");
    println!("    cairn-api --config config/cairn.toml");
    println!();
    println!("CONFIGURATION:");
    println!("    The TOML config file should contain:");
    println!("    - bind_address: IP address to bind (e.g., '127.0.0.1')");
    println!("    - bind_port: Port number (e.g., 8080)");
    println!("    - db_path: SQLite database path, or ':memory:'");
    println!("    - policy_path: Gate policy TOML (optional)");
    println!("    - validator_pool: Agents eligible for cross-validation");
    println!("    - auditors: Agents granted quarantine read access");
    println!("    - [hygiene] / [detector]: Worker schedules");
    println!();
}
