use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

use domofix_gate::auth::{JwtCodec, Role, TokenCodec, TokenPayload};
use domofix_gate::config::loader::{apply_env_overrides, load_config};
use domofix_gate::config::GateConfig;

#[derive(Parser)]
#[command(name = "gate-cli")]
#[command(about = "Management CLI for the Domofix request gate", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "GATE_ADMIN_KEY", default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gate status
    Status,
    /// Show recent audit events
    Audit {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Show rate limiter occupancy
    Limiter,
    /// Sign a session token with the configured secret
    IssueToken {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        sub: String,
        #[arg(long)]
        role: Option<Role>,
        #[arg(long)]
        email: Option<String>,
        /// Lifetime in seconds; defaults to `token.ttl_secs`
        #[arg(long)]
        ttl: Option<i64>,
    },
    /// Verify a session token and print its claims
    InspectToken {
        #[arg(short, long)]
        config: Option<PathBuf>,
        token: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Status => admin_get(&cli.url, &cli.key, "/admin/status").await?,
        Commands::Audit { limit } => admin_get(&cli.url, &cli.key, &format!("/admin/audit?limit={}", limit)).await?,
        Commands::Limiter => admin_get(&cli.url, &cli.key, "/admin/limiter").await?,
        Commands::IssueToken {
            config,
            sub,
            role,
            email,
            ttl,
        } => {
            let config = token_config(config.as_deref())?;
            let codec = JwtCodec::from_config(&config.token);
            let payload = TokenPayload::new(sub, role, email, ttl.unwrap_or(config.token.ttl_secs));
            println!("{}", codec.issue(&payload)?);
        }
        Commands::InspectToken { config, token } => {
            let config = token_config(config.as_deref())?;
            let payload = JwtCodec::from_config(&config.token).decode(&token)?;
            let expired = payload.is_expired();
            let expires_at = Utc.timestamp_opt(payload.exp, 0).single().map(|t| t.to_rfc3339());
            let report = json!({
                "claims": payload,
                "expires_at": expires_at,
                "expired": expired,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn token_config(path: Option<&Path>) -> Result<GateConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => {
            let mut config = GateConfig::default();
            apply_env_overrides(&mut config);
            Ok(config)
        }
    }
}

async fn admin_get(base: &str, key: &str, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", key))?);

    let res = reqwest::Client::new()
        .get(format!("{}{}", base.trim_end_matches('/'), path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
