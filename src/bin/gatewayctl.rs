use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gatewayctl")]
#[command(about = "Management CLI for the proxy gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081", env = "GATEWAY_ADMIN_URL")]
    url: String,

    #[arg(short, long, env = "GATEWAY_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show gateway status and proxy counts
    Status,
    /// List proxies with their health state
    Proxies,
    /// Run a health sweep now
    Check,
    /// Move failed proxies to cooldown and reactivate aged ones
    ResetCooldowns,
    /// Force one proxy back to ACTIVE
    Reset {
        id: u64,
    },
    /// List the active route table
    Routes,
}

impl Commands {
    fn endpoint(&self) -> (Method, String) {
        match self {
            Commands::Status => (Method::GET, "/admin/status".into()),
            Commands::Proxies => (Method::GET, "/admin/proxies".into()),
            Commands::Check => (Method::POST, "/admin/proxies/check".into()),
            Commands::ResetCooldowns => (Method::POST, "/admin/proxies/reset-cooldowns".into()),
            Commands::Reset { id } => (Method::POST, format!("/admin/proxies/{}/reset", id)),
            Commands::Routes => (Method::GET, "/admin/routes".into()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let (method, path) = cli.command.endpoint();
    let res = client
        .request(method, format!("{}{}", cli.url.trim_end_matches('/'), path))
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
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
