use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "dynconf-cli")]
#[command(about = "Management CLI for the dynconf service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Admin bearer key, if the server requires one.
    #[arg(short, long, env = "DYNCONF_ADMIN_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write configs: `put svc1 a=1 b=true --enable b`
    Put {
        service: String,
        /// NAME=JSON pairs; values that are not valid JSON are sent as strings
        #[arg(required = true)]
        configs: Vec<String>,
        /// Names to mark as enabled kill switches
        #[arg(long = "enable")]
        enabled: Vec<String>,
        /// Names to mark as disabled kill switches
        #[arg(long = "disable")]
        disabled: Vec<String>,
    },
    /// Delete configs of a service
    Delete {
        service: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Fetch values the way a client would
    Values {
        service: String,
        #[arg(long = "id")]
        ids: Vec<String>,
        /// RFC 3339 watermark from a previous poll
        #[arg(long)]
        since: Option<String>,
    },
    /// Show server and snapshot status
    Status,
    /// Force a cache refresh
    Invalidate,
}

fn parse_pair(pair: &str) -> Result<(String, Value), String> {
    let (name, raw) = pair
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", pair))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.to_string(), value))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", key))?);
    }

    let res = match cli.command {
        Commands::Put {
            service,
            configs,
            enabled,
            disabled,
        } => {
            let mut map = Map::new();
            for pair in &configs {
                let (name, value) = parse_pair(pair)?;
                map.insert(name, value);
            }
            client
                .post(format!("{}/admin/v1/configs", cli.url))
                .headers(headers)
                .json(&json!({
                    "service": service,
                    "configs": map,
                    "kill_switches_enabled": enabled,
                    "kill_switches_disabled": disabled,
                }))
                .send()
                .await?
        }
        Commands::Delete { service, ids } => {
            client
                .post(format!("{}/admin/v1/configs/delete", cli.url))
                .headers(headers)
                .json(&json!({ "service": service, "ids": ids }))
                .send()
                .await?
        }
        Commands::Values { service, ids, since } => {
            let mut body = json!({ "service": service, "ids": ids });
            if let Some(since) = since {
                body["updated_since"] = Value::String(since);
            }
            client
                .post(format!("{}/configs/values", cli.url))
                .json(&body)
                .send()
                .await?
        }
        Commands::Status => {
            client
                .get(format!("{}/admin/v1/status", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Invalidate => {
            client
                .post(format!("{}/admin/v1/cache/invalidate", cli.url))
                .headers(headers)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    if text.is_empty() {
        println!("OK ({})", status);
        return Ok(());
    }

    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
