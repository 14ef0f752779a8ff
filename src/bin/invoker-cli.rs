use std::path::PathBuf;

use clap::{Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use faas_invoker::compiler::compile;
use faas_invoker::discovery::{DiscoveryRequest, DiscoveryResponse, ResourceType, DISCOVERY_PATH};
use faas_invoker::manifest::load_manifest;

#[derive(Parser)]
#[command(name = "invoker-cli")]
#[command(about = "Management CLI for the FaaS invoker", long_about = None)]
struct Cli {
    /// Invocation endpoint.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Admin API endpoint.
    #[arg(long, default_value = "http://localhost:8081")]
    admin_url: String,

    /// Discovery server address (host:port).
    #[arg(long, default_value = "localhost:9000")]
    discovery: String,

    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered functions
    Functions,
    /// Liveness check
    Ping,
    /// POST a body to a manifest path
    Invoke {
        path: String,
        /// Request body; sent as-is
        #[arg(short, long, default_value = "")]
        data: String,
    },
    /// Check invoker status
    Status,
    /// Show the current and previous snapshot
    Snapshot,
    /// List discovery sessions
    Subscribers,
    /// Compile a manifest offline and print the proxy configuration
    Compile { manifest: PathBuf },
    /// Subscribe to discovery and print every push
    Watch {
        /// Node id announced to the server
        #[arg(long)]
        node: Option<String>,
        /// Reject pushes instead of acknowledging them
        #[arg(long)]
        nack: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut admin_headers = HeaderMap::new();
    admin_headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Functions => {
            let res = client.get(format!("{}/", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Ping => {
            let res = client.get(format!("{}/ping", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Invoke { path, data } => {
            let res = client
                .post(format!("{}{}", cli.url, path))
                .header(CONTENT_TYPE, "application/json")
                .body(data)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Status => {
            let res = client
                .get(format!("{}/admin/status", cli.admin_url))
                .headers(admin_headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Snapshot => {
            let res = client
                .get(format!("{}/admin/snapshot", cli.admin_url))
                .headers(admin_headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Subscribers => {
            let res = client
                .get(format!("{}/admin/subscribers", cli.admin_url))
                .headers(admin_headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Compile { manifest } => {
            let manifest = load_manifest(&manifest)?;
            let config = compile(&manifest)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Watch { node, nack } => {
            let node = node.unwrap_or_else(|| format!("invoker-cli-{}", uuid::Uuid::new_v4()));
            watch(&cli.discovery, &node, nack).await?;
        }
    }

    Ok(())
}

async fn watch(address: &str, node: &str, nack: bool) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("ws://{}{}", address, DISCOVERY_PATH);
    let (socket, _) = connect_async(url.as_str()).await?;
    let (mut sink, mut stream) = socket.split();
    eprintln!("Connected to {} as {}", url, node);

    for type_url in ResourceType::ALL {
        let request = DiscoveryRequest::subscribe(type_url).with_node(node);
        sink.send(Message::Text(serde_json::to_string(&request)?.into())).await?;
    }

    while let Some(frame) = stream.next().await {
        let text = match frame? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let push: DiscoveryResponse = serde_json::from_str(text.as_str())?;
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "type": push.type_url,
                "version": push.version_info,
                "resources": push.resources,
            }))?
        );

        let reply = if nack {
            DiscoveryRequest::nack(&push, "rejected by invoker-cli")
        } else {
            DiscoveryRequest::ack(&push)
        };
        sink.send(Message::Text(serde_json::to_string(&reply)?.into())).await?;
    }

    eprintln!("Discovery stream closed");
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let body = serde_json::from_str::<Value>(&text)
        .and_then(|json| serde_json::to_string_pretty(&json))
        .unwrap_or(text);

    if status.is_success() {
        println!("{}", body);
    } else {
        eprintln!("Error: invoker returned status {}", status);
        eprintln!("Response: {}", body);
    }
    Ok(())
}
