use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the game gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway liveness
    Status,
    /// Check the registry store
    Registry,
    /// List registered instances of a service
    Lookup { service: String },
    /// Show the next round-robin pick for a service
    Instance { service: String },
    /// Dump the Prometheus metrics export
    Metrics,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{}/status", cli.url)).send().await?;
            print_json(res).await?;
        }
        Commands::Registry => {
            let res = client
                .get(format!("{}/registry/status", cli.url))
                .send()
                .await?;
            print_json(res).await?;
        }
        Commands::Lookup { service } => {
            let res = client
                .get(format!("{}/lookup/{}", cli.url, service))
                .send()
                .await?;
            print_json(res).await?;
        }
        Commands::Instance { service } => {
            let res = client
                .get(format!("{}/{}/instance", cli.url, service))
                .send()
                .await?;
            print_json(res).await?;
        }
        Commands::Metrics => {
            let res = client.get(format!("{}/metrics", cli.url)).send().await?;
            println!("{}", res.text().await?);
        }
    }

    Ok(())
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
