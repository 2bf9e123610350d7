//! Read-only inspection CLI for the gateway's shared store.
//!
//! Dumps the key namespaces the gateway maintains: quota windows, upstream
//! health, connection counts, failure counts, and probe latency. Never
//! mutates anything; safe against a live deployment.

use clap::{Parser, Subcommand};
use redis::aio::ConnectionManager;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Inspect the API gateway's shared state store", long_about = None)]
struct Cli {
    /// Redis connection URL.
    #[arg(short, long, default_value = "redis://localhost:6380")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show per-client quota windows
    RateLimits,
    /// Show per-upstream health, connections, failures, latency
    Upstreams,
    /// Show everything
    All,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let client = redis::Client::open(cli.url.as_str())?;
    let mut con = match ConnectionManager::new(client).await {
        Ok(con) => con,
        Err(e) => {
            eprintln!("Cannot connect to Redis at {}: {}", cli.url, e);
            std::process::exit(1);
        }
    };

    println!("Connected to Redis: {}\n", cli.url);

    match cli.command {
        Commands::RateLimits => print_rate_limits(&mut con).await?,
        Commands::Upstreams => print_upstreams(&mut con).await?,
        Commands::All => {
            print_rate_limits(&mut con).await?;
            print_upstreams(&mut con).await?;
        }
    }

    Ok(())
}

async fn print_rate_limits(
    con: &mut ConnectionManager,
) -> Result<(), Box<dyn std::error::Error>> {
    section("RATE LIMITING (rate_limit:<client>)");
    let keys = scan(con, "rate_limit:*").await?;
    if keys.is_empty() {
        println!("  (no keys yet)");
    }
    for key in keys {
        let value: Option<String> = redis::cmd("GET").arg(&key).query_async(con).await?;
        let ttl: i64 = redis::cmd("TTL").arg(&key).query_async(con).await?;
        println!("  {}", key);
        println!(
            "    requests: {}, resets in: {}s",
            value.unwrap_or_default(),
            ttl.max(0)
        );
    }
    Ok(())
}

async fn print_upstreams(
    con: &mut ConnectionManager,
) -> Result<(), Box<dyn std::error::Error>> {
    let sections = [
        ("HEALTH (up_health:<upstream>)", "up_health:*", ""),
        ("CONNECTIONS (up_conn:<upstream>)", "up_conn:*", ""),
        ("FAILURES (up_fail:<upstream>)", "up_fail:*", ""),
        ("LATENCY (up_lat:<upstream>)", "up_lat:*", " ms"),
        ("CIRCUIT PINS (up_pin:<upstream>)", "up_pin:*", ""),
    ];

    for (title, pattern, unit) in sections {
        section(title);
        let mut keys = scan(con, pattern).await?;
        keys.sort();
        if keys.is_empty() {
            println!("  (no keys yet)");
        }
        for key in keys {
            let value: Option<String> = redis::cmd("GET").arg(&key).query_async(con).await?;
            println!("  {}: {}{}", key, value.unwrap_or_default(), unit);
        }
    }
    Ok(())
}

async fn scan(
    con: &mut ConnectionManager,
    pattern: &str,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut found = Vec::new();
    let mut cursor: u64 = 0;
    loop {
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(100)
            .query_async(con)
            .await?;
        found.extend(keys);
        if next == 0 {
            break;
        }
        cursor = next;
    }
    Ok(found)
}

fn section(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{}", title);
    println!("{}", "=".repeat(60));
}
