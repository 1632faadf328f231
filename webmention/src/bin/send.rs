//! Webmention Send - discover endpoints and send webmentions from the command line.
//!
//! Every target is handled concurrently; the process exits non-zero if any
//! of them fails.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use webmention::http::{build_client, FetchOptions};
use webmention::{discover_endpoint, send_notification, Config, SendOutcome};

#[derive(Parser, Debug)]
#[command(
    name = "webmention-send",
    version,
    about = "Discover webmention endpoints and notify targets that a source links to them"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print one JSON object per target instead of plain text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Notify each target that the source links to it
    ///
    /// Example: webmention-send send --source https://a.example/post --target https://b.example/article
    Send {
        /// The page that contains the links
        #[arg(long)]
        source: Url,

        /// Page(s) being linked to; repeat for several targets
        #[arg(long = "target", required = true)]
        targets: Vec<Url>,
    },

    /// Print the webmention endpoint advertised by each target
    Discover {
        #[arg(long = "target", required = true)]
        targets: Vec<Url>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so results on stdout stay machine readable
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true).with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let options = FetchOptions::from_config(&config);
    let client = build_client()?;

    let failures = match cli.command {
        Commands::Send { source, targets } => {
            info!(source = %source, targets = targets.len(), "sending_webmentions");

            let sends = targets
                .iter()
                .map(|target| send_notification(&client, target, &source, &options));
            let results = futures::future::join_all(sends).await;

            let mut failures = 0;
            for (target, result) in targets.iter().zip(results) {
                if result.is_err() {
                    failures += 1;
                }
                print_send(target, &result, cli.json);
            }
            failures
        }
        Commands::Discover { targets } => {
            let lookups = targets
                .iter()
                .map(|target| discover_endpoint(&client, target, &options));
            let results = futures::future::join_all(lookups).await;

            let mut failures = 0;
            for (target, result) in targets.iter().zip(results) {
                if result.is_err() {
                    failures += 1;
                }
                print_discover(target, &result, cli.json);
            }
            failures
        }
    };

    if failures > 0 {
        bail!("{failures} target(s) failed");
    }
    Ok(())
}

fn print_send(target: &Url, result: &webmention::error::Result<SendOutcome>, as_json: bool) {
    let (status, endpoint, detail) = match result {
        Ok(SendOutcome::Delivered { endpoint, status }) => {
            ("delivered", Some(endpoint.as_str()), status.to_string())
        }
        Ok(SendOutcome::NoEndpoint) => ("no_endpoint", None, String::new()),
        Err(e) => ("failed", None, e.to_string()),
    };

    if as_json {
        println!(
            "{}",
            json!({ "target": target.as_str(), "status": status, "endpoint": endpoint, "detail": detail })
        );
    } else {
        match endpoint {
            Some(endpoint) => println!("{target}\t{status}\t{endpoint}\t{detail}"),
            None => println!("{target}\t{status}\t{detail}"),
        }
    }
}

fn print_discover(target: &Url, result: &webmention::error::Result<Option<Url>>, as_json: bool) {
    let (status, endpoint, detail) = match result {
        Ok(Some(endpoint)) => ("found", Some(endpoint.as_str()), String::new()),
        Ok(None) => ("no_endpoint", None, String::new()),
        Err(e) => ("failed", None, e.to_string()),
    };

    if as_json {
        println!(
            "{}",
            json!({ "target": target.as_str(), "status": status, "endpoint": endpoint, "detail": detail })
        );
    } else {
        println!("{target}\t{status}\t{}", endpoint.unwrap_or(detail.as_str()));
    }
}
