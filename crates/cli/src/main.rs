// ABOUTME: CLI for parsing podcast and video feeds with the feedcast feed parser.
// ABOUTME: Fetches a feed from URL or file/stdin and prints the detected format, channel and items as JSON.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use feedcast_feed::{parse_feed, ParsedFeed};
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Parse one or more RSS/Atom feeds and output JSON.
#[derive(Parser, Debug)]
#[command(name = "feedcast-cli")]
#[command(about = "Parse RSS/Atom feeds with feedcast and print JSON", long_about = None)]
struct Args {
    /// Feed URL(s) (http/https) or local file paths. Use "-" to read one feed from stdin.
    #[arg(required = true)]
    targets: Vec<String>,

    /// Override feed_url value (only valid when a single target is provided).
    #[arg(long)]
    feed_url: Option<String>,

    /// Output compact JSON instead of pretty.
    #[arg(long, default_value_t = false)]
    compact: bool,

    /// Print only channel-level fields.
    #[arg(long, default_value_t = false)]
    no_items: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    if args.targets.len() > 1 && args.feed_url.is_some() {
        bail!("--feed-url is only valid when parsing a single target");
    }

    let mut results = Vec::new();

    for target in &args.targets {
        let feed_url = args.feed_url.clone().unwrap_or_else(|| target.clone());

        match load_text(target).and_then(|xml| parse_feed(&feed_url, &xml).map_err(anyhow::Error::new)) {
            Ok(mut parsed) => {
                info!(feed_url = %feed_url, format = ?parsed.format, items = parsed.items.len(), "parsed feed");
                if args.no_items {
                    parsed.items.clear();
                }
                results.push(success(&feed_url, &parsed)?);
            }
            Err(err) => {
                debug!(feed_url = %feed_url, error = %err, "feed failed");
                results.push(json!({
                    "feed_url": feed_url,
                    "ok": false,
                    "feed": null,
                    "error": err.to_string()
                }));
            }
        }
    }

    let parsed = results
        .iter()
        .filter(|r| r.get("ok").and_then(|v| v.as_bool()) == Some(true))
        .count();

    // A single successful target prints the parsed feed on its own.
    let output = match results.as_slice() {
        [only] if parsed == 1 => only.get("feed").cloned().unwrap_or_else(|| json!({})),
        _ => json!({
            "feeds": results,
            "total_feeds": results.len(),
            "parsed": parsed,
            "failed": results.len() - parsed
        }),
    };

    if args.compact {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn success(feed_url: &str, parsed: &ParsedFeed) -> Result<serde_json::Value> {
    Ok(json!({
        "feed_url": feed_url,
        "ok": true,
        "feed": serde_json::to_value(parsed)?,
        "error": null
    }))
}

fn load_text(target: &str) -> Result<String> {
    let bytes = load_bytes(target)?;
    String::from_utf8(bytes).with_context(|| format!("feed is not valid UTF-8: {target}"))
}

fn load_bytes(target: &str) -> Result<Vec<u8>> {
    if target == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        return Ok(buf);
    }

    if let Ok(url) = Url::parse(target) {
        if matches!(url.scheme(), "http" | "https") {
            debug!(%url, "fetching feed");
            let resp = reqwest::blocking::get(url)?.error_for_status()?;
            let bytes = resp.bytes()?;
            return Ok(bytes.to_vec());
        }
    }

    let path = PathBuf::from(target);
    if !path.exists() {
        return Err(anyhow!("file not found: {}", target));
    }
    Ok(fs::read(path)?)
}
