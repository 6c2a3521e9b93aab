use anyhow::{Context, Result};
use clap::Parser;
use html2text::render::text_renderer::TrivialDecorator;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc;

use pullfeed::config::{Config, Connectivity, NetworkPreference};
use pullfeed::feed::{build_client, Entry, FeedView, RefreshEvent, RefreshRequest, Refresher};
use pullfeed::util::strip_control_chars;

/// Get the config directory path (~/.config/pullfeed/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("pullfeed"))
}

#[derive(Parser, Debug)]
#[command(name = "pullfeed", about = "Fetch an RSS feed and list its entries")]
struct Args {
    /// Config file (defaults to ~/.config/pullfeed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Feed URL, overriding the config file
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Links on which downloads are allowed, overriding the config file
    #[arg(long, value_enum)]
    network: Option<NetworkPreference>,

    /// Link this machine is currently on
    #[arg(long, value_enum, default_value_t = Connectivity::Wifi)]
    connection: Connectivity,

    /// Include entry descriptions
    #[arg(long)]
    with_description: bool,

    /// Order entries by publish date, most recent first
    #[arg(long)]
    sort: bool,

    /// Print entries as JSON
    #[arg(long)]
    json: bool,
}

fn resolve_config(args: &Args) -> Result<Config> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => get_config_dir()?.join("config.toml"),
    };
    let mut config = Config::load(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    if let Some(url) = &args.url {
        config.feed_url = url.clone();
    }
    if let Some(network) = args.network {
        config.network = network;
    }
    if args.with_description {
        config.include_description = true;
    }
    Ok(config)
}

/// Wrap width handed to html2text; the result is joined back onto one line.
const DESCRIPTION_WIDTH: usize = 1000;

/// Renders an HTML description as a single line of plain text.
fn description_text(html: &str) -> String {
    let text = html2text::from_read_with_decorator(
        html.as_bytes(),
        DESCRIPTION_WIDTH,
        TrivialDecorator::new(),
    );
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn print_entries(entries: &[Entry], with_description: bool) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();

    for entry in entries {
        writeln!(out, "{}", strip_control_chars(entry.title()))?;
        if let Some(date) = entry.formatted_date() {
            writeln!(out, "  {}", date)?;
        }
        writeln!(out, "  {}", entry.link())?;
        if with_description {
            if let Some(description) = entry.description() {
                let text = description_text(description);
                if !text.is_empty() {
                    writeln!(out, "  {}", strip_control_chars(&text))?;
                }
            }
        }
        writeln!(out)?;
    }
    out.flush()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for --json
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = resolve_config(&args)?;

    if !config.network.permits(args.connection) {
        tracing::info!(
            network = ?config.network,
            connection = ?args.connection,
            "Network preference does not allow a download"
        );
        eprintln!(
            "Error: not downloading over a {:?} connection (network preference: {:?})",
            args.connection, config.network
        );
        eprintln!("Use --network any to allow any connection.");
        std::process::exit(1);
    }

    let client = build_client(&config.fetch_config()).context("Failed to create HTTP client")?;
    let (event_tx, mut event_rx) = mpsc::channel::<RefreshEvent>(1);
    let refresher = Refresher::new(
        client,
        config.feed_url.as_str(),
        config.parse_options(),
        event_tx,
    );

    if refresher.refresh() != RefreshRequest::Started {
        anyhow::bail!("A refresh is already in progress");
    }

    let mut view = FeedView::default();
    match event_rx.recv().await {
        Some(RefreshEvent::Completed(result)) => {
            view.apply(result);
        }
        None => anyhow::bail!("Refresh task ended without reporting a result"),
    }

    if let Some((kind, message)) = view.last_error() {
        eprintln!("Error: {}", kind.user_message());
        eprintln!("  {}", message);
        std::process::exit(1);
    }

    let mut entries = view.entries().to_vec();
    if args.sort {
        entries.sort();
    }

    if args.json {
        let mut out = std::io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, &entries).context("Failed to write JSON")?;
        writeln!(out)?;
    } else {
        print_entries(&entries, config.include_description)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_decodes_character_references() {
        assert_eq!(
            description_text("It&#8217;s &#x2014; &eacute;t&eacute;"),
            "It\u{2019}s \u{2014} \u{e9}t\u{e9}"
        );
    }

    #[test]
    fn test_description_inline_tags_do_not_split_words() {
        assert_eq!(
            description_text("<p>Hel<b>lo</b> <a href=\"x\">world</a>.</p>"),
            "Hello world."
        );
    }

    #[test]
    fn test_description_blocks_collapse_to_one_line() {
        assert_eq!(
            description_text("<p>Hello</p><p>Second&nbsp;para &amp; more</p>"),
            "Hello Second para & more"
        );
        assert_eq!(description_text("  just   text "), "just text");
    }
}
