mod echo;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, bail};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use owo_colors::OwoColorize;
use quire_core::decode::charset_from_content_type;
use quire_core::{
    DiscoveryConfig, FetchConfig, HttpFetcher, RegistryBuilder, decode_document, discover_feeds, extract_with_registry,
    fetch_file, fetch_stdin, fetch_url, parse_feed_bytes, parse_opml,
};
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::echo::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Extract articles, discover feeds and read RSS/Atom/OPML files
#[derive(Parser, Debug)]
#[command(name = "quire")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long, global = true, value_name = "FILE")]
    output: Option<PathBuf>,

    /// HTTP timeout in seconds
    #[arg(long, global = true, default_value_t = 15, value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, global = true, value_name = "UA")]
    user_agent: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract the article from a URL, local HTML file, or "-" for stdin
    Extract {
        #[arg(value_name = "INPUT")]
        input: String,

        /// Page URL used for extractor lookup and link resolution when reading a file or stdin
        #[arg(long, value_name = "URL")]
        url: Option<Url>,

        /// Directory of extractor rule files (default: the user config directory)
        #[arg(long, value_name = "DIR")]
        rules_dir: Option<PathBuf>,
    },
    /// Find the RSS/Atom feeds of a site, given a URL, domain or site name
    Discover {
        #[arg(value_name = "QUERY")]
        query: String,
    },
    /// Parse an RSS/Atom feed from a URL, local file, or "-" for stdin
    Feed {
        #[arg(value_name = "INPUT")]
        input: String,
    },
    /// List the feeds in an OPML subscription file
    Opml {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Generate a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Raw input bytes plus what the transport said about them.
struct Input {
    bytes: Vec<u8>,
    content_type: Option<String>,
    url: Option<Url>,
}

impl Input {
    fn text(&self) -> String {
        let declared = self.content_type.as_deref().and_then(charset_from_content_type);
        decode_document(&self.bytes, declared)
    }
}

fn fetch_config(cli: &Cli) -> FetchConfig {
    let mut config = FetchConfig { timeout: cli.timeout, ..Default::default() };
    if let Some(ua) = &cli.user_agent {
        config.user_agent = ua.clone();
    }
    config
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "quire_core=debug,quire=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

async fn read_input(input: &str, config: &FetchConfig, verbose: bool) -> anyhow::Result<Input> {
    if input == "-" {
        if verbose {
            print_step(1, 3, "Reading from stdin");
        }
        let bytes = fetch_stdin().context("Failed to read from stdin")?;
        return Ok(Input { bytes, content_type: None, url: None });
    }

    if input.starts_with("http://") || input.starts_with("https://") {
        if verbose {
            print_step(1, 3, &format!("Fetching from {}", input.bright_white().underline()));
        }
        let response = fetch_url(input, config).await.context("Failed to fetch URL")?;
        return Ok(Input { bytes: response.body, content_type: response.content_type, url: Some(response.url) });
    }

    if verbose {
        print_step(1, 3, &format!("Reading from file {}", input.bright_white()));
    }
    let bytes = fetch_file(input).with_context(|| format!("Failed to read file: {}", input))?;
    Ok(Input { bytes, content_type: None, url: None })
}

fn write_output(path: Option<&Path>, output: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            fs::write(path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => print!("{}", output),
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> anyhow::Result<String> {
    let mut json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    json.push('\n');
    Ok(json)
}

async fn run_extract(
    cli: &Cli, input: &str, url: Option<&Url>, rules_dir: Option<&Path>,
) -> anyhow::Result<String> {
    let config = fetch_config(cli);
    let started = Instant::now();
    let raw = read_input(input, &config, cli.verbose).await?;
    let html = raw.text();

    if cli.verbose {
        print_detail("Size", &format_size(raw.bytes.len()));
        print_timing("Read", started.elapsed());
        print_step(2, 3, "Loading extractors");
    }

    let mut builder = RegistryBuilder::new().with_builtin();
    if let Some(dir) = rules_dir.map(Path::to_path_buf).or_else(quire_core::extractors::default_rule_dir) {
        builder = builder
            .with_rule_dir(&dir)
            .with_context(|| format!("Failed to load rule files from {}", dir.display()))?;
    }
    let registry = builder.build();

    if cli.verbose {
        print_detail("Extractors", &registry.len().to_string());
        print_step(3, 3, "Extracting article");
    }

    let page_url = url.cloned().or(raw.url);
    let started = Instant::now();
    let article = extract_with_registry(&html, page_url.as_ref(), &registry);

    if article.is_empty() {
        bail!("No article content found in {}", input);
    }

    if cli.verbose {
        print_detail("Domain", &article.domain);
        if let Some(title) = &article.title {
            print_detail("Title", title);
        }
        print_detail("Words", &article.word_count.to_string());
        print_timing("Extract", started.elapsed());
        eprintln!();
    }

    match cli.format {
        OutputFormat::Text => Ok(render_article(&article)),
        OutputFormat::Json => to_json(&article.to_json()),
    }
}

async fn run_discover(cli: &Cli, query: &str) -> anyhow::Result<String> {
    let config = DiscoveryConfig::builder()
        .timeout(cli.timeout)
        .user_agent(fetch_config(cli).user_agent)
        .build();
    let fetcher = HttpFetcher::new(&config.fetch).context("Failed to build HTTP client")?;

    if cli.verbose {
        print_step(1, 1, &format!("Discovering feeds for {}", query.bright_white()));
    }

    let started = Instant::now();
    let feeds = discover_feeds(query, &fetcher, &config, None).await?;

    if cli.verbose {
        print_detail("Feeds", &feeds.len().to_string());
        print_timing("Discover", started.elapsed());
        eprintln!();
    }

    match cli.format {
        OutputFormat::Text => Ok(render_discovered(&feeds)),
        OutputFormat::Json => to_json(&feeds),
    }
}

async fn run_feed(cli: &Cli, input: &str) -> anyhow::Result<String> {
    let config = fetch_config(cli);
    let raw = read_input(input, &config, cli.verbose).await?;

    if cli.verbose {
        print_detail("Size", &format_size(raw.bytes.len()));
        print_step(2, 3, "Parsing feed");
    }

    let declared = raw.content_type.as_deref().and_then(charset_from_content_type);
    let feed = parse_feed_bytes(&raw.bytes, declared).with_context(|| format!("Failed to parse feed: {}", input))?;

    if feed.items.is_empty() {
        print_warning("Feed has no usable items");
    }
    if cli.verbose {
        print_detail("Kind", feed.kind.as_str());
        print_detail("Items", &feed.items.len().to_string());
        print_step(3, 3, "Writing output");
        eprintln!();
    }

    match cli.format {
        OutputFormat::Text => Ok(render_feed(&feed)),
        OutputFormat::Json => to_json(&feed),
    }
}

fn run_opml(cli: &Cli, file: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(file).with_context(|| format!("Failed to read file: {}", file.display()))?;
    let outlines = parse_opml(&decode_document(&bytes, None))
        .with_context(|| format!("Failed to parse OPML: {}", file.display()))?;

    if cli.verbose {
        print_info(&format!("{} feeds in {}", outlines.len(), file.display()));
    }

    match cli.format {
        OutputFormat::Text => Ok(render_outlines(&outlines)),
        OutputFormat::Json => to_json(&outlines),
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let output = match &cli.command {
        Command::Extract { input, url, rules_dir } => run_extract(cli, input, url.as_ref(), rules_dir.as_deref()).await?,
        Command::Discover { query } => run_discover(cli, query).await?,
        Command::Feed { input } => run_feed(cli, input).await?,
        Command::Opml { file } => run_opml(cli, file)?,
        Command::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "quire", &mut io::stdout());
            return Ok(());
        }
    };

    write_output(cli.output.as_deref(), &output)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.verbose {
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    if let Err(e) = run(&cli).await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
