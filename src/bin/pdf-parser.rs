//! Server binary for edgequake-pdf-parser.
//!
//! A thin shim over the library crate: flags and `PDF_PARSER_*` environment
//! variables become a `ServiceConfig`, then the HTTP server runs until
//! SIGINT or SIGTERM.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use pdf_parser::{serve, ApiKeys, AppState, Device, ServiceConfig, UnpdfEngine};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on the default port with two API keys
  PDF_PARSER_API_KEYS=key-a,key-b pdf-parser

  # Upload a file
  curl -H 'X-API-Key: key-a' -F 'file=@paper.pdf;type=application/pdf' \
       http://localhost:8000/parse

  # Parse a remote document
  curl -H 'X-API-Key: key-a' -H 'Content-Type: application/json' \
       -d '{"url": "https://arxiv.org/pdf/1706.03762"}' http://localhost:8000/parse

LOGGING:
  RUST_LOG overrides --log-level, e.g. RUST_LOG=pdf_parser=debug,tower_http=info
"#;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// HTTP service that converts PDF uploads and URLs to Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-parser",
    version,
    about = "HTTP service that converts PDF uploads and URLs to Markdown",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "PDF_PARSER_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on.
    #[arg(long, env = "PDF_PARSER_PORT", default_value_t = 8000)]
    port: u16,

    /// Comma-separated API keys. Empty disables authentication.
    #[arg(long, env = "PDF_PARSER_API_KEYS", default_value = "", hide_env_values = true)]
    api_keys: String,

    /// Root directory for per-request scratch files.
    #[arg(long, env = "PDF_PARSER_TEMP_DIR", default_value = "/tmp/pdf_parser")]
    temp_dir: PathBuf,

    /// Upload ceiling in MiB.
    #[arg(long, env = "PDF_PARSER_MAX_UPLOAD_MB", default_value_t = 25)]
    max_upload_mb: u64,

    /// Maximum pages the engine will convert.
    #[arg(long, env = "PDF_PARSER_MAX_PAGES", default_value_t = 500)]
    max_pages: u32,

    /// Maximum file size in MiB the engine will convert.
    #[arg(long, env = "PDF_PARSER_MAX_FILE_SIZE_MB", default_value_t = 50)]
    max_file_size_mb: u64,

    /// Conversion timeout in seconds.
    #[arg(long, env = "PDF_PARSER_CONVERSION_TIMEOUT", default_value_t = 300)]
    conversion_timeout: u64,

    /// Worker threads reserved for conversion.
    #[arg(long, env = "PDF_PARSER_CONVERSION_THREADS", default_value_t = 4)]
    conversion_threads: usize,

    /// Conversion device: auto, cpu, cuda, mps.
    #[arg(long, env = "PDF_PARSER_DEVICE", default_value = "auto")]
    device: Device,

    /// Timeout in seconds for fetching remote documents.
    #[arg(long, env = "PDF_PARSER_DOWNLOAD_TIMEOUT", default_value_t = 30)]
    download_timeout: u64,

    /// Overall request timeout in seconds.
    #[arg(long, env = "PDF_PARSER_REQUEST_TIMEOUT", default_value_t = 600)]
    request_timeout: u64,

    /// Log level used when RUST_LOG is unset.
    #[arg(long, env = "PDF_PARSER_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log output format.
    #[arg(long, env = "PDF_PARSER_LOG_FORMAT", value_enum, default_value = "text")]
    log_format: LogFormat,
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    match format {
        LogFormat::Json => builder.json().with_current_span(true).init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format);

    let config = ServiceConfig::builder()
        .api_keys(ApiKeys::from_csv(&cli.api_keys))
        .temp_dir(cli.temp_dir)
        .max_upload_mb(cli.max_upload_mb)
        .max_pages(cli.max_pages)
        .max_file_size_mb(cli.max_file_size_mb)
        .conversion_timeout_secs(cli.conversion_timeout)
        .conversion_threads(cli.conversion_threads)
        .device(cli.device)
        .download_timeout_secs(cli.download_timeout)
        .request_timeout_secs(cli.request_timeout)
        .build()
        .context("Invalid configuration")?;

    let engine = UnpdfEngine::new(config.conversion_threads, config.device)
        .context("Failed to start conversion engine")?;
    let state = AppState::new(config, Arc::new(engine)).context("Failed to build app state")?;

    let addr = SocketAddr::new(cli.host, cli.port);
    serve(state, addr)
        .await
        .with_context(|| format!("Server on {addr} failed"))
}
