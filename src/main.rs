//! CLI entry point for `mimescan`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use mimescan::config::Config;
use mimescan::model::structure::format_path;
use mimescan::model::{MessageStructure, ParseReport};
use mimescan::store::SpanStore;
use mimescan::{Cancellation, ScanError, StructureParser};

#[derive(Parser)]
#[command(
    name = "mimescan",
    version,
    about = "Map the MIME structure of a message file without decoding it"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Override the maximum accepted line length in bytes
    #[arg(long, value_name = "BYTES", global = true)]
    max_line_length: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the structure tree of a message
    Scan {
        path: PathBuf,
        /// Emit the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the bytes of one part verbatim
    Extract {
        path: PathBuf,
        /// Dotted part path, e.g. "2.1" (empty for the whole message)
        #[arg(short, long, default_value = "")]
        part: String,
        /// Which region of the part to write
        #[arg(short, long, value_enum, default_value_t = Section::Content)]
        section: Section,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config {
        /// Also write it to the config file location
        #[arg(long)]
        save: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Section {
    Header,
    Content,
    Full,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = mimescan::config::load_config();
    if let Some(limit) = cli.max_line_length {
        config.scanner.max_line_length = limit;
    }

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Scan { path, json } => cmd_scan(&path, json, &config).await,
        Commands::Extract {
            path,
            part,
            section,
            output,
        } => cmd_extract(&path, &part, section, output.as_deref(), &config).await,
        Commands::Config { save } => cmd_config(&config, save),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_path = mimescan::config::log_file_path(config);
    let log_dir = mimescan::config::cache_dir(config);
    let log_name = log_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "mimescan.log".into());
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, log_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Trip the returned signal on Ctrl+C.
fn watch_ctrl_c() -> Cancellation {
    let (handle, cancel) = Cancellation::pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received CTRL+C, cancelling scan");
            handle.cancel();
        }
    });
    cancel
}

/// Open a file and scan it with a progress bar.
async fn scan_file(path: &Path, config: &Config) -> anyhow::Result<(SpanStore, ParseReport)> {
    let mut store = match SpanStore::open(path).await {
        Ok(store) => store,
        Err(ScanError::File { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            anyhow::bail!("File not found: {}", path.display());
        }
        Err(e) => return Err(e.into()),
    };

    let pb = ProgressBar::new(store.len());
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Scanning [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .expect("valid template")
            .progress_chars("#>-"),
    );
    let sink = pb.clone();
    let parser =
        StructureParser::new(config.scanner.clone()).on_progress(move |read| sink.set_position(read));

    let cancel = watch_ctrl_c();
    let result = store.scan(&parser, &cancel).await;
    pb.finish_and_clear();

    match result {
        Ok(report) => Ok((store, report)),
        Err(e) if e.is_cancelled() => anyhow::bail!("Scan cancelled"),
        Err(e) => Err(e.into()),
    }
}

/// Print the structure tree of a message file.
async fn cmd_scan(path: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    let start = Instant::now();
    let (_store, report) = scan_file(path, config).await?;
    let elapsed = start.elapsed();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_tree(path, &report, elapsed);
    }
    Ok(())
}

/// Write one region of one part to a file or stdout.
async fn cmd_extract(
    path: &Path,
    part: &str,
    section: Section,
    output: Option<&Path>,
    config: &Config,
) -> anyhow::Result<()> {
    let (mut store, report) = scan_file(path, config).await?;
    let node = report
        .structure
        .part(part)
        .ok_or_else(|| ScanError::PartNotFound(part.to_string()))?;

    let span = match section {
        Section::Header => node.header_span,
        Section::Content => node.content_span,
        Section::Full => node.full_span(),
    };
    let bytes = store.raw(span).await?;

    match output {
        Some(out) => {
            tokio::fs::write(out, &bytes).await?;
            eprintln!(
                "  Wrote {} from {} to {}",
                humansize::format_size(bytes.len() as u64, humansize::BINARY),
                span,
                out.display()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Print the effective configuration, optionally saving it.
fn cmd_config(config: &Config, save: bool) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    if save {
        let path = mimescan::config::save_config(config)?;
        eprintln!("  Saved to {}", path.display());
    }
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mimescan", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

fn print_tree(path: &Path, report: &ParseReport, elapsed: std::time::Duration) {
    let root = &report.structure;
    println!();
    println!("  File:      {}", path.display());
    println!(
        "  Size:      {}",
        humansize::format_size(report.stream_length, humansize::BINARY)
    );
    println!("  Parts:     {}", root.node_count() - 1);
    println!("  Depth:     {}", root.depth());
    println!("  Time:      {:.2?}", elapsed);
    println!();
    println!(
        "  {:<16} {:<22} {:<22} {:>10}",
        "PART", "HEADER", "CONTENT", "SIZE"
    );

    root.walk(&mut |node_path, node| print_row(node_path, node));

    if !report.diagnostics.is_empty() {
        println!();
        for diagnostic in &report.diagnostics {
            println!("  warning: {diagnostic}");
        }
    }
    println!();
}

fn print_row(node_path: &[usize], node: &MessageStructure) {
    let label = if node_path.is_empty() {
        "(message)".to_string()
    } else {
        format!("{}{}", "  ".repeat(node_path.len() - 1), format_path(node_path))
    };
    let kind = if node.is_multipart() {
        format!(" ({} parts)", node.parts.len())
    } else {
        String::new()
    };
    println!(
        "  {:<16} {:<22} {:<22} {:>10}{}",
        label,
        node.header_span.to_string(),
        node.content_span.to_string(),
        humansize::format_size(node.content_span.length, humansize::BINARY),
        kind
    );
}
