use std::path::PathBuf;
use std::time::Instant;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use tune_history::config;
use tune_history::report::ReportBuilder;
use tune_history::{export, ingest};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Default)]
struct CliArgs {
    history_folder: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    top_n: Option<usize>,
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let started = Instant::now();
    let args = parse_args(std::env::args().skip(1).collect())?;
    init_logging(args.debug)?;

    info!("Tune History v{VERSION}");

    let mut settings = config::load_settings()?;
    if let Some(dir) = args.output_dir {
        settings.output_dir = dir;
    }
    if let Some(top_n) = args.top_n {
        settings.top_n = top_n;
    }

    let Some(history_folder) = args.history_folder else {
        anyhow::bail!("missing streaming history folder, see --help");
    };

    let log = ingest::load_history(&history_folder, &settings.history_file_marker)?;
    match log.year_span() {
        Ok(span) => info!(first_year = span.first, last_year = span.last, "analyzing history"),
        Err(err) => warn!("{err}, nothing to report"),
    }

    let reports = ReportBuilder::new(settings.top_n).build(&log);
    export::write_reports(&settings.output_dir, &reports)?;

    info!("executed in {:.2?}", started.elapsed());
    Ok(())
}

fn init_logging(debug: bool) -> anyhow::Result<()> {
    let default_level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;
    Ok(())
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "-d" | "--debug" => out.debug = true,
            "-o" | "--output" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--output requires a directory");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("--output cannot be empty");
                }
                out.output_dir = Some(PathBuf::from(value.trim()));
            }
            "-n" | "--top" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--top requires a count");
                };
                let top_n: usize = value
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("--top expects a positive integer, got {value}"))?;
                if top_n == 0 {
                    anyhow::bail!("--top must be at least 1");
                }
                out.top_n = Some(top_n);
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other if other.starts_with('-') => anyhow::bail!("unknown argument {other}"),
            folder => {
                if out.history_folder.is_some() {
                    anyhow::bail!("unexpected extra argument {folder}");
                }
                out.history_folder = Some(PathBuf::from(folder));
            }
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("Tune History v{VERSION}");
    println!("Summaries of a streaming history export.");
    println!();
    println!("usage: tune-history <history_folder> [options]");
    println!("  -o, --output DIR   Directory for reports.json (default: output)");
    println!("  -n, --top N        Entries kept per ranked report (default: 20)");
    println!("  -d, --debug        Display debug logging lines");
}
