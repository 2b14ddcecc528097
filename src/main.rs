use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

use view_map::{ConfigError, JsMapFunction, MapError};

mod cli;

use cli::config::{CliConfig, LogFormat};
use cli::indexer::{self, IdSource, IndexError};
use cli::logging::{self, LoggingError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read {path}: {source}", path = .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("Either --map or --source is required")]
    NoSource,

    #[error("{0} document(s) failed to map")]
    DocumentsFailed(usize),
}

#[derive(Parser)]
#[command(name = "view-map")]
#[command(about = "Run JavaScript map functions over JSON documents and print the emitted view rows")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map newline-delimited JSON documents, writing one JSON row per line
    Run {
        #[command(flatten)]
        function: FunctionArgs,

        /// Input file with one JSON document per line (defaults to stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file for the rows (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Document field holding the row id; the line number is used when absent
        #[arg(long, default_value = "_id")]
        id_field: String,

        /// Number of worker threads and execution contexts
        #[arg(short, long, env = "VIEW_MAP_WORKERS")]
        workers: Option<usize>,

        /// TOML configuration file with [engine] and [logging] tables
        #[arg(short, long, env = "VIEW_MAP_CONFIG")]
        config: Option<PathBuf>,

        /// Log filter directive, e.g. "info" or "warn,view_map::script=debug"
        #[arg(long, env = "VIEW_MAP_LOG")]
        log_level: Option<String>,

        /// Log output format
        #[arg(long, value_enum)]
        log_format: Option<LogFormat>,

        /// Exit with an error if any document fails to parse or map
        #[arg(long)]
        strict: bool,
    },

    /// Compile a map function and report whether it is valid
    Check {
        #[command(flatten)]
        function: FunctionArgs,

        /// TOML configuration file; its [engine] limits apply to compilation
        #[arg(short, long, env = "VIEW_MAP_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct FunctionArgs {
    /// File containing the map function source
    #[arg(short, long, conflicts_with = "source")]
    map: Option<PathBuf>,

    /// Map function source given inline
    #[arg(short = 'e', long)]
    source: Option<String>,
}

impl FunctionArgs {
    fn load(&self) -> Result<String, AppError> {
        match (&self.map, &self.source) {
            (Some(path), _) => {
                std::fs::read_to_string(path).map_err(|source| AppError::Open {
                    path: path.clone(),
                    source,
                })
            }
            (None, Some(source)) => Ok(source.clone()),
            (None, None) => Err(AppError::NoSource),
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<CliConfig, AppError> {
    Ok(match path {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::default(),
    })
}

fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            function,
            input,
            output,
            id_field,
            workers,
            config,
            log_level,
            log_format,
            strict,
        } => {
            let mut config = load_config(config)?;
            if let Some(level) = log_level {
                config.logging.level = level;
            }
            if let Some(format) = log_format {
                config.logging.format = format;
            }
            if let Some(workers) = workers {
                config.engine.pool_size = workers;
            }
            logging::init(&config.logging)?;

            let source = function.load()?;
            let mapper = JsMapFunction::with_config(&source, &config.engine)?;
            let workers = config.engine.effective_pool_size();
            let ids = IdSource { field: id_field };

            let reader: Box<dyn io::BufRead + Send> = match &input {
                Some(path) => Box::new(BufReader::new(
                    File::open(path).map_err(|source| AppError::Open {
                        path: path.clone(),
                        source,
                    })?,
                )),
                None => Box::new(BufReader::new(io::stdin())),
            };
            let writer: Box<dyn Write + Send> = match &output {
                Some(path) => Box::new(BufWriter::new(File::create(path)?)),
                None => Box::new(BufWriter::new(io::stdout())),
            };

            let started = Instant::now();
            let result = indexer::index(&mapper, reader, writer, &ids, workers);
            mapper.stop();
            let summary = result?;

            info!(
                documents = summary.documents,
                rows = summary.rows,
                elapsed_ms = started.elapsed().as_millis(),
                "indexing finished"
            );
            eprintln!(
                "{} documents, {} rows, {} invalid, {} failed",
                summary.documents, summary.rows, summary.invalid, summary.failed
            );

            if strict && summary.errors() > 0 {
                return Err(AppError::DocumentsFailed(summary.errors()));
            }
        }

        Commands::Check { function, config } => {
            let config = load_config(config)?;
            let source = function.load()?;
            // One context is enough to know whether the source compiles.
            let engine = config.engine.with_pool_size(1);
            let mapper = JsMapFunction::with_config(&source, &engine)?;
            mapper.stop();
            println!("ok");
        }
    }

    Ok(())
}
