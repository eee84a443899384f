use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tablesync_core::{Config, Db2Config, JobConfig, OracleConfig, SourceConfig};
use tablesync_engine::{ExtractionPlan, ParquetSinkFactory, SyncJob, SyncReport};

/// Config file read when `--config` is not given
const DEFAULT_CONFIG: &str = "tablesync.toml";

/// Source password used when none is configured
const PASSWORD_ENV: &str = "TABLESYNC_PASSWORD";

/// tablesync - extract a relational table into a Parquet file
#[derive(Parser)]
#[command(name = "tablesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: tablesync.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the table described by the config file
    Extract {
        /// Table to extract instead of the configured one
        #[arg(short, long)]
        table: Option<String>,

        /// Output file instead of the configured one
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract a table from DB2 without a config file
    #[command(name = "db2extract")]
    Db2Extract(Db2Args),

    /// Extract a table from Oracle without a config file
    #[command(name = "oracleextract")]
    OracleExtract(OracleArgs),

    /// Show the output schema and extraction query without extracting
    Plan {
        /// Table to plan instead of the configured one
        #[arg(short, long)]
        table: Option<String>,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct ConnectionArgs {
    /// Database host
    #[arg(long, default_value = "localhost")]
    hostname: String,

    /// Database port (default: 1521 for Oracle, 50000 for DB2)
    #[arg(long)]
    port: Option<u16>,

    /// Database user
    #[arg(long)]
    username: String,

    /// Database password (falls back to TABLESYNC_PASSWORD)
    #[arg(long, default_value = "")]
    password: String,

    /// ODBC driver name
    #[arg(long)]
    driver: Option<String>,
}

#[derive(Args, Debug)]
struct JobArgs {
    /// Table to extract
    #[arg(long)]
    table: String,

    /// Records per row group in the output file
    #[arg(long, default_value_t = 10_000)]
    shard_size: usize,

    /// Output file (default: <table>.parquet)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct Db2Args {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Database name
    #[arg(long)]
    database: String,

    /// Schema of the table (default: the connection's current schema)
    #[arg(long)]
    schema: Option<String>,

    #[command(flatten)]
    job: JobArgs,
}

#[derive(Args, Debug)]
struct OracleArgs {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Instance SID
    #[arg(long, conflicts_with = "service_name")]
    sid: Option<String>,

    /// Service name
    #[arg(long)]
    service_name: Option<String>,

    #[command(flatten)]
    job: JobArgs,
}

impl JobArgs {
    fn job_config(&self, table: String) -> JobConfig {
        let mut job = JobConfig::new(table);
        job.shard_size = self.shard_size;
        job.output = self.output.clone();
        job
    }
}

impl Db2Args {
    fn into_config(self) -> Config {
        let table = match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.job.table),
            None => self.job.table.clone(),
        };

        let c = self.connection;
        let mut source = Db2Config::new(
            c.hostname,
            c.port.unwrap_or(50000),
            self.database,
            c.username,
            c.password,
        );
        if let Some(driver) = c.driver {
            source = source.with_driver(driver);
        }

        Config::new(self.job.job_config(table), SourceConfig::Db2(source))
    }
}

impl OracleArgs {
    fn into_config(self) -> Config {
        let c = self.connection;
        let mut source = OracleConfig::new(c.hostname, c.port.unwrap_or(1521), c.username, c.password);
        if let Some(sid) = self.sid {
            source = source.with_sid(sid);
        }
        if let Some(service_name) = self.service_name {
            source = source.with_service_name(service_name);
        }
        if let Some(driver) = c.driver {
            source = source.with_driver(driver);
        }

        Config::new(self.job.job_config(self.job.table.clone()), SourceConfig::Oracle(source))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    init_tracing(cli.verbose);

    match cli.command {
        Commands::Extract {
            table,
            output,
            json,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(table) = table {
                config.job.table = table;
            }
            if let Some(output) = output {
                config.job.output = Some(output);
            }
            extract_command(config, json)
        }
        Commands::Db2Extract(args) => {
            let json = args.job.json;
            extract_command(args.into_config(), json)
        }
        Commands::OracleExtract(args) => {
            let json = args.job.json;
            extract_command(args.into_config(), json)
        }
        Commands::Plan { table, json } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(table) = table {
                config.job.table = table;
            }
            plan_command(config, json)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG));

    if !path.exists() {
        return Err(anyhow::anyhow!(
            "Config file not found at {}. Pass --config or use db2extract/oracleextract.",
            path.display()
        ));
    }

    Config::from_file(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Fill in the source password from the environment when none is configured
fn resolve_password(config: &mut Config, from_env: Option<String>) {
    if config.source.password().is_empty() {
        if let Some(password) = from_env.filter(|p| !p.is_empty()) {
            config.source.set_password(password);
        }
    }
}

fn build_job(mut config: Config) -> Result<(SyncJob, Config)> {
    resolve_password(&mut config, std::env::var(PASSWORD_ENV).ok());
    tracing::debug!("Using config: {:?}", config);

    let job = SyncJob::from_config(&config).context("Invalid configuration")?;
    Ok((job, config))
}

/// Extract command - run one job into a Parquet file
fn extract_command(config: Config, json: bool) -> Result<()> {
    let (job, config) = build_job(config)?;
    let output = config.job.output_path();

    eprintln!(
        "{} {} from {} into {}",
        "Extracting".cyan(),
        job.table_name,
        job.dialect.name(),
        output.display()
    );

    let report = match job.run(&ParquetSinkFactory::new(&output)) {
        Ok(report) => report,
        Err(e) => {
            if e.is_transient() {
                eprintln!("{}", "The source could not be reached; the job can be retried.".yellow());
            }
            let context = format!("Extraction of {} failed ({})", job.table_name, e.kind());
            return Err(anyhow::Error::new(e).context(context));
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, &output);
    }

    Ok(())
}

/// Plan command - show what an extraction would run
fn plan_command(config: Config, json: bool) -> Result<()> {
    let (job, _) = build_job(config)?;

    let plan = job
        .plan()
        .with_context(|| format!("Planning {} failed", job.table_name))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&job, &plan);
    }

    Ok(())
}

fn print_report(report: &SyncReport, output: &Path) {
    println!(
        "{} Extracted {} rows from {} ({})",
        "✓".green(),
        report.rows_written.to_string().bold(),
        report.table_name,
        report.method
    );
    println!("  {} {}", "Output:".bold(), output.display());
    println!("  {} {} fields", "Schema:".bold(), report.schema.len());
}

fn print_plan(job: &SyncJob, plan: &ExtractionPlan) {
    println!("{} {} ({})", "Table:".bold(), job.table_name, job.dialect.name());
    println!();

    println!("{}", "Schema:".bold());
    for field in plan.schema.fields() {
        println!("  {}", field);
    }
    println!();

    println!("{}", "Query:".bold());
    println!("  {}", plan.query.cyan());
}
