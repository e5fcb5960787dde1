use crate::validation::{DEFAULT_PAGE_SIZE, validate_page_size};
use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

const DEFAULT_HTTP_BIND: &str = "127.0.0.1:8080";
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_bind_address: SocketAddr,
    /// Snapshot file; `None` keeps records in memory only.
    pub data_file: Option<PathBuf>,
    pub max_page_size: usize,
    pub graceful_shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            data_file: None,
            max_page_size: DEFAULT_PAGE_SIZE,
            graceful_shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            http_bind: cli_http_bind,
            data_file: cli_data_file,
            max_page_size: cli_max_page_size,
            shutdown_timeout: cli_shutdown_timeout,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            http_bind: file_http_bind,
            data_file: file_data_file,
            max_page_size: file_max_page_size,
            shutdown_timeout: file_shutdown_timeout,
        } = file_config;

        let http_bind_address = match cli_http_bind.or(file_http_bind) {
            Some(addr) => addr,
            None => DEFAULT_HTTP_BIND
                .parse()
                .context("default bind address invalid")?,
        };

        let data_file = cli_data_file
            .or(file_data_file)
            .filter(|path| !path.as_os_str().is_empty());

        let max_page_size = validate_page_size(
            cli_max_page_size
                .or(file_max_page_size)
                .unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .context("invalid max page size")?;

        let graceful_shutdown_timeout_secs = cli_shutdown_timeout
            .or(file_shutdown_timeout)
            .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS);

        Ok(Self {
            http_bind_address,
            data_file,
            max_page_size,
            graceful_shutdown_timeout_secs,
        })
    }

    /// Fail-fast checks run before the server starts.
    pub fn validate(&self) -> Result<()> {
        validate_page_size(self.max_page_size).context("invalid max page size")?;
        anyhow::ensure!(
            self.graceful_shutdown_timeout_secs > 0,
            "shutdown timeout must be at least one second"
        );
        if let Some(path) = self.data_file.as_ref() {
            anyhow::ensure!(
                !path.is_dir(),
                "data file {:?} is a directory",
                path
            );
        }
        Ok(())
    }

    pub fn data_file(&self) -> Option<&Path> {
        self.data_file.as_deref()
    }
}

#[derive(Parser, Debug, Default, Clone)]
#[command(name = "meal-timetable", about = "Meal timetable service", version)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "MEAL_TIMETABLE_HTTP_BIND",
        value_name = "ADDR",
        help = "HTTP bind address"
    )]
    pub http_bind: Option<SocketAddr>,

    #[arg(
        long,
        env = "MEAL_TIMETABLE_DATA_FILE",
        value_name = "FILE",
        help = "JSON snapshot file; records are kept in memory only when unset"
    )]
    pub data_file: Option<PathBuf>,

    #[arg(
        long,
        env = "MEAL_TIMETABLE_MAX_PAGE_SIZE",
        value_name = "N",
        help = "Maximum number of edges returned by a list query",
        value_parser = clap::value_parser!(usize)
    )]
    pub max_page_size: Option<usize>,

    #[arg(
        long,
        env = "MEAL_TIMETABLE_SHUTDOWN_TIMEOUT",
        value_name = "SECS",
        help = "Seconds to wait for in-flight requests on shutdown",
        value_parser = clap::value_parser!(u64)
    )]
    pub shutdown_timeout: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    http_bind: Option<SocketAddr>,
    data_file: Option<PathBuf>,
    max_page_size: Option<usize>,
    shutdown_timeout: Option<u64>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
