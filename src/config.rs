//! Configuration for the openocd-regs tool

use std::path::PathBuf;
use std::time::Duration;
use clap::Parser;

/// TCL port the bundled board scripts start OpenOCD on
pub const DEFAULT_PORT: u16 = 50001;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "openocd-regs")]
#[command(about = "Read CPU registers from a running OpenOCD daemon")]
#[command(version)]
pub struct Args {
    /// Host running the OpenOCD daemon
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// OpenOCD TCL port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Registers to read, comma separated
    #[arg(long, value_delimiter = ',', default_value = "pc,sp")]
    pub registers: Vec<String>,

    /// Halt the target before reading
    #[arg(long)]
    pub halt: bool,

    /// Resume the target after reading
    #[arg(long)]
    pub resume: bool,

    /// Force a fresh read from the target instead of OpenOCD's register cache
    #[arg(long)]
    pub force: bool,

    /// Print the registers as a JSON object
    #[arg(long)]
    pub json: bool,

    /// Connect and response timeout in milliseconds
    #[arg(long, default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log file path (defaults to stderr)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Runtime configuration derived from CLI args
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Register names, in output order
    pub registers: Vec<String>,
    pub halt: bool,
    pub resume: bool,
    pub force: bool,
    pub json: bool,
    pub timeout_ms: u64,
}

impl Config {
    pub fn from_args(args: &Args) -> Self {
        Self {
            host: args.host.clone(),
            port: args.port,
            registers: args
                .registers
                .iter()
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
            halt: args.halt,
            resume: args.resume,
            force: args.force,
            json: args.json,
            timeout_ms: args.timeout_ms,
        }
    }

    /// `host:port` of the OpenOCD TCL server
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            registers: vec!["pc".to_string(), "sp".to_string()],
            halt: false,
            resume: false,
            force: false,
            json: false,
            timeout_ms: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address() {
        let config = Config::default();
        assert_eq!(config.address(), "localhost:50001");
    }

    #[test]
    fn test_timeout() {
        let config = Config { timeout_ms: 250, ..Config::default() };
        assert_eq!(config.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_from_args_drops_blank_register_names() {
        let args = Args::parse_from(["openocd-regs", "--registers", "pc, ,lr,"]);
        let config = Config::from_args(&args);
        assert_eq!(config.registers, vec!["pc", "lr"]);
    }
}
