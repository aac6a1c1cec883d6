//! openocd-regs — Main Entry Point

use clap::Parser;
use tracing::{info, error, debug};
use tracing_subscriber::{EnvFilter, fmt};

use openocd_regs::{capture_registers, report_and_close, Args, Config, OpenOcd};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    info!("Starting openocd-regs v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_args(&args);
    info!("Reading {} from {}", config.registers.join(","), config.address());

    // Connection is released when `oocd` goes out of scope, including on `?`
    let mut oocd = OpenOcd::connect(&config.host, config.port, config.timeout())
        .await
        .inspect_err(|e| error!("Connect error: {}", e))?;

    let snapshot = capture_registers(&mut oocd, &config)
        .await
        .inspect_err(|e| error!("Register read error: {}", e))?;

    let mut out = std::io::stdout();
    report_and_close(oocd, &mut out, &snapshot, config.json).await?;

    Ok(())
}

fn init_logging(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false);

    if let Some(log_file) = &args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)?;
        subscriber.with_writer(file).init();
    } else {
        subscriber.with_writer(std::io::stderr).init();
    }

    debug!("Logging initialized with level: {}", args.log_level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use openocd_regs::config::{Args, Config};

    #[test]
    fn test_args_parsing_defaults() {
        let args = Args::parse_from(["openocd-regs"]);
        assert_eq!(args.host, "localhost");
        assert_eq!(args.port, 50001);
        assert_eq!(args.registers, vec!["pc", "sp"]);
        assert!(!args.halt);
        assert!(!args.resume);
        assert!(!args.json);
        assert_eq!(args.log_level, "info");
        assert!(args.log_file.is_none());
    }

    #[test]
    fn test_args_parsing_with_options() {
        let args = Args::parse_from([
            "openocd-regs",
            "--host", "192.168.1.20",
            "--port", "6666",
            "--registers", "pc,lr,r0",
            "--halt",
            "--resume",
            "--force",
            "--log-level", "debug",
        ]);
        assert_eq!(args.host, "192.168.1.20");
        assert_eq!(args.port, 6666);
        assert_eq!(args.registers, vec!["pc", "lr", "r0"]);
        assert!(args.halt && args.resume && args.force);
        assert_eq!(args.log_level, "debug");
    }

    #[test]
    fn test_default_config_matches_cli_defaults() {
        let from_cli = Config::from_args(&Args::parse_from(["openocd-regs"]));
        let default = Config::default();
        assert_eq!(from_cli.address(), default.address());
        assert_eq!(from_cli.registers, default.registers);
        assert_eq!(from_cli.halt, default.halt);
        assert_eq!(from_cli.resume, default.resume);
        assert_eq!(from_cli.timeout(), default.timeout());
    }

    #[test]
    fn test_config_from_args() {
        let args = Args::parse_from([
            "openocd-regs",
            "--port", "4444",
            "--json",
            "--timeout-ms", "500",
        ]);
        let config = Config::from_args(&args);
        assert_eq!(config.port, 4444);
        assert!(config.json);
        assert_eq!(config.timeout_ms, 500);
    }
}
