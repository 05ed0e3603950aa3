use anyhow::{Context, Result};
use avatar_relay::config::PoseDeliveryMode;
use avatar_relay::{RelayConfig, RelayOrchestrator};
use clap::Parser;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "avatar-relay")]
#[command(about = "Relays pose landmarks and game video between a motion tracker and its consumers")]
#[command(version)]
#[command(long_about = "Receives raw RGB frames from a game client over TCP and writes them \
to a virtual camera device, while a pose capture loop publishes landmarks over UDP or HTTP \
push and serves the latest pose over HTTP.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "avatar-relay.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the relay")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - initialize but don't start components
    #[arg(long, help = "Perform dry run - register components but don't start them")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Override the pose push transport
    #[arg(long, value_name = "MODE", help = "Pose push transport: udp, http, or none")]
    transport: Option<PoseDeliveryMode>,

    /// Override the UDP pose target address
    #[arg(long, value_name = "IP")]
    udp_ip: Option<String>,

    /// Override the UDP pose target port
    #[arg(long, value_name = "PORT")]
    udp_port: Option<u16>,
}

impl Args {
    fn apply_overrides(&self, config: &mut RelayConfig) {
        if let Some(transport) = self.transport {
            config.pose.transport = transport;
        }
        if let Some(ip) = &self.udp_ip {
            config.pose.udp.ip = ip.clone();
        }
        if let Some(port) = self.udp_port {
            config.pose.udp.port = port;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args);

    info!("Starting avatar relay v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = RelayConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;
    args.apply_overrides(&mut config);

    match config.validate() {
        Ok(()) if args.validate_config => {
            info!("Configuration validation successful");
            println!("✓ Configuration is valid");
            return Ok(());
        }
        Ok(()) => {}
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            eprintln!("✗ Configuration validation failed: {}", e);
            std::process::exit(1);
        }
    }

    info!(
        "Relay configured: ingest {}, pose transport {:?}, pull http://{}{}",
        config.ingest.address(),
        config.pose.transport,
        config.pull.address(),
        config.pull.path
    );

    let mut orchestrator = RelayOrchestrator::new(config);

    orchestrator.initialize().await.map_err(|e| {
        error!("Failed to initialize relay: {}", e);
        e
    })?;

    if args.dry_run {
        info!("Dry run mode - components registered but not started");
        println!("✓ Dry run completed successfully - all components registered");
        return Ok(());
    }

    orchestrator.start().await.map_err(|e| {
        error!("Failed to start relay: {}", e);
        e
    })?;

    let exit_code = orchestrator.run().await.map_err(|e| {
        error!("Relay error during execution: {}", e);
        e
    })?;

    info!("Avatar relay exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

fn init_logging(args: &Args) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("avatar_relay={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer().with_target(true).boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    let rendered = toml::to_string_pretty(&RelayConfig::default())
        .context("Failed to render default configuration")?;

    println!("# Avatar relay configuration");
    println!("# Every value below is the built-in default; environment variables");
    println!("# prefixed AVATAR_RELAY_ (sections separated by __) override the file.");
    println!();
    println!("{}", rendered);
    Ok(())
}
