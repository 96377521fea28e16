mod cli;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands};
use formrelay::{server, worker, AppContext};
use fr_convert::{build_registry, ToolRegistry};
use fr_core::config::Config;
use fr_router::Router;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "formrelay=trace,fr_store=debug,fr_router=debug,fr_convert=debug,tower_http=debug"
                .to_string()
        } else {
            "formrelay=debug,fr_store=info,fr_router=info,fr_convert=info,tower_http=info"
                .to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve {
            host,
            port,
            no_worker,
        } => {
            let mut config = Config::load_or_default(config_path);
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(config, !no_worker))
        }
        Commands::Worker { worker_id } => {
            let mut config = Config::load_or_default(config_path);
            if worker_id.is_some() {
                config.worker.worker_id = worker_id;
            }

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_worker(config))
        }
        Commands::Convert {
            input,
            format,
            output_dir,
        } => {
            let config = Config::load_or_default(config_path);
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert_file(config, &input, &format, output_dir))
        }
        Commands::Formats => list_formats(Config::load_or_default(config_path)),
        Commands::CheckTools => check_tools(Config::load_or_default(config_path)),
        Commands::Validate {
            config: validate_path,
        } => {
            let path = validate_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("formrelay {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn start_server(config: Config, with_worker: bool) -> Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config: {warning}");
    }

    tracing::info!(
        "Starting formrelay server on {}:{}",
        config.server.host,
        config.server.port
    );

    let ctx = AppContext::init(config)?;
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
            cancel.cancel();
        });
    }

    let worker_handle = with_worker.then(|| {
        tokio::spawn(worker::run_worker(ctx.clone(), cancel.clone()))
    });
    let housekeeping_handle = tokio::spawn(run_housekeeping(ctx.clone(), cancel.clone()));

    let result = server::serve(ctx, cancel.clone()).await;

    tracing::info!("Shutting down...");
    cancel.cancel();
    if let Some(handle) = worker_handle {
        let _ = handle.await;
    }
    let _ = housekeeping_handle.await;

    result.map_err(Into::into)
}

async fn start_worker(config: Config) -> Result<()> {
    let ctx = AppContext::init(config)?;
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            cancel.cancel();
        });
    }

    worker::run_worker(ctx, cancel).await;
    Ok(())
}

/// Periodically purge expired and aged task records.
async fn run_housekeeping(ctx: AppContext, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = ctx.tasks.cleanup() {
                    tracing::warn!("Task housekeeping failed: {e}");
                }
            }
            _ = cancel.cancelled() => break,
        }
    }
}

async fn convert_file(
    config: Config,
    input: &Path,
    format: &str,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }

    let tools = ToolRegistry::discover(&config.tools);
    let registry = build_registry(&tools, &config.converters);
    let router = Router::new(registry, config.router.max_hops);

    let out_dir = output_dir.unwrap_or_else(|| {
        input
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    });

    let target = format.trim().to_lowercase();
    println!("Converting {:?} -> {target}", input);

    let output = router.convert(input, &target, &out_dir).await?;
    println!("Output: {:?}", output);
    Ok(())
}

fn list_formats(config: Config) -> Result<()> {
    let tools = ToolRegistry::discover(&config.tools);
    let registry = build_registry(&tools, &config.converters);
    let router = Router::new(registry, config.router.max_hops);

    println!("Supported formats:");
    for format in router.formats() {
        let targets = router.possible_conversions(&format);
        println!("  {format} -> {}", targets.join(", "));
    }

    println!("\nDirect conversions:");
    for (from, to) in router.graph().direct_pairs() {
        println!("  {from} -> {to}");
    }

    Ok(())
}

fn check_tools(config: Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools);
    let mut all_ok = true;

    for tool in tools.check_all() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
    }

    println!();
    if all_ok {
        println!("All conversion tools are available!");
    } else {
        println!("Some tools are missing. Conversions that need them will be unavailable.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let contents = std::fs::read_to_string(p)?;
            Config::from_json(&contents)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        println!("Configuration loaded with {} warning(s):", warnings.len());
        for warning in &warnings {
            println!("  ! {warning}");
        }
    }

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Database: {:?}", config.store.db_path);
    println!("  Task TTL: {}s", config.store.task_ttl_secs);
    println!("  Max retries: {}", config.store.max_retries);
    println!("  Max hops: {}", config.router.max_hops);
    println!("  Extra converters: {}", config.converters.len());

    Ok(())
}
