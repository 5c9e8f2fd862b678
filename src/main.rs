use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use weft_core::runtime::registry::StdRegistry;
use weft_core::runtime::{Flow, RuntimeConfig};
use weft_core::Result;

/// Command-line arguments for the `weftd` runtime host (spec §4.7, ambient
/// CLI surface). Grounded on the teacher's `EdgelinkConfig`
/// (`runtime/model/config.rs`): a `clap::Parser` struct with a
/// `default_value_t` home-directory fallback for the flow file path.
#[derive(Parser, Debug, Clone)]
#[command(version, about = "Loads and runs a declarative flow network", long_about = None)]
struct WeftArgs {
    /// Path of the root flow declaration file to load and run.
    #[arg(default_value_t = default_flow_path())]
    flow_path: String,

    /// Path of the log4rs configuration file. Falls back to a plain stdout
    /// logger when omitted.
    #[arg(short, long)]
    log_path: Option<String>,

    /// Path of a layered process config file (TOML) read by
    /// `weft_core::runtime::RuntimeConfig::load`.
    #[arg(short, long)]
    config_path: Option<String>,
}

fn default_flow_path() -> String {
    dirs_next::home_dir()
        .expect("could not determine the $HOME directory")
        .join(".weft")
        .join("flow.json")
        .to_string_lossy()
        .to_string()
}

fn log_init(args: &WeftArgs) {
    if let Some(ref log_path) = args.log_path {
        log4rs::init_file(log_path, Default::default()).unwrap();
        return;
    }
    let stdout = log4rs::append::console::ConsoleAppender::builder()
        .encoder(Box::new(log4rs::encode::pattern::PatternEncoder::new("[{h({l})}]\t{m}{n}")))
        .build();
    let config = log4rs::Config::builder()
        .appender(log4rs::config::Appender::builder().build("stdout", Box::new(stdout)))
        .build(log4rs::config::Root::builder().appender("stdout").build(log::LevelFilter::Info))
        .unwrap();
    log4rs::init_config(config).unwrap();
}

fn load_runtime_config(args: &WeftArgs) -> Result<RuntimeConfig> {
    match &args.config_path {
        Some(path) => {
            let layered = config::Config::builder().add_source(config::File::with_name(path)).build()?;
            RuntimeConfig::load(Some(&layered))
        }
        None => RuntimeConfig::load(None),
    }
}

async fn run_flow(args: WeftArgs, cancel: CancellationToken) -> Result<()> {
    let runtime_config = load_runtime_config(&args)?;
    let registry = Arc::new(StdRegistry::with_builtins());

    log::info!("loading flow declaration: {}", &args.flow_path);
    let flow = Flow::from_file(PathBuf::from(&args.flow_path), registry, &runtime_config).await?;

    let handle = flow.run();

    // The network may reach quiescence on its own (every source exhausted)
    // or be asked to stop externally (ctrl-c). Whichever comes first wins;
    // `stopped` latches before per-node `shutdown` hooks run (spec §4.4), so
    // either way we then await the spawned task itself rather than abort it,
    // letting those hooks finish (spec §4.7 `run_sync`, §6 "exit code is 0
    // on clean shutdown").
    tokio::select! {
        _ = flow.stopped() => {
            log::info!("flow network reached completion");
        }
        _ = cancel.cancelled() => {
            log::info!("stop requested, shutting down the flow network...");
            flow.stop();
        }
    }
    if let Err(e) = handle.await {
        log::error!("flow task did not shut down cleanly: {}", e);
    }

    Ok(())
}

async fn app_main() -> Result<()> {
    let args = WeftArgs::parse();
    log_init(&args);

    log::info!("weftd v{}", env!("CARGO_PKG_VERSION"));

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("ctrl-c received, cancelling...");
            ctrl_c_token.cancel();
        }
    });

    run_flow(args, cancel).await
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    if let Err(err) = app_main().await {
        eprintln!("weftd error: {}", err);
        process::exit(1);
    }
    Ok(())
}
