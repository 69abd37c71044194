// bin/sousvide-web.rs

use std::path::PathBuf;

use clap::Parser;
use sousvide_web::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about = "Web front-end for the sous vide temperature controller")]
pub struct OptsCommon {
    /// Address the web server listens on
    #[arg(long, env = "SOUSVIDE_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: net::SocketAddr,

    /// Settings file, created with defaults if missing
    #[arg(long, env = "SOUSVIDE_SETTINGS", default_value = DEFAULT_SETTINGS_FILE)]
    pub settings: PathBuf,

    #[arg(short, long)]
    pub debug: bool,
}

fn main() -> anyhow::Result<()> {
    let opts = OptsCommon::parse();

    let level = if opts.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    info!("Starting up sousvide-web v{SW_VERSION}");
    debug!("Options: {opts:#?}");

    let settings = Arc::new(SettingsStore::open(&opts.settings)?);
    let state = Arc::new(MyState::new(settings, Arc::new(StubController)));

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async move {
            tokio::select! {
                res = run_api_server(state, opts.listen) => {
                    error!("run_api_server() ended.");
                    res
                }
                res = tokio::signal::ctrl_c() => {
                    info!("Interrupted, shutting down.");
                    Ok(res?)
                }
            }
        })
}

// EOF
