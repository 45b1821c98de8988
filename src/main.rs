use std::path::Path;
use std::sync::Arc;
use tokio::sync::Notify;

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod server;
mod wiki;

use error::WikiError;

fn main() {
    if let Err(e) = run() {
        eprintln!("[FATAL] {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), WikiError> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg).map_err(WikiError::Logger)?;

    // Templates and the pages directory must be usable before anything listens
    let templates = wiki::Templates::load(
        Path::new(&cfg.wiki.template_dir),
        &cfg.wiki.view_template,
        &cfg.wiki.edit_template,
    )?;
    let store = wiki::FileStore::open(&cfg.wiki.data_dir).map_err(|source| WikiError::DataDir {
        path: cfg.wiki.data_dir.clone(),
        source,
    })?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build().map_err(WikiError::Runtime)?;

    runtime.block_on(async_main(config::AppState::new(cfg, store, templates)))
}

async fn async_main(state: config::AppState) -> Result<(), WikiError> {
    let addr = state.config.get_socket_addr().map_err(WikiError::Address)?;
    let listener =
        server::create_listener(addr).map_err(|source| WikiError::Bind { addr, source })?;

    logger::log_server_start(&addr, &state.config);

    let shutdown = Arc::new(Notify::new());
    server::start_signal_handler(Arc::clone(&shutdown));
    server::run_server_loop(listener, Arc::new(state), shutdown).await;

    Ok(())
}
