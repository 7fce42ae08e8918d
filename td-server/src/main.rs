use std::sync::{Arc, OnceLock};

use clap::Parser;
use smol::{Executor, channel};
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use data_manager::{
  DataManager, Gateway,
  api::Endpoints,
  cookies::{CookieError, CookieJar},
};
use player::{Player, output::RodioOutput};
use plugin_manager::{PluginError, PluginManager};
use server::Server;
use settings::Settings;
use signals::{SignalHandler, SignalHandlerError};
use store::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};

mod data_manager;
mod player;
mod plugin_manager;
mod server;
mod settings;
mod signals;
mod store;

#[derive(Debug, Error)]
enum StartupError {
  #[error(transparent)]
  Signals(#[from] SignalHandlerError),

  #[error("Could not open the data store: {0}")]
  Store(#[from] StoreError),

  #[error("Could not load cookies: {0}")]
  Cookies(#[from] CookieError),

  #[error("Could not open default audio stream: {0}")]
  AudioStream(#[from] rodio::StreamError),

  #[error("Could not load plugin: {0}")]
  Plugin(#[from] PluginError),
}

fn open_store(settings: &Settings) -> Result<Arc<dyn KeyValueStore>, StoreError> {
  if settings.ephemeral {
    info!("Using in-memory store");
    return Ok(Arc::new(MemoryStore::new()));
  }

  let store = JsonFileStore::open(settings.data_dir())?;
  info!(dir = ?store.dir(), "Using file store");
  Ok(Arc::new(store))
}

fn load_cookies(settings: &Settings) -> Result<CookieJar, CookieError> {
  let Some(path) = &settings.cookies else {
    warn!("No cookie file given, account data and starring song menus are unavailable");
    return Ok(CookieJar::default());
  };

  let jar = CookieJar::load(path)?;
  if jar.is_empty() {
    warn!(path = ?path, "Cookie file holds no cookies");
  }
  Ok(jar)
}

fn main() -> Result<(), StartupError> {
  let settings = Settings::parse();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  static EX: OnceLock<Arc<Executor>> = OnceLock::new();
  let ex: &'static Arc<Executor<'static>> = EX.get_or_init(|| Arc::new(Executor::new()));

  let mut signal_handler = SignalHandler::init()?;

  let store = open_store(&settings)?;
  let gateway = Arc::new(Gateway::new(
    Endpoints::new(settings.api_base.as_str()),
    load_cookies(&settings)?,
  ));

  let (request_data_tx, request_data_rx) = channel::unbounded();
  let (plugin_manager, event_tx) = PluginManager::new(request_data_tx);
  let plugin_manager = Arc::new(plugin_manager);

  // Must outlive every source played through its mixer
  let output_stream = rodio::OutputStreamBuilder::open_default_stream()?;
  let (output_event_tx, output_event_rx) = channel::unbounded();
  let output = RodioOutput::connect_new(output_stream.mixer(), gateway.clone(), output_event_tx);

  let player = Player::new(output, output_event_rx, store, event_tx.clone());
  let data_manager = Arc::new(DataManager::new(gateway, event_tx));
  let server = Server::new(player, data_manager.clone(), request_data_rx);

  info!(version = %td_ipc::version().0, "Starting td-server");

  smol::block_on(ex.run(async {
    let server_task = ex.spawn(async move {
      if let Err(error) = server.run().await {
        error!("Server stopped: {error}");
      }
    });

    let plugin_manager_task = ex.spawn({
      let plugin_manager = plugin_manager.clone();
      async move {
        if let Err(error) = plugin_manager.run().await {
          error!("Plugin manager stopped: {error}");
        }
      }
    });

    #[cfg(feature = "td-plugin-ipc")]
    let ipc_task = {
      let runner = plugin_manager
        .load_plugin::<td_plugin_ipc::IpcPlugin<_>>(ex.clone())
        .await?;

      ex.spawn(async move {
        if let Err(error) = runner.run().await {
          error!("Ipc plugin stopped: {error}");
        }
      })
    };

    if !settings.no_prefetch {
      ex.spawn(async move {
        if let Err(error) = data_manager.init_data().await {
          warn!("Failed to load home data: {error}");
        }
      })
      .detach();
    }

    signal_handler.wait_for_quit().await;

    #[cfg(feature = "td-plugin-ipc")]
    ipc_task.cancel().await;
    plugin_manager_task.cancel().await;
    server_task.cancel().await;

    Ok::<_, StartupError>(())
  }))?;

  drop(output_stream);
  Ok(())
}
