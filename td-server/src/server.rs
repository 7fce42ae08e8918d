use std::sync::Arc;

use futures_concurrency::future::Race;
use smol::channel::Receiver;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
  data_manager::{DataError, DataManager},
  player::{Player, PlayerError, output::AudioOutput},
  plugin_manager::RequestJson,
};

mod request_handler;

#[derive(Debug, Error)]
pub enum ServerError {
  #[error("Server message channel closed")]
  MessageChannelClosed,

  #[error(transparent)]
  Player(#[from] PlayerError),

  #[error(transparent)]
  Data(#[from] DataError),
}

impl ServerError {
  pub fn is_recoverable(&self) -> bool {
    match self {
      ServerError::Player(error) => error.is_recoverable(),
      ServerError::Data(error) => error.is_recoverable(),
      ServerError::MessageChannelClosed => false,
    }
  }
}

/// Answers requests from every surface, one at a time
pub struct Server<O> {
  player: Player<O>,
  data_manager: Arc<DataManager>,

  request_data_rx: Receiver<RequestJson>,
}

impl<O: AudioOutput> Server<O> {
  pub fn new(
    player: Player<O>,
    data_manager: Arc<DataManager>,
    request_data_rx: Receiver<RequestJson>,
  ) -> Self {
    Self {
      player,
      data_manager,
      request_data_rx,
    }
  }

  async fn handle_requests(&self) -> Result<(), ServerError> {
    loop {
      let (request_data, mut reply_tx) = self
        .request_data_rx
        .recv()
        .await
        .map_err(|_| ServerError::MessageChannelClosed)?;

      debug!(request = request_data.trim(), "Handling request");

      match td_ipc::server::handle_request(&request_data, self).await {
        Ok(reply_data) => {
          let _ = reply_tx.send(reply_data);
        }

        Err((reply_data, error)) => {
          let _ = reply_tx.send(reply_data);

          if error.is_recoverable() {
            warn!("{error}");
          } else {
            return Err(error);
          }
        }
      }
    }
  }

  pub async fn run(&self) -> Result<(), ServerError> {
    (
      async { self.player.run().await.map_err(ServerError::Player) },
      self.handle_requests(),
    )
      .race()
      .await
  }
}
