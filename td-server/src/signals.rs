use std::io;

use async_signal::{Signal, Signals};
use smol::stream::StreamExt;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SignalHandlerError {
  #[error("Failed to register signal handlers: {0}")]
  FailedToRegisterSignalHandlers(io::Error),
}

pub struct SignalHandler {
  signals: Signals,
}

impl SignalHandler {
  pub fn init() -> Result<Self, SignalHandlerError> {
    Ok(Self {
      signals: Signals::new([Signal::Term, Signal::Quit, Signal::Int])
        .map_err(SignalHandlerError::FailedToRegisterSignalHandlers)?,
    })
  }

  pub async fn wait_for_quit(&mut self) {
    while let Some(signal) = self.signals.next().await {
      let signal = match signal {
        Ok(signal) => signal,
        Err(error) => {
          warn!("Failed to receive signal: {error}");
          return;
        }
      };

      if matches!(signal, Signal::Term | Signal::Quit | Signal::Int) {
        info!(?signal, "Shutting down");
        return;
      };
    }

    unreachable!("Iterating over Signals should never return None")
  }
}
