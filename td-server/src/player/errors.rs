use thiserror::Error;

use super::output::OutputError;

#[derive(Debug, Error)]
pub enum PlayerError {
  #[error("Internal Player Error: Event channel closed")]
  EventChannelClosed,

  #[error("Internal Player Error: OutputEvent channel closed")]
  OutputEventChannelClosed,

  #[error(transparent)]
  Output(#[from] OutputError),
}

impl PlayerError {
  /// A failed load leaves the previous track playing, only lost channels are fatal
  pub fn is_recoverable(&self) -> bool {
    matches!(self, PlayerError::Output(_))
  }
}
