use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("Could not connect to socket {path}, is td-server running?")]
  FailedToConnectToSocket { path: String, source: io::Error },

  #[error("Error communicating with server")]
  StreamReadWrite(#[source] io::Error),

  #[error("Failed to (de)serialize server data")]
  Deserialize(#[source] serde_json::Error),

  #[error("Error: {0}")]
  Server(String),
}
