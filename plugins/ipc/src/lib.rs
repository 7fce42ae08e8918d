use std::{
  fs,
  path::{Path, PathBuf},
  sync::Arc,
};

use smol::{
  Executor,
  channel::{self, Receiver, Sender},
  io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader},
  lock::Mutex,
  net::unix::{UnixListener, UnixStream},
  stream::StreamExt,
};
use td_ipc::{
  Notification,
  client::{is_subscribe, serialize_notification},
};
use td_plugin::{Plugin, RequestSender};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum IpcServerError {
  #[error("Failed to check socket file: {0}")]
  CheckSocketFileFailed(#[source] io::Error),

  #[error("The tunedock socket file was already present, is another `td-server` instance running?")]
  SocketInUse,

  #[error("Failed to create ipc socket: {0}")]
  FailedToCreateSocket(#[source] io::Error),
}

/// Notifications queued per subscriber before it is considered stuck and dropped
const SUBSCRIBER_BACKLOG: usize = 64;

type Subscribers = Arc<Mutex<Vec<Sender<String>>>>;

pub struct IpcPlugin<Tx> {
  socket_path: PathBuf,
  request_tx: Tx,
  executor: Arc<Executor<'static>>,
  subscribers: Subscribers,
}

impl<Tx> IpcPlugin<Tx> {
  fn is_socket_in_use(socket_path: &Path) -> Result<bool, IpcServerError> {
    let socket_in_use = fs::exists(socket_path).map_err(IpcServerError::CheckSocketFileFailed)?;
    Ok(socket_in_use)
  }

  fn cleanup_socket(&self) {
    if fs::remove_file(&self.socket_path).is_ok() {
      info!(path = ?self.socket_path, "removed socket");
    }
  }
}

impl<Tx: RequestSender + Send + Sync + Clone + 'static> Plugin<Tx> for IpcPlugin<Tx> {
  type Error = IpcServerError;

  async fn init(request_tx: Tx, executor: Arc<Executor<'static>>) -> Result<Self, Self::Error>
  where
    Self: Sized,
  {
    let socket_path = PathBuf::from(td_ipc::socket_path());
    if Self::is_socket_in_use(&socket_path)? {
      return Err(IpcServerError::SocketInUse);
    }

    Ok(Self {
      socket_path,
      request_tx,
      executor,
      subscribers: Arc::new(Mutex::new(Vec::new())),
    })
  }

  async fn on_event(&self, notification: Notification) -> Result<(), Self::Error> {
    let data = serialize_notification(&notification);

    self.subscribers.lock().await.retain(|tx| {
      // Remove disconnected and stuck subscribers
      tx.try_send(data.clone()).is_ok()
    });

    Ok(())
  }

  async fn run(&self) -> Result<(), Self::Error> {
    let listener =
      UnixListener::bind(&self.socket_path).map_err(IpcServerError::FailedToCreateSocket)?;
    info!(path = ?self.socket_path, "listening for ipc clients");

    while let Some(stream) = listener.incoming().next().await {
      let handler = StreamHandler::new(self.request_tx.clone(), self.subscribers.clone());

      self
        .executor
        .spawn(async move {
          let res = match stream {
            Ok(stream) => handler.handle_stream(stream).await,
            Err(error) => Err(error),
          };

          if let Err(error) = res {
            warn!("failed to serve ipc client: {error}");
          }
        })
        .detach();
    }

    self.cleanup_socket();
    unreachable!("Iterating over Incoming should never return None")
  }
}

impl<Tx> Drop for IpcPlugin<Tx> {
  fn drop(&mut self) {
    self.cleanup_socket();
  }
}

struct StreamHandler<Tx> {
  request_tx: Tx,
  subscribers: Subscribers,
}

impl<Tx> StreamHandler<Tx> {
  fn new(request_tx: Tx, subscribers: Subscribers) -> Self {
    Self {
      request_tx,
      subscribers,
    }
  }
}

impl<Tx: RequestSender> StreamHandler<Tx> {
  async fn handle_stream(&self, stream: UnixStream) -> io::Result<()> {
    let mut request_data = String::new();
    let mut stream_reader = BufReader::new(stream);
    stream_reader.read_line(&mut request_data).await?;

    let mut stream = stream_reader.into_inner();

    if is_subscribe(&request_data) {
      let (notification_tx, notification_rx) = channel::bounded(SUBSCRIBER_BACKLOG);
      self.subscribers.lock().await.push(notification_tx);
      debug!("ipc client subscribed to notifications");

      return Self::stream_notifications(stream, notification_rx).await;
    }

    let reply_data = self.request_tx.send_json(request_data).await;
    stream.write_all(reply_data.as_bytes()).await?;

    Ok(())
  }

  /// Writes notifications until the client disconnects
  async fn stream_notifications(
    mut stream: UnixStream,
    notification_rx: Receiver<String>,
  ) -> io::Result<()> {
    while let Ok(data) = notification_rx.recv().await {
      if let Err(error) = stream.write_all(data.as_bytes()).await {
        if error.kind() == io::ErrorKind::BrokenPipe {
          debug!("ipc subscriber disconnected");
          return Ok(());
        }

        return Err(error);
      }
    }

    Ok(())
  }
}
