use std::sync::Arc;

use async_oneshot as oneshot;
use futures_concurrency::future::Race;
use smol::{
  Executor,
  channel::{self, Receiver, Sender},
  lock::Mutex,
};
use td_ipc::{Event, Notification};
use td_plugin::Plugin;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PluginError {
  #[error("Internal Server Error: Event channel closed")]
  EventChannelClosed,

  #[error(transparent)]
  Plugin(Box<dyn std::error::Error + Send>),
}

/// A serialized request and the channel its serialized reply is sent back on
pub type RequestJson = (String, oneshot::Sender<String>);

#[derive(Debug, Clone)]
pub struct RequestSender {
  request_data_tx: Sender<RequestJson>,
}

impl td_plugin::RequestSender for RequestSender {
  async fn send_json(&self, request_data: String) -> String {
    let (reply_tx, reply_rx) = oneshot::oneshot();

    if let Err(error) = self.request_data_tx.send((request_data, reply_tx)).await {
      return td_ipc::server::serialize_error(&error);
    }

    reply_rx
      .await
      .unwrap_or_else(|_| td_ipc::server::serialize_error(&"Server dropped reply sender"))
  }
}

pub struct PluginRunner<P> {
  plugin: P,
  event_rx: Receiver<Notification>,
}

impl<P: Plugin<RequestSender>> PluginRunner<P> {
  fn map_error(error: P::Error) -> PluginError {
    PluginError::Plugin(Box::new(error))
  }

  async fn receive_events(&self) -> Result<(), PluginError> {
    loop {
      let notification = self
        .event_rx
        .recv()
        .await
        .map_err(|_| PluginError::EventChannelClosed)?;

      self
        .plugin
        .on_event(notification)
        .await
        .map_err(Self::map_error)?;
    }
  }

  pub async fn run(&self) -> Result<(), PluginError> {
    (
      async { self.plugin.run().await.map_err(Self::map_error) },
      self.receive_events(),
    )
      .race()
      .await
  }
}

/// Fans every event out to the loaded plugins
#[derive(Debug)]
pub struct PluginManager {
  request_data_tx: Sender<RequestJson>,

  event_rx: Receiver<Event>,
  event_broadcast_tx: Mutex<Vec<Sender<Notification>>>,
}

impl PluginManager {
  pub fn new(request_data_tx: Sender<RequestJson>) -> (Self, Sender<Event>) {
    let (event_tx, event_rx) = channel::unbounded();

    (
      Self {
        request_data_tx,

        event_rx,
        event_broadcast_tx: Mutex::new(Vec::new()),
      },
      event_tx,
    )
  }

  pub fn request_sender(&self) -> RequestSender {
    RequestSender {
      request_data_tx: self.request_data_tx.clone(),
    }
  }

  pub async fn load_plugin<P: Plugin<RequestSender>>(
    &self,
    executor: Arc<Executor<'static>>,
  ) -> Result<PluginRunner<P>, PluginError> {
    let plugin = P::init(self.request_sender(), executor)
      .await
      .map_err(PluginRunner::<P>::map_error)?;

    let (event_tx, event_rx) = channel::unbounded();
    self.event_broadcast_tx.lock().await.push(event_tx);

    Ok(PluginRunner { plugin, event_rx })
  }

  async fn broadcast(&self, event: Event) {
    let notification = Notification::from(event);
    debug!(command = ?notification.event, "Broadcasting event");

    self.event_broadcast_tx.lock().await.retain(|tx| {
      // Remove closed channels
      tx.try_send(notification.clone()).is_ok()
    });
  }

  pub async fn run(&self) -> Result<(), PluginError> {
    loop {
      let event = self
        .event_rx
        .recv()
        .await
        .map_err(|_| PluginError::EventChannelClosed)?;

      self.broadcast(event).await;
    }
  }
}
