use std::{error::Error, sync::Arc};

use smol::Executor;
use td_ipc::{
  Notification, Reply, Request,
  client::{deserialize_reply, serialize_request},
};

async fn send_request<R: Request>(sender: &(impl RequestSender + ?Sized), request: R) -> Reply<R> {
  let reply_data = sender.send_json(serialize_request(request)).await;
  deserialize_reply::<R>(&reply_data)
    .unwrap_or_else(|error| Err(format!("Malformed reply from server: {error}")))
}

pub trait RequestSender {
  fn send_json(&self, request_data: String) -> impl Future<Output = String> + Send;

  fn send_request<R: Request + Send>(&self, request: R) -> impl Future<Output = Reply<R>> + Send
  where
    Self: Sync,
  {
    send_request(self, request)
  }
}

/// A UI surface that is compiled into the `td-server` binary
/// Requests are passed as json over channels, notifications arrive through `on_event`.
pub trait Plugin<Tx: RequestSender> {
  type Error: Error + Send + 'static;

  fn init(
    request_tx: Tx,
    executor: Arc<Executor<'static>>,
  ) -> impl Future<Output = Result<Self, Self::Error>> + Send
  where
    Self: Sized;

  fn on_event(
    &self,
    notification: Notification,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send;

  fn run(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
