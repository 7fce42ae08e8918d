use serde::Deserialize;

use super::{Notification, Reply, Request};

pub fn serialize_request(request: impl Request) -> String {
  let mut request_data = serde_json::to_string(&request.qualified_request())
    .expect("Requests should not fail to serialize");
  request_data.push('\n');
  request_data
}

pub fn deserialize_reply<R: Request>(reply_data: &str) -> serde_json::Result<Reply<R>> {
  serde_json::from_str(reply_data)
}

pub const SUBSCRIBE_COMMAND: &str = "subscribe";

#[derive(Debug, Deserialize)]
struct CommandName {
  command: String,
}

/// Sent instead of a request to turn a connection into a notification stream
pub fn serialize_subscribe() -> String {
  let mut data = serde_json::json!({ "command": SUBSCRIBE_COMMAND }).to_string();
  data.push('\n');
  data
}

pub fn is_subscribe(request_data: &str) -> bool {
  serde_json::from_str::<CommandName>(request_data.trim())
    .is_ok_and(|CommandName { command }| command == SUBSCRIBE_COMMAND)
}

pub fn serialize_notification(notification: &Notification) -> String {
  let mut data =
    serde_json::to_string(notification).expect("Notifications should not fail to serialize");
  data.push('\n');
  data
}

pub fn deserialize_notification(data: &str) -> serde_json::Result<Notification> {
  serde_json::from_str(data)
}
