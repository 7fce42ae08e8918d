use super::{Reply, Request, requests};

pub use requests::private::RequestHandler;
use requests::private::{QualifiedRequest, _handle_request};

pub(crate) fn serialize_response<R: Request>(response: R::Response) -> String {
  serialize_reply::<R>(&Ok(response))
}

pub(crate) fn serialize_reply<R: Request>(reply: &Reply<R>) -> String {
  let mut reply_data = serde_json::to_string(reply).expect("Replies should not fail to serialize");
  reply_data.push('\n');
  reply_data
}

pub fn serialize_error(error: &impl ToString) -> String {
  let mut reply_data = serde_json::to_string(&Err::<(), String>(error.to_string()))
    .expect("Replies should not fail to serialize");
  reply_data.push('\n');
  reply_data
}

/// Parses `request_data` and dispatches it to `handler`
///
/// Malformed requests are answered with an error reply and never reach the handler.
/// If the handler fails, the serialized error reply is returned alongside the error itself
/// so the caller can decide whether to keep serving.
pub async fn handle_request<H>(request_data: &str, handler: &H) -> Result<String, (String, H::Error)>
where
  H: RequestHandler + ?Sized,
{
  let request = match serde_json::from_str::<QualifiedRequest>(request_data.trim()) {
    Ok(request) => request,
    Err(error) => return Ok(serialize_error(&format!("Invalid request: {error}"))),
  };

  _handle_request(request, handler)
    .await
    .map_err(|error| (serialize_error(&error), error))
}
