use std::fmt::Debug;

use serde::{Serialize, de::DeserializeOwned};

pub mod client;
mod events;
pub mod requests;
pub mod server;
mod types;

pub use events::*;
pub use types::*;

pub(crate) mod private {
  use std::fmt::Debug;

  use serde::{Serialize, de::DeserializeOwned};

  use super::requests;
  pub trait SealedRequest: Debug + Clone + Serialize + DeserializeOwned {
    fn qualified_request(self) -> requests::private::QualifiedRequest;
  }
}

/// Request sent to the tunedock server
///
/// On the wire every request is a single JSON object tagged by its `command` field,
/// e.g. `{"command":"setVolume","volume":0.5}`
pub trait Request: private::SealedRequest {
  type Response: Debug + Clone + Serialize + DeserializeOwned;
}

/// Reply from the tunedock server
///
/// Every request gets one reply.
///
/// * If an error had occurred, it will be an `Err` carrying the error message.
/// * If the request does not need any particular response, it will be `Ok(())`.
#[allow(type_alias_bounds)]
pub type Reply<R>
where
  R: Request,
= Result<<R as Request>::Response, String>;
