use std::{
  io::{BufRead, BufReader, Write},
  net::Shutdown,
  os::unix::net::UnixStream,
};

use td_ipc::{
  Notification, Request,
  client::{deserialize_notification, deserialize_reply, serialize_request, serialize_subscribe},
};

use crate::Error;

fn connect() -> Result<UnixStream, Error> {
  let socket_path = td_ipc::socket_path();
  UnixStream::connect(socket_path).map_err(|source| Error::FailedToConnectToSocket {
    path: socket_path.into(),
    source,
  })
}

pub fn send_request<R: Request>(request: R) -> Result<R::Response, Error> {
  let mut stream = connect()?;

  stream
    .write_all(serialize_request(request).as_bytes())
    .map_err(Error::StreamReadWrite)?;

  let mut reply_data = String::new();
  let mut stream_reader = BufReader::new(stream);
  stream_reader
    .read_line(&mut reply_data)
    .map_err(Error::StreamReadWrite)?;

  stream_reader
    .into_inner()
    .shutdown(Shutdown::Both)
    .map_err(Error::StreamReadWrite)?;

  let reply = deserialize_reply::<R>(&reply_data).map_err(Error::Deserialize)?;

  reply.map_err(Error::Server)
}

/// Calls `on_notification` for every notification until the server goes away
pub fn subscribe(mut on_notification: impl FnMut(Notification)) -> Result<(), Error> {
  let mut stream = connect()?;

  stream
    .write_all(serialize_subscribe().as_bytes())
    .map_err(Error::StreamReadWrite)?;

  for line in BufReader::new(stream).lines() {
    let line = line.map_err(Error::StreamReadWrite)?;
    on_notification(deserialize_notification(&line).map_err(Error::Deserialize)?);
  }

  Ok(())
}
