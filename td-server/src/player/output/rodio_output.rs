use std::{
  io::Cursor,
  sync::{Arc, atomic::Ordering},
};

use rodio::{
  Decoder,
  mixer::Mixer,
  queue::{SourcesQueueInput, SourcesQueueOutput, queue},
};
use smol::{channel::Sender, lock::Mutex};
use td_ipc::{PlaybackConfig, Track, TrackId};
use tracing::debug;

use super::{AudioOutput, Controls, OutputError, OutputEvent, controlled_source::wrap_source};
use crate::data_manager::Gateway;

/// Audio bytes of the most recently loaded track, repeats skip the download
type CachedAudio = (TrackId, Arc<[u8]>);

/// Streams remote tracks into a `rodio` queue
pub struct RodioOutput {
  source_queue: Arc<SourcesQueueInput>,
  controls: Arc<Controls>,
  gateway: Arc<Gateway>,
  cache: Mutex<Option<CachedAudio>>,
  event_tx: Sender<OutputEvent>,
}

impl RodioOutput {
  pub fn connect_new(mixer: &Mixer, gateway: Arc<Gateway>, event_tx: Sender<OutputEvent>) -> Self {
    let (output, source) = Self::new(gateway, event_tx);
    mixer.add(source);
    output
  }

  pub fn new(gateway: Arc<Gateway>, event_tx: Sender<OutputEvent>) -> (Self, SourcesQueueOutput) {
    let (queue_in, queue_out) = queue(true);

    (
      Self {
        source_queue: queue_in,
        controls: Arc::new(Controls::new(PlaybackConfig::DEFAULT_VOLUME)),
        gateway,
        cache: Mutex::new(None),
        event_tx,
      },
      queue_out,
    )
  }

  fn emit(&self, event: OutputEvent) {
    // The player owns the receiver for as long as this output exists
    let _ = self.event_tx.try_send(event);
  }

  async fn fetch(&self, id: TrackId) -> Result<Arc<[u8]>, OutputError> {
    let mut cache = self.cache.lock().await;
    if let Some((cached_id, bytes)) = cache.as_ref()
      && *cached_id == id
    {
      return Ok(bytes.clone());
    }

    let download = async {
      let url = self.gateway.song_url(id).await?;
      self.gateway.fetch_audio(url).await
    };
    let bytes: Arc<[u8]> = download
      .await
      .map_err(|source| OutputError::Source { id, source })?
      .into();

    debug!(id, len = bytes.len(), "Fetched track audio");
    *cache = Some((id, bytes.clone()));
    Ok(bytes)
  }

  fn set_paused(&self, paused: bool) -> bool {
    self.controls.paused.swap(paused, Ordering::AcqRel) != paused
  }
}

impl AudioOutput for RodioOutput {
  async fn load(&self, track: &Track) -> Result<(), OutputError> {
    let id = track.id;
    self.emit(OutputEvent::LoadStart(id));

    let bytes = self.fetch(id).await?;
    let len = bytes.len() as u64;

    let decoder = smol::unblock(move || {
      Decoder::builder()
        .with_data(Cursor::new(bytes))
        .with_byte_len(len)
        .build()
    })
    .await
    .map_err(|source| OutputError::Decoder { id, source })?;

    let generation = self.controls.retire_sources();
    self.controls.paused.store(true, Ordering::Release);
    self.source_queue.append(wrap_source(
      decoder,
      id,
      generation,
      self.controls.clone(),
      self.event_tx.clone(),
    ));

    Ok(())
  }

  fn play(&self) {
    if self.set_paused(false) {
      self.emit(OutputEvent::Playing);
    }
  }

  fn pause(&self) {
    if self.set_paused(true) {
      self.emit(OutputEvent::Paused);
    }
  }

  fn stop(&self) {
    self.controls.retire_sources();
    self.pause();
  }

  fn set_volume(&self, volume: f32) {
    let volume = volume.clamp(0.0, 1.0);
    if self.controls.swap_volume(volume) != volume {
      self.emit(OutputEvent::VolumeChanged(volume));
    }
  }

  fn set_muted(&self, muted: bool) {
    self.controls.muted.store(muted, Ordering::Relaxed);
  }
}
