use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use rodio::decoder::DecoderError;
use td_ipc::{Track, TrackId};
use thiserror::Error;

use crate::data_manager::ApiError;

mod controlled_source;
mod rodio_output;

pub use rodio_output::RodioOutput;

/// Reported by an output whenever its playback state changes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputEvent {
  LoadStart(TrackId),
  Playing,
  Paused,
  /// The track played until its end
  Ended(TrackId),
  VolumeChanged(f32),
}

#[derive(Debug, Error)]
pub enum OutputError {
  #[error("Could not load track {id}: {source}")]
  Source {
    id: TrackId,
    #[source]
    source: ApiError,
  },

  #[error("Could not decode track {id}: {source}")]
  Decoder {
    id: TrackId,
    #[source]
    source: DecoderError,
  },
}

/// The single audio sink driven by the `Player`
///
/// State changes are reported asynchronously as `OutputEvent`s,
/// the methods themselves only fail while loading.
pub trait AudioOutput: Send + Sync {
  /// Replaces whatever is loaded with `track`, paused
  fn load(&self, track: &Track) -> impl Future<Output = Result<(), OutputError>> + Send;

  fn play(&self);

  fn pause(&self);

  /// Drops the loaded track
  fn stop(&self);

  fn set_volume(&self, volume: f32);

  fn set_muted(&self, muted: bool);
}

/// Shared between an output and the sources it is playing
pub struct Controls {
  pub paused: AtomicBool,
  pub muted: AtomicBool,
  volume: AtomicU32,
  /// Sources appended under an older generation skip themselves
  generation: AtomicU64,
}

impl Controls {
  pub fn new(volume: f32) -> Self {
    Self {
      paused: AtomicBool::new(true),
      muted: AtomicBool::new(false),
      volume: AtomicU32::new(volume.to_bits()),
      generation: AtomicU64::new(0),
    }
  }

  pub fn volume(&self) -> f32 {
    f32::from_bits(self.volume.load(Ordering::Relaxed))
  }

  /// Returns the previous volume
  pub fn swap_volume(&self, volume: f32) -> f32 {
    f32::from_bits(self.volume.swap(volume.to_bits(), Ordering::Relaxed))
  }

  pub fn generation(&self) -> u64 {
    self.generation.load(Ordering::Acquire)
  }

  /// Retires every appended source, returns the generation for the next one
  pub fn retire_sources(&self) -> u64 {
    self.generation.fetch_add(1, Ordering::AcqRel) + 1
  }

  /// Amplification applied to the playing source
  pub fn effective_volume(&self) -> f32 {
    if self.muted.load(Ordering::Relaxed) {
      0.0
    } else {
      self.volume()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn muting_silences_without_losing_volume() {
    let controls = Controls::new(0.5);
    assert_eq!(controls.effective_volume(), 0.5);

    controls.muted.store(true, Ordering::Relaxed);
    assert_eq!(controls.effective_volume(), 0.0);
    assert_eq!(controls.volume(), 0.5);

    assert_eq!(controls.swap_volume(0.25), 0.5);
    controls.muted.store(false, Ordering::Relaxed);
    assert_eq!(controls.effective_volume(), 0.25);
  }

  #[test]
  fn retiring_sources_starts_a_new_generation() {
    let controls = Controls::new(0.5);
    let first = controls.generation();

    let next = controls.retire_sources();
    assert_ne!(next, first);
    assert_eq!(controls.generation(), next);
  }
}
