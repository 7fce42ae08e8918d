use std::{
  sync::{Arc, atomic::Ordering},
  time::Duration,
};

use rodio::{
  Source,
  source::{Amplify, Pausable, Skippable, TrackPosition},
};
use smol::channel::Sender;
use td_ipc::TrackId;

use super::{Controls, OutputEvent};

type WrappedSourceInner<S> = ControlledSource<Skippable<Pausable<Amplify<TrackPosition<S>>>>>;

const SOURCE_UPDATE_INTERVAL: Duration = Duration::from_millis(5);

/// Applies the shared controls to one decoded track and reports when it ends
pub struct ControlledSource<I> {
  input: I,
  track_id: TrackId,
  generation: u64,
  controls: Arc<Controls>,
  event_tx: Sender<OutputEvent>,
  finished: bool,
}

impl<I> ControlledSource<I>
where
  I: Source,
{
  #[inline]
  pub fn with_controls(&mut self, f: impl FnOnce(&mut I, &Arc<Controls>, bool)) {
    let retired = self.is_retired();
    f(&mut self.input, &self.controls, retired)
  }

  fn is_retired(&self) -> bool {
    self.controls.generation() != self.generation
  }

  fn finish(&mut self) {
    if self.finished {
      return;
    }

    self.finished = true;

    // Retired sources were replaced or stopped, they did not end on their own
    if !self.is_retired() {
      let _ = self.event_tx.try_send(OutputEvent::Ended(self.track_id));
    }
  }
}

impl<I> Iterator for ControlledSource<I>
where
  I: Source,
{
  type Item = I::Item;

  #[inline]
  fn next(&mut self) -> Option<Self::Item> {
    let value = self.input.next();
    if value.is_none() {
      self.finish();
    }

    value
  }

  #[inline]
  fn size_hint(&self) -> (usize, Option<usize>) {
    self.input.size_hint()
  }
}

impl<I> Source for ControlledSource<I>
where
  I: Source,
{
  #[inline]
  fn current_span_len(&self) -> Option<usize> {
    self.input.current_span_len()
  }

  #[inline]
  fn channels(&self) -> rodio::ChannelCount {
    self.input.channels()
  }

  #[inline]
  fn sample_rate(&self) -> rodio::SampleRate {
    self.input.sample_rate()
  }

  #[inline]
  fn total_duration(&self) -> Option<Duration> {
    self.input.total_duration()
  }
}

fn control_wrapped_source<S: Source>(controlled: &mut WrappedSourceInner<S>) {
  controlled.with_controls(|skippable, controls, retired| {
    if retired {
      skippable.skip();
      return;
    }

    let pausable = skippable.inner_mut();
    pausable.set_paused(controls.paused.load(Ordering::Relaxed));

    let volume_controlled = pausable.inner_mut();
    volume_controlled.set_factor(controls.effective_volume());
  });
}

/// Wraps `source` as a member of the `generation` it was appended under
pub fn wrap_source<S: Source>(
  source: S,
  track_id: TrackId,
  generation: u64,
  controls: Arc<Controls>,
  event_tx: Sender<OutputEvent>,
) -> impl Source {
  let wrapped = source
    .track_position()
    .amplify(controls.effective_volume())
    .pausable(true)
    .skippable();

  let controlled = ControlledSource {
    input: wrapped,
    track_id,
    generation,
    controls,
    event_tx,
    finished: false,
  };

  controlled.periodic_access(SOURCE_UPDATE_INTERVAL, control_wrapped_source)
}
