use std::sync::Arc;

use smol::{
  channel::{Receiver, Sender},
  lock::{Mutex, MutexGuard},
};
use td_ipc::{Event, PlayMode, PlaybackConfig, PlayerState, SongList, Track, TrackId};
use tracing::{debug, error, info, warn};

use controller::{Advance, ControllerSnapshot, MediaController};
use output::{AudioOutput, OutputEvent};

use crate::store::{self, KeyValueStore};

pub mod controller;
pub mod errors;
pub mod output;

pub use errors::PlayerError;

pub const CONFIG_KEY: &str = "player-config";
pub const CONTROLLER_KEY: &str = "player-controller";

struct PlayerInner {
  controller: MediaController,
  config: PlaybackConfig,
  /// Session only, never persisted
  muted: bool,
  /// Track currently held by the output
  loaded: Option<TrackId>,
}

impl PlayerInner {
  fn song_list(&self) -> SongList {
    SongList {
      song: self.controller.current().cloned(),
      song_list: self.controller.songs().to_vec(),
    }
  }
}

/// Owns the output and the playlist, every command and output event runs under one lock
pub struct Player<O> {
  output: O,
  state: Mutex<PlayerInner>,
  store: Arc<dyn KeyValueStore>,
  event_tx: Sender<Event>,
  output_event_rx: Receiver<OutputEvent>,
}

impl<O: AudioOutput> Player<O> {
  pub fn new(
    output: O,
    output_event_rx: Receiver<OutputEvent>,
    store: Arc<dyn KeyValueStore>,
    event_tx: Sender<Event>,
  ) -> Self {
    let config = Self::restore_config(store.as_ref());

    let mut controller = match store::load_json::<ControllerSnapshot>(store.as_ref(), CONTROLLER_KEY) {
      Ok(Some(snapshot)) => MediaController::from_snapshot(snapshot, &mut rand::rng()),
      Ok(None) => MediaController::new(),
      Err(error) => {
        warn!("Starting with an empty playlist: {error}");
        MediaController::new()
      }
    };
    controller.mark_playing(false);

    if config.play_mode == PlayMode::Shuffle {
      controller.ensure_shuffle_order(&mut rand::rng());
    }

    info!(
      tracks = controller.len(),
      volume = config.volume,
      play_mode = ?config.play_mode,
      "Restored player state"
    );

    output.set_volume(config.volume);

    Self {
      output,
      state: Mutex::new(PlayerInner {
        controller,
        config,
        muted: false,
        loaded: None,
      }),
      store,
      event_tx,
      output_event_rx,
    }
  }

  fn restore_config(store: &dyn KeyValueStore) -> PlaybackConfig {
    match store::load_json::<PlaybackConfig>(store, CONFIG_KEY) {
      Ok(Some(config)) => config,
      Ok(None) => {
        let config = PlaybackConfig::default();
        if let Err(error) = store::save_json(store, CONFIG_KEY, &config) {
          warn!("Failed to persist default config: {error}");
        }
        config
      }
      Err(error) => {
        warn!("Using default config: {error}");
        PlaybackConfig::default()
      }
    }
  }

  fn persist_controller(&self, inner: &PlayerInner) {
    let snapshot = inner.controller.snapshot();
    if let Err(error) = store::save_json(self.store.as_ref(), CONTROLLER_KEY, &snapshot) {
      warn!("Failed to persist playlist: {error}");
    }
  }

  fn persist_config(&self, inner: &PlayerInner) {
    if let Err(error) = store::save_json(self.store.as_ref(), CONFIG_KEY, &inner.config) {
      warn!("Failed to persist config: {error}");
    }
  }

  async fn emit(&self, event: Event) -> Result<(), PlayerError> {
    self
      .event_tx
      .send(event)
      .await
      .map_err(|_| PlayerError::EventChannelClosed)
  }

  /// Loads the current track into the output, paused
  async fn load_current(&self, inner: &mut PlayerInner) -> Result<(), PlayerError> {
    let Some(track) = inner.controller.current().cloned() else {
      return Ok(());
    };

    debug!(id = track.id, title = %track.title, "Loading track");
    self.output.load(&track).await?;
    inner.loaded = Some(track.id);
    Ok(())
  }

  /// Plays whatever an advance or retreat settled on
  async fn start_advanced(
    &self,
    inner: &mut PlayerInner,
    advance: Advance,
  ) -> Result<(), PlayerError> {
    self.persist_controller(inner);

    if advance.track_id().is_some() {
      self.load_current(inner).await?;
      self.output.play();
    }

    Ok(())
  }

  /// Drops the loaded track unless it is still the current one
  fn stop_if_replaced(&self, inner: &mut PlayerInner) {
    if inner.loaded.is_some() && inner.loaded != inner.controller.current_id() {
      self.output.stop();
      inner.loaded = None;
    }
  }

  async fn lock(&self) -> MutexGuard<'_, PlayerInner> {
    self.state.lock().await
  }

  pub async fn set_song(&self, track: Track) -> Result<(), PlayerError> {
    let mut inner = self.lock().await;

    inner.controller.set_current(track, &mut rand::rng());
    self.persist_controller(&inner);

    self.load_current(&mut inner).await?;
    self.output.play();
    Ok(())
  }

  pub async fn play(&self) -> Result<(), PlayerError> {
    let mut inner = self.lock().await;

    let Some(current) = inner.controller.current_id() else {
      debug!("Nothing to play");
      return Ok(());
    };

    if inner.loaded != Some(current) {
      self.load_current(&mut inner).await?;
    }

    self.output.play();
    Ok(())
  }

  pub async fn pause(&self) {
    let _inner = self.lock().await;
    self.output.pause();
  }

  pub async fn next(&self) -> Result<(), PlayerError> {
    let mut inner = self.lock().await;

    let mode = inner.config.play_mode;
    let advance = inner.controller.advance(mode, &mut rand::rng());
    debug!(?advance, ?mode, "Next track");

    self.start_advanced(&mut inner, advance).await
  }

  pub async fn previous(&self) -> Result<(), PlayerError> {
    let mut inner = self.lock().await;

    let mode = inner.config.play_mode;
    let advance = inner.controller.retreat(mode, &mut rand::rng());
    debug!(?advance, ?mode, "Previous track");

    self.start_advanced(&mut inner, advance).await
  }

  pub async fn set_volume(&self, volume: f32) {
    let mut inner = self.lock().await;

    inner.config.volume = volume.clamp(0.0, 1.0);
    self.persist_config(&inner);
    self.output.set_volume(inner.config.volume);
  }

  /// Returns whether the output is muted now
  pub async fn toggle_muted(&self) -> bool {
    let mut inner = self.lock().await;

    inner.muted = !inner.muted;
    self.output.set_muted(inner.muted);
    inner.muted
  }

  pub async fn switch_play_mode(&self) -> PlayMode {
    let mut inner = self.lock().await;

    let mode = inner.config.play_mode.next();
    inner.config.play_mode = mode;

    if mode == PlayMode::Shuffle {
      inner.controller.ensure_shuffle_order(&mut rand::rng());
    } else {
      inner.controller.drop_shuffle_order();
    }

    self.persist_config(&inner);
    self.persist_controller(&inner);
    info!(?mode, "Switched play mode");
    mode
  }

  pub async fn set_song_list(&self, song_list: Vec<Track>) -> Result<(), PlayerError> {
    let mut inner = self.lock().await;

    inner.controller.replace_all(song_list, &mut rand::rng());
    self.stop_if_replaced(&mut inner);
    self.persist_controller(&inner);

    let SongList { song, song_list } = inner.song_list();
    self
      .emit(Event::ModifySongListSuccessfully { song, song_list })
      .await
  }

  pub async fn clear_song_list(&self) -> Result<(), PlayerError> {
    let mut inner = self.lock().await;

    inner.controller.clear();
    self.stop_if_replaced(&mut inner);
    self.persist_controller(&inner);

    let SongList { song, song_list } = inner.song_list();
    self
      .emit(Event::ModifySongListSuccessfully { song, song_list })
      .await
  }

  /// Returns the playlist after the insert
  pub async fn add_song(&self, track: Track) -> Result<Vec<Track>, PlayerError> {
    let mut inner = self.lock().await;

    if inner.controller.current_id().is_none() {
      inner.controller.set_current(track, &mut rand::rng());
    } else {
      inner.controller.add(track, &mut rand::rng());
    }
    self.persist_controller(&inner);

    let SongList { song, song_list } = inner.song_list();
    self
      .emit(Event::AddSongSuccessfully {
        song,
        song_list: song_list.clone(),
      })
      .await?;

    Ok(song_list)
  }

  pub async fn delete_song(&self, track: Track) -> Result<(), PlayerError> {
    let mut inner = self.lock().await;

    let target_playing = inner
      .controller
      .get(track.id)
      .is_some_and(|target| target.playing);

    // Keep the music going when the audible track is deleted
    if target_playing && inner.controller.len() > 1 {
      let advance = inner
        .controller
        .advance(PlayMode::LoopPlaylist, &mut rand::rng());
      if let Err(error) = self.start_advanced(&mut inner, advance).await {
        warn!("Deleting anyway: {error}");
      }
    }

    inner.controller.remove(track.id);
    if inner.loaded == Some(track.id) {
      self.output.stop();
      inner.loaded = None;
    }
    self.persist_controller(&inner);

    let SongList { song, song_list } = inner.song_list();
    self
      .emit(Event::DeleteSongSuccessfully { song, song_list })
      .await
  }

  pub async fn hide_media_list(&self) -> Result<(), PlayerError> {
    self.emit(Event::HideMediaList).await
  }

  pub async fn player_state(&self) -> PlayerState {
    let inner = self.lock().await;

    if inner.controller.is_empty() {
      PlayerState::Empty
    } else if inner.controller.current().is_some_and(|track| track.playing) {
      PlayerState::Playing
    } else {
      PlayerState::Paused
    }
  }

  pub async fn current_song(&self) -> Option<Track> {
    self.lock().await.controller.current().cloned()
  }

  pub async fn song_list(&self) -> SongList {
    self.lock().await.song_list()
  }

  pub async fn config(&self) -> PlaybackConfig {
    self.lock().await.config
  }

  async fn handle_output_event(&self, event: OutputEvent) -> Result<(), PlayerError> {
    let mut inner = self.lock().await;

    match event {
      OutputEvent::LoadStart(_) => {
        let SongList { song, song_list } = inner.song_list();
        self.emit(Event::LoadStart { song, song_list }).await
      }

      OutputEvent::Playing => {
        inner.controller.mark_playing(true);
        self.persist_controller(&inner);

        let SongList { song, song_list } = inner.song_list();
        self.emit(Event::Play { song, song_list }).await
      }

      OutputEvent::Paused => {
        inner.controller.mark_playing(false);
        self.persist_controller(&inner);

        let SongList { song, song_list } = inner.song_list();
        self.emit(Event::Pause { song, song_list }).await
      }

      OutputEvent::Ended(id) => {
        if inner.loaded != Some(id) {
          debug!(id, "Ignoring end of a replaced track");
          return Ok(());
        }

        let mode = inner.config.play_mode;
        let advance = inner.controller.advance(mode, &mut rand::rng());
        debug!(?advance, ?mode, "Track ended");

        if advance.track_id().is_none() {
          inner.loaded = None;
          self.output.pause();
        }

        let started = self.start_advanced(&mut inner, advance).await;

        let SongList { song, song_list } = inner.song_list();
        self.emit(Event::Ended { song, song_list }).await?;
        started
      }

      OutputEvent::VolumeChanged(volume) => self.emit(Event::VolumeChange { volume }).await,
    }
  }

  pub async fn run(&self) -> Result<(), PlayerError> {
    loop {
      let event = self
        .output_event_rx
        .recv()
        .await
        .map_err(|_| PlayerError::OutputEventChannelClosed)?;

      if let Err(error) = self.handle_output_event(event).await {
        if error.is_recoverable() {
          error!("{error}");
        } else {
          return Err(error);
        }
      }
    }
  }
}
