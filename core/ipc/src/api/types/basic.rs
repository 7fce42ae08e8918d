use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version(pub String);

/// Coarse player state reported to surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerState {
  /// The playlist is empty, nothing can be played
  Empty,
  Paused,
  Playing,
}

/// Governs which track `next`/`previous` and the end of a track lead to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayMode {
  /// Play through the playlist once and stop after the last track
  #[default]
  Sequential,
  /// Wrap around to the first track after the last one
  LoopPlaylist,
  /// Repeat the current track
  LoopOne,
  /// Visit every track once in random order, then reshuffle
  Shuffle,
}

impl PlayMode {
  /// The mode selected by the next `switchPlayMode` command
  pub fn next(self) -> Self {
    match self {
      PlayMode::Sequential => PlayMode::LoopPlaylist,
      PlayMode::LoopPlaylist => PlayMode::LoopOne,
      PlayMode::LoopOne => PlayMode::Shuffle,
      PlayMode::Shuffle => PlayMode::Sequential,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackConfig {
  pub volume: f32,
  pub play_mode: PlayMode,
}

impl PlaybackConfig {
  pub const DEFAULT_VOLUME: f32 = 0.8;
}

impl Default for PlaybackConfig {
  fn default() -> Self {
    Self {
      volume: Self::DEFAULT_VOLUME,
      play_mode: PlayMode::default(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn play_mode_cycles_with_period_four() {
    for mode in [
      PlayMode::Sequential,
      PlayMode::LoopPlaylist,
      PlayMode::LoopOne,
      PlayMode::Shuffle,
    ] {
      assert_eq!(mode.next().next().next().next(), mode);
      assert_ne!(mode.next(), mode);
    }
  }

  #[test]
  fn play_mode_switch_order() {
    assert_eq!(PlayMode::Sequential.next(), PlayMode::LoopPlaylist);
    assert_eq!(PlayMode::LoopPlaylist.next(), PlayMode::LoopOne);
    assert_eq!(PlayMode::LoopOne.next(), PlayMode::Shuffle);
    assert_eq!(PlayMode::Shuffle.next(), PlayMode::Sequential);
  }

  #[test]
  fn config_wire_format() {
    let config = PlaybackConfig::default();
    let json = serde_json::to_value(config).unwrap();

    assert_eq!(json["playMode"], "sequential");
    assert!((json["volume"].as_f64().unwrap() - 0.8).abs() < 1e-6);
  }
}
