use serde::{Deserialize, Serialize};

use super::{HomeData, Track};

/// The server component a notification was emitted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Origin {
  PlayerBackground,
  DataManager,
}

/// State changes broadcast to every surface
///
/// Playlist related events carry the current track and the whole playlist,
/// so surfaces can re-render without issuing another request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
  tag = "command",
  rename_all = "camelCase",
  rename_all_fields = "camelCase"
)]
pub enum Event {
  /// The output started loading the current track
  #[serde(rename = "loadstart")]
  LoadStart {
    song: Option<Track>,
    song_list: Vec<Track>,
  },
  Play {
    song: Option<Track>,
    song_list: Vec<Track>,
  },
  Pause {
    song: Option<Track>,
    song_list: Vec<Track>,
  },
  /// A track finished; `song` is the current track after advancing
  Ended {
    song: Option<Track>,
    song_list: Vec<Track>,
  },
  #[serde(rename = "volumechange")]
  VolumeChange { volume: f32 },

  ModifySongListSuccessfully {
    song: Option<Track>,
    song_list: Vec<Track>,
  },
  AddSongSuccessfully {
    song: Option<Track>,
    song_list: Vec<Track>,
  },
  DeleteSongSuccessfully {
    song: Option<Track>,
    song_list: Vec<Track>,
  },
  HideMediaList,

  StarSongMenuSuccessfully { data: HomeData },
  UnStarSongMenuSuccessfully { data: HomeData },
}

impl Event {
  pub fn origin(&self) -> Origin {
    match self {
      Event::StarSongMenuSuccessfully { .. } | Event::UnStarSongMenuSuccessfully { .. } => {
        Origin::DataManager
      }
      _ => Origin::PlayerBackground,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
  pub from: Origin,
  #[serde(flatten)]
  pub event: Event,
}

impl From<Event> for Notification {
  fn from(event: Event) -> Self {
    Self {
      from: event.origin(),
      event,
    }
  }
}
