use serde::{Deserialize, Serialize};

pub type TrackId = u64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
  /// Song id on the remote site, unique within a playlist
  pub id: TrackId,
  #[serde(default)]
  pub title: String,
  #[serde(default, alias = "uname")]
  pub author: String,
  #[serde(default)]
  pub cover: String,
  /// Length in seconds, when the remote listing provides it
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub duration: Option<u64>,
  /// Only ever true for the current track while it is audible
  #[serde(default)]
  pub playing: bool,
}

impl Track {
  pub fn new(id: TrackId, title: impl Into<String>) -> Self {
    Self {
      id,
      title: title.into(),
      author: String::new(),
      cover: String::new(),
      duration: None,
      playing: false,
    }
  }

  pub fn with_author(mut self, author: impl Into<String>) -> Self {
    self.author = author.into();
    self
  }
}

/// The current track alongside the whole playlist, as sent to surfaces
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongList {
  pub song: Option<Track>,
  pub song_list: Vec<Track>,
}

/// Identifies a song menu (a remote playlist) for star/unstar commands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongMenuRef {
  pub menu_id: u64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn remote_listing_fields_are_accepted() {
    let track: Track = serde_json::from_str(
      r#"{"id":375,"title":"Song","uname":"Someone","cover":"http://c","duration":180,"lyric":""}"#,
    )
    .unwrap();

    assert_eq!(track.id, 375);
    assert_eq!(track.author, "Someone");
    assert_eq!(track.duration, Some(180));
    assert!(!track.playing);
  }
}
