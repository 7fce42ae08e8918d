use super::{
  HomeData, PlayMode, PlaybackConfig, PlayerState, Request, SongList, SongMenuRef, Track,
  Version, private::SealedRequest,
};

macro_rules! requests {
  (@def $(#[$meta:meta])* $name:ident { $($t:tt)* } ) => {
    $(#[$meta])*
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct $name{$($t)*}
  };

  (
    $($(#[$meta:meta])* $name:ident $fields:tt -> $response:ty;)*
  ) => {
paste::paste! {
  pub(crate) mod private {
    use crate::requests;
    use super::*;

    /// Prefer using `Request` generics when writing requests
    /// This type is only needed to destinguish between requests when sending them to the server
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(tag = "command", rename_all = "camelCase")]
    pub enum QualifiedRequest {
      $(
        $name(super::$name),
      )*
    }

    pub async fn _handle_request<E>(request: QualifiedRequest, handler: &(impl RequestHandler<Error = E> + ?Sized)) -> Result<String, E> {
      let reply_data = match request {
        $(
          QualifiedRequest::$name(request) => {
            crate::server::serialize_response::<super::$name>(handler.[<handle_$name:snake>](request).await?)
          }
        )*
      };

      Ok(reply_data)
    }

    pub trait RequestHandler {
      type Error: ToString;

      $(
        fn [<handle_$name:snake>](&self, request: requests::$name) -> impl Future<Output = Result<$response, Self::Error>> + Send;
      )*
    }
  }

  $(
    requests!(@def $(#[$meta])* $name $fields);

    impl SealedRequest for $name {
      fn qualified_request(self) -> private::QualifiedRequest {
        private::QualifiedRequest::$name(self)
      }
    }

    impl Request for $name {
      type Response = $response;
    }
  )*
}
};
}

requests! {
  GetVersion {} -> Version;

  /// Make `song` the current track and start playing it, adding it to the playlist if needed
  SetSong { pub song: Track } -> ();
  Play {} -> ();
  Pause {} -> ();
  SetVolume { pub volume: f32 } -> ();
  SetNextSong {} -> ();
  SetPrevSong {} -> ();
  /// Toggles mute, replies with the new muted state
  SetMeted {} -> bool;

  GetPlayerState {} -> PlayerState;
  GetCurrentSong {} -> Option<Track>;
  GetSongList {} -> SongList;
  GetConfig {} -> PlaybackConfig;

  /// Replace the whole playlist
  SetSongList { pub song_list: Vec<Track> } -> ();
  ClearSongList {} -> ();
  /// Replies with the updated playlist
  AddSong { pub song: Track } -> Vec<Track>;
  DeleteSong { pub song: Track } -> ();
  /// Cycles the play mode, replies with the new one
  SwitchPlayMode {} -> PlayMode;
  /// Asks every surface to collapse its playlist view
  HideMediaList {} -> ();

  GetData {} -> HomeData;
  GetSongMenu {
    pub sid: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pn: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ps: Option<u32>,
  } -> Vec<Track>;
  StarSongMenu { pub song_menu: SongMenuRef } -> ();
  UnStarSongMenu { pub song_menu: SongMenuRef } -> ();
}
