use td_ipc::{
  HomeData, PlayMode, PlaybackConfig, PlayerState, SongList, Track, Version, requests,
  server::RequestHandler,
};

use super::{Server, ServerError};
use crate::player::output::AudioOutput;

impl<O: AudioOutput> RequestHandler for Server<O> {
  type Error = ServerError;

  async fn handle_get_version(&self, _request: requests::GetVersion) -> Result<Version, Self::Error> {
    Ok(td_ipc::version())
  }

  async fn handle_set_song(
    &self,
    requests::SetSong { song }: requests::SetSong,
  ) -> Result<(), Self::Error> {
    Ok(self.player.set_song(song).await?)
  }

  async fn handle_play(&self, _request: requests::Play) -> Result<(), Self::Error> {
    Ok(self.player.play().await?)
  }

  async fn handle_pause(&self, _request: requests::Pause) -> Result<(), Self::Error> {
    self.player.pause().await;
    Ok(())
  }

  async fn handle_set_volume(
    &self,
    requests::SetVolume { volume }: requests::SetVolume,
  ) -> Result<(), Self::Error> {
    self.player.set_volume(volume).await;
    Ok(())
  }

  async fn handle_set_next_song(&self, _request: requests::SetNextSong) -> Result<(), Self::Error> {
    Ok(self.player.next().await?)
  }

  async fn handle_set_prev_song(&self, _request: requests::SetPrevSong) -> Result<(), Self::Error> {
    Ok(self.player.previous().await?)
  }

  async fn handle_set_meted(&self, _request: requests::SetMeted) -> Result<bool, Self::Error> {
    Ok(self.player.toggle_muted().await)
  }

  async fn handle_get_player_state(
    &self,
    _request: requests::GetPlayerState,
  ) -> Result<PlayerState, Self::Error> {
    Ok(self.player.player_state().await)
  }

  async fn handle_get_current_song(
    &self,
    _request: requests::GetCurrentSong,
  ) -> Result<Option<Track>, Self::Error> {
    Ok(self.player.current_song().await)
  }

  async fn handle_get_song_list(
    &self,
    _request: requests::GetSongList,
  ) -> Result<SongList, Self::Error> {
    Ok(self.player.song_list().await)
  }

  async fn handle_get_config(
    &self,
    _request: requests::GetConfig,
  ) -> Result<PlaybackConfig, Self::Error> {
    Ok(self.player.config().await)
  }

  async fn handle_set_song_list(
    &self,
    requests::SetSongList { song_list }: requests::SetSongList,
  ) -> Result<(), Self::Error> {
    Ok(self.player.set_song_list(song_list).await?)
  }

  async fn handle_clear_song_list(
    &self,
    _request: requests::ClearSongList,
  ) -> Result<(), Self::Error> {
    Ok(self.player.clear_song_list().await?)
  }

  async fn handle_add_song(
    &self,
    requests::AddSong { song }: requests::AddSong,
  ) -> Result<Vec<Track>, Self::Error> {
    Ok(self.player.add_song(song).await?)
  }

  async fn handle_delete_song(
    &self,
    requests::DeleteSong { song }: requests::DeleteSong,
  ) -> Result<(), Self::Error> {
    Ok(self.player.delete_song(song).await?)
  }

  async fn handle_switch_play_mode(
    &self,
    _request: requests::SwitchPlayMode,
  ) -> Result<PlayMode, Self::Error> {
    Ok(self.player.switch_play_mode().await)
  }

  async fn handle_hide_media_list(
    &self,
    _request: requests::HideMediaList,
  ) -> Result<(), Self::Error> {
    Ok(self.player.hide_media_list().await?)
  }

  async fn handle_get_data(&self, _request: requests::GetData) -> Result<HomeData, Self::Error> {
    Ok(self.data_manager.home_data().await)
  }

  async fn handle_get_song_menu(
    &self,
    requests::GetSongMenu { sid, pn, ps }: requests::GetSongMenu,
  ) -> Result<Vec<Track>, Self::Error> {
    Ok(self.data_manager.song_menu(sid, pn, ps).await?)
  }

  async fn handle_star_song_menu(
    &self,
    requests::StarSongMenu { song_menu }: requests::StarSongMenu,
  ) -> Result<(), Self::Error> {
    Ok(self.data_manager.star_song_menu(song_menu).await?)
  }

  async fn handle_un_star_song_menu(
    &self,
    requests::UnStarSongMenu { song_menu }: requests::UnStarSongMenu,
  ) -> Result<(), Self::Error> {
    Ok(self.data_manager.unstar_song_menu(song_menu).await?)
  }
}
