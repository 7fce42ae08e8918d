use std::{io, sync::Arc};

use futures_concurrency::future::TryJoin;
use smol::{channel::Sender, lock::Mutex};
use td_ipc::{Event, HomeData, SongMenuRef, Track, TrackId};
use thiserror::Error;
use tracing::{debug, info};

pub mod api;
pub mod cookies;
mod gateway;

pub use gateway::Gateway;

const SONG_MENU_PAGE_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Http request failed: {0}")]
  Http(#[source] Box<ureq::Error>),

  #[error("Failed to read response body: {0}")]
  Body(#[source] io::Error),

  #[error("Malformed api response: {0}")]
  Json(#[source] serde_json::Error),

  #[error("Api rejected the request ({code}): {message}")]
  Rejected { code: i64, message: String },

  #[error("Api response has no data")]
  MissingData,

  #[error("No valid CSRF token, the session cookie is missing or expired")]
  MissingCsrf,

  #[error("Song {0} has no playable source")]
  NoSource(TrackId),
}

#[derive(Debug, Error)]
pub enum DataError {
  #[error("Api request failed: {0}")]
  Api(#[from] ApiError),

  #[error("Event channel closed")]
  EventChannelClosed,
}

impl DataError {
  /// Api failures only fail the request that caused them
  pub fn is_recoverable(&self) -> bool {
    !matches!(self, Self::EventChannelClosed)
  }
}

/// Cached remote data shown by every surface
pub struct DataManager {
  gateway: Arc<Gateway>,
  home_data: Mutex<HomeData>,
  event_tx: Sender<Event>,
}

impl DataManager {
  pub fn new(gateway: Arc<Gateway>, event_tx: Sender<Event>) -> Self {
    Self {
      gateway,
      home_data: Mutex::new(HomeData::default()),
      event_tx,
    }
  }

  /// Fetches every home resource, the cache is only replaced if all of them succeed
  pub async fn init_data(&self) -> Result<(), DataError> {
    let gateway = &self.gateway;

    let (account, banner, hot_rank, all_rank, user_menu, user_collected_menu, recommend_list) = (
      gateway.account(),
      gateway.banner(),
      gateway.hot_rank(),
      gateway.all_rank(),
      gateway.user_song_menu(),
      gateway.user_collected_menu(),
      gateway.recommend_list(),
    )
      .try_join()
      .await?;

    *self.home_data.lock().await = HomeData {
      account,
      banner,
      hot_rank,
      user_menu,
      recommend_list,
      user_collected_menu,
      all_rank,
    };

    info!("Home data loaded");
    Ok(())
  }

  pub async fn home_data(&self) -> HomeData {
    self.home_data.lock().await.clone()
  }

  pub async fn song_menu(
    &self,
    sid: u64,
    pn: Option<u32>,
    ps: Option<u32>,
  ) -> Result<Vec<Track>, DataError> {
    let songs = self
      .gateway
      .song_menu(sid, pn.unwrap_or(1), ps.unwrap_or(SONG_MENU_PAGE_SIZE))
      .await?;

    debug!(sid, count = songs.len(), "Fetched song menu");
    Ok(songs)
  }

  pub async fn star_song_menu(&self, menu: SongMenuRef) -> Result<(), DataError> {
    let csrf = self.gateway.csrf_token().ok_or(ApiError::MissingCsrf)?;
    self.gateway.star_song_menu(menu.menu_id, &csrf).await?;

    let data = self.refresh_collected_menu().await?;
    self.emit(Event::StarSongMenuSuccessfully { data }).await
  }

  pub async fn unstar_song_menu(&self, menu: SongMenuRef) -> Result<(), DataError> {
    let csrf = self.gateway.csrf_token().ok_or(ApiError::MissingCsrf)?;
    self.gateway.unstar_song_menu(menu.menu_id, &csrf).await?;

    let data = self.refresh_collected_menu().await?;
    self.emit(Event::UnStarSongMenuSuccessfully { data }).await
  }

  async fn refresh_collected_menu(&self) -> Result<HomeData, DataError> {
    let collected = self.gateway.user_collected_menu().await?;

    let mut home_data = self.home_data.lock().await;
    home_data.user_collected_menu = collected;
    Ok(home_data.clone())
  }

  async fn emit(&self, event: Event) -> Result<(), DataError> {
    self
      .event_tx
      .send(event)
      .await
      .map_err(|_| DataError::EventChannelClosed)
  }
}

#[cfg(test)]
mod tests {
  use super::{api::Endpoints, cookies::CookieJar, *};

  // Nothing listens on the discard port, any request that is sent fails with `Http`
  const UNREACHABLE_BASE: &str = "http://127.0.0.1:9/api";

  fn data_manager(cookies: CookieJar) -> (DataManager, smol::channel::Receiver<Event>) {
    let (event_tx, event_rx) = smol::channel::unbounded();
    let gateway = Gateway::new(Endpoints::new(UNREACHABLE_BASE), cookies);
    (DataManager::new(Arc::new(gateway), event_tx), event_rx)
  }

  #[test]
  fn star_without_csrf_sends_nothing() {
    let (data_manager, event_rx) = data_manager(CookieJar::default());

    let result = smol::block_on(data_manager.star_song_menu(SongMenuRef { menu_id: 1 }));
    assert!(matches!(result, Err(DataError::Api(ApiError::MissingCsrf))));

    let result = smol::block_on(data_manager.unstar_song_menu(SongMenuRef { menu_id: 1 }));
    assert!(matches!(result, Err(DataError::Api(ApiError::MissingCsrf))));

    assert!(event_rx.is_empty());
  }

  #[test]
  fn expired_csrf_is_rejected() {
    let jar = CookieJar::parse_netscape("127.0.0.1\tFALSE\t/\tFALSE\t1\tbili_jct\tstale\n").unwrap();
    let (data_manager, _event_rx) = data_manager(jar);

    let result = smol::block_on(data_manager.star_song_menu(SongMenuRef { menu_id: 1 }));
    assert!(matches!(result, Err(DataError::Api(ApiError::MissingCsrf))));
  }

  #[test]
  fn failed_init_keeps_the_previous_cache() {
    let (data_manager, _event_rx) = data_manager(CookieJar::default());

    let result = smol::block_on(data_manager.init_data());
    assert!(matches!(result, Err(DataError::Api(ApiError::Http(_)))));
    assert_eq!(smol::block_on(data_manager.home_data()), HomeData::default());
  }
}
