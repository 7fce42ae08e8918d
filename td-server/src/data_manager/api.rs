use serde::{Deserialize, de::DeserializeOwned};
use url::Url;

use super::ApiError;

pub const DEFAULT_API_BASE: &str = "https://www.bilibili.com/audio/music-service-c/web";

/// Sent as `Referer` with every request, the audio CDN refuses requests without it
pub const SITE_ORIGIN: &str = "https://www.bilibili.com";

/// Session cookie holding the CSRF token required by mutations
pub const CSRF_COOKIE: &str = "bili_jct";

/// Endpoint urls of the remote api, all relative to one base url
#[derive(Debug, Clone)]
pub struct Endpoints {
  base: String,
}

impl Endpoints {
  pub fn new(base: impl Into<String>) -> Self {
    let base = base.into().trim_end_matches('/').to_string();
    Self { base }
  }

  fn url(&self, path: &str) -> String {
    format!("{}{path}", self.base)
  }

  pub fn account(&self) -> String {
    self.url("/user/info")
  }

  pub fn banner(&self) -> String {
    self.url("/banner")
  }

  pub fn hot_rank(&self) -> String {
    self.url("/menu/hit")
  }

  pub fn all_rank(&self, pn: u32, ps: u32) -> String {
    self.url(&format!("/menu/rank?pn={pn}&ps={ps}"))
  }

  pub fn user_song_menu(&self, pn: u32, ps: u32) -> String {
    self.url(&format!("/collections/list?pn={pn}&ps={ps}"))
  }

  pub fn user_collected_menu(&self, pn: u32, ps: u32) -> String {
    self.url(&format!("/menu/collected?pn={pn}&ps={ps}"))
  }

  pub fn recommend_list(&self, pn: u32, ps: u32) -> String {
    self.url(&format!("/menu/recommend?pn={pn}&ps={ps}"))
  }

  pub fn song_menu(&self, sid: u64, pn: u32, ps: u32) -> String {
    self.url(&format!("/song/of-menu?sid={sid}&pn={pn}&ps={ps}"))
  }

  pub fn song_url(&self, sid: u64) -> String {
    self.url(&format!("/url?sid={sid}&privilege=2&quality=2"))
  }

  /// `POST` stars a menu, `DELETE` with `?sid=` unstars it
  pub fn star_song_menu(&self) -> String {
    self.url("/menu/collect")
  }

  pub fn unstar_song_menu(&self, sid: u64) -> String {
    format!(
      "{}?sid={}",
      self.star_song_menu(),
      urlencoding::encode(&sid.to_string())
    )
  }
}

/// Host a request to `url` is sent to, `None` for unparsable urls
pub fn host_of(url: &str) -> Option<String> {
  let url = Url::parse(url).ok()?;
  url.host_str().map(str::to_string)
}

/// Every response of the site api is wrapped in this envelope
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
  pub code: i64,
  #[serde(default, alias = "msg")]
  pub message: String,
  pub data: Option<T>,
}

impl<T> Envelope<T> {
  /// Fails unless the api reported success
  pub fn check(&self) -> Result<(), ApiError> {
    if self.code == 0 {
      Ok(())
    } else {
      Err(ApiError::Rejected {
        code: self.code,
        message: self.message.clone(),
      })
    }
  }

  pub fn into_data(self) -> Result<T, ApiError> {
    self.check()?;
    self.data.ok_or(ApiError::MissingData)
  }
}

/// One page of a paginated resource
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
  pub cur_page: u32,
  pub page_count: u32,
  #[serde(default)]
  pub data: Vec<T>,
}

/// Stream sources of a single song
#[derive(Debug, Clone, Deserialize)]
pub struct SongSource {
  #[serde(default)]
  pub cdns: Vec<String>,
}

pub fn parse_envelope<T: DeserializeOwned>(data: &str) -> Result<Envelope<T>, ApiError> {
  serde_json::from_str(data).map_err(ApiError::Json)
}

#[cfg(test)]
mod tests {
  use serde_json::Value;

  use super::*;

  #[test]
  fn host_is_extracted_from_urls() {
    assert_eq!(host_of(DEFAULT_API_BASE).as_deref(), Some("www.bilibili.com"));
    assert_eq!(
      host_of("http://user@localhost:8080/api/").as_deref(),
      Some("localhost")
    );
    assert_eq!(
      host_of("https://upos-sz-mirrorkodo.bilivideo.com/song.m4a?e=1").as_deref(),
      Some("upos-sz-mirrorkodo.bilivideo.com")
    );
    assert_eq!(host_of("not a url"), None);
  }

  #[test]
  fn urls_are_joined_without_double_slashes() {
    let endpoints = Endpoints::new("http://localhost/api/");
    assert_eq!(
      endpoints.song_menu(10, 1, 100),
      "http://localhost/api/song/of-menu?sid=10&pn=1&ps=100"
    );
    assert_eq!(
      endpoints.unstar_song_menu(7),
      "http://localhost/api/menu/collect?sid=7"
    );
  }

  #[test]
  fn envelope_reports_rejections() {
    let envelope = parse_envelope::<Value>(r#"{"code":72000000,"msg":"not logged in","data":null}"#)
      .unwrap();

    match envelope.into_data() {
      Err(ApiError::Rejected { code, message }) => {
        assert_eq!(code, 72000000);
        assert_eq!(message, "not logged in");
      }
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn envelope_unwraps_pages() {
    let envelope =
      parse_envelope::<Page<u32>>(r#"{"code":0,"data":{"curPage":1,"pageCount":3,"data":[4,5]}}"#)
        .unwrap();
    let page = envelope.into_data().unwrap();

    assert_eq!(page.cur_page, 1);
    assert_eq!(page.page_count, 3);
    assert_eq!(page.data, vec![4, 5]);
  }

  #[test]
  fn song_menu_pages_hold_tracks() {
    let envelope = parse_envelope::<Page<td_ipc::Track>>(
      r#"{"code":0,"msg":"success","data":{"curPage":1,"pageCount":1,"totalSize":2,"data":[
        {"id":375,"title":"First","uname":"Someone","cover":"http://c/1.jpg","duration":180},
        {"id":376,"title":"Second","uname":"Someone else"}
      ]}}"#,
    )
    .unwrap();
    let page = envelope.into_data().unwrap();

    assert_eq!(page.data.len(), 2);
    assert_eq!(page.data[0].author, "Someone");
    assert_eq!(page.data[1].duration, None);
    assert!(page.data.iter().all(|track| !track.playing));
  }

  #[test]
  fn page_without_data_is_empty() {
    let envelope = parse_envelope::<Page<td_ipc::Track>>(
      r#"{"code":0,"data":{"curPage":1,"pageCount":0}}"#,
    )
    .unwrap();

    assert!(envelope.into_data().unwrap().data.is_empty());
  }

  #[test]
  fn successful_mutation_without_data_passes_check() {
    let envelope = parse_envelope::<Value>(r#"{"code":0,"msg":"success"}"#).unwrap();
    assert!(envelope.check().is_ok());
    assert!(matches!(envelope.into_data(), Err(ApiError::MissingData)));
  }
}
