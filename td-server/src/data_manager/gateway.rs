use std::{io::Read, time::Duration};

use serde::de::DeserializeOwned;
use serde_json::Value;
use td_ipc::Track;
use tracing::debug;

use super::{
  ApiError,
  api::{self, Endpoints, Page, SongSource},
  cookies::{CookieJar, unix_now},
};

/// Largest audio file that will be buffered for playback
const MAX_AUDIO_BYTES: u64 = 256 * 1024 * 1024;

/// Accumulates every page of a paginated resource, starting at `first_page`
///
/// Pages are requested until `curPage >= pageCount`.
/// Any failed page fails the whole collection, there is no partial result.
pub async fn collect_pages<T, F, Fut>(
  first_page: u32,
  page_size: u32,
  mut fetch_page: F,
) -> Result<Vec<T>, ApiError>
where
  F: FnMut(u32, u32) -> Fut,
  Fut: Future<Output = Result<Page<T>, ApiError>>,
{
  let mut items = Vec::new();
  let mut page_number = first_page;

  loop {
    let page = fetch_page(page_number, page_size).await?;
    items.extend(page.data);

    if page.cur_page >= page.page_count {
      return Ok(items);
    }

    page_number += 1;
  }
}

/// Blocking http client for the remote api, every call is moved off the executor
#[derive(Debug, Clone)]
pub struct Gateway {
  agent: ureq::Agent,
  endpoints: Endpoints,
  cookies: CookieJar,
}

impl Gateway {
  pub fn new(endpoints: Endpoints, cookies: CookieJar) -> Self {
    let agent = ureq::AgentBuilder::new()
      .timeout_connect(Duration::from_secs(5))
      .timeout_read(Duration::from_secs(15))
      .timeout_write(Duration::from_secs(15))
      .build();

    Self {
      agent,
      endpoints,
      cookies,
    }
  }

  /// The CSRF token, `None` if it is missing, session only or has expired
  pub fn csrf_token(&self) -> Option<String> {
    self
      .cookies
      .get_expiring(api::CSRF_COOKIE, unix_now())
      .map(str::to_string)
  }

  fn request(&self, method: &str, url: &str) -> ureq::Request {
    let request = self
      .agent
      .request(method, url)
      .set("Referer", api::SITE_ORIGIN);

    let cookie = api::host_of(url).and_then(|host| self.cookies.header_for(&host, unix_now()));
    match cookie {
      Some(cookie) => request.set("Cookie", &cookie),
      None => request,
    }
  }

  fn call_blocking<T: DeserializeOwned>(
    request: ureq::Request,
    body: Option<Body>,
  ) -> Result<api::Envelope<T>, ApiError> {
    let url = request.url().to_string();

    let response = match body {
      None => request.call(),
      Some(Body::Form(fields)) => {
        let fields: Vec<(&str, &str)> = fields
          .iter()
          .map(|(name, value)| (*name, value.as_str()))
          .collect();
        request.send_form(&fields)
      }
      Some(Body::UrlEncoded(body)) => request
        .set("Content-Type", "application/x-www-form-urlencoded")
        .send_string(&body),
    }
    .map_err(|error| ApiError::Http(Box::new(error)))?;

    debug!(url, status = response.status(), "api response");

    let data = response.into_string().map_err(ApiError::Body)?;
    api::parse_envelope(&data)
  }

  async fn send<T: DeserializeOwned + Send + 'static>(
    &self,
    method: &str,
    url: String,
    body: Option<Body>,
  ) -> Result<api::Envelope<T>, ApiError> {
    let request = self.request(method, &url);
    smol::unblock(move || Self::call_blocking(request, body)).await
  }

  async fn get_data<T: DeserializeOwned + Send + 'static>(&self, url: String) -> Result<T, ApiError> {
    self.send::<T>("GET", url, None).await?.into_data()
  }

  pub async fn account(&self) -> Result<Value, ApiError> {
    self.get_data(self.endpoints.account()).await
  }

  pub async fn banner(&self) -> Result<Value, ApiError> {
    self.get_data(self.endpoints.banner()).await
  }

  pub async fn hot_rank(&self) -> Result<Value, ApiError> {
    self.get_data(self.endpoints.hot_rank()).await
  }

  pub async fn all_rank(&self) -> Result<Vec<Value>, ApiError> {
    collect_pages(1, 5, |pn, ps| self.get_data(self.endpoints.all_rank(pn, ps))).await
  }

  pub async fn user_song_menu(&self) -> Result<Vec<Value>, ApiError> {
    collect_pages(1, 5, |pn, ps| {
      self.get_data(self.endpoints.user_song_menu(pn, ps))
    })
    .await
  }

  pub async fn user_collected_menu(&self) -> Result<Vec<Value>, ApiError> {
    collect_pages(1, 5, |pn, ps| {
      self.get_data(self.endpoints.user_collected_menu(pn, ps))
    })
    .await
  }

  pub async fn recommend_list(&self) -> Result<Vec<Value>, ApiError> {
    collect_pages(1, 10, |pn, ps| {
      self.get_data(self.endpoints.recommend_list(pn, ps))
    })
    .await
  }

  /// Songs of the song menu `sid`, starting at page `pn`
  pub async fn song_menu(&self, sid: u64, pn: u32, ps: u32) -> Result<Vec<Track>, ApiError> {
    collect_pages(pn, ps, |pn, ps| {
      self.get_data(self.endpoints.song_menu(sid, pn, ps))
    })
    .await
  }

  /// First stream url of the song `sid`
  pub async fn song_url(&self, sid: u64) -> Result<String, ApiError> {
    let source: SongSource = self.get_data(self.endpoints.song_url(sid)).await?;
    source
      .cdns
      .into_iter()
      .next()
      .ok_or(ApiError::NoSource(sid))
  }

  /// Downloads a whole audio stream into memory
  pub async fn fetch_audio(&self, url: String) -> Result<Vec<u8>, ApiError> {
    let request = self.request("GET", &url);

    smol::unblock(move || {
      let response = request
        .call()
        .map_err(|error| ApiError::Http(Box::new(error)))?;

      let mut bytes = Vec::new();
      response
        .into_reader()
        .take(MAX_AUDIO_BYTES)
        .read_to_end(&mut bytes)
        .map_err(ApiError::Body)?;

      debug!(url, len = bytes.len(), "downloaded audio");
      Ok(bytes)
    })
    .await
  }

  pub async fn star_song_menu(&self, sid: u64, csrf: &str) -> Result<(), ApiError> {
    let form = vec![("sid", sid.to_string()), ("csrf", csrf.to_string())];

    self
      .send::<Value>("POST", self.endpoints.star_song_menu(), Some(Body::Form(form)))
      .await?
      .check()
  }

  pub async fn unstar_song_menu(&self, sid: u64, csrf: &str) -> Result<(), ApiError> {
    let body = format!("csrf={}", urlencoding::encode(csrf));

    self
      .send::<Value>(
        "DELETE",
        self.endpoints.unstar_song_menu(sid),
        Some(Body::UrlEncoded(body)),
      )
      .await?
      .check()
  }
}

enum Body {
  Form(Vec<(&'static str, String)>),
  UrlEncoded(String),
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;

  use super::*;

  fn page<T>(cur_page: u32, page_count: u32, data: Vec<T>) -> Page<T> {
    Page {
      cur_page,
      page_count,
      data,
    }
  }

  #[test]
  fn pages_are_accumulated_in_order() {
    let requested = RefCell::new(Vec::new());

    let items = smol::block_on(collect_pages(1, 5, |pn, ps| {
      requested.borrow_mut().push((pn, ps));
      let result = match pn {
        1 => Ok(page(1, 2, vec!["x"])),
        2 => Ok(page(2, 2, vec!["y"])),
        _ => Err(ApiError::MissingData),
      };
      async move { result }
    }))
    .unwrap();

    assert_eq!(items, vec!["x", "y"]);
    assert_eq!(*requested.borrow(), vec![(1, 5), (2, 5)]);
  }

  #[test]
  fn single_page_stops_immediately() {
    let calls = RefCell::new(0);

    let items = smol::block_on(collect_pages(1, 10, |_, _| {
      *calls.borrow_mut() += 1;
      async { Ok(page(1, 1, vec![1, 2, 3])) }
    }))
    .unwrap();

    assert_eq!(items, vec![1, 2, 3]);
    assert_eq!(*calls.borrow(), 1);
  }

  #[test]
  fn empty_resource_has_no_pages() {
    let items: Vec<u32> =
      smol::block_on(collect_pages(1, 5, |_, _| async { Ok(page(1, 0, vec![])) })).unwrap();

    assert!(items.is_empty());
  }

  #[test]
  fn failed_page_rejects_the_whole_collection() {
    let result = smol::block_on(collect_pages(1, 5, |pn, _| async move {
      if pn == 1 {
        Ok(page(1, 3, vec!["x"]))
      } else {
        Err(ApiError::Rejected {
          code: -404,
          message: "gone".into(),
        })
      }
    }));

    assert!(matches!(result, Err(ApiError::Rejected { code: -404, .. })));
  }

  #[test]
  fn csrf_token_comes_from_the_jar() {
    let jar = CookieJar::parse_netscape(
      ".bilibili.com\tTRUE\t/\tFALSE\t4000000000\tbili_jct\ttoken\n",
    )
    .unwrap();

    let gateway = Gateway::new(Endpoints::new(api::DEFAULT_API_BASE), jar);
    assert_eq!(gateway.csrf_token().as_deref(), Some("token"));

    let gateway = Gateway::new(Endpoints::new(api::DEFAULT_API_BASE), CookieJar::default());
    assert_eq!(gateway.csrf_token(), None);
  }

  #[test]
  fn session_only_csrf_token_is_rejected() {
    let jar = CookieJar::parse_netscape(
      ".bilibili.com\tTRUE\t/\tFALSE\t0\tbili_jct\ttoken\n",
    )
    .unwrap();

    let gateway = Gateway::new(Endpoints::new(api::DEFAULT_API_BASE), jar);
    assert_eq!(gateway.csrf_token(), None);
  }

  #[test]
  fn cookies_are_only_sent_to_matching_hosts() {
    let jar = CookieJar::parse_netscape(
      ".bilibili.com\tTRUE\t/\tFALSE\t4000000000\tSESSDATA\tsecret\n",
    )
    .unwrap();
    let gateway = Gateway::new(Endpoints::new(api::DEFAULT_API_BASE), jar);

    let api_request = gateway.request("GET", &gateway.endpoints.banner());
    assert_eq!(api_request.header("Cookie"), Some("SESSDATA=secret"));

    let cdn_request = gateway.request("GET", "https://upos-sz-mirrorkodo.bilivideo.com/song.m4a");
    assert_eq!(cdn_request.header("Cookie"), None);
    assert_eq!(cdn_request.header("Referer"), Some(api::SITE_ORIGIN));
  }
}
