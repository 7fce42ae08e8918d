use std::{
  fs, io,
  path::{Path, PathBuf},
  time::{SystemTime, UNIX_EPOCH},
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CookieError {
  #[error("Failed to read cookie file {path}: {source}")]
  Read { path: PathBuf, source: io::Error },

  #[error("Malformed cookie file, line {line}: {reason}")]
  Malformed { line: usize, reason: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
  pub domain: String,
  pub path: String,
  pub secure: bool,
  /// Unix seconds, `None` for session cookies
  pub expires: Option<u64>,
  pub name: String,
  pub value: String,
}

impl Cookie {
  pub fn is_expired(&self, now: u64) -> bool {
    self.expires.is_some_and(|expires| expires <= now)
  }

  fn matches_host(&self, host: &str) -> bool {
    let domain = self.domain.trim_start_matches('.');
    host == domain
      || host
        .strip_suffix(domain)
        .is_some_and(|prefix| prefix.ends_with('.'))
  }
}

/// Session cookies exported from a browser in the Netscape `cookies.txt` format
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
  cookies: Vec<Cookie>,
}

impl CookieJar {
  pub fn load(path: &Path) -> Result<Self, CookieError> {
    let text = fs::read_to_string(path).map_err(|source| CookieError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    Self::parse_netscape(&text)
  }

  pub fn parse_netscape(text: &str) -> Result<Self, CookieError> {
    const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

    let mut cookies = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
      let line_number = index + 1;
      let line = raw_line.trim_end_matches('\r');

      // HttpOnly cookies are written as comments by most exporters
      let line = match line.strip_prefix(HTTP_ONLY_PREFIX) {
        Some(line) => line,
        None if line.starts_with('#') || line.trim().is_empty() => continue,
        None => line,
      };

      let fields: Vec<&str> = line.split('\t').collect();
      let [domain, _include_subdomains, path, secure, expires, name, value] = fields[..] else {
        return Err(CookieError::Malformed {
          line: line_number,
          reason: "expected 7 tab separated fields",
        });
      };

      let expires: u64 = expires.parse().map_err(|_| CookieError::Malformed {
        line: line_number,
        reason: "expiration is not a unix timestamp",
      })?;

      cookies.push(Cookie {
        domain: domain.into(),
        path: path.into(),
        secure: secure.eq_ignore_ascii_case("TRUE"),
        expires: (expires != 0).then_some(expires),
        name: name.into(),
        value: value.into(),
      });
    }

    Ok(Self { cookies })
  }

  pub fn is_empty(&self) -> bool {
    self.cookies.is_empty()
  }

  /// Value of the unexpired cookie `name`
  pub fn get(&self, name: &str, now: u64) -> Option<&str> {
    self
      .cookies
      .iter()
      .find(|cookie| cookie.name == name && !cookie.is_expired(now))
      .map(|cookie| cookie.value.as_str())
  }

  /// Value of the cookie `name` if it carries an expiry that has not passed yet
  pub fn get_expiring(&self, name: &str, now: u64) -> Option<&str> {
    self
      .cookies
      .iter()
      .find(|cookie| cookie.name == name && cookie.expires.is_some_and(|expires| expires > now))
      .map(|cookie| cookie.value.as_str())
  }

  /// `Cookie` header value for requests to `host`
  pub fn header_for(&self, host: &str, now: u64) -> Option<String> {
    let header = self
      .cookies
      .iter()
      .filter(|cookie| cookie.matches_host(host) && !cookie.is_expired(now))
      .map(|cookie| format!("{}={}", cookie.name, cookie.value))
      .collect::<Vec<_>>()
      .join("; ");

    (!header.is_empty()).then_some(header)
  }
}

pub fn unix_now() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|duration| duration.as_secs())
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;

  const JAR: &str = "# Netscape HTTP Cookie File\n\
    .bilibili.com\tTRUE\t/\tFALSE\t2000000000\tbili_jct\tcsrf-token\n\
    #HttpOnly_.bilibili.com\tTRUE\t/\tTRUE\t2000000000\tSESSDATA\tsession\n\
    .example.com\tTRUE\t/\tFALSE\t0\tother\tx\n\
    .bilibili.com\tTRUE\t/\tFALSE\t1000\told\ty\n";

  #[test]
  fn parses_netscape_format() {
    let jar = CookieJar::parse_netscape(JAR).unwrap();

    assert_eq!(jar.get("bili_jct", 1_500_000_000), Some("csrf-token"));
    assert_eq!(jar.get("SESSDATA", 1_500_000_000), Some("session"));
    // Session cookies never expire
    assert_eq!(jar.get("other", u64::MAX), Some("x"));
  }

  #[test]
  fn expired_cookies_are_ignored() {
    let jar = CookieJar::parse_netscape(JAR).unwrap();

    assert_eq!(jar.get("old", 999), Some("y"));
    assert_eq!(jar.get("old", 1000), None);
    assert_eq!(jar.get("bili_jct", 2_000_000_001), None);
  }

  #[test]
  fn expiring_lookup_skips_session_cookies() {
    let jar = CookieJar::parse_netscape(JAR).unwrap();

    assert_eq!(jar.get_expiring("bili_jct", 1_500_000_000), Some("csrf-token"));
    assert_eq!(jar.get_expiring("bili_jct", 2_000_000_000), None);
    assert_eq!(jar.get_expiring("other", 0), None);
  }

  #[test]
  fn header_only_includes_matching_domains() {
    let jar = CookieJar::parse_netscape(JAR).unwrap();

    assert_eq!(
      jar.header_for("www.bilibili.com", 1_500_000_000).as_deref(),
      Some("bili_jct=csrf-token; SESSDATA=session")
    );
    assert_eq!(jar.header_for("notbilibili.com", 1_500_000_000), None);
    assert_eq!(jar.header_for("example.com", 0).as_deref(), Some("other=x"));
  }

  #[test]
  fn malformed_lines_are_rejected() {
    let error = CookieJar::parse_netscape("# header\n.a.com\tTRUE\t/\n").unwrap_err();
    assert!(matches!(error, CookieError::Malformed { line: 2, .. }));

    let error =
      CookieJar::parse_netscape(".a.com\tTRUE\t/\tFALSE\tsoon\tname\tvalue\n").unwrap_err();
    assert!(matches!(error, CookieError::Malformed { line: 1, .. }));
  }
}
