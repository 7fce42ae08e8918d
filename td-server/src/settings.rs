use std::path::PathBuf;

use clap::Parser;

use crate::data_manager::api::DEFAULT_API_BASE;

/// Audio player daemon for the bilibili music service
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Settings {
  /// Directory the playlist and config are persisted in
  #[arg(long, env = "TD_DATA_DIR")]
  pub data_dir: Option<PathBuf>,

  /// Base url of the remote music api
  #[arg(long, env = "TD_API_BASE", default_value = DEFAULT_API_BASE)]
  pub api_base: String,

  /// Netscape `cookies.txt` holding the site session
  #[arg(long, env = "TD_COOKIES")]
  pub cookies: Option<PathBuf>,

  /// Keep all state in memory, nothing is read from or written to disk
  #[arg(long)]
  pub ephemeral: bool,

  /// Do not fetch the home data on startup
  #[arg(long)]
  pub no_prefetch: bool,
}

impl Settings {
  pub fn data_dir(&self) -> PathBuf {
    self.data_dir.clone().unwrap_or_else(|| {
      dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("tunedock")
    })
  }
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory;

  use super::*;

  #[test]
  fn settings_are_well_formed() {
    Settings::command().debug_assert();
  }

  #[test]
  fn explicit_data_dir_wins() {
    let settings = Settings::parse_from(["td-server", "--data-dir", "/tmp/td", "--ephemeral"]);

    assert_eq!(settings.data_dir(), PathBuf::from("/tmp/td"));
    assert!(settings.ephemeral);
    assert!(!settings.no_prefetch);
  }

  #[test]
  fn default_data_dir_is_namespaced() {
    let settings = Settings {
      data_dir: None,
      api_base: DEFAULT_API_BASE.into(),
      cookies: None,
      ephemeral: false,
      no_prefetch: false,
    };

    assert!(settings.data_dir().ends_with("tunedock"));
  }
}
