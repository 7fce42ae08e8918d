use clap::{Args, Parser, Subcommand};

/// Control a running td-server
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
  #[command(subcommand)]
  pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Resume playback, or play the given song right away
  Play {
    #[arg(long)]
    id: Option<u64>,
    #[arg(long, requires = "id")]
    title: Option<String>,
    #[arg(long, requires = "id")]
    author: Option<String>,
  },
  Pause,
  Next,
  #[command(alias = "previous")]
  Prev,

  /// Print or set the volume (0.0 to 1.0)
  Volume {
    volume: Option<f32>,
  },
  /// Switch to the next play mode
  Mode,
  /// Toggle mute
  Mute,

  State,
  Current,
  #[command(alias = "ls")]
  List,
  Clear,
  /// Add a song to the playlist
  Add {
    #[command(flatten)]
    song: SongArgs,
  },
  /// Remove a song from the playlist
  #[command(alias = "rm")]
  Remove {
    id: u64,
  },

  /// Print the songs of a song menu
  Menu {
    #[command(flatten)]
    menu: MenuArgs,
  },
  /// Replace the playlist with the songs of a song menu
  LoadMenu {
    #[command(flatten)]
    menu: MenuArgs,
  },
  Star {
    menu_id: u64,
  },
  Unstar {
    menu_id: u64,
  },
  /// Print the cached home data as json
  Data,

  /// Print notifications as they happen
  Watch,
  Version,
}

#[derive(Debug, Args)]
pub struct SongArgs {
  #[arg(long)]
  pub id: u64,
  #[arg(long, default_value = "")]
  pub title: String,
  #[arg(long, default_value = "")]
  pub author: String,
}

#[derive(Debug, Args)]
pub struct MenuArgs {
  pub sid: u64,
  /// First page to fetch
  #[arg(long)]
  pub page: Option<u32>,
  #[arg(long)]
  pub page_size: Option<u32>,
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory;

  use super::*;

  #[test]
  fn cli_is_well_formed() {
    Cli::command().debug_assert();
  }

  #[test]
  fn play_takes_an_optional_song() {
    let cli = Cli::parse_from(["td", "play"]);
    assert!(matches!(cli.command, Command::Play { id: None, .. }));

    let cli = Cli::parse_from(["td", "play", "--id", "7", "--title", "x"]);
    assert!(matches!(cli.command, Command::Play { id: Some(7), title: Some(_), .. }));

    assert!(Cli::try_parse_from(["td", "play", "--title", "x"]).is_err());
  }

  #[test]
  fn menus_accept_paging() {
    let cli = Cli::parse_from(["td", "load-menu", "10", "--page-size", "50"]);
    match cli.command {
      Command::LoadMenu { menu } => {
        assert_eq!(menu.sid, 10);
        assert_eq!(menu.page, None);
        assert_eq!(menu.page_size, Some(50));
      }
      other => panic!("unexpected {other:?}"),
    }
  }
}
