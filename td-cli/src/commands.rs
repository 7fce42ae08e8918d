use td_ipc::{Event, Notification, PlayMode, PlayerState, Track, requests};

use crate::cli::{Cli, Command, MenuArgs, SongArgs};
use crate::ipc::{send_request, subscribe};

fn song(SongArgs { id, title, author }: SongArgs) -> Track {
  Track::new(id, title).with_author(author)
}

fn describe(track: &Track) -> String {
  match (track.title.is_empty(), track.author.is_empty()) {
    (true, _) => format!("#{}", track.id),
    (false, true) => format!("{} (#{})", track.title, track.id),
    (false, false) => format!("{} - {} (#{})", track.title, track.author, track.id),
  }
}

fn print_song_list(current: Option<&Track>, song_list: &[Track]) {
  for track in song_list {
    let marker = if current.is_some_and(|current| current.id == track.id) {
      ">"
    } else {
      "|"
    };

    println!("{marker} {}", describe(track));
  }
}

fn play_mode_name(mode: PlayMode) -> &'static str {
  match mode {
    PlayMode::Sequential => "sequential",
    PlayMode::LoopPlaylist => "loop playlist",
    PlayMode::LoopOne => "loop one",
    PlayMode::Shuffle => "shuffle",
  }
}

fn fetch_menu(MenuArgs { sid, page, page_size }: MenuArgs) -> Result<Vec<Track>, crate::Error> {
  send_request(requests::GetSongMenu {
    sid,
    pn: page,
    ps: page_size,
  })
}

fn print_notification(Notification { from, event }: Notification) {
  let from = format!("{from:?}");

  match event {
    Event::LoadStart { song, .. } => {
      println!("[{from}] loading {}", song.as_ref().map(describe).unwrap_or_default())
    }
    Event::Play { song, .. } => {
      println!("[{from}] playing {}", song.as_ref().map(describe).unwrap_or_default())
    }
    Event::Pause { .. } => println!("[{from}] paused"),
    Event::Ended { song, .. } => match song {
      Some(song) => println!("[{from}] ended, next is {}", describe(&song)),
      None => println!("[{from}] ended"),
    },
    Event::VolumeChange { volume } => println!("[{from}] volume {volume}"),
    Event::ModifySongListSuccessfully { song_list, .. }
    | Event::AddSongSuccessfully { song_list, .. }
    | Event::DeleteSongSuccessfully { song_list, .. } => {
      println!("[{from}] playlist has {} songs", song_list.len())
    }
    Event::HideMediaList => println!("[{from}] hide media list"),
    Event::StarSongMenuSuccessfully { .. } => println!("[{from}] starred song menu"),
    Event::UnStarSongMenuSuccessfully { .. } => println!("[{from}] unstarred song menu"),
  }
}

pub fn handle_command(command: Cli) -> Result<(), crate::Error> {
  match command.command {
    Command::Play { id, title, author } => match id {
      Some(id) => send_request(requests::SetSong {
        song: Track::new(id, title.unwrap_or_default()).with_author(author.unwrap_or_default()),
      })?,
      None => send_request(requests::Play {})?,
    },
    Command::Pause => send_request(requests::Pause {})?,
    Command::Next => send_request(requests::SetNextSong {})?,
    Command::Prev => send_request(requests::SetPrevSong {})?,

    Command::Volume { volume } => {
      if let Some(volume) = volume {
        send_request(requests::SetVolume { volume })?
      } else {
        let config = send_request(requests::GetConfig {})?;
        println!("Volume: {}", config.volume);
      }
    }
    Command::Mode => {
      let mode = send_request(requests::SwitchPlayMode {})?;
      println!("Play mode: {}", play_mode_name(mode));
    }
    Command::Mute => {
      let muted = send_request(requests::SetMeted {})?;
      println!("Muted: {}", if muted { "on" } else { "off" });
    }

    Command::State => {
      let state = send_request(requests::GetPlayerState {})?;
      match state {
        PlayerState::Empty => println!("State: empty"),
        PlayerState::Paused => println!("State: paused"),
        PlayerState::Playing => println!("State: playing"),
      }
    }
    Command::Current => match send_request(requests::GetCurrentSong {})? {
      Some(track) => println!("{}", describe(&track)),
      None => println!("Nothing is loaded"),
    },
    Command::List => {
      let list = send_request(requests::GetSongList {})?;
      print_song_list(list.song.as_ref(), &list.song_list);
    }
    Command::Clear => send_request(requests::ClearSongList {})?,
    Command::Add { song: args } => {
      let song_list = send_request(requests::AddSong { song: song(args) })?;
      println!("Playlist has {} songs", song_list.len());
    }
    Command::Remove { id } => send_request(requests::DeleteSong {
      song: Track::new(id, ""),
    })?,

    Command::Menu { menu } => {
      let songs = fetch_menu(menu)?;
      print_song_list(None, &songs);
    }
    Command::LoadMenu { menu } => {
      let songs = fetch_menu(menu)?;
      let count = songs.len();
      send_request(requests::SetSongList { song_list: songs })?;
      println!("Loaded {count} songs");
    }
    Command::Star { menu_id } => send_request(requests::StarSongMenu {
      song_menu: td_ipc::SongMenuRef { menu_id },
    })?,
    Command::Unstar { menu_id } => send_request(requests::UnStarSongMenu {
      song_menu: td_ipc::SongMenuRef { menu_id },
    })?,
    Command::Data => {
      let data = send_request(requests::GetData {})?;
      let json = serde_json::to_string_pretty(&data).map_err(crate::Error::Deserialize)?;
      println!("{json}");
    }

    Command::Watch => subscribe(print_notification)?,
    Command::Version => {
      let version = send_request(requests::GetVersion {})?;
      println!("td-server {}", version.0);
      println!("td {}", td_ipc::version().0);
    }
  };

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tracks_are_described_with_what_is_known() {
    assert_eq!(describe(&Track::new(3, "")), "#3");
    assert_eq!(describe(&Track::new(3, "Song")), "Song (#3)");
    assert_eq!(
      describe(&Track::new(3, "Song").with_author("Someone")),
      "Song - Someone (#3)"
    );
  }
}
