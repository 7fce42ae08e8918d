use std::collections::HashSet;

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use td_ipc::{PlayMode, Track, TrackId};
use tracing::warn;

/// Outcome of moving the current pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
  /// The pointer moved to another track
  Moved(TrackId),
  /// The pointer stayed, the same track should play again
  Repeat(TrackId),
  /// The end of the playlist was reached, the pointer stayed
  Stopped,
  Empty,
}

impl Advance {
  /// The track that should be loaded next, if any
  pub fn track_id(&self) -> Option<TrackId> {
    match self {
      Advance::Moved(id) | Advance::Repeat(id) => Some(*id),
      Advance::Stopped | Advance::Empty => None,
    }
  }
}

/// Persisted form of a `MediaController`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerSnapshot {
  pub songs: Vec<Track>,
  pub current: Option<TrackId>,
  #[serde(default)]
  pub shuffle_order: Option<Vec<TrackId>>,
  #[serde(default)]
  pub ordered_end: Option<TrackId>,
  #[serde(default)]
  pub random_end: Option<TrackId>,
}

/// The playlist, the current pointer and the shuffle order
///
/// `songs` never holds two tracks with the same id, `current` always refers to one of them,
/// and `shuffle_order` (while present) is a permutation of their ids.
#[derive(Debug, Clone, Default)]
pub struct MediaController {
  songs: Vec<Track>,
  current: Option<TrackId>,
  shuffle_order: Option<Vec<TrackId>>,
}

impl MediaController {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn songs(&self) -> &[Track] {
    &self.songs
  }

  pub fn len(&self) -> usize {
    self.songs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.songs.is_empty()
  }

  pub fn get(&self, id: TrackId) -> Option<&Track> {
    self.songs.iter().find(|track| track.id == id)
  }

  pub fn current_id(&self) -> Option<TrackId> {
    self.current
  }

  pub fn current(&self) -> Option<&Track> {
    self.current.and_then(|id| self.get(id))
  }

  /// Last track in insertion order
  pub fn ordered_end(&self) -> Option<TrackId> {
    self.songs.last().map(|track| track.id)
  }

  /// Last track of the current shuffle pass
  pub fn random_end(&self) -> Option<TrackId> {
    self.shuffle_order.as_ref().and_then(|order| order.last().copied())
  }

  pub fn shuffle_order(&self) -> Option<&[TrackId]> {
    self.shuffle_order.as_deref()
  }

  fn position(&self, id: TrackId) -> Option<usize> {
    self.songs.iter().position(|track| track.id == id)
  }

  fn contains(&self, id: TrackId) -> bool {
    self.position(id).is_some()
  }

  /// Moves the pointer, the `playing` flag never survives a pointer change
  fn point_at(&mut self, id: Option<TrackId>) {
    self.current = id;
    self.mark_playing(false);
  }

  /// Sets the `playing` flag of the current track and clears it everywhere else
  pub fn mark_playing(&mut self, playing: bool) {
    let current = self.current;
    for track in &mut self.songs {
      track.playing = playing && Some(track.id) == current;
    }
  }

  /// Points at `track`, inserting it first if it is not in the playlist
  pub fn set_current(&mut self, track: Track, rng: &mut impl Rng) {
    let id = track.id;
    if !self.contains(id) {
      self.insert(track, rng);
    }

    self.point_at(Some(id));
  }

  /// Adds `track` unless a track with the same id is already present
  pub fn add(&mut self, track: Track, rng: &mut impl Rng) -> &[Track] {
    if !self.contains(track.id) {
      self.insert(track, rng);
    }

    &self.songs
  }

  fn insert(&mut self, mut track: Track, rng: &mut impl Rng) {
    let id = track.id;
    track.playing = false;
    self.songs.push(track);

    // New tracks land somewhere in the unvisited part of the shuffle pass
    let current = self.current;
    if let Some(order) = &mut self.shuffle_order {
      let first_unvisited = current
        .and_then(|current| order.iter().position(|&other| other == current))
        .map_or(0, |position| position + 1);

      let slot = rng.random_range(first_unvisited..=order.len());
      order.insert(slot, id);
    }
  }

  /// Deletes the track `id`
  ///
  /// If it was the current track the pointer moves to the following track,
  /// or the preceding one when it was the last.
  pub fn remove(&mut self, id: TrackId) -> Option<Track> {
    let position = self.position(id)?;
    let track = self.songs.remove(position);

    if let Some(order) = &mut self.shuffle_order {
      order.retain(|&other| other != id);
    }

    if self.current == Some(id) {
      let neighbour = self
        .songs
        .get(position)
        .or_else(|| position.checked_sub(1).and_then(|previous| self.songs.get(previous)))
        .map(|track| track.id);

      self.point_at(neighbour);
    }

    Some(track)
  }

  /// Rebuilds the playlist from `tracks`, the first occurrence of an id wins
  pub fn replace_all(&mut self, tracks: Vec<Track>, rng: &mut impl Rng) {
    let previous = self.current;
    let was_playing = self.current().is_some_and(|track| track.playing);

    self.songs = dedup_tracks(tracks);
    self.point_at(self.songs.first().map(|track| track.id));

    // The output keeps playing a track that stays current
    if was_playing && self.current == previous {
      self.mark_playing(true);
    }

    if self.shuffle_order.take().is_some() {
      self.ensure_shuffle_order(rng);
    }
  }

  /// Empties the playlist, an existing shuffle order stays materialized
  pub fn clear(&mut self) {
    self.songs.clear();
    self.current = None;
    if let Some(order) = &mut self.shuffle_order {
      order.clear();
    }
  }

  /// Creates a shuffle order starting at the current track, unless a valid one exists
  pub fn ensure_shuffle_order(&mut self, rng: &mut impl Rng) {
    if let Some(order) = &self.shuffle_order
      && self.is_permutation(order)
    {
      return;
    }

    let mut order: Vec<TrackId> = self
      .songs
      .iter()
      .map(|track| track.id)
      .filter(|&id| Some(id) != self.current)
      .collect();
    order.shuffle(rng);

    if let Some(current) = self.current {
      order.insert(0, current);
    }

    self.shuffle_order = Some(order);
  }

  pub fn drop_shuffle_order(&mut self) {
    self.shuffle_order = None;
  }

  fn is_permutation(&self, order: &[TrackId]) -> bool {
    let mut seen = HashSet::with_capacity(order.len());
    order.len() == self.songs.len()
      && order
        .iter()
        .all(|&id| self.contains(id) && seen.insert(id))
  }

  /// Starts a new shuffle pass that does not begin with the track that just played
  fn reshuffle(&mut self, rng: &mut impl Rng) -> TrackId {
    let mut order: Vec<TrackId> = self.songs.iter().map(|track| track.id).collect();
    order.shuffle(rng);

    if order.len() > 1 && self.current == order.first().copied() {
      let swap_with = rng.random_range(1..order.len());
      order.swap(0, swap_with);
    }

    let first = order[0];
    self.shuffle_order = Some(order);
    first
  }

  fn first_entry(&mut self, mode: PlayMode, rng: &mut impl Rng) -> Advance {
    let first = if mode == PlayMode::Shuffle {
      self.ensure_shuffle_order(rng);
      self.shuffle_order.as_ref().and_then(|order| order.first().copied())
    } else {
      self.songs.first().map(|track| track.id)
    };

    match first {
      Some(id) => {
        self.point_at(Some(id));
        Advance::Moved(id)
      }
      None => Advance::Empty,
    }
  }

  fn move_to(&mut self, id: TrackId) -> Advance {
    self.point_at(Some(id));
    Advance::Moved(id)
  }

  /// Moves the pointer to the track that follows the current one under `mode`
  pub fn advance(&mut self, mode: PlayMode, rng: &mut impl Rng) -> Advance {
    if self.songs.is_empty() {
      return Advance::Empty;
    }

    let Some((current, position)) = self
      .current
      .and_then(|current| self.position(current).map(|position| (current, position)))
    else {
      return self.first_entry(mode, rng);
    };

    let len = self.songs.len();
    match mode {
      PlayMode::LoopOne => Advance::Repeat(current),
      PlayMode::LoopPlaylist | PlayMode::Shuffle if len == 1 => Advance::Repeat(current),

      PlayMode::Sequential if position + 1 == len => Advance::Stopped,
      PlayMode::Sequential => self.move_to(self.songs[position + 1].id),
      PlayMode::LoopPlaylist => self.move_to(self.songs[(position + 1) % len].id),

      PlayMode::Shuffle => {
        self.ensure_shuffle_order(rng);
        let next = self.shuffle_order.as_ref().and_then(|order| {
          let position = order.iter().position(|&id| id == current)?;
          order.get(position + 1).copied()
        });

        match next {
          Some(id) => self.move_to(id),
          None => {
            let id = self.reshuffle(rng);
            self.move_to(id)
          }
        }
      }
    }
  }

  /// Moves the pointer to the track that precedes the current one under `mode`
  pub fn retreat(&mut self, mode: PlayMode, rng: &mut impl Rng) -> Advance {
    if self.songs.is_empty() {
      return Advance::Empty;
    }

    let Some((current, position)) = self
      .current
      .and_then(|current| self.position(current).map(|position| (current, position)))
    else {
      return self.first_entry(mode, rng);
    };

    let len = self.songs.len();
    match mode {
      PlayMode::LoopOne => Advance::Repeat(current),
      PlayMode::LoopPlaylist | PlayMode::Shuffle if len == 1 => Advance::Repeat(current),

      PlayMode::Sequential if position == 0 => Advance::Stopped,
      PlayMode::Sequential => self.move_to(self.songs[position - 1].id),
      PlayMode::LoopPlaylist => self.move_to(self.songs[(position + len - 1) % len].id),

      PlayMode::Shuffle => {
        self.ensure_shuffle_order(rng);
        let previous = self.shuffle_order.as_ref().and_then(|order| {
          match order.iter().position(|&id| id == current)? {
            0 => order.last().copied(),
            position => order.get(position - 1).copied(),
          }
        });

        match previous {
          Some(id) => self.move_to(id),
          None => Advance::Stopped,
        }
      }
    }
  }

  pub fn snapshot(&self) -> ControllerSnapshot {
    ControllerSnapshot {
      songs: self.songs.clone(),
      current: self.current,
      shuffle_order: self.shuffle_order.clone(),
      ordered_end: self.ordered_end(),
      random_end: self.random_end(),
    }
  }

  /// Restores a persisted controller, repairing whatever no longer holds
  pub fn from_snapshot(snapshot: ControllerSnapshot, rng: &mut impl Rng) -> Self {
    let song_count = snapshot.songs.len();
    let songs = dedup_tracks(snapshot.songs);
    if songs.len() != song_count {
      warn!(
        dropped = song_count - songs.len(),
        "Dropped duplicate tracks from persisted playlist"
      );
    }

    let mut controller = Self {
      current: snapshot
        .current
        .filter(|&id| songs.iter().any(|track| track.id == id)),
      songs,
      shuffle_order: None,
    };
    controller.mark_playing(false);

    if let Some(order) = snapshot.shuffle_order {
      let stale =
        !controller.is_permutation(&order) || order.last().copied() != snapshot.random_end;

      controller.shuffle_order = Some(order);
      if stale {
        warn!("Rebuilding stale shuffle order");
        controller.shuffle_order = None;
        controller.ensure_shuffle_order(rng);
      }
    }

    controller
  }
}

fn dedup_tracks(tracks: Vec<Track>) -> Vec<Track> {
  let mut seen = HashSet::with_capacity(tracks.len());
  tracks
    .into_iter()
    .filter(|track| seen.insert(track.id))
    .map(|mut track| {
      track.playing = false;
      track
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use rand::{SeedableRng, rngs::StdRng};

  use super::*;

  fn rng() -> StdRng {
    StdRng::seed_from_u64(7)
  }

  fn controller(ids: &[TrackId], current: Option<TrackId>) -> MediaController {
    let mut rng = rng();
    let mut controller = MediaController::new();
    controller.replace_all(
      ids.iter().map(|&id| Track::new(id, format!("track {id}"))).collect(),
      &mut rng,
    );
    controller.point_at(current);
    controller
  }

  #[test]
  fn loop_playlist_wraps_back_to_start() {
    let mut rng = rng();
    for len in 1..6 {
      let ids: Vec<TrackId> = (1..=len).collect();
      let mut controller = controller(&ids, Some(1));

      for _ in 0..len {
        controller.advance(PlayMode::LoopPlaylist, &mut rng);
      }
      assert_eq!(controller.current_id(), Some(1));
    }
  }

  #[test]
  fn sequential_stops_at_the_last_track() {
    let mut rng = rng();
    let mut controller = controller(&[1, 2, 3], Some(3));

    assert_eq!(controller.advance(PlayMode::Sequential, &mut rng), Advance::Stopped);
    assert_eq!(controller.current_id(), Some(3));

    assert_eq!(
      controller.advance(PlayMode::LoopPlaylist, &mut rng),
      Advance::Moved(1)
    );
    assert_eq!(controller.current_id(), Some(1));
  }

  #[test]
  fn sequential_walks_through_once() {
    let mut rng = rng();
    let mut controller = controller(&[1, 2, 3], Some(1));

    assert_eq!(controller.advance(PlayMode::Sequential, &mut rng), Advance::Moved(2));
    assert_eq!(controller.advance(PlayMode::Sequential, &mut rng), Advance::Moved(3));
    assert_eq!(controller.advance(PlayMode::Sequential, &mut rng), Advance::Stopped);
  }

  #[test]
  fn retreat_mirrors_advance() {
    let mut rng = rng();
    let mut controller = controller(&[1, 2, 3], Some(1));

    assert_eq!(controller.retreat(PlayMode::Sequential, &mut rng), Advance::Stopped);
    assert_eq!(controller.retreat(PlayMode::LoopPlaylist, &mut rng), Advance::Moved(3));
    assert_eq!(controller.retreat(PlayMode::Sequential, &mut rng), Advance::Moved(2));
    assert_eq!(controller.retreat(PlayMode::LoopOne, &mut rng), Advance::Repeat(2));
  }

  #[test]
  fn loop_one_repeats() {
    let mut rng = rng();
    let mut controller = controller(&[1, 2], Some(2));

    assert_eq!(controller.advance(PlayMode::LoopOne, &mut rng), Advance::Repeat(2));
    assert_eq!(controller.current_id(), Some(2));
  }

  #[test]
  fn single_track_repeats_when_looping() {
    let mut rng = rng();
    let mut controller = controller(&[1], Some(1));

    assert_eq!(controller.advance(PlayMode::LoopPlaylist, &mut rng), Advance::Repeat(1));
    assert_eq!(controller.advance(PlayMode::Shuffle, &mut rng), Advance::Repeat(1));
    assert_eq!(controller.advance(PlayMode::Sequential, &mut rng), Advance::Stopped);
  }

  #[test]
  fn empty_playlist_cannot_advance() {
    let mut rng = rng();
    let mut controller = MediaController::new();

    assert_eq!(controller.advance(PlayMode::LoopPlaylist, &mut rng), Advance::Empty);
    assert_eq!(controller.retreat(PlayMode::Shuffle, &mut rng), Advance::Empty);
  }

  #[test]
  fn advance_without_pointer_starts_at_the_first_track() {
    let mut rng = rng();
    let mut controller = controller(&[4, 5], None);

    assert_eq!(controller.advance(PlayMode::Sequential, &mut rng), Advance::Moved(4));
  }

  #[test]
  fn removing_current_moves_to_a_neighbour() {
    let mut controller = controller(&[1, 2, 3], Some(2));

    assert_eq!(controller.remove(2).map(|track| track.id), Some(2));
    assert_eq!(controller.current_id(), Some(3));

    controller.remove(3);
    assert_eq!(controller.current_id(), Some(1));

    controller.remove(1);
    assert_eq!(controller.current_id(), None);
    assert!(controller.is_empty());
  }

  #[test]
  fn removing_current_never_dangles() {
    let mut rng = rng();
    for len in 2..6 {
      for current in 1..=len {
        let ids: Vec<TrackId> = (1..=len).collect();
        let mut controller = controller(&ids, Some(current));
        controller.ensure_shuffle_order(&mut rng);

        controller.remove(current);
        let pointer = controller.current_id().unwrap();
        assert!(controller.get(pointer).is_some());
        assert_eq!(controller.shuffle_order().unwrap().len(), controller.len());
      }
    }
  }

  #[test]
  fn removing_unknown_track_is_a_no_op() {
    let mut controller = controller(&[1, 2], Some(1));

    assert_eq!(controller.remove(9), None);
    assert_eq!(controller.len(), 2);
    assert_eq!(controller.current_id(), Some(1));
  }

  #[test]
  fn add_is_idempotent() {
    let mut rng = rng();
    let mut controller = controller(&[1], Some(1));

    assert_eq!(controller.add(Track::new(2, "b"), &mut rng).len(), 2);
    assert_eq!(controller.add(Track::new(2, "other title"), &mut rng).len(), 2);
    assert_eq!(controller.get(2).unwrap().title, "b");
  }

  #[test]
  fn set_current_inserts_and_clears_playing() {
    let mut rng = rng();
    let mut controller = controller(&[1, 2], Some(1));
    controller.mark_playing(true);
    assert!(controller.current().unwrap().playing);

    controller.set_current(Track::new(3, "c"), &mut rng);
    assert_eq!(controller.current_id(), Some(3));
    assert_eq!(controller.len(), 3);
    assert!(controller.songs().iter().all(|track| !track.playing));
  }

  #[test]
  fn replace_all_drops_duplicates() {
    let mut rng = rng();
    let mut controller = MediaController::new();

    controller.replace_all(
      vec![Track::new(1, "a"), Track::new(2, "b"), Track::new(1, "again")],
      &mut rng,
    );
    assert_eq!(controller.len(), 2);
    assert_eq!(controller.get(1).unwrap().title, "a");
    assert_eq!(controller.current_id(), Some(1));

    controller.replace_all(vec![], &mut rng);
    assert_eq!(controller.current_id(), None);
  }

  #[test]
  fn replace_all_keeps_the_playing_flag_of_a_kept_current_track() {
    let mut rng = rng();
    let mut controller = controller(&[1, 2], Some(1));
    controller.mark_playing(true);

    controller.replace_all(vec![Track::new(1, "a"), Track::new(3, "c")], &mut rng);
    assert!(controller.current().unwrap().playing);

    controller.replace_all(vec![Track::new(3, "c"), Track::new(1, "a")], &mut rng);
    assert_eq!(controller.current_id(), Some(3));
    assert!(controller.songs().iter().all(|track| !track.playing));
  }

  #[test]
  fn shuffle_pass_visits_every_track_once() {
    let mut rng = rng();
    let ids: Vec<TrackId> = (1..=8).collect();
    let mut controller = controller(&ids, Some(1));
    controller.ensure_shuffle_order(&mut rng);
    assert_eq!(controller.shuffle_order().unwrap()[0], 1);

    let mut visited = vec![1];
    for _ in 1..ids.len() {
      let id = controller.advance(PlayMode::Shuffle, &mut rng).track_id().unwrap();
      visited.push(id);
    }

    let mut sorted = visited.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, ids);
    assert_eq!(controller.random_end(), visited.last().copied());

    // Exhausted pass reshuffles without repeating the last track
    let last = controller.current_id();
    let next = controller.advance(PlayMode::Shuffle, &mut rng);
    assert_ne!(next.track_id(), last);
    assert_eq!(controller.shuffle_order().unwrap()[0], next.track_id().unwrap());
  }

  #[test]
  fn shuffle_retreat_wraps_to_random_end() {
    let mut rng = rng();
    let mut controller = controller(&[1, 2, 3, 4], Some(1));
    controller.ensure_shuffle_order(&mut rng);

    let random_end = controller.random_end().unwrap();
    assert_eq!(controller.retreat(PlayMode::Shuffle, &mut rng), Advance::Moved(random_end));
  }

  #[test]
  fn added_tracks_join_the_unvisited_part_of_the_pass() {
    let mut rng = rng();
    let mut controller = controller(&[1, 2, 3], Some(1));
    controller.ensure_shuffle_order(&mut rng);
    controller.advance(PlayMode::Shuffle, &mut rng);
    let current = controller.current_id().unwrap();

    controller.add(Track::new(10, "new"), &mut rng);

    let order = controller.shuffle_order().unwrap();
    let current_position = order.iter().position(|&id| id == current).unwrap();
    let new_position = order.iter().position(|&id| id == 10).unwrap();
    assert!(new_position > current_position);
    assert_eq!(order.len(), 4);
  }

  #[test]
  fn snapshot_round_trips() {
    let mut rng = rng();
    let mut controller = controller(&[1, 2, 3], Some(2));
    controller.ensure_shuffle_order(&mut rng);

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.ordered_end, Some(3));
    assert_eq!(snapshot.random_end, controller.random_end());

    let json = serde_json::to_string(&snapshot).unwrap();
    let parsed: ControllerSnapshot = serde_json::from_str(&json).unwrap();
    let restored = MediaController::from_snapshot(parsed, &mut rng);

    assert_eq!(restored.snapshot(), snapshot);
  }

  #[test]
  fn restore_repairs_invalid_snapshots() {
    let mut rng = rng();
    let mut playing = Track::new(1, "a");
    playing.playing = true;

    let snapshot = ControllerSnapshot {
      songs: vec![playing, Track::new(2, "b"), Track::new(1, "dup")],
      current: Some(1),
      shuffle_order: Some(vec![2, 9]),
      ordered_end: Some(1),
      random_end: Some(9),
    };

    let restored = MediaController::from_snapshot(snapshot, &mut rng);
    assert_eq!(restored.len(), 2);
    assert!(!restored.current().unwrap().playing);

    let order = restored.shuffle_order().unwrap();
    assert_eq!(order[0], 1);
    assert_eq!(order.len(), 2);

    let dangling = ControllerSnapshot {
      songs: vec![Track::new(1, "a")],
      current: Some(5),
      ..Default::default()
    };
    assert_eq!(MediaController::from_snapshot(dangling, &mut rng).current_id(), None);
  }
}
