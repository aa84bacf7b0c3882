//! Single-writer room store.
//!
//! Holds the room the user is in and its roster. Every mutation goes through
//! a method here; the round machine and the session describe changes as
//! [`RoomUpdate`] values instead of touching fields.
//!
//! # Invariants
//!
//! - At most one roster entry per user id.

use quizwire_proto::payloads::{PlayerInRoom, RoomSnapshot, RoomStatus};
use serde::{Deserialize, Serialize};

/// What happens to a player's entry when they leave mid-match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeavePolicy {
    /// Drop the entry.
    Remove,
    /// Keep the entry with its score, marked departed.
    #[default]
    Freeze,
    /// Keep the entry marked departed, score reset to zero.
    Forfeit,
}

/// A roster entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomPlayer {
    /// Roster entry id.
    pub id: String,
    /// Linked user id.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Avatar reference.
    pub avatar: Option<String>,
    /// Current score.
    pub score: i64,
    /// Left the room while the match was running.
    pub departed: bool,
}

impl From<PlayerInRoom> for RoomPlayer {
    fn from(p: PlayerInRoom) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            name: p.name,
            avatar: p.avatar,
            score: p.score,
            departed: false,
        }
    }
}

/// The room the user is in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Room id.
    pub id: String,
    /// Shareable join code.
    pub code: String,
    /// Host user id.
    pub host_id: String,
    /// Display name.
    pub name: String,
    /// Rounds in the match.
    pub rounds: u32,
    /// Player capacity.
    pub max_players: u32,
    /// Room status.
    pub status: RoomStatus,
    /// Roster, in join order.
    pub players: Vec<RoomPlayer>,
}

/// Partial update of room attributes. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomPatch {
    /// New display name.
    pub name: Option<String>,
    /// New host.
    pub host_id: Option<String>,
    /// New round count.
    pub rounds: Option<u32>,
    /// New capacity.
    pub max_players: Option<u32>,
    /// New status.
    pub status: Option<RoomStatus>,
}

impl RoomPatch {
    /// Patch changing only the status.
    pub fn status(status: RoomStatus) -> Self {
        Self { status: Some(status), ..Self::default() }
    }
}

/// A roster change requested by another component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomUpdate {
    /// Set one player's score.
    SetScore {
        /// Player
        user_id: String,
        /// New score
        score: i64,
    },
    /// Update scores of listed players, adding unknown ones.
    MergeScores(Vec<PlayerInRoom>),
    /// Replace the roster, keeping known avatars.
    ReplacePlayers(Vec<PlayerInRoom>),
    /// Change room attributes.
    Patch(RoomPatch),
}

/// The room store.
#[derive(Debug, Default)]
pub struct RoomStore {
    room: Option<Room>,
    leave_policy: LeavePolicy,
}

impl RoomStore {
    /// Empty store.
    pub fn new(leave_policy: LeavePolicy) -> Self {
        Self { room: None, leave_policy }
    }

    /// Current room.
    pub fn room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    /// Roster entry for `user_id`.
    pub fn player(&self, user_id: &str) -> Option<&RoomPlayer> {
        self.room.as_ref()?.players.iter().find(|p| p.user_id == user_id)
    }

    /// Policy applied by [`RoomStore::player_left`].
    pub fn leave_policy(&self) -> LeavePolicy {
        self.leave_policy
    }

    /// Replace the whole room. Duplicate user ids keep the last entry, and
    /// avatars already known are kept when the snapshot has none.
    pub fn set_room(&mut self, snapshot: RoomSnapshot) {
        let previous = self.room.take();
        let players = merge_roster(previous.as_ref(), snapshot.players);
        self.room = Some(Room {
            id: snapshot.id,
            code: snapshot.code,
            host_id: snapshot.host_id,
            name: snapshot.name,
            rounds: snapshot.rounds,
            max_players: snapshot.max_players,
            status: snapshot.status,
            players,
        });
    }

    /// Apply a partial update. Ignored when no room is set.
    pub fn update_room(&mut self, patch: RoomPatch) {
        let Some(room) = self.room.as_mut() else {
            tracing::debug!("room patch ignored, no room");
            return;
        };
        if let Some(name) = patch.name {
            room.name = name;
        }
        if let Some(host_id) = patch.host_id {
            room.host_id = host_id;
        }
        if let Some(rounds) = patch.rounds {
            room.rounds = rounds;
        }
        if let Some(max_players) = patch.max_players {
            room.max_players = max_players;
        }
        if let Some(status) = patch.status {
            room.status = status;
        }
    }

    /// Forget the room (user left, or navigated away).
    pub fn clear_room(&mut self) {
        self.room = None;
    }

    /// Replace the roster, keeping each user's previous avatar when the
    /// incoming entry has none.
    pub fn set_players(&mut self, players: Vec<PlayerInRoom>) {
        let Some(room) = self.room.as_mut() else {
            return;
        };
        room.players = merge_roster(Some(&*room), players);
    }

    /// Add a player, or refresh the existing entry for the same user id.
    pub fn upsert_player(&mut self, player: PlayerInRoom) {
        let Some(room) = self.room.as_mut() else {
            return;
        };
        match room.players.iter_mut().find(|p| p.user_id == player.user_id) {
            Some(existing) => {
                let avatar = player.avatar.or_else(|| existing.avatar.take());
                existing.id = player.id;
                existing.name = player.name;
                existing.avatar = avatar;
                existing.score = player.score;
                existing.departed = false;
            },
            None => room.players.push(player.into()),
        }
    }

    /// Set scores for listed players. Unknown players are added.
    pub fn apply_scores(&mut self, players: Vec<PlayerInRoom>) {
        let Some(room) = self.room.as_mut() else {
            return;
        };
        for player in players {
            match room.players.iter_mut().find(|p| p.user_id == player.user_id) {
                Some(existing) => existing.score = player.score,
                None => room.players.push(player.into()),
            }
        }
    }

    /// Set one player's score. Unknown players are ignored.
    pub fn set_score(&mut self, user_id: &str, score: i64) {
        if let Some(room) = self.room.as_mut()
            && let Some(player) = room.players.iter_mut().find(|p| p.user_id == user_id)
        {
            player.score = score;
        }
    }

    /// A player left. Before the match starts the entry is always removed;
    /// during or after it the [`LeavePolicy`] decides.
    pub fn player_left(&mut self, user_id: &str) {
        let policy = self.leave_policy;
        let Some(room) = self.room.as_mut() else {
            return;
        };

        if room.status == RoomStatus::NotStarted || policy == LeavePolicy::Remove {
            room.players.retain(|p| p.user_id != user_id);
            return;
        }

        if let Some(player) = room.players.iter_mut().find(|p| p.user_id == user_id) {
            player.departed = true;
            if policy == LeavePolicy::Forfeit {
                player.score = 0;
            }
        }
    }

    /// Apply an update requested by another component.
    pub fn apply(&mut self, update: RoomUpdate) {
        match update {
            RoomUpdate::SetScore { user_id, score } => self.set_score(&user_id, score),
            RoomUpdate::MergeScores(players) => self.apply_scores(players),
            RoomUpdate::ReplacePlayers(players) => self.set_players(players),
            RoomUpdate::Patch(patch) => self.update_room(patch),
        }
    }
}

/// Build a roster from `incoming`, deduplicated by user id (last wins),
/// carrying over avatars and departed flags from `previous`.
fn merge_roster(previous: Option<&Room>, incoming: Vec<PlayerInRoom>) -> Vec<RoomPlayer> {
    let mut roster: Vec<RoomPlayer> = Vec::with_capacity(incoming.len());
    for player in incoming {
        let known = previous.and_then(|r| r.players.iter().find(|p| p.user_id == player.user_id));
        let mut entry = RoomPlayer::from(player);
        if let Some(known) = known {
            if entry.avatar.is_none() {
                entry.avatar.clone_from(&known.avatar);
            }
            entry.departed = known.departed;
        }
        match roster.iter_mut().find(|p| p.user_id == entry.user_id) {
            Some(slot) => *slot = entry,
            None => roster.push(entry),
        }
    }
    roster
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(user_id: &str, score: i64, avatar: Option<&str>) -> PlayerInRoom {
        PlayerInRoom {
            id: format!("p-{user_id}"),
            user_id: user_id.into(),
            name: user_id.to_uppercase(),
            avatar: avatar.map(str::to_string),
            score,
        }
    }

    fn snapshot(status: RoomStatus, players: Vec<PlayerInRoom>) -> RoomSnapshot {
        RoomSnapshot {
            id: "r1".into(),
            code: "123456".into(),
            host_id: "a".into(),
            name: "Friday quiz".into(),
            rounds: 10,
            max_players: 4,
            status,
            players,
        }
    }

    #[test]
    fn set_room_dedupes_by_user() {
        let mut store = RoomStore::default();
        store.set_room(snapshot(RoomStatus::NotStarted, vec![
            player("a", 0, None),
            player("a", 5, None),
            player("b", 0, None),
        ]));
        let room = store.room().unwrap();
        assert_eq!(room.players.len(), 2);
        assert_eq!(store.player("a").unwrap().score, 5);
    }

    #[test]
    fn set_players_keeps_previous_avatar() {
        let mut store = RoomStore::default();
        store.set_room(snapshot(RoomStatus::InProgress, vec![player("a", 0, Some("fox.png"))]));
        store.set_players(vec![player("a", 7, None)]);
        let a = store.player("a").unwrap();
        assert_eq!(a.avatar.as_deref(), Some("fox.png"));
        assert_eq!(a.score, 7);
    }

    #[test]
    fn upsert_adds_then_refreshes() {
        let mut store = RoomStore::default();
        store.set_room(snapshot(RoomStatus::NotStarted, vec![]));
        store.upsert_player(player("b", 0, Some("owl.png")));
        store.upsert_player(player("b", 3, None));
        let room = store.room().unwrap();
        assert_eq!(room.players.len(), 1);
        assert_eq!(room.players[0].avatar.as_deref(), Some("owl.png"));
    }

    #[test]
    fn leave_before_start_always_removes() {
        let mut store = RoomStore::new(LeavePolicy::Freeze);
        store.set_room(snapshot(RoomStatus::NotStarted, vec![player("a", 0, None)]));
        store.player_left("a");
        assert!(store.player("a").is_none());
    }

    #[test]
    fn leave_policies_mid_match() {
        for (policy, expect) in [
            (LeavePolicy::Remove, None),
            (LeavePolicy::Freeze, Some((true, 9))),
            (LeavePolicy::Forfeit, Some((true, 0))),
        ] {
            let mut store = RoomStore::new(policy);
            store.set_room(snapshot(RoomStatus::InProgress, vec![player("a", 9, None)]));
            store.player_left("a");
            assert_eq!(store.player("a").map(|p| (p.departed, p.score)), expect, "{policy:?}");
        }
    }

    #[test]
    fn merge_scores_adds_unknown_players() {
        let mut store = RoomStore::default();
        store.set_room(snapshot(RoomStatus::InProgress, vec![player("a", 1, None)]));
        store.apply(RoomUpdate::MergeScores(vec![player("a", 4, None), player("c", 2, None)]));
        assert_eq!(store.player("a").unwrap().score, 4);
        assert_eq!(store.player("c").unwrap().score, 2);
    }

    #[test]
    fn patch_and_clear() {
        let mut store = RoomStore::default();
        store.update_room(RoomPatch { name: Some("x".into()), ..RoomPatch::default() });
        assert!(store.room().is_none());

        store.set_room(snapshot(RoomStatus::NotStarted, vec![]));
        store.apply(RoomUpdate::Patch(RoomPatch::status(RoomStatus::InProgress)));
        assert_eq!(store.room().unwrap().status, RoomStatus::InProgress);
        assert_eq!(store.room().unwrap().name, "Friday quiz");

        store.clear_room();
        assert!(store.room().is_none());
    }
}
