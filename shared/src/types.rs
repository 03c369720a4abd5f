//! Protocol-level enums shared between the server and its clients.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Room game mode; determines the player cap (2 or 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    #[serde(rename = "1v1")]
    OneVsOne,
    #[serde(rename = "2v2")]
    TwoVsTwo,
}

impl GameMode {
    pub fn max_players(self) -> usize {
        match self {
            GameMode::OneVsOne => 2,
            GameMode::TwoVsTwo => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Active,
    Finished,
}

/// One of the two room teams. Serialized as the bare numbers 1 and 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    One,
    Two,
}

impl Team {
    pub fn number(self) -> u8 {
        match self {
            Team::One => 1,
            Team::Two => 2,
        }
    }

    pub fn from_number(n: u8) -> Option<Team> {
        match n {
            1 => Some(Team::One),
            2 => Some(Team::Two),
            _ => None,
        }
    }

    /// The chip color the server assigns: team 1 plays green, team 2 blue.
    pub fn color(self) -> TeamColor {
        match self {
            Team::One => TeamColor::Green,
            Team::Two => TeamColor::Blue,
        }
    }

    pub fn other(self) -> Team {
        match self {
            Team::One => Team::Two,
            Team::Two => Team::One,
        }
    }
}

impl Serialize for Team {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.number())
    }
}

impl<'de> Deserialize<'de> for Team {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let n = u8::deserialize(deserializer)?;
        Team::from_number(n).ok_or_else(|| de::Error::custom(format!("invalid team: {n}")))
    }
}

/// Chip colors. `Red` exists for a client-only local mode; the server never
/// assigns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamColor {
    Green,
    Blue,
    Red,
}

impl TeamColor {
    /// The color the other side plays. Only green and blue are produced by
    /// networked games, so the mapping stays a two-way swap.
    pub fn opponent(self) -> TeamColor {
        match self {
            TeamColor::Green => TeamColor::Blue,
            TeamColor::Blue => TeamColor::Green,
            TeamColor::Red => TeamColor::Red,
        }
    }
}

/// Why a player left a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveReason {
    Leave,
    Disconnect,
    Kick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RematchCancelReason {
    PlayerDeclined,
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_wire_names_and_caps() {
        assert_eq!(serde_json::to_string(&GameMode::OneVsOne).unwrap(), "\"1v1\"");
        assert_eq!(serde_json::to_string(&GameMode::TwoVsTwo).unwrap(), "\"2v2\"");
        assert_eq!(GameMode::OneVsOne.max_players(), 2);
        assert_eq!(GameMode::TwoVsTwo.max_players(), 4);
    }

    #[test]
    fn test_team_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Team::One).unwrap(), "1");
        assert_eq!(serde_json::from_str::<Team>("2").unwrap(), Team::Two);
        assert!(serde_json::from_str::<Team>("3").is_err());
    }

    #[test]
    fn test_team_colors() {
        assert_eq!(Team::One.color(), TeamColor::Green);
        assert_eq!(Team::Two.color(), TeamColor::Blue);
        assert_eq!(TeamColor::Green.opponent(), TeamColor::Blue);
        assert_eq!(TeamColor::Blue.opponent(), TeamColor::Green);
    }

    #[test]
    fn test_cancel_reason_wire_names() {
        assert_eq!(
            serde_json::to_string(&RematchCancelReason::PlayerDeclined).unwrap(),
            "\"player_declined\""
        );
        assert_eq!(
            serde_json::to_string(&RematchCancelReason::Timeout).unwrap(),
            "\"timeout\""
        );
    }
}
