//! The duplex channel protocol.
//!
//! Everything the server pushes is one `ServerEvent` wrapped in an envelope
//! that adds the send timestamp, producing `{type, data, timestamp}` objects
//! on the wire. The only message clients send on the channel is `ping`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::BoardType;
use crate::cards::Card;
use crate::types::{LeaveReason, RematchCancelReason, TeamColor};
use crate::views::{
    ChipView, GamePlayerView, RematchStateView, RoomPlayerView, RoomView, SequenceView, TeamView,
};

/// Every event type the server can push on a duplex channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    Connected { player_id: Uuid },

    #[serde(rename_all = "camelCase")]
    RoomUpdated { room: RoomView },

    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        room_id: Uuid,
        player: RoomPlayerView,
    },

    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        room_id: Uuid,
        player_id: Uuid,
        reason: LeaveReason,
        new_host_id: Option<Uuid>,
    },

    /// Sent individually: `your_hand` holds only the recipient's cards.
    #[serde(rename_all = "camelCase")]
    GameStarted {
        game_id: Uuid,
        room_id: Uuid,
        board_type: BoardType,
        deck_seed: u32,
        players: Vec<GamePlayerView>,
        teams: Vec<TeamView>,
        first_player_id: Uuid,
        your_hand: Vec<Card>,
    },

    /// The per-move broadcast clients replay onto their local board.
    /// `chip_placed` is `None` when a one-eyed Jack removed a chip.
    #[serde(rename_all = "camelCase")]
    TurnMade {
        game_id: Uuid,
        player_id: Uuid,
        card_played: Card,
        row: usize,
        col: usize,
        chip_placed: Option<ChipView>,
        new_sequences: Vec<SequenceView>,
        next_player_id: Uuid,
    },

    #[serde(rename_all = "camelCase")]
    GameFinished {
        game_id: Uuid,
        winner_id: Uuid,
        winner_name: String,
        winning_team_color: TeamColor,
        final_sequences: Vec<SequenceView>,
    },

    #[serde(rename_all = "camelCase")]
    RematchVote { rematch: RematchStateView },

    #[serde(rename_all = "camelCase")]
    RematchStarted { new_game_id: Uuid },

    #[serde(rename_all = "camelCase")]
    RematchCancelled {
        game_id: Uuid,
        reason: RematchCancelReason,
    },

    /// Reserved for asynchronous problems; request-level failures travel on
    /// the request path instead.
    #[serde(rename_all = "camelCase")]
    Error { message: String },

    Pong,
}

/// Wire envelope: flattens the event's `type`/`data` pair and stamps it.
#[derive(Debug, Serialize)]
pub struct EventEnvelope<'a> {
    #[serde(flatten)]
    pub event: &'a ServerEvent,
    /// Unix milliseconds at send time.
    pub timestamp: u64,
}

/// Inbound channel messages. Heartbeat only; all state changes arrive over
/// the request surface.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let event = ServerEvent::Connected {
            player_id: Uuid::nil(),
        };
        let envelope = EventEnvelope {
            event: &event,
            timestamp: 1234,
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["type"], "connected");
        assert_eq!(value["timestamp"], 1234);
        assert_eq!(value["data"]["playerId"], Uuid::nil().to_string());
    }

    #[test]
    fn test_turn_made_payload_fields() {
        let event = ServerEvent::TurnMade {
            game_id: Uuid::nil(),
            player_id: Uuid::nil(),
            card_played: Card::from_code("JD").unwrap(),
            row: 4,
            col: 4,
            chip_placed: Some(ChipView {
                color: TeamColor::Green,
                part_of_sequence: false,
            }),
            new_sequences: vec![],
            next_player_id: Uuid::nil(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "turn_made");
        assert_eq!(value["data"]["cardPlayed"], "JD");
        assert_eq!(value["data"]["chipPlaced"]["color"], "green");
        assert_eq!(value["data"]["newSequences"], serde_json::json!([]));
    }

    #[test]
    fn test_pong_has_no_data() {
        let value = serde_json::to_value(&ServerEvent::Pong).unwrap();
        assert_eq!(value["type"], "pong");
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_client_message_parses_ping_only() {
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"ping"}"#).unwrap(),
            ClientMessage::Ping
        ));
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"turn"}"#).is_err());
    }
}
