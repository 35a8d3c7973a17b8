//! Resource models returned by the remote API.
//!
//! Field names on the wire follow the server's contract; the Rust names are
//! their English equivalents.

use serde::{Deserialize, Serialize};

use crate::session::Identity;

pub type RoomId = i64;
pub type RoundId = i64;

/// A game room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    #[serde(rename = "nome")]
    pub name: String,
    /// Code other players use to join
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "criador_id")]
    pub creator_id: i64,
}

/// A player seated in a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
}

/// A round played in a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    #[serde(rename = "sala_id")]
    pub room_id: RoomId,
    pub status: String,
}

/// A bet placed on a round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub id: i64,
    #[serde(rename = "valor")]
    pub amount: f64,
    #[serde(rename = "participante_nome")]
    pub participant_name: String,
}

/// A dealt card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    #[serde(rename = "naipe")]
    pub suit: String,
    #[serde(rename = "valor")]
    pub rank: String,
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.rank, self.suit)
    }
}

/// Table state for one round, as seen by the signed-in player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    #[serde(rename = "cartasJogador", default)]
    pub player_cards: Vec<Card>,
    #[serde(rename = "cartasDealer", default)]
    pub dealer_cards: Vec<Card>,
    #[serde(rename = "totalJogador", default)]
    pub player_total: i64,
    #[serde(rename = "totalDealer", default)]
    pub dealer_total: i64,
    pub status: String,
    #[serde(rename = "mensagem", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl GameState {
    /// Turns have started once the player holds at least one card.
    pub fn turns_started(&self) -> bool {
        !self.player_cards.is_empty()
    }
}

/// Successful sign-in response
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(rename = "usuario")]
    pub identity: Identity,
}

#[derive(Debug, Serialize)]
pub(crate) struct SignInRequest<'a> {
    pub email: &'a str,
    #[serde(rename = "senha")]
    pub secret: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    #[serde(rename = "nome")]
    pub name: &'a str,
    pub email: &'a str,
    #[serde(rename = "senha")]
    pub secret: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRoomRequest<'a> {
    #[serde(rename = "nome")]
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct PlaceBetRequest {
    #[serde(rename = "valor")]
    pub amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_state_from_wire() {
        let json = r#"{
            "cartasJogador": [{"id": 1, "naipe": "copas", "valor": "A"}],
            "cartasDealer": [],
            "totalJogador": 11,
            "totalDealer": 0,
            "status": "em_andamento"
        }"#;
        let state: GameState = serde_json::from_str(json).unwrap();
        assert_eq!(state.player_cards.len(), 1);
        assert_eq!(state.player_cards[0].to_string(), "A copas");
        assert_eq!(state.player_total, 11);
        assert!(state.message.is_none());
        assert!(state.turns_started());
    }

    #[test]
    fn test_game_state_missing_hands_defaults_empty() {
        let state: GameState = serde_json::from_str(r#"{"status":"aguardando"}"#).unwrap();
        assert!(!state.turns_started());
        assert_eq!(state.dealer_total, 0);
    }

    #[test]
    fn test_room_from_wire() {
        let room: Room = serde_json::from_str(
            r#"{"id": 7, "nome": "Mesa 1", "codigo": "AB12", "criador_id": 3}"#,
        )
        .unwrap();
        assert_eq!(room.name, "Mesa 1");
        assert_eq!(room.code, "AB12");
        assert_eq!(room.creator_id, 3);
    }

    #[test]
    fn test_sign_in_request_uses_server_field_names() {
        let body = serde_json::to_value(SignInRequest {
            email: "a@b.com",
            secret: "x",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"email": "a@b.com", "senha": "x"}));
    }
}
