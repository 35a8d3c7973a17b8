//! Event types pushed by the server.

/// A player joined the room
pub const PARTICIPANT_JOINED: &str = "participante_entrou";

/// A player left the room
pub const PARTICIPANT_LEFT: &str = "participante_saiu";

/// A new round started; the payload carries it under `rodada`
pub const ROUND_STARTED: &str = "rodada_iniciada";

/// The table state of a round changed
pub const STATE_UPDATED: &str = "estado_atualizado";

/// A bet was placed on a round
pub const BET_PLACED: &str = "aposta_realizada";

/// Events a room view listens for.
pub const ROOM_EVENTS: [&str; 3] = [PARTICIPANT_JOINED, PARTICIPANT_LEFT, ROUND_STARTED];

/// Events a game view listens for.
pub const GAME_EVENTS: [&str; 2] = [STATE_UPDATED, BET_PLACED];
