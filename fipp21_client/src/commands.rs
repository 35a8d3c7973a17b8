use fipp21::api::{RoomId, RoundId};
use std::fmt;

/// What a `watch` command follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchTarget {
    /// Participants and rounds of a room
    Room(RoomId),
    /// Bets and table state of a round
    Game(RoundId),
}

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { email: String, password: String },
    Register {
        email: String,
        password: String,
        name: String,
    },
    Logout,
    WhoAmI,
    Rooms,
    Create { name: String },
    Join { code: String },
    Room(RoomId),
    Leave(RoomId),
    Round(RoomId),
    Start(RoomId),
    Bets(RoundId),
    Bet { round_id: RoundId, amount: f64 },
    Turns(RoundId),
    State(RoundId),
    Hit(RoundId),
    Stand,
    Dealer(RoundId),
    Watch(WatchTarget),
    Unwatch,
    Status,
    Help,
    Quit,
}

/// Errors that can occur during command parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing was typed.
    Empty,
    /// A required argument is missing; carries the usage line.
    MissingArgument(&'static str),
    /// An id argument is not a number.
    InvalidId(String),
    /// Bet amount is not a positive number.
    InvalidAmount(String),
    /// `watch` target is neither `room` nor `game`.
    InvalidWatchTarget(String),
    /// Unrecognized command.
    UnrecognizedCommand(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Type a command, or 'help' to see available commands"),
            Self::MissingArgument(usage) => write!(f, "Missing argument. Usage: {}", usage),
            Self::InvalidId(value) => write!(f, "Invalid id '{}'. Ids are whole numbers", value),
            Self::InvalidAmount(value) => write!(
                f,
                "Invalid bet amount '{}'. Must be a positive number (e.g., 'bet 3 25')",
                value
            ),
            Self::InvalidWatchTarget(target) => write!(
                f,
                "Cannot watch '{}'. Use 'watch room ID' or 'watch game ROUND_ID'",
                target
            ),
            Self::UnrecognizedCommand(cmd) => write!(
                f,
                "Unrecognized command '{}'. Type 'help' to see available commands",
                cmd
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Help text listing every command.
pub const HELP: &str = "\
Account:
  login EMAIL PASSWORD          Sign in
  register EMAIL PASSWORD NAME  Create an account
  logout                        Sign out and forget the saved session
  whoami                        Show the signed-in user

Rooms:
  rooms                         List rooms you created or joined
  create NAME                   Create a room
  join CODE                     Join a room by its share code
  room ID                       Show a room and its participants
  leave ID                      Leave a room

Rounds:
  round ROOM_ID                 Show the active round of a room
  start ROOM_ID                 Start a new round
  bets ROUND_ID                 List bets on a round
  bet ROUND_ID AMOUNT           Place a bet
  turns ROUND_ID                Deal the opening hands

Table:
  state ROUND_ID                Show cards and totals
  hit ROUND_ID                  Draw a card
  stand                         Stop drawing on the current round
  dealer ROUND_ID               Advance the dealer

Live updates:
  watch room ID                 Follow a room's participants and rounds
  watch game ROUND_ID           Follow a round's bets and table
  unwatch                       Stop following

  status                        Show session and connection status
  help                          Show this help
  quit                          Exit
";

/// Parse a command line into a [`Command`].
///
/// # Examples
///
/// ```
/// use fipp21_client::commands::{parse_command, Command, WatchTarget};
///
/// assert_eq!(parse_command("rooms"), Ok(Command::Rooms));
/// assert_eq!(parse_command("hit 12"), Ok(Command::Hit(12)));
/// assert_eq!(parse_command("watch game 3"), Ok(Command::Watch(WatchTarget::Game(3))));
/// ```
pub fn parse_command(input: &str) -> Result<Command, ParseError> {
    let parts: Vec<&str> = input.split_ascii_whitespace().collect();
    let Some((&name, args)) = parts.split_first() else {
        return Err(ParseError::Empty);
    };

    match name.to_ascii_lowercase().as_str() {
        "login" => match args {
            [email, password, ..] => Ok(Command::Login {
                email: email.to_string(),
                password: password.to_string(),
            }),
            _ => Err(ParseError::MissingArgument("login EMAIL PASSWORD")),
        },
        "register" => match args {
            [email, password, name @ ..] if !name.is_empty() => Ok(Command::Register {
                email: email.to_string(),
                password: password.to_string(),
                name: name.join(" "),
            }),
            _ => Err(ParseError::MissingArgument("register EMAIL PASSWORD NAME")),
        },
        "logout" => Ok(Command::Logout),
        "whoami" => Ok(Command::WhoAmI),
        "rooms" => Ok(Command::Rooms),
        "create" if args.is_empty() => Err(ParseError::MissingArgument("create NAME")),
        "create" => Ok(Command::Create {
            name: args.join(" "),
        }),
        "join" => match args.first() {
            Some(code) => Ok(Command::Join {
                code: code.to_string(),
            }),
            None => Err(ParseError::MissingArgument("join CODE")),
        },
        "room" => parse_id(args, "room ID").map(Command::Room),
        "leave" => parse_id(args, "leave ID").map(Command::Leave),
        "round" => parse_id(args, "round ROOM_ID").map(Command::Round),
        "start" => parse_id(args, "start ROOM_ID").map(Command::Start),
        "bets" => parse_id(args, "bets ROUND_ID").map(Command::Bets),
        "bet" => parse_bet_command(args),
        "turns" => parse_id(args, "turns ROUND_ID").map(Command::Turns),
        "state" => parse_id(args, "state ROUND_ID").map(Command::State),
        "hit" => parse_id(args, "hit ROUND_ID").map(Command::Hit),
        "stand" => Ok(Command::Stand),
        "dealer" => parse_id(args, "dealer ROUND_ID").map(Command::Dealer),
        "watch" => parse_watch_command(args),
        "unwatch" => Ok(Command::Unwatch),
        "status" => Ok(Command::Status),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        _ => Err(ParseError::UnrecognizedCommand(name.to_string())),
    }
}

fn parse_id(args: &[&str], usage: &'static str) -> Result<i64, ParseError> {
    let value = args.first().ok_or(ParseError::MissingArgument(usage))?;
    value
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidId(value.to_string()))
}

/// Parse a bet command: "bet ROUND_ID AMOUNT"
fn parse_bet_command(args: &[&str]) -> Result<Command, ParseError> {
    const USAGE: &str = "bet ROUND_ID AMOUNT";
    let round_id = parse_id(args, USAGE)?;
    let value = args.get(1).ok_or(ParseError::MissingArgument(USAGE))?;
    let amount = value
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|a| a.is_finite() && *a > 0.0)
        .ok_or_else(|| ParseError::InvalidAmount(value.to_string()))?;
    Ok(Command::Bet { round_id, amount })
}

/// Parse a watch command: "watch room ID" or "watch game ROUND_ID"
fn parse_watch_command(args: &[&str]) -> Result<Command, ParseError> {
    match args.first().map(|t| t.to_ascii_lowercase()) {
        Some(target) if target == "room" => {
            parse_id(&args[1..], "watch room ID").map(|id| Command::Watch(WatchTarget::Room(id)))
        }
        Some(target) if target == "game" => parse_id(&args[1..], "watch game ROUND_ID")
            .map(|id| Command::Watch(WatchTarget::Game(id))),
        Some(_) => Err(ParseError::InvalidWatchTarget(args[0].to_string())),
        None => Err(ParseError::MissingArgument("watch room ID | watch game ROUND_ID")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Account commands ===

    #[test]
    fn test_parse_login() {
        assert_eq!(
            parse_command("login a@b.com hunter2"),
            Ok(Command::Login {
                email: "a@b.com".to_string(),
                password: "hunter2".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_login_missing_password() {
        assert_eq!(
            parse_command("login a@b.com"),
            Err(ParseError::MissingArgument("login EMAIL PASSWORD"))
        );
    }

    #[test]
    fn test_parse_register_joins_name() {
        assert_eq!(
            parse_command("register a@b.com pw Ana Maria"),
            Ok(Command::Register {
                email: "a@b.com".to_string(),
                password: "pw".to_string(),
                name: "Ana Maria".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_register_requires_name() {
        assert!(matches!(
            parse_command("register a@b.com pw"),
            Err(ParseError::MissingArgument(_))
        ));
    }

    #[test]
    fn test_parse_single_word_commands() {
        assert_eq!(parse_command("logout"), Ok(Command::Logout));
        assert_eq!(parse_command("whoami"), Ok(Command::WhoAmI));
        assert_eq!(parse_command("rooms"), Ok(Command::Rooms));
        assert_eq!(parse_command("stand"), Ok(Command::Stand));
        assert_eq!(parse_command("unwatch"), Ok(Command::Unwatch));
        assert_eq!(parse_command("status"), Ok(Command::Status));
        assert_eq!(parse_command("help"), Ok(Command::Help));
        assert_eq!(parse_command("?"), Ok(Command::Help));
        assert_eq!(parse_command("quit"), Ok(Command::Quit));
        assert_eq!(parse_command("exit"), Ok(Command::Quit));
    }

    // === Room commands ===

    #[test]
    fn test_parse_create_keeps_spaces() {
        assert_eq!(
            parse_command("create Friday night"),
            Ok(Command::Create {
                name: "Friday night".to_string()
            })
        );
        assert!(matches!(
            parse_command("create"),
            Err(ParseError::MissingArgument(_))
        ));
    }

    #[test]
    fn test_parse_join() {
        assert_eq!(
            parse_command("join XK42"),
            Ok(Command::Join {
                code: "XK42".to_string()
            })
        );
        assert!(matches!(
            parse_command("join"),
            Err(ParseError::MissingArgument(_))
        ));
    }

    #[test]
    fn test_parse_id_commands() {
        assert_eq!(parse_command("room 4"), Ok(Command::Room(4)));
        assert_eq!(parse_command("leave 4"), Ok(Command::Leave(4)));
        assert_eq!(parse_command("round 4"), Ok(Command::Round(4)));
        assert_eq!(parse_command("start 4"), Ok(Command::Start(4)));
        assert_eq!(parse_command("bets 9"), Ok(Command::Bets(9)));
        assert_eq!(parse_command("turns 9"), Ok(Command::Turns(9)));
        assert_eq!(parse_command("state 9"), Ok(Command::State(9)));
        assert_eq!(parse_command("hit 9"), Ok(Command::Hit(9)));
        assert_eq!(parse_command("dealer 9"), Ok(Command::Dealer(9)));
    }

    #[test]
    fn test_parse_invalid_id() {
        assert_eq!(
            parse_command("room four"),
            Err(ParseError::InvalidId("four".to_string()))
        );
        assert!(matches!(
            parse_command("hit"),
            Err(ParseError::MissingArgument("hit ROUND_ID"))
        ));
    }

    // === Bet command ===

    #[test]
    fn test_parse_bet() {
        assert_eq!(
            parse_command("bet 3 25"),
            Ok(Command::Bet {
                round_id: 3,
                amount: 25.0
            })
        );
    }

    #[test]
    fn test_parse_bet_accepts_decimal_comma() {
        assert_eq!(
            parse_command("bet 3 12,50"),
            Ok(Command::Bet {
                round_id: 3,
                amount: 12.5
            })
        );
    }

    #[test]
    fn test_parse_bet_rejects_non_positive() {
        assert_eq!(
            parse_command("bet 3 0"),
            Err(ParseError::InvalidAmount("0".to_string()))
        );
        assert_eq!(
            parse_command("bet 3 -5"),
            Err(ParseError::InvalidAmount("-5".to_string()))
        );
        assert_eq!(
            parse_command("bet 3 lots"),
            Err(ParseError::InvalidAmount("lots".to_string()))
        );
        assert_eq!(
            parse_command("bet 3 NaN"),
            Err(ParseError::InvalidAmount("NaN".to_string()))
        );
    }

    #[test]
    fn test_parse_bet_missing_amount() {
        assert!(matches!(
            parse_command("bet 3"),
            Err(ParseError::MissingArgument(_))
        ));
    }

    // === Watch command ===

    #[test]
    fn test_parse_watch_targets() {
        assert_eq!(
            parse_command("watch room 2"),
            Ok(Command::Watch(WatchTarget::Room(2)))
        );
        assert_eq!(
            parse_command("watch GAME 8"),
            Ok(Command::Watch(WatchTarget::Game(8)))
        );
    }

    #[test]
    fn test_parse_watch_errors() {
        assert_eq!(
            parse_command("watch table 2"),
            Err(ParseError::InvalidWatchTarget("table".to_string()))
        );
        assert!(matches!(
            parse_command("watch room"),
            Err(ParseError::MissingArgument(_))
        ));
        assert!(matches!(
            parse_command("watch"),
            Err(ParseError::MissingArgument(_))
        ));
    }

    // === Whitespace and case handling ===

    #[test]
    fn test_parse_with_surrounding_whitespace() {
        assert_eq!(parse_command("   rooms  "), Ok(Command::Rooms));
        assert_eq!(parse_command("\thit   7 "), Ok(Command::Hit(7)));
    }

    #[test]
    fn test_parse_is_case_insensitive_for_command_names() {
        assert_eq!(parse_command("ROOMS"), Ok(Command::Rooms));
        assert_eq!(parse_command("Hit 7"), Ok(Command::Hit(7)));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_command(""), Err(ParseError::Empty));
        assert_eq!(parse_command("   "), Err(ParseError::Empty));
    }

    #[test]
    fn test_parse_unrecognized() {
        assert_eq!(
            parse_command("double 3"),
            Err(ParseError::UnrecognizedCommand("double".to_string()))
        );
    }

    // === Error messages ===

    #[test]
    fn test_error_messages() {
        let msg = ParseError::InvalidAmount("-1".to_string()).to_string();
        assert!(msg.contains("-1"));
        assert!(msg.contains("positive"));

        let msg = ParseError::MissingArgument("join CODE").to_string();
        assert!(msg.contains("join CODE"));

        let msg = ParseError::UnrecognizedCommand("foo".to_string()).to_string();
        assert!(msg.contains("foo"));
        assert!(msg.contains("help"));
    }
}
