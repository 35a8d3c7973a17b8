//! Interactive shell: runs parsed commands against the session store, the API
//! client and the push dispatcher, and prints push notifications.

use std::collections::HashSet;
use std::io::Write;

use anyhow::Result;
use chrono::Local;
use fipp21::api::{ApiResult, Bet, Card, GameState, Participant, Room, RoomId, RoundId};
use fipp21::realtime::{Frame, events};
use fipp21::session::{SessionStatus, Storage};
use fipp21::{ConnectionState, Dispatcher, SessionStore, Subscription};
use tokio::sync::mpsc;

use crate::commands::{Command, HELP, WatchTarget};

/// Whether the shell should keep reading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Command executor for one terminal.
///
/// Push frames for the watched room or round are forwarded to the receiver
/// returned by [`Shell::new`]; feed them back through
/// [`handle_notice`](Self::handle_notice) so the refresh runs on the shell's
/// task instead of the connection task.
pub struct Shell<S: Storage, W: Write> {
    session: SessionStore<S>,
    dispatcher: Dispatcher,
    out: W,
    notices: mpsc::UnboundedSender<Frame>,
    watching: Option<WatchTarget>,
    subscriptions: Vec<(&'static str, Subscription)>,
    current_round: Option<RoundId>,
    stood: HashSet<RoundId>,
}

impl<S: Storage, W: Write> Shell<S, W> {
    pub fn new(
        session: SessionStore<S>,
        dispatcher: Dispatcher,
        out: W,
    ) -> (Self, mpsc::UnboundedReceiver<Frame>) {
        let (notices, notices_rx) = mpsc::unbounded_channel();
        let shell = Self {
            session,
            dispatcher,
            out,
            notices,
            watching: None,
            subscriptions: Vec::new(),
            current_round: None,
            stood: HashSet::new(),
        };
        (shell, notices_rx)
    }

    pub fn session(&self) -> &SessionStore<S> {
        &self.session
    }

    pub fn watching(&self) -> Option<WatchTarget> {
        self.watching
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Run one command.
    ///
    /// API failures are printed, not returned; the error path is reserved
    /// for failures writing to the terminal.
    pub async fn execute(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::Help => write!(self.out, "{}", HELP)?,
            Command::Quit => {
                self.shutdown();
                writeln!(self.out, "Bye.")?;
                return Ok(Flow::Quit);
            }
            Command::Status => self.print_status()?,
            Command::Login { email, password } => self.login(&email, &password).await?,
            Command::Register {
                email,
                password,
                name,
            } => match self.session.register(&name, &email, &password).await {
                Ok(()) => writeln!(
                    self.out,
                    "Account created. Sign in with: login {} PASSWORD",
                    email
                )?,
                Err(e) => writeln!(self.out, "Registration failed: {}", e.user_message())?,
            },
            Command::Logout => {
                self.shutdown();
                self.session.sign_out();
                self.current_round = None;
                self.stood.clear();
                writeln!(self.out, "Signed out.")?;
            }
            Command::WhoAmI => match self.session.identity() {
                Some(identity) => writeln!(
                    self.out,
                    "{} <{}> (id {})",
                    identity.name, identity.email, identity.id
                )?,
                None => writeln!(self.out, "Not signed in.")?,
            },
            Command::Unwatch => {
                if self.unwatch() {
                    writeln!(self.out, "Stopped watching.")?;
                } else {
                    writeln!(self.out, "Not watching anything.")?;
                }
            }
            other if !self.session.is_authenticated() => {
                tracing::debug!(command = ?other, "Command refused, not signed in");
                writeln!(self.out, "Sign in first: login EMAIL PASSWORD")?;
            }
            other => self.run_authenticated(other).await?,
        }
        Ok(Flow::Continue)
    }

    async fn login(&mut self, email: &str, password: &str) -> Result<()> {
        match self.session.sign_in(email, password).await {
            Ok(identity) => writeln!(self.out, "Welcome, {}!", identity.name)?,
            Err(e) => {
                tracing::debug!("Sign-in failed: {}", e);
                writeln!(self.out, "Sign-in failed: {}", e.user_message())?;
            }
        }
        Ok(())
    }

    async fn run_authenticated(&mut self, command: Command) -> Result<()> {
        let api = self.session.api().clone();

        match command {
            Command::Rooms => {
                let mine = api.my_rooms().await;
                let Some(mine) = self.checked(mine, "Could not load your rooms.")? else {
                    return Ok(());
                };
                let joined = api.joined_rooms().await;
                let Some(joined) = self.checked(joined, "Could not load your rooms.")? else {
                    return Ok(());
                };
                self.print_rooms("Your rooms:", &mine)?;
                self.print_rooms("Joined rooms:", &joined)?;
            }
            Command::Create { name } => {
                let created = api.create_room(&name).await;
                if let Some(room) = self.checked(created, "Could not create the room.")? {
                    writeln!(
                        self.out,
                        "Created room #{} {}. Share code: {}",
                        room.id, room.name, room.code
                    )?;
                }
            }
            Command::Join { code } => {
                let joined = api.join_room(&code).await;
                if self.checked(joined, "Could not join the room.")?.is_some() {
                    writeln!(self.out, "Joined room {}.", code)?;
                }
            }
            Command::Room(room_id) => self.show_room(room_id).await?,
            Command::Leave(room_id) => {
                let left = api.leave_room(room_id).await;
                if self.checked(left, "Could not leave the room.")?.is_some() {
                    if self.watching == Some(WatchTarget::Room(room_id)) {
                        self.unwatch();
                    }
                    writeln!(self.out, "Left room #{}.", room_id)?;
                }
            }
            Command::Round(room_id) => self.show_active_round(room_id).await?,
            Command::Start(room_id) => {
                let started = api.start_round(room_id).await;
                if let Some(round) = self.checked(started, "Could not start a round.")? {
                    self.current_round = Some(round.id);
                    writeln!(self.out, "Started round #{}.", round.id)?;
                }
            }
            Command::Bets(round_id) => self.show_bets(round_id).await?,
            Command::Bet { round_id, amount } => {
                let placed = api.place_bet(round_id, amount).await;
                if self.checked(placed, "Could not place the bet.")?.is_some() {
                    self.current_round = Some(round_id);
                    writeln!(
                        self.out,
                        "Bet of {:.2} placed on round #{}.",
                        amount, round_id
                    )?;
                }
            }
            Command::Turns(round_id) => {
                let dealt = api.start_turns(round_id).await;
                if self.checked(dealt, "Could not deal the cards.")?.is_some() {
                    self.current_round = Some(round_id);
                    writeln!(self.out, "Cards dealt for round #{}.", round_id)?;
                    self.show_state(round_id).await?;
                }
            }
            Command::State(round_id) => {
                self.current_round = Some(round_id);
                self.show_state(round_id).await?;
            }
            Command::Hit(round_id) => {
                if self.stood.contains(&round_id) {
                    writeln!(self.out, "You already stand on round #{}.", round_id)?;
                    return Ok(());
                }
                let drawn = api.hit(round_id).await;
                if self.checked(drawn, "Could not draw a card.")?.is_some() {
                    self.current_round = Some(round_id);
                    self.show_state(round_id).await?;
                }
            }
            Command::Stand => match self.current_round {
                Some(round_id) => {
                    self.stood.insert(round_id);
                    writeln!(
                        self.out,
                        "You stand on round #{}. Waiting for the dealer.",
                        round_id
                    )?;
                }
                None => writeln!(self.out, "No round in play. Use 'state ROUND_ID' first.")?,
            },
            Command::Dealer(round_id) => {
                let advanced = api.dealer_hit(round_id).await;
                if self.checked(advanced, "Could not advance the dealer.")?.is_some() {
                    self.show_state(round_id).await?;
                }
            }
            Command::Watch(target) => self.watch(target)?,
            Command::Help
            | Command::Quit
            | Command::Status
            | Command::Login { .. }
            | Command::Register { .. }
            | Command::Logout
            | Command::WhoAmI
            | Command::Unwatch => {}
        }
        Ok(())
    }

    /// Report the outcome of an API call and apply its effect on the session.
    ///
    /// Returns `None` after printing the failure.
    fn checked<T>(&mut self, result: ApiResult<T>, fallback: &str) -> Result<Option<T>> {
        match self.session.guard(result) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_unauthorized() => {
                self.unwatch();
                writeln!(
                    self.out,
                    "Your session has expired. Sign in again with: login EMAIL PASSWORD"
                )?;
                Ok(None)
            }
            Err(e) => {
                tracing::debug!("API call failed: {}", e);
                writeln!(self.out, "{}", e.user_message(fallback))?;
                Ok(None)
            }
        }
    }

    fn watch(&mut self, target: WatchTarget) -> Result<()> {
        self.unwatch();

        let event_types: &[&'static str] = match target {
            WatchTarget::Room(_) => &events::ROOM_EVENTS,
            WatchTarget::Game(_) => &events::GAME_EVENTS,
        };
        for &event_type in event_types {
            let notices = self.notices.clone();
            let subscription = self.dispatcher.on(event_type, move |frame| {
                let _ = notices.send(frame.clone());
            });
            self.subscriptions.push((event_type, subscription));
        }
        self.dispatcher.connect();
        self.watching = Some(target);

        match target {
            WatchTarget::Room(room_id) => {
                writeln!(self.out, "Watching room #{}. Type 'unwatch' to stop.", room_id)?
            }
            WatchTarget::Game(round_id) => {
                self.current_round = Some(round_id);
                writeln!(
                    self.out,
                    "Watching round #{}. Type 'unwatch' to stop.",
                    round_id
                )?
            }
        }
        Ok(())
    }

    /// Drop every push registration. Returns whether anything was watched.
    fn unwatch(&mut self) -> bool {
        for (event_type, subscription) in self.subscriptions.drain(..) {
            self.dispatcher.off(event_type, &subscription);
        }
        self.watching.take().is_some()
    }

    /// Stop watching and close the push connection.
    pub fn shutdown(&mut self) {
        self.unwatch();
        self.dispatcher.disconnect();
    }

    /// React to a push frame by re-fetching what it refers to.
    pub async fn handle_notice(&mut self, frame: Frame) -> Result<()> {
        let Some(target) = self.watching else {
            return Ok(());
        };
        if !concerns(target, &frame) {
            tracing::debug!(
                event_type = frame.event_type(),
                "Ignoring push frame for another view"
            );
            return Ok(());
        }

        let stamp = Local::now().format("%H:%M:%S");
        writeln!(self.out, "[{}] {}", stamp, describe(&frame))?;

        match target {
            WatchTarget::Room(room_id) => {
                self.show_participants(room_id).await?;
                self.show_active_round(room_id).await?;
            }
            WatchTarget::Game(round_id) => {
                self.show_bets(round_id).await?;
                self.show_state(round_id).await?;
            }
        }
        Ok(())
    }

    async fn show_room(&mut self, room_id: RoomId) -> Result<()> {
        let room = self.session.api().clone().room(room_id).await;
        let Some(room) = self.checked(room, "Could not load the room.")? else {
            return Ok(());
        };
        writeln!(
            self.out,
            "Room #{} {} (code {})",
            room.id, room.name, room.code
        )?;
        self.show_participants(room_id).await
    }

    async fn show_participants(&mut self, room_id: RoomId) -> Result<()> {
        let participants = self.session.api().clone().participants(room_id).await;
        if let Some(participants) = self.checked(participants, "Could not load participants.")? {
            self.print_participants(&participants)?;
        }
        Ok(())
    }

    async fn show_active_round(&mut self, room_id: RoomId) -> Result<()> {
        let round = self.session.api().clone().active_round(room_id).await;
        match self.checked(round, "Could not load the active round.")? {
            Some(Some(round)) => {
                self.current_round = Some(round.id);
                writeln!(self.out, "Active round #{} ({})", round.id, round.status)?;
            }
            Some(None) => writeln!(self.out, "No active round in room #{}.", room_id)?,
            None => {}
        }
        Ok(())
    }

    async fn show_bets(&mut self, round_id: RoundId) -> Result<()> {
        let bets = self.session.api().clone().bets(round_id).await;
        if let Some(bets) = self.checked(bets, "Could not load bets.")? {
            self.print_bets(round_id, &bets)?;
        }
        Ok(())
    }

    async fn show_state(&mut self, round_id: RoundId) -> Result<()> {
        let state = self.session.api().clone().game_state(round_id).await;
        if let Some(state) = self.checked(state, "Could not load the table.")? {
            self.print_state(round_id, &state)?;
        }
        Ok(())
    }

    fn print_status(&mut self) -> Result<()> {
        match self.session.session() {
            Some(session) => {
                let trust = match session.status {
                    SessionStatus::Verified => "verified",
                    SessionStatus::Provisional => "restored, not yet confirmed",
                };
                writeln!(
                    self.out,
                    "Signed in as {} <{}> ({})",
                    session.identity.name, session.identity.email, trust
                )?;
            }
            None => writeln!(self.out, "Not signed in.")?,
        }

        let push = match self.dispatcher.state() {
            ConnectionState::Disconnected => "not connected".to_string(),
            ConnectionState::Connecting => "connecting".to_string(),
            ConnectionState::Open => "open".to_string(),
            ConnectionState::Reconnecting { attempt, delay } => format!(
                "reconnecting (attempt {}, next try in {:.1}s)",
                attempt,
                delay.as_secs_f64()
            ),
            ConnectionState::GaveUp => "gave up reconnecting".to_string(),
            ConnectionState::Closed => "closed".to_string(),
        };
        writeln!(self.out, "Push connection: {}", push)?;

        match self.watching {
            Some(WatchTarget::Room(id)) => writeln!(self.out, "Watching: room #{}", id)?,
            Some(WatchTarget::Game(id)) => writeln!(self.out, "Watching: round #{}", id)?,
            None => writeln!(self.out, "Watching: nothing")?,
        }
        Ok(())
    }

    fn print_rooms(&mut self, title: &str, rooms: &[Room]) -> Result<()> {
        writeln!(self.out, "{}", title)?;
        if rooms.is_empty() {
            writeln!(self.out, "  (none)")?;
        }
        for room in rooms {
            writeln!(self.out, "  #{} {} (code {})", room.id, room.name, room.code)?;
        }
        Ok(())
    }

    fn print_participants(&mut self, participants: &[Participant]) -> Result<()> {
        let names: Vec<&str> = participants.iter().map(|p| p.name.as_str()).collect();
        if names.is_empty() {
            writeln!(self.out, "Players: (none)")?;
        } else {
            writeln!(self.out, "Players: {}", names.join(", "))?;
        }
        Ok(())
    }

    fn print_bets(&mut self, round_id: RoundId, bets: &[Bet]) -> Result<()> {
        if bets.is_empty() {
            writeln!(self.out, "No bets on round #{} yet.", round_id)?;
            return Ok(());
        }
        writeln!(self.out, "Bets on round #{}:", round_id)?;
        for bet in bets {
            writeln!(self.out, "  {}: {:.2}", bet.participant_name, bet.amount)?;
        }
        Ok(())
    }

    fn print_state(&mut self, round_id: RoundId, state: &GameState) -> Result<()> {
        if !state.turns_started() {
            writeln!(
                self.out,
                "Round #{}: cards not dealt yet ({}).",
                round_id, state.status
            )?;
            return Ok(());
        }
        writeln!(
            self.out,
            "Dealer: {} ({})",
            hand(&state.dealer_cards),
            state.dealer_total
        )?;
        writeln!(
            self.out,
            "You:    {} ({})",
            hand(&state.player_cards),
            state.player_total
        )?;
        writeln!(self.out, "Status: {}", state.status)?;
        if let Some(message) = &state.message {
            writeln!(self.out, "{}", message)?;
        }
        Ok(())
    }
}

fn hand(cards: &[Card]) -> String {
    if cards.is_empty() {
        return "-".to_string();
    }
    cards
        .iter()
        .map(Card::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whether a frame belongs to the watched view. Frames that name a different
/// room or round are skipped; frames that name none are accepted.
fn concerns(target: WatchTarget, frame: &Frame) -> bool {
    let names = |field: &str, id: i64| {
        frame
            .payload
            .get(field)
            .and_then(|v| v.as_i64())
            .is_none_or(|v| v == id)
    };
    match target {
        WatchTarget::Room(room_id) => {
            events::ROOM_EVENTS.contains(&frame.event_type()) && names("sala_id", room_id)
        }
        WatchTarget::Game(round_id) => {
            events::GAME_EVENTS.contains(&frame.event_type()) && names("rodada_id", round_id)
        }
    }
}

fn describe(frame: &Frame) -> String {
    match frame.event_type() {
        events::PARTICIPANT_JOINED => "A player joined the room.".to_string(),
        events::PARTICIPANT_LEFT => "A player left the room.".to_string(),
        events::ROUND_STARTED => match frame.payload["rodada"]["id"].as_i64() {
            Some(id) => format!("Round #{} started.", id),
            None => "A new round started.".to_string(),
        },
        events::STATE_UPDATED => "The table changed.".to_string(),
        events::BET_PLACED => "A bet was placed.".to_string(),
        other => format!("Update: {}", other),
    }
}
