//! Typed notifications.
//!
//! Each notification kind has its own [`Channel`]; listeners run
//! synchronously in registration order. The game also keeps every
//! notification in a [`GameEvent`] log that callers drain after each
//! command.

use crate::catalog::UnitTypeKey;
use crate::grid::Cell;
use crate::player::PlayerId;
use crate::unit::{UnitId, UnitMode};

/// A player's turn began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnStarted {
    /// Whose turn it is.
    pub player: PlayerId,
    /// Gold credited at turn start.
    pub income: u32,
    /// Global turn counter after the increment.
    pub turn: u32,
}

/// A player's turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnEnded {
    /// Whose turn ended.
    pub player: PlayerId,
    /// Global turn counter.
    pub turn: u32,
}

/// A unit died.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitKilled {
    /// The unit, already freed.
    pub unit: UnitId,
    /// Its type.
    pub type_key: UnitTypeKey,
    /// Its owner.
    pub owner: PlayerId,
    /// Where it died.
    pub cell: Cell,
    /// Whether its owner needed it alive.
    pub must_survive: bool,
}

/// A unit changed mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChanged {
    /// The unit.
    pub unit: UnitId,
    /// Its owner.
    pub owner: PlayerId,
    /// Previous mode.
    pub from: UnitMode,
    /// New mode.
    pub to: UnitMode,
}

/// A unit finished a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitMoved {
    /// The unit.
    pub unit: UnitId,
    /// Its owner.
    pub owner: PlayerId,
    /// Starting cell.
    pub from: Cell,
    /// Destination cell.
    pub to: Cell,
}

/// A player left the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerDefeated {
    /// The defeated player.
    pub player: PlayerId,
}

/// Any notification, as recorded in the game's event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// See [`TurnStarted`].
    TurnStarted(TurnStarted),
    /// See [`TurnEnded`].
    TurnEnded(TurnEnded),
    /// See [`UnitKilled`].
    UnitKilled(UnitKilled),
    /// See [`ModeChanged`].
    ModeChanged(ModeChanged),
    /// See [`UnitMoved`].
    UnitMoved(UnitMoved),
    /// See [`PlayerDefeated`].
    PlayerDefeated(PlayerDefeated),
}

/// Handle returned by [`Channel::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

type Listener<E> = Box<dyn FnMut(&E)>;

/// Listeners for one notification type.
pub struct Channel<E> {
    listeners: Vec<(ListenerId, Listener<E>)>,
    next_id: usize,
}

impl<E> Default for Channel<E> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }
}

impl<E> std::fmt::Debug for Channel<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<E> Channel<E> {
    /// Register a listener. It runs after every listener registered before it.
    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    /// Deliver a notification to every listener in registration order.
    pub fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    /// Number of listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Check if there are no listeners.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// One channel per notification type.
#[derive(Debug, Default)]
pub struct EventBus {
    /// Turn start notifications.
    pub turn_started: Channel<TurnStarted>,
    /// Turn end notifications.
    pub turn_ended: Channel<TurnEnded>,
    /// Unit death notifications.
    pub unit_killed: Channel<UnitKilled>,
    /// Mode change notifications.
    pub mode_changed: Channel<ModeChanged>,
    /// Move notifications.
    pub unit_moved: Channel<UnitMoved>,
    /// Defeat notifications.
    pub player_defeated: Channel<PlayerDefeated>,
}

impl EventBus {
    /// Route a notification to its channel.
    pub fn dispatch(&mut self, event: &GameEvent) {
        match event {
            GameEvent::TurnStarted(e) => self.turn_started.emit(e),
            GameEvent::TurnEnded(e) => self.turn_ended.emit(e),
            GameEvent::UnitKilled(e) => self.unit_killed.emit(e),
            GameEvent::ModeChanged(e) => self.mode_changed.emit(e),
            GameEvent::UnitMoved(e) => self.unit_moved.emit(e),
            GameEvent::PlayerDefeated(e) => self.player_defeated.emit(e),
        }
    }
}
