//! Presentation effects and the blocking counter.
//!
//! Commands resolve their full result immediately and then queue an
//! [`EffectBatch`] describing what the player should see. While any
//! blocking batch is outstanding the game refuses new commands; the
//! presentation layer releases it with [`EffectQueue::complete`].

use crate::catalog::TerrainKey;
use crate::combat::Strike;
use crate::grid::Cell;
use crate::player::PlayerId;
use crate::unit::UnitId;

/// Identifies a queued batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

/// One visual step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// A unit walks along a path.
    Walk {
        /// The walker.
        unit: UnitId,
        /// Cells from start to destination.
        path: Vec<Cell>,
    },
    /// Damage from an attack, splash or bash.
    Strike(Strike),
    /// A unit dies.
    Kill {
        /// The fallen unit.
        unit: UnitId,
        /// Where it fell.
        cell: Cell,
        /// Whether a grave was left behind.
        grave: bool,
    },
    /// A grave rises as a new unit.
    Raise {
        /// The raised unit.
        unit: UnitId,
        /// The grave cell.
        cell: Cell,
    },
    /// Terrain changes hands or is rebuilt.
    Terrain {
        /// Changed cell.
        cell: Cell,
        /// New terrain.
        terrain: TerrainKey,
    },
    /// A unit regains hitpoints.
    Heal {
        /// Healed unit.
        unit: UnitId,
        /// Hitpoints restored.
        amount: u32,
    },
    /// A grave crumbles.
    GraveExpired {
        /// The grave cell.
        cell: Cell,
    },
    /// Announce a new turn.
    TurnBanner {
        /// Whose turn it is.
        player: PlayerId,
        /// Global turn counter.
        turn: u32,
    },
}

/// Effects queued by one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectBatch {
    /// Pass to [`EffectQueue::complete`] once played.
    pub ticket: Ticket,
    /// Effects in playback order.
    pub effects: Vec<Effect>,
    /// Whether the game is blocked until this batch completes.
    pub blocking: bool,
}

/// Queued batches plus the outstanding blocking tickets.
#[derive(Debug, Clone, Default)]
pub struct EffectQueue {
    next_ticket: u64,
    pending: Vec<EffectBatch>,
    outstanding: Vec<Ticket>,
}

impl EffectQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a batch. Empty batches are dropped.
    pub fn push(&mut self, effects: Vec<Effect>, blocking: bool) -> Option<Ticket> {
        if effects.is_empty() {
            return None;
        }
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        if blocking {
            self.outstanding.push(ticket);
        }
        self.pending.push(EffectBatch {
            ticket,
            effects,
            blocking,
        });
        Some(ticket)
    }

    /// Hand every queued batch to the presentation layer.
    pub fn take(&mut self) -> Vec<EffectBatch> {
        std::mem::take(&mut self.pending)
    }

    /// Release a blocking batch. Returns `false` for unknown or already
    /// completed tickets.
    pub fn complete(&mut self, ticket: Ticket) -> bool {
        let before = self.outstanding.len();
        self.outstanding.retain(|&t| t != ticket);
        before != self.outstanding.len()
    }

    /// Release every outstanding batch.
    pub fn complete_all(&mut self) {
        self.outstanding.clear();
    }

    /// Number of outstanding blocking batches.
    #[must_use]
    pub fn blocking(&self) -> usize {
        self.outstanding.len()
    }

    /// Whether commands must wait.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        !self.outstanding.is_empty()
    }
}
