use crate::models::message::Turn;
use crate::models::role::Role;

/// Ordered, append-only log of the turns exchanged in one session.
///
/// Only the agent appends. Everyone else reads a slice or takes a snapshot.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_system<S: Into<String>>(system: Option<S>) -> Self {
        let mut conversation = Self::new();
        if let Some(system) = system {
            conversation.push(Turn::system(system));
        }
        conversation
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Drop everything after the leading system turn, if any
    pub(crate) fn reset(&mut self) {
        let keep = match self.turns.first() {
            Some(turn) if turn.role == Role::System => 1,
            _ => 0,
        };
        self.turns.truncate(keep);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Owned copy for callers that need to keep the history around
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
