use std::fmt::Display;

use rst_common::with_errors::thiserror::{self, Error};

/// `TransitionError` raised when a trigger is not allowed from the current state
#[derive(Debug, PartialEq, Error, Clone)]
#[error("invalid transition from {from} on {trigger}")]
pub struct TransitionError {
    pub from: String,
    pub trigger: String,
}

impl TransitionError {
    pub fn new(from: impl Display, trigger: impl Display) -> Self {
        Self {
            from: from.to_string(),
            trigger: trigger.to_string(),
        }
    }
}

/// `StateMachine` is a pure transition function shared by all protocol states
///
/// The implementer only need to define the transition table through `next`. Any caller
/// must evaluate `fire` before performing any persistence or network side effect, so an
/// illegal transition never leaves anything behind
pub trait StateMachine: Sized + Copy + Display {
    type Trigger: Copy + Display;

    fn next(&self, trigger: Self::Trigger) -> Option<Self>;

    fn is_terminal(&self) -> bool;

    fn fire(&self, trigger: Self::Trigger) -> Result<Self, TransitionError> {
        self.next(trigger)
            .ok_or_else(|| TransitionError::new(*self, trigger))
    }
}
