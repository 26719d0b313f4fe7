//! Inbound operator commands.
//!
//! The three idempotent state-setting actions an operator can request.
//! Each maps to exactly one target state.

use core::fmt;

use crate::gate::TargetState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    /// Open now; the control loop closes again after the configured window.
    OpenTemporary,
    /// Open until an explicit `Close`.
    OpenPermanent,
    Close,
}

impl OperatorCommand {
    pub const ALL: [Self; 3] = [Self::OpenTemporary, Self::OpenPermanent, Self::Close];

    pub fn target(self) -> TargetState {
        match self {
            Self::OpenTemporary => TargetState::OpenTemporary,
            Self::OpenPermanent => TargetState::OpenPermanent,
            Self::Close => TargetState::Closed,
        }
    }

    /// Action name, also the HTTP route segment.
    pub fn name(self) -> &'static str {
        match self {
            Self::OpenTemporary => "open_temporary",
            Self::OpenPermanent => "open_permanent",
            Self::Close => "close",
        }
    }
}

impl fmt::Display for OperatorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
