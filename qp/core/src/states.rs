//! State handler return codes

/// What a state handler did with an event.
///
/// `S` is the state identifier of the machine, usually a fieldless enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QStateReturn<S> {
    /// Event was handled in this state
    Handled,
    /// A guard rejected the event; the parent state gets it next
    Unhandled,
    /// Transition to a new state
    Transition(S),
    /// Not handled here; bubble to the registered parent state
    Super,
    /// Nested initial transition, only valid as the reply to INIT
    Initial(S),
}

impl<S> QStateReturn<S> {
    /// Check if the event was consumed by this state
    pub fn is_handled(&self) -> bool {
        matches!(
            self,
            QStateReturn::Handled | QStateReturn::Transition(_) | QStateReturn::Initial(_)
        )
    }

    /// Check if this is a transition
    pub fn is_transition(&self) -> bool {
        matches!(self, QStateReturn::Transition(_) | QStateReturn::Initial(_))
    }

    /// Target of a transition, if any
    pub fn target(&self) -> Option<&S> {
        match self {
            QStateReturn::Transition(s) | QStateReturn::Initial(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(feature = "defmt")]
impl<S> defmt::Format for QStateReturn<S> {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            QStateReturn::Handled => defmt::write!(fmt, "Handled"),
            QStateReturn::Unhandled => defmt::write!(fmt, "Unhandled"),
            QStateReturn::Transition(_) => defmt::write!(fmt, "Transition"),
            QStateReturn::Super => defmt::write!(fmt, "Super"),
            QStateReturn::Initial(_) => defmt::write!(fmt, "Initial"),
        }
    }
}
