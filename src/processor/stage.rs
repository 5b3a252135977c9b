use tracing::trace;

/// Progress of one unit of work through the processor.
///
/// `Pending → LocksAcquired → Validated → Applied → Committed`, with a move
/// to `Aborted` allowed from any stage that is not terminal.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Stage {
    Pending,
    LocksAcquired,
    Validated,
    Applied,
    Committed,
    Aborted
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Committed | Stage::Aborted)
    }

    pub fn can_advance_to(&self, next: Stage) -> bool {
        match (self, next) {
            (current, Stage::Aborted) => !current.is_terminal(),
            (Stage::Pending, Stage::LocksAcquired)
            | (Stage::LocksAcquired, Stage::Validated)
            | (Stage::Validated, Stage::Applied)
            | (Stage::Applied, Stage::Committed) => true,
            _ => false
        }
    }

    pub fn advance(&mut self, next: Stage) {
        debug_assert!(self.can_advance_to(next), "Illegal stage transition [{self:?}] -> [{next:?}]");
        trace!("Stage [{self:?}] -> [{next:?}]");
        *self = next;
    }
}
