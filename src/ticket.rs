//! Request sequencing shared by the controllers: the last issued request wins.

/// Opaque sequence number handed out when a fetch is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct TicketCounter {
    latest: u64,
}

impl TicketCounter {
    pub fn issue(&mut self) -> Ticket {
        self.latest += 1;
        Ticket(self.latest)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.latest
    }
}

/// How a completed fetch was applied to its controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Applied,
    /// A newer request was issued after this one; the response was dropped.
    Stale,
    Failed(crate::error::FailureKind),
}
