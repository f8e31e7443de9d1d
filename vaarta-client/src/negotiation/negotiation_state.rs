use std::fmt;

/// Where one side of a call stands in the offer/answer exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationState {
    Idle,
    OfferSent,
    OfferReceived,
    Connected,
    /// Only reachable from `Connected`; returns there once the remote answers.
    Renegotiating,
}

impl NegotiationState {
    /// Whether the remote is expected to send candidates for this call.
    pub fn accepts_candidates(self) -> bool {
        self != Self::Idle
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::OfferSent => "offer-sent",
            Self::OfferReceived => "offer-received",
            Self::Connected => "connected",
            Self::Renegotiating => "renegotiating",
        };
        f.write_str(name)
    }
}
