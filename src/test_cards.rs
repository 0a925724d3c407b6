//! Sandbox test cards
//!
//! Card numbers the sandbox backend reserves for deterministic outcomes.

use crate::payments::PaymentOutcome;

/// Why a decline card is declined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    /// Not enough funds
    InsufficientFunds,
    /// Card past its expiry
    ExpiredCard,
    /// Wrong CVC
    IncorrectCvc,
}

impl DeclineReason {
    /// Machine-readable decline code.
    pub const fn code(self) -> &'static str {
        match self {
            Self::InsufficientFunds => "insufficient_funds",
            Self::ExpiredCard => "expired_card",
            Self::IncorrectCvc => "incorrect_cvc",
        }
    }

    /// Human-readable message.
    pub const fn message(self) -> &'static str {
        match self {
            Self::InsufficientFunds => "Card declined: insufficient funds",
            Self::ExpiredCard => "Card declined: card expired",
            Self::IncorrectCvc => "Card declined: incorrect CVC",
        }
    }
}

/// What the sandbox does with a test card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardBehaviour {
    /// Charge completes
    Approve,
    /// Charge is refused
    Decline(DeclineReason),
    /// Charge waits on 3-D Secure and stays pending
    RequiresAuthentication,
}

/// A reserved sandbox card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestCard {
    /// Short name used on the command line
    pub name: &'static str,

    /// Card number
    pub number: &'static str,

    /// Sandbox outcome
    pub behaviour: CardBehaviour,
}

impl TestCard {
    /// Visa that always succeeds.
    pub const SUCCESS_VISA: Self = Self {
        name: "success_visa",
        number: "4111111111111111",
        behaviour: CardBehaviour::Approve,
    };

    /// Mastercard that always succeeds.
    pub const SUCCESS_MASTERCARD: Self = Self {
        name: "success_mastercard",
        number: "5555555555554444",
        behaviour: CardBehaviour::Approve,
    };

    /// Declined for insufficient funds.
    pub const DECLINE_INSUFFICIENT: Self = Self {
        name: "decline_insufficient",
        number: "4000000000000002",
        behaviour: CardBehaviour::Decline(DeclineReason::InsufficientFunds),
    };

    /// Declined as expired.
    pub const DECLINE_EXPIRED: Self = Self {
        name: "decline_expired",
        number: "4000000000000069",
        behaviour: CardBehaviour::Decline(DeclineReason::ExpiredCard),
    };

    /// Declined for a wrong CVC.
    pub const DECLINE_CVC: Self = Self {
        name: "decline_cvc",
        number: "4000000000000127",
        behaviour: CardBehaviour::Decline(DeclineReason::IncorrectCvc),
    };

    /// Requires 3-D Secure.
    pub const REQUIRES_3DS: Self = Self {
        name: "requires_3ds",
        number: "4000000000000341",
        behaviour: CardBehaviour::RequiresAuthentication,
    };

    /// Every reserved card.
    pub const ALL: [Self; 6] = [
        Self::SUCCESS_VISA,
        Self::SUCCESS_MASTERCARD,
        Self::DECLINE_INSUFFICIENT,
        Self::DECLINE_EXPIRED,
        Self::DECLINE_CVC,
        Self::REQUIRES_3DS,
    ];

    /// Look up a reserved card by number. Whitespace in `number` is ignored.
    pub fn lookup(number: &str) -> Option<Self> {
        let normalized: String = number.chars().filter(|c| !c.is_whitespace()).collect();

        Self::ALL.into_iter().find(|card| card.number == normalized)
    }

    /// Outcome a charge with this card settles into.
    pub const fn expected_outcome(self) -> PaymentOutcome {
        match self.behaviour {
            CardBehaviour::Approve => PaymentOutcome::Succeeded,
            CardBehaviour::Decline(_) => PaymentOutcome::Failed,
            CardBehaviour::RequiresAuthentication => PaymentOutcome::Pending,
        }
    }
}
