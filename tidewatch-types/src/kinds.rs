//! Tracking-number kinds, cost and caller tiers, priorities and fallback strategies.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Kind of identifier a tracking number represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingKind {
    /// ISO 6346 container number, e.g. `MSCU1234565`.
    Container,
    /// Carrier booking reference.
    Booking,
    /// Bill of lading number.
    BillOfLading,
    /// Vessel identifier (IMO number).
    Vessel,
}

impl TrackingKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Container,
        Self::Booking,
        Self::BillOfLading,
        Self::Vessel,
    ];

    /// Stable, snake-case identifier for logs/errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Booking => "booking",
            Self::BillOfLading => "bill_of_lading",
            Self::Vessel => "vessel",
        }
    }

    /// Infer the kind of an undeclared tracking number.
    ///
    /// - four letters (the fourth being `U`, `J` or `Z`) followed by seven digits is a container;
    /// - `IMO` followed by seven digits, or seven bare digits, is a vessel;
    /// - a letter prefix of at least two characters followed by digits, ten characters or
    ///   longer, is a bill of lading;
    /// - anything else is treated as a booking reference.
    #[must_use]
    pub fn infer(number: &str) -> Self {
        let cleaned: String = number
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        let bytes = cleaned.as_bytes();

        if is_container_number(bytes) {
            return Self::Container;
        }

        let digits = |s: &[u8]| !s.is_empty() && s.iter().all(u8::is_ascii_digit);
        if let Some(rest) = cleaned.strip_prefix("IMO")
            && rest.len() == 7
            && digits(rest.as_bytes())
        {
            return Self::Vessel;
        }
        if bytes.len() == 7 && digits(bytes) {
            return Self::Vessel;
        }

        let prefix = bytes.iter().take_while(|b| b.is_ascii_alphabetic()).count();
        if prefix >= 2 && bytes.len() >= 10 && bytes[prefix..].iter().any(u8::is_ascii_digit) {
            return Self::BillOfLading;
        }

        Self::Booking
    }
}

fn is_container_number(bytes: &[u8]) -> bool {
    bytes.len() == 11
        && bytes[..4].iter().all(u8::is_ascii_alphabetic)
        && matches!(bytes[3], b'U' | b'J' | b'Z')
        && bytes[4..].iter().all(u8::is_ascii_digit)
}

impl fmt::Display for TrackingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags::bitflags! {
    /// Set of tracking-number kinds a provider can serve.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TrackingKinds: u8 {
        /// Container numbers.
        const CONTAINER = 1 << 0;
        /// Booking references.
        const BOOKING = 1 << 1;
        /// Bills of lading.
        const BILL_OF_LADING = 1 << 2;
        /// Vessel identifiers.
        const VESSEL = 1 << 3;
    }
}

impl TrackingKinds {
    /// Whether the set contains the given kind.
    #[must_use]
    pub fn supports(self, kind: TrackingKind) -> bool {
        self.contains(kind.into())
    }
}

impl From<TrackingKind> for TrackingKinds {
    fn from(kind: TrackingKind) -> Self {
        match kind {
            TrackingKind::Container => Self::CONTAINER,
            TrackingKind::Booking => Self::BOOKING,
            TrackingKind::BillOfLading => Self::BILL_OF_LADING,
            TrackingKind::Vessel => Self::VESSEL,
        }
    }
}

/// Pricing tier of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostTier {
    /// No cost per call.
    Free,
    /// Free allowance, paid beyond it.
    Freemium,
    /// Paid per call or by subscription.
    Paid,
    /// Premium contract.
    Premium,
}

impl CostTier {
    /// Numeric cost weight (higher is more expensive).
    #[must_use]
    pub const fn weight(self) -> u8 {
        match self {
            Self::Free => 0,
            Self::Freemium => 1,
            Self::Paid => 2,
            Self::Premium => 3,
        }
    }

    /// Paid and premium providers.
    #[must_use]
    pub const fn is_paid(self) -> bool {
        matches!(self, Self::Paid | Self::Premium)
    }

    /// Stable, snake-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Freemium => "freemium",
            Self::Paid => "paid",
            Self::Premium => "premium",
        }
    }
}

/// Subscription tier of the caller asking for a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerTier {
    /// Free plan; routed cost-first.
    Free,
    /// Regular paid plan.
    #[default]
    Standard,
    /// Premium plan; routed reliability-first.
    Premium,
    /// Enterprise plan; routed reliability-first.
    Enterprise,
}

/// Priority of a lookup. Only `High` bypasses batching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Background refreshes.
    Low,
    /// Regular lookups.
    #[default]
    Normal,
    /// Interactive lookups; dispatched immediately.
    High,
}

/// Policy governing when the orchestrator stops querying further providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Stop at the first success.
    FreeFirst,
    /// Stop only at a success from a provider above 0.85 reliability.
    ReliabilityFirst,
    /// Stop at a success from a provider above 0.75 reliability.
    #[default]
    PaidFirst,
}

impl FallbackStrategy {
    /// Reliability a success must exceed to satisfy this strategy; `None` means any success.
    #[must_use]
    pub const fn stop_threshold(self) -> Option<f64> {
        match self {
            Self::FreeFirst => None,
            Self::ReliabilityFirst => Some(0.85),
            Self::PaidFirst => Some(0.75),
        }
    }

    /// Whether a success at `reliability` lets the orchestrator stop.
    #[must_use]
    pub fn is_satisfied_by(self, reliability: f64) -> bool {
        self.stop_threshold().is_none_or(|t| reliability > t)
    }

    /// Stable, snake-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FreeFirst => "free_first",
            Self::ReliabilityFirst => "reliability_first",
            Self::PaidFirst => "paid_first",
        }
    }
}

impl fmt::Display for FallbackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
