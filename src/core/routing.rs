//! Display metadata for the specialist that produced a response.
//!
//! The backend names which master agent answered each request; the client
//! only ever derives presentation attributes from that name. The mapping is
//! a pure lookup with one fallback tuple, so it is safe to call at render
//! time on every frame.

use tracing::debug;

/// Icon, human-readable label, and badge color for one specialist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteStyle {
    pub icon: &'static str,
    pub label: &'static str,
    pub color: &'static str,
}

/// Used for any unrecognized (or absent) specialist identifier.
pub const FALLBACK_ROUTE: RouteStyle = RouteStyle {
    icon: "🤖",
    label: "Banking Assistant",
    color: "#6c757d",
};

/// The router itself; responses it answers directly carry this name and are
/// rendered without a "routed to" badge.
pub const MAIN_AGENT: &str = "MainBankingMasterAgent";

const ROUTES: &[(&str, RouteStyle)] = &[
    (
        "AccountMasterAgent",
        RouteStyle {
            icon: "🏦",
            label: "Account Specialist",
            color: "#4a90e2",
        },
    ),
    (
        "CardMasterAgent",
        RouteStyle {
            icon: "💳",
            label: "Card Specialist",
            color: "#28a745",
        },
    ),
    (
        "TransactionMasterAgent",
        RouteStyle {
            icon: "💸",
            label: "Transaction Specialist",
            color: "#ffc107",
        },
    ),
    (
        "LoansAndInvestmentMasterAgent",
        RouteStyle {
            icon: "📈",
            label: "Loans & Investment Specialist",
            color: "#17a2b8",
        },
    ),
    (
        "PayeeRecurringPaymentMasterAgent",
        RouteStyle {
            icon: "🔄",
            label: "Payments Specialist",
            color: "#6f42c1",
        },
    ),
    (
        "BankingServicesMasterAgent",
        RouteStyle {
            icon: "🛠️",
            label: "Banking Services Specialist",
            color: "#fd7e14",
        },
    ),
    (
        MAIN_AGENT,
        RouteStyle {
            icon: "🏦",
            label: "Main Banking Agent",
            color: "#4a90e2",
        },
    ),
];

/// Resolve a specialist identifier to its display metadata.
///
/// Identical input always yields identical output; unknown names (including
/// `None`) resolve to [`FALLBACK_ROUTE`].
pub fn resolve(agent_name: Option<&str>) -> &'static RouteStyle {
    let Some(name) = agent_name else {
        return &FALLBACK_ROUTE;
    };
    match ROUTES.iter().find(|(known, _)| *known == name) {
        Some((_, style)) => style,
        None => {
            debug!(agent_name = %name, "unrecognized specialist, using fallback route");
            &FALLBACK_ROUTE
        }
    }
}
