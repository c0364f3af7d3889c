// Token Ledger Domain Model

use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};

/// Ledger entry identifier (UUID v4, injected)
pub type TokenId = String;

/// Token lifecycle status.
///
/// `Waiting -> Served` on a successful serve, `Waiting -> Missed` on a skip.
/// Terminal once it leaves `Waiting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    Waiting,
    Served,
    Missed,
}

impl std::fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenStatus::Waiting => write!(f, "waiting"),
            TokenStatus::Served => write!(f, "served"),
            TokenStatus::Missed => write!(f, "missed"),
        }
    }
}

impl std::str::FromStr for TokenStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(TokenStatus::Waiting),
            "served" => Ok(TokenStatus::Served),
            "missed" => Ok(TokenStatus::Missed),
            other => Err(DomainError::UnknownTokenStatus(other.to_string())),
        }
    }
}

/// One issued ticket in a shop's ledger.
///
/// `(shop_id, token_number)` is a natural key within a calendar day only;
/// numbers restart at every reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenEntry {
    pub id: TokenId,
    pub shop_id: String,
    pub token_number: i64,
    pub status: TokenStatus,

    /// External payment reference, set at most once
    pub payment_id: Option<String>,

    pub created_at: i64,
    pub served_by: Option<String>,
    pub served_at: Option<i64>,
}

impl TokenEntry {
    /// Create a freshly issued waiting entry
    pub fn issued(
        id: impl Into<String>,
        shop_id: impl Into<String>,
        token_number: i64,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            shop_id: shop_id.into(),
            token_number,
            status: TokenStatus::Waiting,
            payment_id: None,
            created_at,
            served_by: None,
            served_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_entries_start_waiting_and_unclaimed() {
        let entry = TokenEntry::issued("t-1", "shop-1", 1, 1_000);
        assert_eq!(entry.status, TokenStatus::Waiting);
        assert!(entry.payment_id.is_none());
        assert!(entry.served_by.is_none());
        assert!(entry.served_at.is_none());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [TokenStatus::Waiting, TokenStatus::Served, TokenStatus::Missed] {
            assert_eq!(status.to_string().parse::<TokenStatus>().unwrap(), status);
        }
        assert!("cancelled".parse::<TokenStatus>().is_err());
    }
}
