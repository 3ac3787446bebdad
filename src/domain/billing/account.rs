//! Stripe account labels.
//!
//! A site talks to at most two Stripe accounts. The label is plain data carried
//! by every client, config record and lookup result.

use serde::{Deserialize, Serialize};

/// Which of the two processor accounts a client, config or resource belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StripeAccount {
    /// The account that receives every newly created resource.
    Primary,

    /// The account kept alive during a migration for pre-existing resources.
    Secondary,
}

impl StripeAccount {
    /// Both accounts in fallback order.
    pub const ALL: [StripeAccount; 2] = [StripeAccount::Primary, StripeAccount::Secondary];

    /// Returns the lowercase label used in settings keys, logs and responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            StripeAccount::Primary => "primary",
            StripeAccount::Secondary => "secondary",
        }
    }

    /// Returns the other account.
    pub fn other(&self) -> StripeAccount {
        match self {
            StripeAccount::Primary => StripeAccount::Secondary,
            StripeAccount::Secondary => StripeAccount::Primary,
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, StripeAccount::Primary)
    }
}

impl Default for StripeAccount {
    fn default() -> Self {
        StripeAccount::Primary
    }
}

impl std::fmt::Display for StripeAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown account label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown Stripe account label: {0}")]
pub struct UnknownAccountLabel(pub String);

impl std::str::FromStr for StripeAccount {
    type Err = UnknownAccountLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(StripeAccount::Primary),
            "secondary" => Ok(StripeAccount::Secondary),
            other => Err(UnknownAccountLabel(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_is_primary() {
        assert_eq!(StripeAccount::default(), StripeAccount::Primary);
    }

    #[test]
    fn all_lists_primary_first() {
        assert_eq!(
            StripeAccount::ALL,
            [StripeAccount::Primary, StripeAccount::Secondary]
        );
    }

    #[test]
    fn other_swaps_accounts() {
        assert_eq!(StripeAccount::Primary.other(), StripeAccount::Secondary);
        assert_eq!(StripeAccount::Secondary.other(), StripeAccount::Primary);
    }

    #[test]
    fn parses_labels_case_insensitively() {
        assert_eq!("Primary".parse::<StripeAccount>(), Ok(StripeAccount::Primary));
        assert_eq!(" secondary ".parse::<StripeAccount>(), Ok(StripeAccount::Secondary));
        assert!("tertiary".parse::<StripeAccount>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&StripeAccount::Secondary).unwrap();
        assert_eq!(json, "\"secondary\"");
    }

    proptest! {
        #[test]
        fn display_parse_round_trip(idx in 0usize..2) {
            let account = StripeAccount::ALL[idx];
            prop_assert_eq!(account.to_string().parse::<StripeAccount>(), Ok(account));
        }

        #[test]
        fn unknown_labels_never_parse(label in "[a-z]{1,12}") {
            prop_assume!(label != "primary" && label != "secondary");
            prop_assert!(label.parse::<StripeAccount>().is_err());
        }
    }
}
