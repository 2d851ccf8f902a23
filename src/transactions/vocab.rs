//! Closed vocabularies for transaction type and expense category.
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A value outside a closed vocabulary. The message lists every valid option.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {kind}. Valid options are: {}", .options.join(", "))]
pub struct InvalidVariant {
    pub kind: &'static str,
    pub options: Vec<&'static str>,
}

macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal, $all_fn:ident {
            $($variant:ident => $value:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire and storage values, in declaration order.
            pub fn $all_fn() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.as_str()).collect()
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = InvalidVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| InvalidVariant {
                        kind: $kind,
                        options: Self::$all_fn(),
                    })
            }
        }
    };
}

vocabulary! {
    /// What kind of money movement a transaction records.
    TransactionType, "transaction type", all_types {
        Income => "income",
        Expense => "expense",
        Transfer => "transfer",
        Investment => "investment",
        Refund => "refund",
        Withdrawal => "withdrawal",
        Deposit => "deposit",
    }
}

vocabulary! {
    /// Spending bucket. Required on every transaction, whatever its type.
    ExpenseCategory, "expense category", all_categories {
        Housing => "housing",
        Utilities => "utilities",
        Food => "food",
        Transportation => "transportation",
        Healthcare => "healthcare",
        Entertainment => "entertainment",
        Shopping => "shopping",
        Education => "education",
        PersonalCare => "personal_care",
        DebtPayments => "debt_payments",
        Savings => "savings",
        Investments => "investments",
        Insurance => "insurance",
        GiftsDonations => "gifts_donations",
        Travel => "travel",
        Children => "children",
        Pets => "pets",
        Business => "business",
        Taxes => "taxes",
        Miscellaneous => "miscellaneous",
    }
}
