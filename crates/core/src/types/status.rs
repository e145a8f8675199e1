//! Status enums for orders, payments and users.
//!
//! Orders and their payments share one lifecycle: both start `pending` and
//! settle exactly once, to either `completed` or `failed`.

use serde::{Deserialize, Serialize};

/// Error returned when a status transition is not allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal status transition from {from} to {to}")]
pub struct TransitionError {
    /// Current status.
    pub from: &'static str,
    /// Requested status.
    pub to: &'static str,
}

macro_rules! settlement_status {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            /// Created, not yet settled.
            #[default]
            Pending,
            /// Settled successfully.
            Completed,
            /// Settlement failed.
            Failed,
        }

        impl $name {
            /// Lowercase wire/storage representation.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    Self::Pending => "pending",
                    Self::Completed => "completed",
                    Self::Failed => "failed",
                }
            }

            /// Whether no further transition is possible.
            #[must_use]
            pub const fn is_terminal(self) -> bool {
                matches!(self, Self::Completed | Self::Failed)
            }

            /// Move to `next`, allowing only `pending → completed|failed`.
            ///
            /// # Errors
            ///
            /// Returns [`TransitionError`] for any other transition.
            pub const fn transition(self, next: Self) -> Result<Self, TransitionError> {
                match (self, next) {
                    (Self::Pending, Self::Completed | Self::Failed) => Ok(next),
                    _ => Err(TransitionError {
                        from: self.as_str(),
                        to: next.as_str(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    "pending" => Ok(Self::Pending),
                    "completed" => Ok(Self::Completed),
                    "failed" => Ok(Self::Failed),
                    _ => Err(format!("invalid {}: {s}", stringify!($name))),
                }
            }
        }
    };
}

settlement_status!(
    /// Overall order status.
    OrderStatus
);

settlement_status!(
    /// Payment status of an order. Moves in lockstep with [`OrderStatus`].
    PaymentStatus
);

impl From<PaymentStatus> for OrderStatus {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Pending => Self::Pending,
            PaymentStatus::Completed => Self::Completed,
            PaymentStatus::Failed => Self::Failed,
        }
    }
}

/// Role assigned to a registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular shopper. Every self-registered account gets this role.
    #[default]
    Customer,
    /// Store administrator.
    Admin,
}

impl UserRole {
    /// Lowercase wire/storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}
