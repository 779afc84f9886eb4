//! Enumerations stored as Postgres enum types in the `shop` schema.
//!
//! Every enum serializes in lowercase, matching both the database labels and
//! the JSON the API exchanges. `FromStr` accepts the same labels.

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known enum variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    /// Human-readable name of the enum being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Implements `as_str`, `Display` and `FromStr` from one label table.
macro_rules! labels {
    ($ty:ident, $kind:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $ty {
            /// All variants in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The lowercase label used in the database and JSON.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl ::core::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($label => Ok(Self::$variant),)+
                    _ => Err(ParseEnumError {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

// =============================================================================
// Catalog
// =============================================================================

/// Which pet a product is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.product_category", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Dogs,
    Cats,
}

labels!(Category, "category", { Dogs => "dogs", Cats => "cats" });

/// Mat size of a product variant.
///
/// Ordering follows declaration order, which is also the order of the
/// Postgres enum labels, so `ORDER BY size` yields small, medium, large.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.variant_size", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum VariantSize {
    Small,
    Medium,
    Large,
}

labels!(VariantSize, "variant size", {
    Small => "small",
    Medium => "medium",
    Large => "large",
});

/// Rendition label of a stored product image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.image_size", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ImageSize {
    Thumbnail,
    Small,
    #[default]
    Medium,
    Large,
}

labels!(ImageSize, "image size", {
    Thumbnail => "thumbnail",
    Small => "small",
    Medium => "medium",
    Large => "large",
});

/// Moderation state of a review. Only approved reviews are public.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.review_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

labels!(ReviewStatus, "review status", {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

// =============================================================================
// Accounts
// =============================================================================

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.user_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Shopper; may review products and see their own orders.
    #[default]
    Customer,
    /// Full access to catalog, order and review management.
    Admin,
}

labels!(UserRole, "user role", { Customer => "customer", Admin => "admin" });

// =============================================================================
// Orders
// =============================================================================

/// Fulfillment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.order_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

labels!(OrderStatus, "order status", {
    Pending => "pending",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.payment_method", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash on delivery.
    Cod,
    JazzCash,
    EasyPaisa,
    Stripe,
    Card,
}

labels!(PaymentMethod, "payment method", {
    Cod => "cod",
    JazzCash => "jazzcash",
    EasyPaisa => "easypaisa",
    Stripe => "stripe",
    Card => "card",
});

impl PaymentMethod {
    /// Payment status recorded when an order is placed.
    ///
    /// There is no gateway integration: every method except cash on
    /// delivery is treated as settled at checkout.
    #[must_use]
    pub const fn initial_payment_status(self) -> PaymentStatus {
        match self {
            Self::Cod => PaymentStatus::Pending,
            Self::JazzCash | Self::EasyPaisa | Self::Stripe | Self::Card => PaymentStatus::Paid,
        }
    }
}

/// Settlement state of an order's payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.payment_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

labels!(PaymentStatus, "payment status", {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Refunded => "refunded",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip_through_from_str() {
        for method in PaymentMethod::ALL {
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), *method);
        }
        for status in OrderStatus::ALL {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("Cats".parse::<Category>().unwrap(), Category::Cats);
        assert_eq!(" DOGS ".parse::<Category>().unwrap(), Category::Dogs);
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        let err = "birds".parse::<Category>().unwrap_err();
        assert_eq!(err.kind, "category");
        assert_eq!(err.to_string(), "invalid category: birds");
    }

    #[test]
    fn test_payment_method_serde_uses_lowercase_labels() {
        let json = serde_json::to_string(&PaymentMethod::JazzCash).unwrap();
        assert_eq!(json, "\"jazzcash\"");
        let parsed: PaymentMethod = serde_json::from_str("\"easypaisa\"").unwrap();
        assert_eq!(parsed, PaymentMethod::EasyPaisa);
        assert!(serde_json::from_str::<PaymentMethod>("\"bitcoin\"").is_err());
    }

    #[test]
    fn test_variant_size_orders_small_to_large() {
        let mut sizes = vec![VariantSize::Large, VariantSize::Small, VariantSize::Medium];
        sizes.sort();
        assert_eq!(sizes, VariantSize::ALL);
    }

    #[test]
    fn test_initial_payment_status() {
        assert_eq!(
            PaymentMethod::Cod.initial_payment_status(),
            PaymentStatus::Pending
        );
        for method in [
            PaymentMethod::JazzCash,
            PaymentMethod::EasyPaisa,
            PaymentMethod::Stripe,
            PaymentMethod::Card,
        ] {
            assert_eq!(method.initial_payment_status(), PaymentStatus::Paid);
        }
    }
}
