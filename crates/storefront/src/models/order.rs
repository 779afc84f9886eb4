//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use paw_core::{
    OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId,
    VariantId, VariantSize,
};

/// Delivery address captured at checkout. Stored as JSONB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    /// `None` for guest checkout.
    pub user_id: Option<UserId>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub shipping_address: ShippingAddress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of an order. Price and size are snapshots taken at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub size: Option<VariantSize>,
    pub price: Decimal,
    pub quantity: i32,
}

/// An order line with the product it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDetail {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub item: OrderItem,
    pub title: String,
    pub slug: String,
    pub sku: String,
}

/// An order together with its lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemDetail>,
}

/// An order as listed in the admin API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrder {
    #[serde(flatten)]
    pub order: Order,
    /// `None` for guest orders or deleted accounts.
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub items: Vec<OrderItemDetail>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shipping_address_postal_code_optional() {
        let address: ShippingAddress = serde_json::from_str(
            r#"{"name":"Ayesha","phone":"03001234567","address":"12 Canal Rd","city":"Lahore"}"#,
        )
        .unwrap();
        assert!(address.postal_code.is_none());

        let json = serde_json::to_value(&address).unwrap();
        assert!(json.get("postalCode").is_none());
        assert_eq!(json["city"], "Lahore");
    }

    #[test]
    fn test_order_with_items_serializes_flat() {
        let order = Order {
            id: OrderId::new(7),
            user_id: None,
            total_amount: Decimal::from(9000),
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::Cod,
            payment_status: PaymentStatus::Pending,
            shipping_address: ShippingAddress {
                name: "Ayesha".to_string(),
                phone: "03001234567".to_string(),
                address: "12 Canal Rd".to_string(),
                city: "Lahore".to_string(),
                postal_code: Some("54000".to_string()),
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(OrderWithItems {
            order,
            items: Vec::new(),
        })
        .unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["totalAmount"], 9000.0);
        assert_eq!(json["paymentMethod"], "cod");
        assert_eq!(json["shippingAddress"]["postalCode"], "54000");
        assert!(json["userId"].is_null());
        assert!(json["items"].as_array().unwrap().is_empty());
    }
}
