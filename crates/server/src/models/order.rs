//! Orders, order lines and computed totals.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use procura_core::{
    ContactId, OrderId, OrderItemId, OrderState, ProductInfoId, Quantity, ShopId, UserId,
    line_total, total_sum,
};

/// An order row. A basket is an order in [`OrderState::Basket`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub state: OrderState,
    pub contact_id: ContactId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One order line joined with its product info, product and shop.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItemView {
    pub id: OrderItemId,
    #[serde(skip)]
    pub order_id: OrderId,
    pub product_info_id: ProductInfoId,
    pub product_name: String,
    pub model: String,
    pub shop_id: ShopId,
    pub shop_name: String,
    pub quantity: Quantity,
    /// Current unit price from the catalog.
    pub price: Decimal,
    /// `quantity × price`, filled in when the summary is built.
    #[sqlx(skip)]
    pub line_total: Decimal,
}

/// An order with its items and a total computed from current prices.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemView>,
    pub total_sum: Decimal,
}

impl OrderSummary {
    /// Build a summary, computing line totals and the order total.
    #[must_use]
    pub fn new(order: Order, mut items: Vec<OrderItemView>) -> Self {
        for item in &mut items {
            item.line_total = line_total(item.price, item.quantity);
        }
        let total_sum = total_sum(items.iter().map(|item| (item.price, item.quantity)));
        Self {
            order,
            items,
            total_sum,
        }
    }

    /// Group items by order, preserving the order of `orders`.
    ///
    /// Items whose order is not in `orders` are dropped.
    #[must_use]
    pub fn group(orders: Vec<Order>, items: Vec<OrderItemView>) -> Vec<Self> {
        let mut by_order: std::collections::HashMap<OrderId, Vec<OrderItemView>> =
            std::collections::HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }
        orders
            .into_iter()
            .map(|order| {
                let items = by_order.remove(&order.id).unwrap_or_default();
                Self::new(order, items)
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn order(id: i32) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(id),
            user_id: UserId::new(1),
            state: OrderState::New,
            contact_id: ContactId::new(1),
            created_at: now,
            updated_at: now,
        }
    }

    fn item(id: i32, order_id: i32, quantity: i64, price: &str) -> OrderItemView {
        OrderItemView {
            id: OrderItemId::new(id),
            order_id: OrderId::new(order_id),
            product_info_id: ProductInfoId::new(id),
            product_name: format!("product {id}"),
            model: String::new(),
            shop_id: ShopId::new(1),
            shop_name: "Связной".to_owned(),
            quantity: Quantity::new(quantity).unwrap(),
            price: Decimal::from_str(price).unwrap(),
            line_total: Decimal::ZERO,
        }
    }

    #[test]
    fn test_summary_total_and_line_totals() {
        let summary = OrderSummary::new(
            order(1),
            vec![item(1, 1, 2, "10.0"), item(2, 1, 1, "5.0")],
        );
        assert_eq!(summary.total_sum, Decimal::from_str("25.0").unwrap());
        assert_eq!(summary.items[0].line_total, Decimal::from_str("20.0").unwrap());
    }

    #[test]
    fn test_group_keeps_order_sequence() {
        let summaries = OrderSummary::group(
            vec![order(2), order(1), order(3)],
            vec![item(1, 1, 1, "3.00"), item(2, 2, 2, "1.50"), item(3, 9, 1, "1.00")],
        );
        let ids: Vec<i32> = summaries.iter().map(|s| s.order.id.as_i32()).collect();
        assert_eq!(ids, vec![2, 1, 3]);
        assert_eq!(summaries[0].total_sum, Decimal::from_str("3.00").unwrap());
        assert!(summaries[2].items.is_empty());
        assert_eq!(summaries[2].total_sum, Decimal::ZERO);
    }

    #[test]
    fn test_summary_serializes_flat() {
        let summary = OrderSummary::new(order(7), vec![item(1, 7, 2, "10.00")]);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["state"], "new");
        assert_eq!(json["total_sum"], "20.00");
        assert!(json["items"][0].get("order_id").is_none());
    }
}
