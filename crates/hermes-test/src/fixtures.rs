//! Value fixtures.
//!
//! - [`Order`] - nested payload with optional fields and ordered collections
//! - [`OrderAttributes`] - naturally and reverse ordered sets and maps
//! - [`Shape`] - polymorphic payload tagged by `kind`
//!
//! # Example
//!
//! ```
//! use hermes_test::fixtures::{sample_order, Order};
//!
//! let order = sample_order();
//! assert_eq!(Order::key().as_str(), "orders.Order");
//! assert_eq!(order.lines.len(), 2);
//! ```

use hermes_core::{Marshaled, TypeKey};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

/// A customer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order number.
    pub id: u64,
    /// Customer reference.
    pub customer: String,
    /// Order lines, in entry order.
    pub lines: Vec<OrderLine>,
    /// Ordered attribute collections.
    pub attributes: OrderAttributes,
    /// Free-text note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Order {
    /// Type key of [`Order`].
    pub const fn key() -> TypeKey {
        TypeKey::of::<Self>()
    }
}

impl Marshaled for Order {
    const TYPE_KEY: &'static str = "orders.Order";
}

/// One line of an [`Order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Stock keeping unit.
    pub sku: String,
    /// Ordered quantity.
    pub quantity: u32,
    /// Unit price in cents.
    pub unit_price_cents: i64,
}

impl Marshaled for OrderLine {
    const TYPE_KEY: &'static str = "orders.OrderLine";
}

/// Collections whose iteration order is part of the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAttributes {
    /// Ascending integers.
    pub natural: BTreeSet<i32>,
    /// Descending strings.
    pub reverse: BTreeSet<Reverse<String>>,
    /// Entries by descending key.
    pub reverse_map: BTreeMap<Reverse<String>, String>,
    /// Entries by ascending key.
    pub navigable_map: BTreeMap<i32, String>,
}

impl Marshaled for OrderAttributes {
    const TYPE_KEY: &'static str = "orders.OrderAttributes";
}

/// A polymorphic payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Shape {
    /// A circle.
    Circle {
        /// Radius.
        radius: f64,
    },
    /// An axis-aligned rectangle.
    Rectangle {
        /// Width.
        width: f64,
        /// Height.
        height: f64,
    },
}

impl Shape {
    /// Type key of [`Shape`].
    pub const fn key() -> TypeKey {
        TypeKey::of::<Self>()
    }

    /// Key naming the concrete variant, as a runtime type would.
    pub const fn variant_key(&self) -> TypeKey {
        match self {
            Self::Circle { .. } => TypeKey::new("geometry.Circle"),
            Self::Rectangle { .. } => TypeKey::new("geometry.Rectangle"),
        }
    }
}

impl Marshaled for Shape {
    const TYPE_KEY: &'static str = "geometry.Shape";
}

/// A fixed order exercising every field.
pub fn sample_order() -> Order {
    let attributes = OrderAttributes {
        natural: [3, 1, 2].into_iter().collect(),
        reverse: ["a", "c", "b"]
            .into_iter()
            .map(|s| Reverse(s.to_string()))
            .collect(),
        reverse_map: [("x", "1"), ("z", "3"), ("y", "2")]
            .into_iter()
            .map(|(k, v)| (Reverse(k.to_string()), v.to_string()))
            .collect(),
        navigable_map: [(20, "twenty"), (10, "ten")]
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect(),
    };

    Order {
        id: 1001,
        customer: "ACME Corp".to_string(),
        lines: vec![
            OrderLine {
                sku: "SKU-1".to_string(),
                quantity: 2,
                unit_price_cents: 1999,
            },
            OrderLine {
                sku: "SKU-2".to_string(),
                quantity: 1,
                unit_price_cents: 500,
            },
        ],
        attributes,
        note: Some("leave at the door".to_string()),
    }
}

/// Proptest strategies for the fixtures.
pub mod strategies {
    use super::*;

    /// Arbitrary [`OrderLine`].
    pub fn order_line() -> impl Strategy<Value = OrderLine> {
        ("[A-Z]{3}-[0-9]{1,4}", 0u32..1000, -100_000i64..100_000).prop_map(
            |(sku, quantity, unit_price_cents)| OrderLine {
                sku,
                quantity,
                unit_price_cents,
            },
        )
    }

    /// Arbitrary [`OrderAttributes`].
    pub fn order_attributes() -> impl Strategy<Value = OrderAttributes> {
        (
            prop::collection::btree_set(any::<i32>(), 0..8),
            prop::collection::btree_set("\\PC{0,8}".prop_map(Reverse), 0..8),
            prop::collection::btree_map("\\PC{0,8}".prop_map(Reverse), "\\PC{0,8}", 0..8),
            prop::collection::btree_map(any::<i32>(), "\\PC{0,8}", 0..8),
        )
            .prop_map(|(natural, reverse, reverse_map, navigable_map)| OrderAttributes {
                natural,
                reverse,
                reverse_map,
                navigable_map,
            })
    }

    /// Arbitrary [`Order`].
    pub fn order() -> impl Strategy<Value = Order> {
        (
            any::<u64>(),
            "\\PC{0,24}",
            prop::collection::vec(order_line(), 0..6),
            order_attributes(),
            prop::option::of("\\PC{0,32}"),
        )
            .prop_map(|(id, customer, lines, attributes, note)| Order {
                id,
                customer,
                lines,
                attributes,
                note,
            })
    }

    /// Arbitrary [`Shape`].
    ///
    /// Dimensions are quarter units so their decimal form parses back to the
    /// same `f64`.
    pub fn shape() -> impl Strategy<Value = Shape> {
        let dimension = || (0u32..4_000_000).prop_map(|n| f64::from(n) / 4.0);
        prop_oneof![
            dimension().prop_map(|radius| Shape::Circle { radius }),
            (dimension(), dimension()).prop_map(|(width, height)| Shape::Rectangle { width, height }),
        ]
    }
}
