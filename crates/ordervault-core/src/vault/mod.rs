//! Data Vault entity records.
//!
//! One order event decomposes into an [`EntitySet`]:
//! - hubs: one immutable row per business key (user, order, restaurant,
//!   product, category)
//! - links: one immutable row per relationship instance between two hubs
//! - satellites: append-only descriptive attributes of a hub, versioned by
//!   a content hashdiff
//!
//! Records are plain values. The writer in [`crate::db::writer`] maps their
//! fields to statement parameters per entity kind.

pub mod decompose;

pub use decompose::decompose;

use chrono::{DateTime, Utc};

use crate::key::SurrogateId;

/// Lineage stamped on every record of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadContext {
    /// When the event was loaded.
    pub load_dt: DateTime<Utc>,
    /// Feed that populated the rows, normally the inbound topic.
    pub load_src: String,
}

impl LoadContext {
    #[must_use]
    pub fn new(load_dt: DateTime<Utc>, load_src: impl Into<String>) -> Self {
        Self {
            load_dt,
            load_src: load_src.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Hubs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserHub {
    pub h_user_pk: SurrogateId,
    pub user_id: String,
    pub load_dt: DateTime<Utc>,
    pub load_src: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductHub {
    pub h_product_pk: SurrogateId,
    pub product_id: String,
    pub load_dt: DateTime<Utc>,
    pub load_src: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryHub {
    pub h_category_pk: SurrogateId,
    pub category_name: String,
    pub load_dt: DateTime<Utc>,
    pub load_src: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestaurantHub {
    pub h_restaurant_pk: SurrogateId,
    pub restaurant_id: String,
    pub load_dt: DateTime<Utc>,
    pub load_src: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderHub {
    pub h_order_pk: SurrogateId,
    pub order_id: String,
    pub order_dt: String,
    pub load_dt: DateTime<Utc>,
    pub load_src: String,
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// Key seed: `{h_order_pk}{h_product_pk}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderProductLink {
    pub hk_order_product_pk: SurrogateId,
    pub h_order_pk: SurrogateId,
    pub h_product_pk: SurrogateId,
    pub load_dt: DateTime<Utc>,
    pub load_src: String,
}

/// Key seed: `{h_product_pk}{h_restaurant_pk}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRestaurantLink {
    pub hk_product_restaurant_pk: SurrogateId,
    pub h_product_pk: SurrogateId,
    pub h_restaurant_pk: SurrogateId,
    pub load_dt: DateTime<Utc>,
    pub load_src: String,
}

/// Key seed: `{h_product_pk}{h_category_pk}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCategoryLink {
    pub hk_product_category_pk: SurrogateId,
    pub h_product_pk: SurrogateId,
    pub h_category_pk: SurrogateId,
    pub load_dt: DateTime<Utc>,
    pub load_src: String,
}

/// Key seed: `{h_order_pk}{h_user_pk}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUserLink {
    pub hk_order_user_pk: SurrogateId,
    pub h_order_pk: SurrogateId,
    pub h_user_pk: SurrogateId,
    pub load_dt: DateTime<Utc>,
    pub load_src: String,
}

// ---------------------------------------------------------------------------
// Satellites
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserNames {
    pub h_user_pk: SurrogateId,
    pub username: String,
    pub userlogin: String,
    pub load_dt: DateTime<Utc>,
    pub load_src: String,
    pub hk_user_names_hashdiff: SurrogateId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductNames {
    pub h_product_pk: SurrogateId,
    pub name: String,
    pub load_dt: DateTime<Utc>,
    pub load_src: String,
    pub hk_product_names_hashdiff: SurrogateId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestaurantNames {
    pub h_restaurant_pk: SurrogateId,
    pub name: String,
    pub load_dt: DateTime<Utc>,
    pub load_src: String,
    pub hk_restaurant_names_hashdiff: SurrogateId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderCost {
    pub h_order_pk: SurrogateId,
    pub cost: f64,
    pub payment: String,
    pub load_dt: DateTime<Utc>,
    pub load_src: String,
    pub hk_order_cost_hashdiff: SurrogateId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderStatus {
    pub h_order_pk: SurrogateId,
    pub status: String,
    pub load_dt: DateTime<Utc>,
    pub load_src: String,
    pub hk_order_status_hashdiff: SurrogateId,
}

// ---------------------------------------------------------------------------
// EntitySet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hubs {
    pub user: UserHub,
    pub order: OrderHub,
    pub restaurant: RestaurantHub,
    /// One per element of the event's `products` array, in order.
    pub products: Vec<ProductHub>,
    /// One per element of the event's `categories` array, in order.
    pub categories: Vec<CategoryHub>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Links {
    pub order_products: Vec<OrderProductLink>,
    pub product_restaurants: Vec<ProductRestaurantLink>,
    /// Every product paired with every category of the event.
    pub product_categories: Vec<ProductCategoryLink>,
    pub order_user: OrderUserLink,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Satellites {
    pub user_names: UserNames,
    pub product_names: Vec<ProductNames>,
    pub restaurant_names: RestaurantNames,
    pub order_cost: OrderCost,
    pub order_status: OrderStatus,
}

/// Every hub, link and satellite implied by one order event.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySet {
    pub hubs: Hubs,
    pub links: Links,
    pub satellites: Satellites,
}

impl EntitySet {
    #[must_use]
    pub fn hub_count(&self) -> usize {
        3 + self.hubs.products.len() + self.hubs.categories.len()
    }

    #[must_use]
    pub fn link_count(&self) -> usize {
        1 + self.links.order_products.len()
            + self.links.product_restaurants.len()
            + self.links.product_categories.len()
    }

    #[must_use]
    pub fn satellite_count(&self) -> usize {
        4 + self.satellites.product_names.len()
    }
}
