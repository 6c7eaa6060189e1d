//! Outbound per-order summary consumed by the counter stage.
//!
//! ```text
//! {"user_id": "...", "product_id": [..], "product_name": [..],
//!  "category_id": [..], "category_name": [..], "order_cnt": [..]}
//! ```
//!
//! `product_id`, `product_name` and `order_cnt` are index-aligned, one entry
//! per distinct product of the order in first-seen order. `order_cnt` is the
//! number of times the product appears on the order. `category_id` and
//! `category_name` are index-aligned, one entry per distinct category.

use serde::{Deserialize, Serialize};

use crate::key::SurrogateId;
use crate::vault::EntitySet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEvent {
    pub user_id: SurrogateId,
    pub product_id: Vec<SurrogateId>,
    pub product_name: Vec<String>,
    pub category_id: Vec<SurrogateId>,
    pub category_name: Vec<String>,
    pub order_cnt: Vec<u32>,
}

/// Summary arrays that are supposed to be index-aligned are not.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "summary arrays are misaligned: {products} product ids, {names} product names, \
     {counts} counts, {categories} category ids, {category_names} category names"
)]
pub struct MisalignedSummary {
    pub products: usize,
    pub names: usize,
    pub counts: usize,
    pub categories: usize,
    pub category_names: usize,
}

impl SummaryEvent {
    /// Build the summary for a decomposed order.
    #[must_use]
    pub fn from_entities(set: &EntitySet) -> Self {
        let mut product_id: Vec<SurrogateId> = Vec::new();
        let mut product_name = Vec::new();
        let mut order_cnt: Vec<u32> = Vec::new();

        for names in &set.satellites.product_names {
            match product_id.iter().position(|id| *id == names.h_product_pk) {
                Some(i) => order_cnt[i] += 1,
                None => {
                    product_id.push(names.h_product_pk);
                    product_name.push(names.name.clone());
                    order_cnt.push(1);
                }
            }
        }

        let mut category_id: Vec<SurrogateId> = Vec::new();
        let mut category_name = Vec::new();
        for hub in &set.hubs.categories {
            if !category_id.contains(&hub.h_category_pk) {
                category_id.push(hub.h_category_pk);
                category_name.push(hub.category_name.clone());
            }
        }

        Self {
            user_id: set.hubs.user.h_user_pk,
            product_id,
            product_name,
            category_id,
            category_name,
            order_cnt,
        }
    }

    /// Check that the aligned arrays have matching lengths.
    ///
    /// # Errors
    ///
    /// Returns [`MisalignedSummary`] with every array length when they differ.
    pub fn check_alignment(&self) -> Result<(), MisalignedSummary> {
        let products = self.product_id.len();
        if self.product_name.len() == products
            && self.order_cnt.len() == products
            && self.category_name.len() == self.category_id.len()
        {
            return Ok(());
        }
        Err(MisalignedSummary {
            products,
            names: self.product_name.len(),
            counts: self.order_cnt.len(),
            categories: self.category_id.len(),
            category_names: self.category_name.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::fixtures::closed_message;
    use crate::event::{CategoryRef, OrderEvent, ProductRef};
    use crate::key::derive;
    use crate::vault::{LoadContext, decompose};
    use chrono::Utc;
    use serde_json::json;

    fn entities_for(products: &[&str], categories: &[&str]) -> EntitySet {
        let mut event = OrderEvent::from_message(&closed_message()).expect("fixture");
        event.products = products
            .iter()
            .map(|id| ProductRef {
                id: (*id).to_string(),
                name: None,
            })
            .collect();
        event.categories = categories
            .iter()
            .map(|name| CategoryRef {
                name: (*name).to_string(),
            })
            .collect();
        decompose(&event, &LoadContext::new(Utc::now(), "test")).expect("decompose")
    }

    #[test]
    fn single_product_summary() {
        let summary = SummaryEvent::from_entities(&entities_for(&["p1"], &["c1"]));

        assert_eq!(summary.user_id, derive("u1"));
        assert_eq!(summary.product_id, vec![derive("p1")]);
        assert_eq!(summary.product_name, vec!["p1".to_string()]);
        assert_eq!(summary.category_id, vec![derive("c1")]);
        assert_eq!(summary.category_name, vec!["c1".to_string()]);
        assert_eq!(summary.order_cnt, vec![1]);
    }

    #[test]
    fn repeated_products_are_counted() {
        let summary = SummaryEvent::from_entities(&entities_for(&["p1", "p2", "p1"], &[]));

        assert_eq!(summary.product_id, vec![derive("p1"), derive("p2")]);
        assert_eq!(summary.order_cnt, vec![2, 1]);
        assert!(summary.category_id.is_empty());
        summary.check_alignment().expect("aligned");
    }

    #[test]
    fn wire_shape_matches_counter_contract() {
        let summary = SummaryEvent::from_entities(&entities_for(&["p1"], &["c1"]));
        let value = serde_json::to_value(&summary).expect("serialize");

        assert_eq!(
            value,
            json!({
                "user_id": "0f9e1d07-7a1a-53bf-b2d0-e5d137cc35d4",
                "product_id": ["6375cdd9-b837-5ac9-a4d6-ae200d4e6059"],
                "product_name": ["p1"],
                "category_id": ["b05c6e55-e2b2-5713-b0b0-25e95c4cc05c"],
                "category_name": ["c1"],
                "order_cnt": [1]
            })
        );
    }

    #[test]
    fn misaligned_arrays_are_reported() {
        let mut summary = SummaryEvent::from_entities(&entities_for(&["p1", "p2"], &["c1"]));
        summary.order_cnt.pop();

        let err = summary.check_alignment().expect_err("misaligned");
        assert_eq!(err.products, 2);
        assert_eq!(err.counts, 1);
    }
}
