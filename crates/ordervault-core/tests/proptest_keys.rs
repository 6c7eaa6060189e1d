use chrono::{TimeZone, Utc};
use ordervault_core::event::{CategoryRef, OrderEvent, ProductRef};
use ordervault_core::key::{SurrogateId, derive};
use ordervault_core::vault::{LoadContext, decompose};
use proptest::collection::btree_set;
use proptest::prelude::*;
use serde_json::Value;


fn base_event() -> OrderEvent {
    OrderEvent::from_message(&fixtures::closed_order()).expect("fixture")
}

fn natural_key() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{1,24}"
}

fn with_lines(products: &[String], categories: &[String]) -> OrderEvent {
    let mut event = base_event();
    event.products = products
        .iter()
        .map(|id| ProductRef {
            id: id.clone(),
            name: None,
        })
        .collect();
    event.categories = categories
        .iter()
        .map(|name| CategoryRef { name: name.clone() })
        .collect();
    event
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn derive_is_deterministic(seed in any::<String>()) {
        let first = derive(&seed);
        prop_assert_eq!(first, derive(&seed));
        // Survives a text round trip, as it does through the warehouse.
        prop_assert_eq!(first.to_string().parse::<SurrogateId>().expect("parse"), first);
    }

    #[test]
    fn distinct_seeds_give_distinct_ids(a in any::<String>(), b in any::<String>()) {
        prop_assume!(a != b);
        prop_assert_ne!(derive(&a), derive(&b));
    }

    #[test]
    fn link_operand_order_matters(a in natural_key(), b in natural_key()) {
        prop_assume!(a != b);
        let (left, right) = (derive(&a), derive(&b));
        prop_assert_ne!(SurrogateId::link(left, right), SurrogateId::link(right, left));
    }

    #[test]
    fn product_category_links_are_the_cartesian_product(
        products in btree_set(natural_key(), 0..6),
        categories in btree_set(natural_key(), 0..6),
    ) {
        let products: Vec<String> = products.into_iter().collect();
        let categories: Vec<String> = categories.into_iter().collect();
        let event = with_lines(&products, &categories);
        let set = decompose(&event, &LoadContext::new(Utc::now(), "prop")).expect("decompose");

        prop_assert_eq!(set.links.product_categories.len(), products.len() * categories.len());
        let mut keys: Vec<_> = set
            .links
            .product_categories
            .iter()
            .map(|link| link.hk_product_category_pk)
            .collect();
        keys.sort();
        keys.dedup();
        prop_assert_eq!(keys.len(), products.len() * categories.len());
    }

    #[test]
    fn hashdiffs_ignore_load_lineage(
        offset_secs in 0i64..10_000_000,
        source in "[a-z-]{1,16}",
    ) {
        let event = base_event();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("valid ts");
        let a = decompose(&event, &LoadContext::new(base, "order-service-orders")).expect("a");
        let b = decompose(
            &event,
            &LoadContext::new(base + chrono::Duration::seconds(offset_secs), source),
        )
        .expect("b");

        prop_assert_eq!(
            a.satellites.user_names.hk_user_names_hashdiff,
            b.satellites.user_names.hk_user_names_hashdiff
        );
        prop_assert_eq!(
            a.satellites.order_cost.hk_order_cost_hashdiff,
            b.satellites.order_cost.hk_order_cost_hashdiff
        );
        prop_assert_eq!(
            a.satellites.order_status.hk_order_status_hashdiff,
            b.satellites.order_status.hk_order_status_hashdiff
        );
        prop_assert_eq!(a.hubs.order.h_order_pk, b.hubs.order.h_order_pk);
    }

    #[test]
    fn hashdiff_tracks_attribute_changes(name in "[a-zA-Z ]{1,20}", other in "[a-zA-Z ]{1,20}") {
        let mut first = base_event();
        first.restaurant.name = name.clone();
        let mut second = base_event();
        second.restaurant.name = other.clone();

        let ctx = LoadContext::new(Utc::now(), "prop");
        let a = decompose(&first, &ctx).expect("a");
        let b = decompose(&second, &ctx).expect("b");

        prop_assert_eq!(
            name == other,
            a.satellites.restaurant_names.hk_restaurant_names_hashdiff
                == b.satellites.restaurant_names.hk_restaurant_names_hashdiff
        );
    }

    #[test]
    fn arbitrary_json_never_panics_the_parser(value in arb_json()) {
        let _ = OrderEvent::from_message(&value);
    }
}

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 32, 6, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            proptest::collection::btree_map(
                prop_oneof![
                    Just("payload".to_string()),
                    Just("status".to_string()),
                    Just("user".to_string()),
                    Just("id".to_string()),
                    "[a-z]{1,8}",
                ],
                inner,
                0..6,
            )
            .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}
