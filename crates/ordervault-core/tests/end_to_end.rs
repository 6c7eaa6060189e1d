//! Order events through the loader, the warehouse and the counter stage.

use chrono::Utc;
use ordervault_core::config::{CounterConfig, MalformedPolicy};
use ordervault_core::db::{self, query, writer::VaultWriter};
use ordervault_core::event::{OrderEvent, SummaryEvent};
use ordervault_core::key::derive;
use ordervault_core::loader::{CounterLoader, LoadReport, OrderLoader};
use ordervault_core::lock::RunLock;
use ordervault_core::queue::{JsonlTopic, MemoryQueue, MessageSink, MessageSource};
use ordervault_core::vault::{LoadContext, decompose};
use std::time::Duration;
use tempfile::TempDir;

use fixtures::*;

#[test]
fn single_closed_order_materializes_one_of_everything() {
    let conn = db::open_in_memory().expect("db");
    let mut orders = MemoryQueue::with_messages(ORDER_TOPIC, [closed_order()]);
    let mut summaries = MemoryQueue::new(SUMMARY_TOPIC);

    let report = OrderLoader::new(
        &conn,
        &mut orders,
        &mut summaries,
        loader_config(30, MalformedPolicy::Skip),
    )
    .run()
    .expect("run");
    assert_eq!(report.loaded, 1);

    let stats = query::warehouse_stats(&conn).expect("stats");
    for table in [
        "h_user",
        "h_product",
        "h_category",
        "h_restaurant",
        "h_order",
        "l_order_product",
        "l_product_restaurant",
        "l_product_category",
        "l_order_user",
        "s_user_names",
        "s_product_names",
        "s_restaurant_names",
        "s_order_cost",
        "s_order_status",
    ] {
        assert_eq!(stats.count(table), 1, "expected exactly one row in {table}");
    }
    assert_eq!(stats.total_rows(), 14);

    assert_eq!(summaries.len(), 1);
    let summary: SummaryEvent =
        serde_json::from_value(summaries.consume().expect("consume").expect("summary"))
            .expect("decode summary");
    assert_eq!(summary.user_id, derive("u1"));
    assert_eq!(summary.product_id, vec![derive("p1")]);
    assert_eq!(summary.order_cnt, vec![1]);
    assert_eq!(summary.category_id, vec![derive("c1")]);
}

#[test]
fn orders_that_are_not_closed_write_and_publish_nothing() {
    let conn = db::open_in_memory().expect("db");
    let mut orders = MemoryQueue::with_messages(
        ORDER_TOPIC,
        ["NEW", "ACCEPTED", "CANCELLED", "closed"]
            .map(|status| order_message("o1", status, &["p1"], &["c1"])),
    );
    let mut summaries = MemoryQueue::new(SUMMARY_TOPIC);

    let report = OrderLoader::new(
        &conn,
        &mut orders,
        &mut summaries,
        loader_config(30, MalformedPolicy::Skip),
    )
    .run()
    .expect("run");

    assert_eq!(report.skipped, 4);
    assert_eq!(query::warehouse_stats(&conn).expect("stats").total_rows(), 0);
    assert!(summaries.is_empty());
}

#[test]
fn loading_the_same_order_twice_leaves_the_warehouse_unchanged() {
    let conn = db::open_in_memory().expect("db");
    let mut summaries = MemoryQueue::new(SUMMARY_TOPIC);

    let mut first = MemoryQueue::with_messages(ORDER_TOPIC, [closed_order()]);
    OrderLoader::new(
        &conn,
        &mut first,
        &mut summaries,
        loader_config(30, MalformedPolicy::Skip),
    )
    .run()
    .expect("first run");
    let once = dump_warehouse(&conn);

    let mut replay = MemoryQueue::with_messages(ORDER_TOPIC, [closed_order()]);
    let report = OrderLoader::new(
        &conn,
        &mut replay,
        &mut summaries,
        loader_config(30, MalformedPolicy::Skip),
    )
    .run()
    .expect("second run");

    assert_eq!(report.loaded, 1);
    assert_eq!(dump_warehouse(&conn), once);
    // Each delivery still yields a summary; the counter stage is downstream.
    assert_eq!(summaries.len(), 2);
}

#[test]
fn status_change_appends_a_second_status_version() {
    let conn = db::open_in_memory().expect("db");
    let writer = VaultWriter::new(&conn);
    let ctx = LoadContext::new(Utc::now(), ORDER_TOPIC);

    let closed = OrderEvent::from_message(&closed_order()).expect("closed");
    let mut reopened = closed.clone();
    reopened.status = "REOPENED".to_string();

    let first = decompose(&closed, &ctx).expect("decompose closed");
    let second = decompose(&reopened, &ctx).expect("decompose reopened");
    assert_ne!(
        first.satellites.order_status.hk_order_status_hashdiff,
        second.satellites.order_status.hk_order_status_hashdiff
    );

    writer.write(&first).expect("write closed");
    let stats = writer.write(&second).expect("write reopened");
    assert_eq!(stats.inserted, 1);

    let statuses: Vec<String> = conn
        .prepare("SELECT status FROM s_order_status ORDER BY status")
        .expect("prepare")
        .query_map([], |row| row.get(0))
        .expect("query")
        .collect::<rusqlite::Result<_>>()
        .expect("collect");
    assert_eq!(statuses, vec!["CLOSED".to_string(), "REOPENED".to_string()]);
}

#[test]
fn every_product_is_linked_to_every_category() {
    let conn = db::open_in_memory().expect("db");
    let mut orders = MemoryQueue::with_messages(
        ORDER_TOPIC,
        [order_message("o7", "CLOSED", &["p1", "p2", "p3"], &["soup", "noodles"])],
    );
    let mut summaries = MemoryQueue::new(SUMMARY_TOPIC);

    OrderLoader::new(
        &conn,
        &mut orders,
        &mut summaries,
        loader_config(30, MalformedPolicy::Skip),
    )
    .run()
    .expect("run");

    let stats = query::warehouse_stats(&conn).expect("stats");
    assert_eq!(stats.count("l_product_category"), 6);
    assert_eq!(stats.count("l_order_product"), 3);
    assert_eq!(stats.count("h_category"), 2);
}

#[test]
fn empty_product_and_category_lists_still_load_the_order() {
    let conn = db::open_in_memory().expect("db");
    let mut orders =
        MemoryQueue::with_messages(ORDER_TOPIC, [order_message("o9", "CLOSED", &[], &[])]);
    let mut summaries = MemoryQueue::new(SUMMARY_TOPIC);

    OrderLoader::new(
        &conn,
        &mut orders,
        &mut summaries,
        loader_config(30, MalformedPolicy::Skip),
    )
    .run()
    .expect("run");

    let stats = query::warehouse_stats(&conn).expect("stats");
    assert_eq!(stats.count("h_order"), 1);
    assert_eq!(stats.count("l_order_user"), 1);
    assert_eq!(stats.count("h_product"), 0);
    assert_eq!(stats.count("l_product_category"), 0);
    assert_eq!(stats.count("s_product_names"), 0);

    let summary: SummaryEvent =
        serde_json::from_value(summaries.consume().expect("consume").expect("summary"))
            .expect("decode");
    assert!(summary.product_id.is_empty());
    assert!(summary.order_cnt.is_empty());
}

#[test]
fn summaries_feed_the_counter_stage() {
    let conn = db::open_in_memory().expect("db");
    let mut orders = MemoryQueue::with_messages(
        ORDER_TOPIC,
        [
            order_message("o1", "CLOSED", &["p1", "p1", "p2"], &["c1"]),
            order_message("o2", "CLOSED", &["p1"], &["c1", "c2"]),
        ],
    );
    let mut summaries = MemoryQueue::new(SUMMARY_TOPIC);

    OrderLoader::new(
        &conn,
        &mut orders,
        &mut summaries,
        loader_config(30, MalformedPolicy::Skip),
    )
    .run()
    .expect("load");
    let report = CounterLoader::new(&conn, &mut summaries, CounterConfig::default())
        .run()
        .expect("count");
    assert_eq!(report.applied, 2);

    let user = derive("u1").to_string();
    let product = |id: &str| {
        query::product_counter(&conn, &user, &derive(id).to_string()).expect("product counter")
    };
    let category = |name: &str| {
        query::category_counter(&conn, &user, &derive(name).to_string()).expect("category counter")
    };
    assert_eq!(product("p1"), Some(3));
    assert_eq!(product("p2"), Some(1));
    assert_eq!(category("c1"), Some(2));
    assert_eq!(category("c2"), Some(1));
}

#[test]
fn file_topics_resume_from_the_committed_offset() {
    let dir = TempDir::new().expect("tempdir");
    let conn = db::open_warehouse(&dir.path().join("warehouse.db"), db::DEFAULT_BUSY_TIMEOUT)
        .expect("open warehouse");
    let spool = dir.path().join("queue");

    let mut producer = JsonlTopic::open(&spool, ORDER_TOPIC).expect("open producer");
    for order_id in ["o1", "o2", "o3"] {
        producer
            .produce(&order_message(order_id, "CLOSED", &["p1"], &["c1"]))
            .expect("produce");
    }

    let run = |batch_size: usize| -> LoadReport {
        let mut orders = JsonlTopic::open(&spool, ORDER_TOPIC).expect("open orders");
        let _lock = RunLock::acquire(orders.lock_path(), Duration::from_secs(1)).expect("lock");
        let mut summaries = JsonlTopic::open(&spool, SUMMARY_TOPIC).expect("open summaries");
        OrderLoader::new(
            &conn,
            &mut orders,
            &mut summaries,
            loader_config(batch_size, MalformedPolicy::Skip),
        )
        .run()
        .expect("run")
    };

    assert_eq!(run(2).loaded, 2);
    assert_eq!(run(2).loaded, 1);
    assert_eq!(run(2).fetched, 0);

    let stats = query::warehouse_stats(&conn).expect("stats");
    assert_eq!(stats.count("h_order"), 3);
    assert_eq!(stats.count("h_user"), 1);

    let mut summaries = JsonlTopic::open(&spool, SUMMARY_TOPIC).expect("reopen summaries");
    let mut published = 0;
    while summaries.consume().expect("consume").is_some() {
        published += 1;
    }
    assert_eq!(published, 3);
    assert_eq!(MessageSource::topic(&summaries), SUMMARY_TOPIC);
}
