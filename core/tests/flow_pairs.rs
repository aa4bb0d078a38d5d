//! Flow aggregation tests.
//!
//! Covers: the worked three-transfer example, exclusion of rows with a
//! missing account id, row-count semantics for repeated transfer ids,
//! self-loops, and the completeness property over the retained rows.

use flownet_core::{
    config::ProfileThresholds,
    flow::{aggregate_flow_pairs, FlowPair},
    participant::participant_metrics,
    records::TransferRecord,
    table::Table,
};
use serde_json::json;

fn transfer(id: i64, s: Option<i64>, r: Option<i64>, amount: f64) -> TransferRecord {
    TransferRecord {
        transfer_id: Some(id),
        sender_account_id: s,
        recipient_account_id: r,
        normalised_amount: amount,
    }
}

#[test]
fn worked_example_produces_three_pairs() {
    let transfers = vec![
        TransferRecord::new(1, 10, 20, 100.0),
        TransferRecord::new(2, 20, 10, 50.0),
        TransferRecord::new(3, 10, 30, 75.0),
    ];

    let pairs = aggregate_flow_pairs(&transfers);

    assert_eq!(
        pairs,
        vec![
            FlowPair::new(10, 20, 1, 100.0),
            FlowPair::new(10, 30, 1, 75.0),
            FlowPair::new(20, 10, 1, 50.0),
        ]
    );
}

#[test]
fn rows_with_missing_ids_are_excluded_not_grouped() {
    let transfers = vec![
        transfer(1, Some(1), Some(2), 10.0),
        transfer(2, None, Some(2), 500.0),
        transfer(3, Some(1), None, 700.0),
        transfer(4, None, None, 900.0),
        transfer(5, Some(1), Some(2), 5.0),
    ];

    let pairs = aggregate_flow_pairs(&transfers);

    assert_eq!(pairs.len(), 1, "Only the (1, 2) pair should survive: {pairs:?}");
    assert_eq!(pairs[0].transfer_count, 2);
    assert_eq!(pairs[0].total_value, 15.0);
}

#[test]
fn repeated_transfer_ids_are_counted_as_rows() {
    let transfers = vec![
        TransferRecord::new(7, 1, 2, 10.0),
        TransferRecord::new(7, 1, 2, 10.0),
        TransferRecord::new(7, 1, 2, 10.0),
    ];

    let pairs = aggregate_flow_pairs(&transfers);

    assert_eq!(pairs[0].transfer_count, 3);
    assert_eq!(pairs[0].total_value, 30.0);
}

#[test]
fn self_loops_are_ordinary_pairs() {
    let transfers = vec![
        TransferRecord::new(1, 4, 4, 12.5),
        TransferRecord::new(2, 4, 4, 7.5),
    ];

    let pairs = aggregate_flow_pairs(&transfers);

    assert_eq!(pairs, vec![FlowPair::new(4, 4, 2, 20.0)]);
    assert!(pairs[0].is_self_loop());
}

#[test]
fn value_is_conserved_over_retained_rows() {
    let mut transfers = Vec::new();
    for i in 0..200i64 {
        let sender = if i % 17 == 0 { None } else { Some(i % 7) };
        let recipient = Some((i * 3) % 11);
        transfers.push(transfer(i, sender, recipient, (i % 13) as f64 * 2.5));
    }

    let pairs = aggregate_flow_pairs(&transfers);

    let expected: f64 = transfers
        .iter()
        .filter(|t| t.endpoints().is_some())
        .map(|t| t.normalised_amount)
        .sum();
    let actual: f64 = pairs.iter().map(|p| p.total_value).sum();
    assert!(
        (expected - actual).abs() < 1e-9,
        "Flow pair totals {actual} should equal retained transfer totals {expected}"
    );

    let mut keys: Vec<_> = pairs.iter().map(|p| (p.source_id, p.destination_id)).collect();
    let before = keys.len();
    keys.dedup();
    assert_eq!(before, keys.len(), "Each ordered pair must appear exactly once");
}

#[test]
fn transfers_read_from_a_loose_table() {
    let table = Table::new(
        "transfers",
        &["transfer_id", "sender_account_id", "recipient_account_id", "normalised_amount"],
    )
    .with_row(vec![json!(1), json!(10), json!("20"), json!("100.5")])
    .with_row(vec![json!(2), json!(null), json!(20), json!(3.0)])
    .with_row(vec![json!(3), json!(10.0), json!(20), json!("n/a")]);

    let transfers = TransferRecord::from_table(&table).unwrap();
    let pairs = aggregate_flow_pairs(&transfers);

    assert_eq!(pairs, vec![FlowPair::new(10, 20, 2, 100.5)]);
}

#[test]
fn transfer_table_without_amount_is_a_schema_error() {
    let table = Table::new(
        "transfers",
        &["transfer_id", "sender_account_id", "recipient_account_id"],
    );

    let err = TransferRecord::from_table(&table).unwrap_err();

    assert_eq!(
        err.missing_columns().unwrap(),
        &["normalised_amount".to_string()]
    );
}

#[test]
fn small_amounts_after_a_large_one_are_not_lost() {
    let transfers = vec![
        TransferRecord::new(1, 1, 2, 1e16),
        TransferRecord::new(2, 1, 2, 1.0),
        TransferRecord::new(3, 1, 2, 1.0),
    ];

    let pairs = aggregate_flow_pairs(&transfers);

    assert_eq!(pairs[0].total_value, 1e16 + 2.0, "Pair total dropped the small amounts");

    let metrics = participant_metrics(&pairs, &ProfileThresholds::default());
    assert_eq!(metrics[0].participant_id, 1);
    assert_eq!(metrics[0].total_sent, 1e16 + 2.0);
    assert_eq!(metrics[1].total_received, 1e16 + 2.0);
}

#[test]
fn participant_totals_across_pairs_keep_small_amounts() {
    let pairs = vec![
        FlowPair::new(1, 2, 1, 1e16),
        FlowPair::new(1, 3, 1, 1.0),
        FlowPair::new(1, 4, 1, 1.0),
    ];

    let metrics = participant_metrics(&pairs, &ProfileThresholds::default());

    assert_eq!(metrics[0].total_sent, 1e16 + 2.0);
}
