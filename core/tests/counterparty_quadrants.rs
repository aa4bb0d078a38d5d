//! Counterparty value/volume classifier tests.

use flownet_core::{
    config::QuadrantConfig,
    counterparty::{
        aggregate_counterparties, aggregate_totals, classify_counterparty_quadrants,
        quadrant_counts, quadrant_cuts, CounterpartyAggregate, Quadrant, UNKNOWN_COUNTERPARTY,
    },
    records::{CounterpartyRole, CounterpartyTxn},
    table::Table,
};
use serde_json::json;

use CounterpartyRole::{Beneficiary, Remitter};

fn agg(name: &str, role: CounterpartyRole, value: f64, volume: u64) -> CounterpartyAggregate {
    CounterpartyAggregate {
        name: name.to_string(),
        role,
        value_total: value,
        volume_total: volume,
    }
}

fn quadrant_of(rows: &[flownet_core::counterparty::ClassifiedCounterparty], name: &str) -> Quadrant {
    rows.iter()
        .find(|r| r.name == name)
        .unwrap_or_else(|| panic!("{name} missing"))
        .quadrant
}

#[test]
fn blank_and_missing_names_share_the_unknown_bucket() {
    let txns = vec![
        CounterpartyTxn::new(None, Remitter, 10.0),
        CounterpartyTxn::new(Some("   "), Remitter, 5.0),
        CounterpartyTxn::new(Some(""), Beneficiary, 1.0),
        CounterpartyTxn::new(Some("Acme"), Remitter, 2.0),
    ];

    let aggs = aggregate_counterparties(&txns);

    let unknown_remitter = aggs
        .iter()
        .find(|a| a.name == UNKNOWN_COUNTERPARTY && a.role == Remitter)
        .expect("Unknown remitter bucket should exist");
    assert_eq!(unknown_remitter.value_total, 15.0);
    assert_eq!(unknown_remitter.volume_total, 2);
    assert!(
        aggs.iter().any(|a| a.name == UNKNOWN_COUNTERPARTY && a.role == Beneficiary),
        "Roles are bucketed separately"
    );
    assert_eq!(aggs.len(), 3);
}

#[test]
fn non_numeric_amounts_add_nothing_but_still_count() {
    let txns = vec![
        CounterpartyTxn::new(Some("Acme"), Remitter, 100.0),
        CounterpartyTxn::new(Some("Acme"), Remitter, "n/a"),
        CounterpartyTxn::new(Some("Acme"), Remitter, " 25.5 "),
    ];

    let aggs = aggregate_counterparties(&txns);

    assert_eq!(aggs.len(), 1);
    assert_eq!(aggs[0].value_total, 125.5);
    assert_eq!(aggs[0].volume_total, 3, "Every row is volume, numeric or not");
}

#[test]
fn medians_split_into_four_quadrants() {
    let aggs = vec![
        agg("A", Remitter, 10_000_000.0, 10),
        agg("B", Remitter, 1_000_000.0, 1),
        agg("C", Beneficiary, 5_000_000.0, 5),
        agg("D", Beneficiary, 500_000.0, 8),
    ];
    let config = QuadrantConfig::default();

    let cuts = quadrant_cuts(&aggs, &config);
    assert_eq!(cuts.value_median, 3.0);
    assert_eq!(cuts.volume_median, 6.5);

    let rows = classify_counterparty_quadrants(&aggs, &config);
    assert_eq!(quadrant_of(&rows, "A"), Quadrant::HighValueHighVolume);
    assert_eq!(quadrant_of(&rows, "B"), Quadrant::LowValueLowVolume);
    assert_eq!(quadrant_of(&rows, "C"), Quadrant::HighValueLowVolume);
    assert_eq!(quadrant_of(&rows, "D"), Quadrant::LowValueHighVolume);
    assert_eq!(quadrant_of(&rows, "D").to_string(), "Low Value / High Volume");

    let order: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(order, vec!["A", "C", "B", "D"], "Sorted by value descending");
    assert_eq!(rows[0].value_scaled, 10.0);
}

#[test]
fn value_equal_to_the_median_meets_it() {
    let aggs = vec![
        agg("low", Remitter, 1_000_000.0, 1),
        agg("mid", Remitter, 2_000_000.0, 2),
        agg("high", Remitter, 3_000_000.0, 3),
    ];

    let rows = classify_counterparty_quadrants(&aggs, &QuadrantConfig::default());

    assert_eq!(quadrant_of(&rows, "mid"), Quadrant::HighValueHighVolume);
    assert_eq!(quadrant_of(&rows, "low"), Quadrant::LowValueLowVolume);
}

#[test]
fn single_counterparty_is_high_on_both() {
    let rows = classify_counterparty_quadrants(
        &[agg("solo", Beneficiary, 42.0, 1)],
        &QuadrantConfig::default(),
    );

    assert_eq!(rows[0].quadrant, Quadrant::HighValueHighVolume);
}

#[test]
fn empty_input_classifies_nothing() {
    let rows = classify_counterparty_quadrants(&[], &QuadrantConfig::default());
    assert!(rows.is_empty());
    assert!(quadrant_counts(&rows).iter().all(|(_, n)| *n == 0));
}

#[test]
fn reclassifying_gives_the_same_answer() {
    let aggs = vec![
        agg("A", Remitter, 7.0, 3),
        agg("B", Remitter, 7.0, 3),
        agg("C", Beneficiary, 2.0, 9),
        agg("D", Beneficiary, 11.0, 1),
        agg("E", Remitter, 0.0, 4),
    ];
    let config = QuadrantConfig::default();

    let first = classify_counterparty_quadrants(&aggs, &config);
    let second = classify_counterparty_quadrants(&aggs, &config);

    assert_eq!(first, second);
    let names: Vec<&str> = first.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["D", "A", "B", "C", "E"], "Equal values keep input order");
}

#[test]
fn value_scale_is_configurable() {
    let aggs = vec![agg("A", Remitter, 300.0, 1), agg("B", Remitter, 100.0, 1)];

    let rows = classify_counterparty_quadrants(&aggs, &QuadrantConfig { value_scale: 100.0 });

    assert_eq!(rows[0].value_scaled, 3.0);
    assert_eq!(quadrant_cuts(&aggs, &QuadrantConfig { value_scale: 100.0 }).value_median, 2.0);
}

#[test]
fn totals_merge_roles_and_rank_largest_first() {
    let txns = vec![
        CounterpartyTxn::new(Some("Acme"), Remitter, 10.0),
        CounterpartyTxn::new(Some("Acme"), Beneficiary, 5.0),
        CounterpartyTxn::new(Some("Borealis"), Remitter, 20.0),
        CounterpartyTxn::new(None, Beneficiary, 1.0),
    ];

    let totals = aggregate_totals(&txns);

    let pairs: Vec<(&str, f64)> = totals.iter().map(|t| (t.name.as_str(), t.amount)).collect();
    assert_eq!(
        pairs,
        vec![("Borealis", 20.0), ("Acme", 15.0), (UNKNOWN_COUNTERPARTY, 1.0)]
    );
}

#[test]
fn table_rows_with_unknown_roles_are_skipped_and_counted() {
    let table = Table::new("counterparty_transactions", &["counterparty_name", "role", "amount"])
        .with_row(vec![json!("Acme"), json!("Remitter"), json!(12.5)])
        .with_row(vec![json!("Acme"), json!("beneficiary"), json!("7")])
        .with_row(vec![json!("Acme"), json!("intermediary"), json!(1.0)])
        .with_row(vec![json!(null), json!(null), json!(1.0)]);

    let (txns, skipped) = CounterpartyTxn::from_table(&table).unwrap();

    assert_eq!(txns.len(), 2);
    assert_eq!(skipped, 2);
    assert_eq!(txns[1].amount.value(), 7.0);
}

#[test]
fn counterparty_table_without_role_is_a_schema_error() {
    let table = Table::new("counterparty_transactions", &["counterparty_name", "amount"]);

    let err = CounterpartyTxn::from_table(&table).unwrap_err();

    assert_eq!(err.missing_columns().unwrap(), &["role".to_string()]);
}

#[test]
fn value_totals_keep_small_amounts() {
    let txns = vec![
        CounterpartyTxn::new(Some("Acme"), Remitter, 1e16),
        CounterpartyTxn::new(Some("Acme"), Remitter, 1.0),
        CounterpartyTxn::new(Some("Acme"), Remitter, 1.0),
    ];

    assert_eq!(aggregate_counterparties(&txns)[0].value_total, 1e16 + 2.0);
    assert_eq!(aggregate_totals(&txns)[0].amount, 1e16 + 2.0);
}
