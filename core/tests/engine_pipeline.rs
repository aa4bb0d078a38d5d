//! End-to-end tests: input tables staged in SQLite, one engine run,
//! results written back and read again.

use flownet_core::{
    config::EngineConfig,
    engine::{AnalysisEngine, AnalysisInput},
    error::FlowError,
    quality::DataQualityWarning,
    store::{new_run_id, FlowStore},
    table::Table,
};
use serde_json::json;

fn transfers() -> Table {
    Table::new(
        "transfers",
        &["transfer_id", "sender_account_id", "recipient_account_id", "normalised_amount"],
    )
    .with_row(vec![json!(1), json!(100), json!(200), json!(100.0)])
    .with_row(vec![json!(2), json!(200), json!(100), json!(50.0)])
    .with_row(vec![json!(3), json!(100), json!(300), json!(75.0)])
    .with_row(vec![json!(4), json!(null), json!(300), json!(10.0)])
    .with_row(vec![json!(5), json!(300), json!(999), json!("oops")])
}

fn accounts() -> Table {
    Table::new("accounts", &["account_id", "entity_id"])
        .with_row(vec![json!(100), json!(1)])
        .with_row(vec![json!(200), json!(2)])
        .with_row(vec![json!(300), json!(3)])
}

fn clients() -> Table {
    Table::new("clients", &["entity_id", "company_name", "segment"])
        .with_row(vec![json!(1), json!("Acme Shipping"), json!("Corporate")])
        .with_row(vec![json!(2), json!("Borealis"), json!(null)])
        .with_row(vec![json!(3), json!("Cobalt"), json!("SME")])
        .with_row(vec![json!(4), json!("Dormant Ltd"), json!("SME")])
}

fn counterparties() -> Table {
    Table::new("counterparty_transactions", &["counterparty_name", "role", "amount"])
        .with_row(vec![json!("Acme"), json!("remitter"), json!(2_000_000.0)])
        .with_row(vec![json!("Acme"), json!("remitter"), json!(1_000_000.0)])
        .with_row(vec![json!(""), json!("beneficiary"), json!(5.0)])
        .with_row(vec![json!("Borealis"), json!("beneficiary"), json!("bad")])
}

fn input() -> AnalysisInput {
    AnalysisInput {
        transfers: transfers(),
        accounts: accounts(),
        entities: clients(),
        counterparty_txns: Some(counterparties()),
    }
}

fn engine() -> AnalysisEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    AnalysisEngine::new(EngineConfig::default()).unwrap()
}

#[test]
fn full_run_produces_every_output() {
    let out = engine().run(&input()).unwrap();

    // Row 4 has a null sender; row 5 is kept at account level with amount 0.
    assert_eq!(out.flow_pairs.len(), 4);
    let p100 = out
        .participants
        .iter()
        .find(|p| p.participant_id == 100)
        .unwrap();
    assert_eq!(p100.total_sent, 175.0);
    assert!(p100.has_two_way_flow);

    assert_eq!(out.network.nodes.len(), 4, "Entity 4 is isolated but present");
    assert_eq!(out.network.edges.len(), 3);
    assert_eq!(out.network.dropped_transfers, 2);
    assert_eq!(out.network.node(4).unwrap().network_role.label(), "Peripheral");

    assert_eq!(out.counterparties.len(), 3);
    assert_eq!(out.counterparties[0].name, "Acme");
    assert_eq!(out.name_totals[0].amount, 3_000_000.0);
    assert!(out.display_nodes.len() <= 4);
}

#[test]
fn data_quality_counts_every_dropped_or_coerced_row() {
    let out = engine().run(&input()).unwrap();
    let w = &out.quality.warnings;

    assert!(w.contains(&DataQualityWarning::MissingIdentifiers {
        table: "transfers".into(),
        rows: 1
    }));
    assert!(w.contains(&DataQualityWarning::UnmappedAccounts { rows: 1 }));
    assert!(w.contains(&DataQualityWarning::NonNumericAmounts {
        table: "transfers".into(),
        rows: 1
    }));
    assert!(w.contains(&DataQualityWarning::NonNumericAmounts {
        table: "counterparty_transactions".into(),
        rows: 1
    }));
    assert!(!out.quality.is_clean());
}

#[test]
fn counterparty_table_is_optional() {
    let mut input = input();
    input.counterparty_txns = None;

    let out = engine().run(&input).unwrap();

    assert!(out.counterparties.is_empty());
    assert!(out.name_totals.is_empty());
    assert!(!out.flow_pairs.is_empty());
}

#[test]
fn schema_error_aborts_before_any_output() {
    let mut input = input();
    input.accounts = Table::new("accounts", &["account_id"]);

    match engine().run(&input) {
        Err(FlowError::Schema { table, missing }) => {
            assert_eq!(table, "accounts");
            assert_eq!(missing, vec!["entity_id".to_string()]);
        }
        other => panic!("Expected a schema error, got {other:?}"),
    }
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let mut config = EngineConfig::default();
    config.quadrant.value_scale = 0.0;

    assert!(matches!(
        AnalysisEngine::new(config),
        Err(FlowError::InvalidConfig { .. })
    ));
}

#[test]
fn tables_round_trip_through_the_store() {
    let store = FlowStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.write_table(&transfers()).unwrap();

    let loaded = store.load_table("transfers").unwrap();

    assert_eq!(loaded.columns, transfers().columns);
    assert_eq!(loaded.len(), 5);
    assert!(loaded.rows[3][1].is_null(), "Null sender survives the round trip");
    assert_eq!(loaded.rows[4][3], json!("oops"));
}

#[test]
fn loading_an_absent_table_is_a_missing_table_error() {
    let store = FlowStore::in_memory().unwrap();

    assert!(!store.table_exists("transfers").unwrap());
    assert!(matches!(
        store.load_table("transfers"),
        Err(FlowError::MissingTable { .. })
    ));
    assert!(matches!(
        store.load_table("x; DROP TABLE y"),
        Err(FlowError::MissingTable { .. })
    ));
}

#[test]
fn saved_run_has_one_row_per_output_record() {
    let store = FlowStore::in_memory().unwrap();
    store.migrate().unwrap();
    for table in [transfers(), accounts(), clients(), counterparties()] {
        store.write_table(&table).unwrap();
    }

    let input = AnalysisInput {
        transfers: store.load_table("transfers").unwrap(),
        accounts: store.load_table("accounts").unwrap(),
        entities: store.load_table("clients").unwrap(),
        counterparty_txns: Some(store.load_table("counterparty_transactions").unwrap()),
    };
    let engine = engine();
    let out = engine.run(&input).unwrap();

    let run_id = new_run_id();
    store
        .insert_run(&run_id, engine.config().betweenness.seed, "test")
        .unwrap();
    store.save_analysis(&run_id, &out).unwrap();

    assert!(store.run_exists(&run_id).unwrap());
    assert_eq!(store.result_row_count("flow_pair", &run_id).unwrap(), 4);
    assert_eq!(store.result_row_count("participant_metric", &run_id).unwrap(), 4);
    assert_eq!(store.result_row_count("node_metric", &run_id).unwrap(), 4);
    assert_eq!(store.result_row_count("entity_edge", &run_id).unwrap(), 3);
    assert_eq!(store.result_row_count("counterparty_quadrant", &run_id).unwrap(), 3);

    let roles = store.stored_roles(&run_id).unwrap();
    assert_eq!(roles.len(), 4);
    assert_eq!(roles[3], (4, "Peripheral".to_string()));
}

#[test]
fn migrations_are_idempotent() {
    let store = FlowStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.migrate().unwrap();
}

#[test]
fn failed_save_leaves_no_partial_run() {
    let store = FlowStore::in_memory().unwrap();
    store.migrate().unwrap();
    let mut out = engine().run(&input()).unwrap();
    // A repeated (name, role) breaks the last table written.
    let duplicate = out.counterparties[0].clone();
    out.counterparties.push(duplicate);

    let run_id = new_run_id();
    store.insert_run(&run_id, 42, "test").unwrap();

    assert!(store.save_analysis(&run_id, &out).is_err());
    for table in ["flow_pair", "participant_metric", "node_metric", "entity_edge"] {
        assert_eq!(
            store.result_row_count(table, &run_id).unwrap(),
            0,
            "{table} kept rows from a failed save"
        );
    }
}
