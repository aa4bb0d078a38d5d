//! flownet-report: headless batch runner for the flow graph engine.
//!
//! Usage:
//!   flownet-report --db ledger.db
//!   flownet-report --db ledger.db --config engine.json --top 20 --json
//!
//! Reads the `transfers`, `accounts` and `clients` tables (and
//! `counterparty_transactions` when present), writes the result tables
//! back into the same database under a fresh run id.

use anyhow::Result;
use flownet_core::{
    config::EngineConfig,
    counterparty::quadrant_counts,
    display::{label_candidates, node_label, LabelBy},
    engine::{AnalysisEngine, AnalysisInput, AnalysisOutput},
    error::FlowError,
    participant::profile_counts,
    store::{new_run_id, FlowStore},
};
use std::env;

const TRANSFERS_TABLE: &str = "transfers";
const ACCOUNTS_TABLE: &str = "accounts";
const ENTITIES_TABLE: &str = "clients";
const COUNTERPARTY_TABLE: &str = "counterparty_transactions";

#[derive(serde::Serialize)]
struct JsonReport<'a> {
    run_id: &'a str,
    flow_pairs: usize,
    participants: usize,
    top_participants: &'a [flownet_core::participant::ParticipantMetrics],
    nodes: &'a [flownet_core::graph::NodeMetrics],
    edges: &'a [flownet_core::graph::EdgeRecord],
    counterparties: &'a [flownet_core::counterparty::ClassifiedCounterparty],
    name_totals: &'a [flownet_core::counterparty::NameTotal],
    display_nodes: &'a [flownet_core::display::RankedNode],
    data_quality: &'a flownet_core::quality::DataQualityReport,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = arg_value(&args, "--db").unwrap_or("ledger.db");
    let json = args.iter().any(|a| a == "--json");

    let mut config = match arg_value(&args, "--config") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    config.report.top_n = parse_arg(&args, "--top", config.report.top_n);
    config.betweenness.seed = parse_arg(&args, "--seed", config.betweenness.seed);

    let store = FlowStore::open(db)?;
    store.migrate()?;

    let input = AnalysisInput {
        transfers: store.load_table(TRANSFERS_TABLE)?,
        accounts: store.load_table(ACCOUNTS_TABLE)?,
        entities: store.load_table(ENTITIES_TABLE)?,
        counterparty_txns: if store.table_exists(COUNTERPARTY_TABLE)? {
            Some(store.load_table(COUNTERPARTY_TABLE)?)
        } else {
            None
        },
    };

    let engine = AnalysisEngine::new(config)?;
    let output = match engine.run(&input) {
        Ok(output) => output,
        Err(FlowError::Schema { table, missing }) => {
            anyhow::bail!(
                "input table '{table}' is missing required columns: {}",
                missing.join(", ")
            );
        }
        Err(e) => return Err(e.into()),
    };

    let run_id = new_run_id();
    store.insert_run(&run_id, engine.config().betweenness.seed, env!("CARGO_PKG_VERSION"))?;
    store.save_analysis(&run_id, &output)?;
    log::info!("saved {run_id} to {db}");

    if json {
        let report = JsonReport {
            run_id: &run_id,
            flow_pairs: output.flow_pairs.len(),
            participants: output.participants.len(),
            top_participants: &output.top_participants,
            nodes: &output.network.nodes,
            edges: &output.network.edges,
            counterparties: &output.counterparties,
            name_totals: &output.name_totals,
            display_nodes: &output.display_nodes,
            data_quality: &output.quality,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&run_id, db, &output);
    }
    Ok(())
}

fn print_summary(run_id: &str, db: &str, output: &AnalysisOutput) {
    println!("flownet-report");
    println!("  run_id:        {run_id}");
    println!("  db:            {db}");
    println!("  flow pairs:    {}", output.flow_pairs.len());
    println!("  participants:  {}", output.participants.len());
    println!("  graph nodes:   {}", output.network.graph.node_count());
    println!("  graph edges:   {}", output.network.graph.edge_count());
    println!("  betweenness:   {:?}", output.network.betweenness_mode);
    println!();

    println!("=== TOP PARTICIPANTS ===");
    for p in &output.top_participants {
        println!(
            "  {:>10} | cps {:>4} | sent {:>14.2} | recv {:>14.2} | {}",
            p.participant_id,
            p.unique_counterparties,
            p.total_sent,
            p.total_received,
            p.interaction_profile
        );
    }
    println!();

    println!("=== INTERACTION PROFILES ===");
    for (profile, n) in profile_counts(&output.participants) {
        println!("  {profile:<18} {n}");
    }
    println!();

    println!("=== NETWORK ROLES ===");
    for (role, n) in output.network.role_counts() {
        println!("  {role:<18} {n}");
    }
    let labelled = label_candidates(&output.network, &output.display_nodes, LabelBy::Strength, 10);
    if !labelled.is_empty() {
        println!("  strongest:");
        for id in labelled {
            println!("    {}", node_label(&output.network, id));
        }
    }
    println!();

    if !output.counterparties.is_empty() {
        println!("=== COUNTERPARTY QUADRANTS ===");
        for (quadrant, n) in quadrant_counts(&output.counterparties) {
            println!("  {quadrant:<26} {n}");
        }
        println!();
    }

    println!("=== DATA QUALITY ===");
    if output.quality.is_clean() {
        println!("  (no rows dropped)");
    } else {
        for w in &output.quality.warnings {
            println!("  {w}");
        }
    }
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
