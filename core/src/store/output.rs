use super::{is_identifier, FlowStore};
use crate::{
    counterparty::ClassifiedCounterparty,
    engine::AnalysisOutput,
    error::{FlowError, FlowResult},
    flow::FlowPair,
    graph::{EdgeRecord, NodeMetrics},
    participant::ParticipantMetrics,
};
use rusqlite::{params, Transaction};

impl FlowStore {
    // ── Result tables ─────────────────────────────────────────────

    /// Write every result table of one analysis under `run_id`.
    /// One transaction: a failure on any table leaves none of them.
    pub fn save_analysis(&self, run_id: &str, output: &AnalysisOutput) -> FlowResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        save_flow_pairs(&tx, run_id, &output.flow_pairs)?;
        save_participants(&tx, run_id, &output.participants)?;
        save_nodes(&tx, run_id, &output.network.nodes)?;
        save_edges(&tx, run_id, &output.network.edges)?;
        save_counterparties(&tx, run_id, &output.counterparties)?;
        tx.commit()?;
        log::debug!("store: saved analysis {run_id}");
        Ok(())
    }

    /// Rows written for one run in one of the result tables.
    pub fn result_row_count(&self, table: &str, run_id: &str) -> FlowResult<i64> {
        if !is_identifier(table) {
            return Err(FlowError::MissingTable {
                table: table.to_string(),
            });
        }
        let n: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM \"{table}\" WHERE run_id = ?1"),
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// network_role per entity for one run, ascending entity id.
    pub fn stored_roles(&self, run_id: &str) -> FlowResult<Vec<(i64, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT entity_id, network_role FROM node_metric WHERE run_id = ?1 ORDER BY entity_id",
        )?;
        let rows = stmt.query_map(params![run_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn save_flow_pairs(tx: &Transaction<'_>, run_id: &str, pairs: &[FlowPair]) -> FlowResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO flow_pair (run_id, source_id, destination_id, transfer_count, total_value)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for p in pairs {
        stmt.execute(params![
            run_id,
            p.source_id,
            p.destination_id,
            p.transfer_count as i64,
            p.total_value,
        ])?;
    }
    Ok(())
}

fn save_participants(tx: &Transaction<'_>, run_id: &str, rows: &[ParticipantMetrics]) -> FlowResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO participant_metric (run_id, participant_id, unique_destinations,
            unique_sources, unique_counterparties, total_sent, total_received,
            has_two_way_flow, interaction_profile)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;
    for r in rows {
        stmt.execute(params![
            run_id,
            r.participant_id,
            r.unique_destinations as i64,
            r.unique_sources as i64,
            r.unique_counterparties as i64,
            r.total_sent,
            r.total_received,
            r.has_two_way_flow as i32,
            r.interaction_profile.label(),
        ])?;
    }
    Ok(())
}

fn save_nodes(tx: &Transaction<'_>, run_id: &str, nodes: &[NodeMetrics]) -> FlowResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO node_metric (run_id, entity_id, in_degree, out_degree, in_strength,
            out_strength, betweenness, degree_level, strength_level, betweenness_level,
            network_role, attributes_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )?;
    for n in nodes {
        stmt.execute(params![
            run_id,
            n.entity_id,
            n.in_degree as i64,
            n.out_degree as i64,
            n.in_strength,
            n.out_strength,
            n.betweenness,
            n.degree_level.to_string(),
            n.strength_level.to_string(),
            n.betweenness_level.to_string(),
            n.network_role.label(),
            serde_json::to_string(&n.attributes)?,
        ])?;
    }
    Ok(())
}

fn save_edges(tx: &Transaction<'_>, run_id: &str, edges: &[EdgeRecord]) -> FlowResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO entity_edge (run_id, sender_entity, recipient_entity, edge_amount, edge_count)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for e in edges {
        stmt.execute(params![
            run_id,
            e.sender_entity,
            e.recipient_entity,
            e.edge_amount,
            e.edge_count as i64,
        ])?;
    }
    Ok(())
}

fn save_counterparties(
    tx: &Transaction<'_>,
    run_id: &str,
    rows: &[ClassifiedCounterparty],
) -> FlowResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO counterparty_quadrant (run_id, name, role, value_total, volume_total, quadrant)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for r in rows {
        stmt.execute(params![
            run_id,
            r.name,
            r.role.as_str(),
            r.value_total,
            r.volume_total as i64,
            r.quadrant.label(),
        ])?;
    }
    Ok(())
}
