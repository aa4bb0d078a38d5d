//! The batch analysis engine.
//!
//! EXECUTION ORDER (fixed):
//!   1. Schema check of every input table (any failure aborts the run)
//!   2. Flow aggregation over account ids
//!   3. Participant metrics (always after 2)
//!   4. Entity-resolved graph
//!   5. Counterparty quadrants
//!   6. Data-quality summary
//!
//! RULES:
//!   - No I/O. Tables come in, owned results go out.
//!   - No state carried between runs; `run` takes `&self`.

use crate::{
    config::EngineConfig,
    counterparty::{
        aggregate_counterparties, aggregate_totals, classify_counterparty_quadrants,
        ClassifiedCounterparty, NameTotal,
    },
    display::{display_ranking, RankedNode},
    error::FlowResult,
    flow::{aggregate_flow_pairs, FlowPair},
    graph::{build_entity_graph, AccountRegistry, EntityNetwork},
    participant::{participant_metrics, top_participants, ParticipantMetrics},
    quality::{
        missing_identifier_count, non_numeric_count, unmapped_transfer_count,
        DataQualityReport, DataQualityWarning,
    },
    records::{AccountRecord, CounterpartyTxn, EntityRecord, TransferRecord},
    table::Table,
};

pub struct AnalysisInput {
    pub transfers: Table,
    pub accounts: Table,
    pub entities: Table,
    /// Optional: without it the counterparty outputs are empty.
    pub counterparty_txns: Option<Table>,
}

#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub flow_pairs: Vec<FlowPair>,
    pub participants: Vec<ParticipantMetrics>,
    pub top_participants: Vec<ParticipantMetrics>,
    pub network: EntityNetwork,
    pub display_nodes: Vec<RankedNode>,
    pub counterparties: Vec<ClassifiedCounterparty>,
    pub name_totals: Vec<NameTotal>,
    pub quality: DataQualityReport,
}

pub struct AnalysisEngine {
    config: EngineConfig,
}

impl AnalysisEngine {
    pub fn new(config: EngineConfig) -> FlowResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn run(&self, input: &AnalysisInput) -> FlowResult<AnalysisOutput> {
        // 1. Every schema first, so a bad table never leaves partial output.
        input.transfers.require(&TransferRecord::COLUMNS)?;
        input.accounts.require(&AccountRecord::COLUMNS)?;
        input.entities.require(&[EntityRecord::ID_COLUMN])?;
        if let Some(cp) = &input.counterparty_txns {
            cp.require(&CounterpartyTxn::COLUMNS)?;
        }

        let transfers = TransferRecord::from_table(&input.transfers)?;
        let accounts = AccountRecord::from_table(&input.accounts)?;
        let entities = EntityRecord::from_table(&input.entities)?;
        log::debug!(
            "engine: {} transfer(s), {} account(s), {} entity row(s)",
            transfers.len(),
            accounts.len(),
            entities.len()
        );

        // 2-3.
        let flow_pairs = aggregate_flow_pairs(&transfers);
        let participants = participant_metrics(&flow_pairs, &self.config.profile);
        let top = top_participants(&participants, self.config.report.top_n);

        // 4.
        let network = build_entity_graph(&entities, &accounts, &transfers, &self.config);
        let display_nodes = display_ranking(&network, self.config.report.display_max_nodes);

        // 5.
        let (counterparties, name_totals, unknown_roles) = match &input.counterparty_txns {
            Some(table) => {
                let (txns, skipped) = CounterpartyTxn::from_table(table)?;
                let aggregates = aggregate_counterparties(&txns);
                (
                    classify_counterparty_quadrants(&aggregates, &self.config.quadrant),
                    aggregate_totals(&txns),
                    skipped,
                )
            }
            None => (Vec::new(), Vec::new(), 0),
        };

        // 6.
        let registry = AccountRegistry::from_records(&accounts);
        let mut quality = DataQualityReport::default();
        quality.note(missing_identifier_count(&transfers), |rows| {
            DataQualityWarning::MissingIdentifiers {
                table: input.transfers.name.clone(),
                rows,
            }
        });
        quality.note(unmapped_transfer_count(&transfers, &registry), |rows| {
            DataQualityWarning::UnmappedAccounts { rows }
        });
        quality.note(
            non_numeric_count(&input.transfers, "normalised_amount"),
            |rows| DataQualityWarning::NonNumericAmounts {
                table: input.transfers.name.clone(),
                rows,
            },
        );
        if let Some(cp) = &input.counterparty_txns {
            quality.note(non_numeric_count(cp, "amount"), |rows| {
                DataQualityWarning::NonNumericAmounts {
                    table: cp.name.clone(),
                    rows,
                }
            });
        }
        quality.note(unknown_roles, |rows| DataQualityWarning::UnknownRoles { rows });
        quality.log();

        Ok(AnalysisOutput {
            flow_pairs,
            participants,
            top_participants: top,
            network,
            display_nodes,
            counterparties,
            name_totals,
            quality,
        })
    }
}
