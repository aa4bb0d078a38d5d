//! flownet-core: turns a ledger of transfers into a flow graph between
//! participants and labels each participant by its structural position.

pub mod centrality;
pub mod config;
pub mod counterparty;
pub mod display;
pub mod engine;
pub mod error;
pub mod flow;
pub mod graph;
pub mod participant;
pub mod quality;
pub mod records;
pub mod rng;
pub mod roles;
pub mod store;
pub mod sum;
pub mod table;
pub mod types;
