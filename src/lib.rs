// chainmesh - Hash-linked ledger replicated over peer gossip
//
// Modules, leaf-first:
// - ledger: blocks and the validated append-only chain
// - transport: TCP peer channels
// - sync: wire protocol, reconciliation, peer fan-out
// - node: process wiring around one shared ledger
// - api: HTTP surface

pub mod api;
pub mod config;
pub mod ledger;
pub mod node;
pub mod sync;
pub mod transport;

pub use config::{NodeConfig, ConfigError};
pub use node::{Node, NodeError, SyncStats};
