//! # MCP Server for Microsoft Sentinel threat hunting
//!
//! This library manages hunting queries, hunts and the relations linking
//! them in a Microsoft Sentinel workspace, and exposes those operations to
//! MCP clients through the bundled server binary.
//!
//! ## Features
//!
//! - List, fetch, create and delete hunting queries and hunts
//! - Link queries to hunts
//! - Create a hunt, a query and their link in one call
//! - Create queries from KQL files with comment metadata
//! - Run ad-hoc KQL against the workspace
//! - Purge everything this integration created, relations before hunts
//!
//! Every resource created here is tagged (queries) or labelled (hunts and
//! relations) with an origin marker, and purge only ever touches resources
//! that carry it.

pub mod config;
pub mod sentinel;

pub use config::SentinelConfig;
pub use sentinel::{
    api::SentinelApi,
    auth::{StaticTokenProvider, TokenProvider},
    client::SentinelClient,
    error::SentinelApiError,
    purge::{PurgeReport, Reconciler},
};
