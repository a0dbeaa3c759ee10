//! DealerDesk domain crate.
//!
//! Holds the archive-and-purge workflow and the collaborator contracts it
//! runs against. No database or HTTP dependencies live here; the Postgres
//! store is in `dealerdesk_db` and the HTTP surface in `dealerdesk_api`.
//!
//! - [`archive`] -- job descriptors, the coordinator, and the job registry.
//! - [`store`] -- the [`store::DataStore`] contract and an in-memory store.
//! - [`notify`] -- operator notifications and the sink contract.

pub mod archive;
pub mod error;
pub mod notify;
pub mod roles;
pub mod store;
pub mod types;
