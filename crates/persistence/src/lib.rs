//! Persistence layer for fixline
//!
//! The pipeline treats storage as a set of keyed stores behind traits; the
//! engine behind them is an external concern. The in-memory backends here
//! are the default and the test double in one.

pub mod error;
pub mod memory;
pub mod stores;

pub use error::PersistenceError;
pub use memory::{
    InMemoryBusinessStore, InMemoryCallContextStore, InMemoryCallRecordStore, InMemoryLeadStore,
};
pub use stores::{BusinessStore, CallContextStore, CallRecord, CallRecordStore, LeadStore};
