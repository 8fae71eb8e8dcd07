//! Transactions.
//!
//! shelfdb transactions give:
//! - **Atomicity**: all writes of a commit land in one journal frame
//! - **Isolation**: each transaction reads its own snapshot; one writer at a time
//! - **Durability**: commits are appended to the journal before they become visible
//!
//! A transaction declares its store scope and mode up front. Touching a
//! store outside the scope is an `Argument` error, writing in a read-only
//! transaction is `ReadOnly`.

mod state;

pub use state::{Transaction, TransactionState};
