//! # tessera-store: Store client interface for `Tessera`
//!
//! Workloads never talk to a concrete store. They drive the traits in this
//! crate, which capture exactly the surface the tenant-isolation workload
//! needs from a transactional key-value store:
//!
//! - [`Database`]: creates transactions and accepts configuration [`Knob`]s
//! - [`Transaction`]: buffered reads/writes, commit, and the standard
//!   [`Transaction::on_error`] retry contract
//! - [`StoreError`]: the error taxonomy with retryability classes
//! - [`Clock`]: the time source behind every suspension point
//!
//! ## Retry Contract
//!
//! ```ignore
//! let mut tr = db.create_transaction();
//! loop {
//!     match body(&mut tr).and_then(|()| tr.commit()) {
//!         Ok(()) => break,
//!         Err(e) => tr.on_error(e)?, // backs off and resets, or propagates
//!     }
//! }
//! ```
//!
//! [`run_transaction`] packages that loop.

use bytes::Bytes;
use tessera_types::{Knob, TransactionOption};

mod clock;
mod error;
mod retry;

pub use clock::{Clock, SystemClock, duration_to_ns, secs_f64_to_ns};
pub use error::StoreError;
pub use retry::{Backoff, RetryPolicy};

/// A handle to a transactional key-value store.
pub trait Database: Send + Sync {
    /// Transaction type produced by this database.
    type Transaction: Transaction;

    /// Starts a new, empty transaction.
    fn create_transaction(&self) -> Self::Transaction;

    /// Adjusts a store configuration knob.
    fn set_knob(&self, knob: Knob) -> Result<(), StoreError>;
}

/// A single client transaction.
///
/// Writes are buffered locally and validated by the store at commit time.
pub trait Transaction {
    /// Enables an option for the remainder of this try. Cleared by [`reset`].
    ///
    /// [`reset`]: Transaction::reset
    fn set_option(&mut self, option: TransactionOption);

    /// Reads a key from the store.
    fn get(&mut self, key: &[u8]) -> Result<Option<Bytes>, StoreError>;

    /// Buffers a write of `value` to `key`.
    fn set(&mut self, key: &[u8], value: &[u8]);

    /// Buffers removal of `key`.
    fn clear(&mut self, key: &[u8]);

    /// Submits all buffered writes atomically.
    fn commit(&mut self) -> Result<(), StoreError>;

    /// Applies the standard retry policy to `error`.
    ///
    /// Retryable errors sleep for the current backoff, reset the transaction
    /// and return `Ok(())`. Any other error is returned unchanged.
    fn on_error(&mut self, error: StoreError) -> Result<(), StoreError>;

    /// Discards buffered writes and options, keeping the backoff state.
    fn reset(&mut self);
}

/// Runs `body` in a transaction, committing and retrying until it succeeds or
/// hits a non-retryable error.
///
/// `body` is re-invoked from scratch on every retry.
pub fn run_transaction<D, T, F>(db: &D, mut body: F) -> Result<T, StoreError>
where
    D: Database,
    F: FnMut(&mut D::Transaction) -> Result<T, StoreError>,
{
    let mut tr = db.create_transaction();
    loop {
        let result = body(&mut tr).and_then(|value| {
            tr.commit()?;
            Ok(value)
        });
        match result {
            Ok(value) => return Ok(value),
            Err(error) => {
                tracing::debug!(code = error.code(), %error, "transaction failed");
                tr.on_error(error)?;
            }
        }
    }
}
