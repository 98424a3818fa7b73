//! Transaction bodies and the retrying transaction runner.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{StoreError, StoreTransaction, TemplateStore};

#[cfg(test)]
#[path = "transaction_tests.rs"]
mod tests;

/// The decision logic run inside a store transaction.
///
/// A body may be run several times when its transaction loses a race, so it must derive
/// everything it writes from what it reads through `tx`.
#[async_trait]
pub trait TransactionBody: Send + Sync {
    type Output: Send;
    type Error: From<StoreError> + Send;

    async fn run(&self, tx: &mut dyn StoreTransaction) -> Result<Self::Output, Self::Error>;
}

/// How many times a conflicting transaction is attempted before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

/// The output of a committed transaction and the number of attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed<T> {
    pub output: T,
    pub attempts: u32,
}

/// Runs `body` in a fresh transaction and commits it, retrying on conflicts.
///
/// Errors returned by the body abort the transaction without retrying; nothing it staged is
/// applied.
///
/// # Errors
///
/// Returns the body's error, or the store error converted into it when beginning or committing
/// fails. A `StoreError::Conflict` is only returned once `policy.max_attempts` is exhausted.
pub async fn run_transaction<B>(
    store: &dyn TemplateStore,
    policy: RetryPolicy,
    body: &B,
) -> Result<Committed<B::Output>, B::Error>
where
    B: TransactionBody + ?Sized,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let mut tx = store.begin().await?;
        let output = body.run(tx.as_mut()).await?;

        match tx.commit().await {
            Ok(()) => {
                debug!(attempt = attempt, "Transaction committed");
                return Ok(Committed {
                    output,
                    attempts: attempt,
                });
            }
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                warn!(
                    attempt = attempt,
                    max_attempts = max_attempts,
                    error = %err,
                    "Transaction conflict, retrying"
                );
                attempt += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
}
