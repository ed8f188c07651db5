//! Unit of work: one workflow invocation, one database transaction.

use crate::errors::ServiceError;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionError, TransactionTrait};
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};

/// Type alias for boxed future used in transactions
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Execute a function within a database transaction.
///
/// Commits when the closure returns `Ok` and rolls back on `Err`. The
/// closure's `ServiceError` is handed back unchanged, so business failures
/// like `InsufficientStock` keep their variant across the rollback.
///
/// ```rust,ignore
/// let moved = with_transaction(&db, |txn| {
///     Box::pin(async move {
///         let out = ledger::append(txn, debit).await?;
///         let inn = ledger::append(txn, credit).await?;
///         Ok((out, inn))
///     })
/// })
/// .await?;
/// ```
pub async fn with_transaction<F, T>(db: &DatabaseConnection, f: F) -> Result<T, ServiceError>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    T: Send,
{
    let result = db.transaction::<_, T, ServiceError>(f).await;

    match &result {
        Ok(_) => debug!("Transaction committed"),
        Err(TransactionError::Transaction(e)) => {
            debug!(code = e.code(), "Transaction rolled back")
        }
        Err(TransactionError::Connection(e)) => warn!(error = %e, "Transaction failed to run"),
    }

    result.map_err(|e| match e {
        TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
        TransactionError::Transaction(e) => e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::location;
    use assert_matches::assert_matches;
    use crate::db::memory_pool;
    use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
    use uuid::Uuid;

    fn new_location(name: &str) -> location::ActiveModel {
        location::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            code: Set(None),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn commits_on_ok() {
        let db = memory_pool().await;
        with_transaction(&db, |txn| {
            Box::pin(async move {
                new_location("Front").insert(txn).await?;
                Ok(())
            })
        })
        .await
        .unwrap();

        assert_eq!(location::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rolls_back_and_keeps_error_variant() {
        let db = memory_pool().await;
        let result: Result<(), _> = with_transaction(&db, |txn| {
            Box::pin(async move {
                new_location("Back").insert(txn).await?;
                Err(ServiceError::InvalidOperation("abort".into()))
            })
        })
        .await;

        assert_matches!(result, Err(ServiceError::InvalidOperation(msg)) if msg == "abort");
        assert_eq!(location::Entity::find().count(&db).await.unwrap(), 0);
    }
}
