//! Commit-or-rollback helpers shared by handlers that write several records.

use tokio_util::sync::CancellationToken;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::StorageTransaction;

/// Wraps a storage failure as a server error.
///
/// Errors that already carry a protocol meaning for the caller (cancellation,
/// server errors) are passed through untouched.
pub(crate) fn storage_failure(err: AuthError) -> AuthError {
    match err {
        AuthError::Cancelled | AuthError::ServerError { .. } => err,
        other => AuthError::server_error_from("Storage operation failed", other),
    }
}

/// Ends a transaction according to `outcome`.
///
/// On success the transaction is committed unless `ctx` was cancelled in the
/// meantime, in which case it is rolled back. On failure it is rolled back and
/// the original error is returned; a failed rollback replaces it with a
/// server error.
pub(crate) async fn finish(
    ctx: &CancellationToken,
    tx: Box<dyn StorageTransaction>,
    outcome: AuthResult<()>,
) -> AuthResult<()> {
    let outcome = match outcome {
        Ok(()) if ctx.is_cancelled() => Err(AuthError::Cancelled),
        other => other,
    };

    match outcome {
        Ok(()) => tx.commit().await.map_err(|err| {
            tracing::warn!(error = %err, "transaction commit failed");
            AuthError::server_error_from("Unable to commit the transaction", err)
        }),
        Err(err) => Err(abort(tx, err).await),
    }
}

/// Rolls `tx` back and returns `err`, or a server error if the rollback
/// itself failed.
pub(crate) async fn abort(tx: Box<dyn StorageTransaction>, err: AuthError) -> AuthError {
    if let Err(rollback_err) = tx.rollback().await {
        tracing::warn!(
            error = %rollback_err,
            cause = %err,
            "transaction rollback failed"
        );
        return AuthError::server_error_from("Unable to roll back the transaction", rollback_err);
    }
    tracing::debug!(error = %err, "transaction rolled back");
    err
}
