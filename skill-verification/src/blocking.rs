use crate::error::{VerificationError, VerificationResult};
use std::future::Future;

/// Drive an async verification step to completion on the calling thread.
///
/// The blocking entry points share the async implementation through this
/// helper. It refuses to run inside an existing Tokio runtime instead of
/// panicking there.
pub(crate) fn block_on<F: Future>(future: F) -> VerificationResult<F::Output> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(VerificationError::Runtime(
            "blocking verification called from within an async runtime; use the async variant"
                .to_string(),
        ));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| VerificationError::Runtime(format!("failed to start runtime: {}", e)))?;

    Ok(runtime.block_on(future))
}
