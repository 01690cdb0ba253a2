//! The fill-and-save flow: one remote call, then at most one file write.

use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::client::FillClient;
use crate::error::{FillError, Result};
use crate::output::{WritePolicy, save_result};
use crate::types::FillRequest;

/// Outcome of a successful fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillOutcome {
    /// Status reported by the service
    pub status: u16,
    /// Where the document was written
    pub output: PathBuf,
    /// Size of the document in bytes
    pub bytes_written: usize,
}

/// Fill `request` through `client` and write the document to `output`.
///
/// The write starts only once the complete response is in hand, so dropping
/// this future before then (e.g. on Ctrl+C) leaves `output` untouched.
#[tracing::instrument(
    skip(client, request),
    fields(template_id = %request.template_id, output = %output.display())
)]
pub async fn fill_and_save<C>(
    client: &C,
    request: &FillRequest,
    output: &Path,
    policy: WritePolicy,
) -> Result<FillOutcome>
where
    C: FillClient + ?Sized,
{
    let result = client.fill(request).await?;

    tracing::info!(status = result.status, "Received fill response");

    let bytes_written = save_result(&result, output, policy)?.unwrap_or_default();

    Ok(FillOutcome {
        status: result.status,
        output: output.to_path_buf(),
        bytes_written,
    })
}

/// Run `fill_and_save` until it finishes or `shutdown` resolves, then report the status.
///
/// The service status goes to `out` as a single line whenever one was received,
/// including for rejected requests. Transport failures and cancellation print
/// nothing. The returned error is what makes the process exit non-zero.
pub async fn fill_and_report<C, S, W>(
    client: &C,
    request: &FillRequest,
    output: &Path,
    policy: WritePolicy,
    shutdown: S,
    out: &mut W,
) -> Result<FillOutcome>
where
    C: FillClient + ?Sized,
    S: Future<Output = ()>,
    W: Write,
{
    let result = tokio::select! {
        biased;
        _ = shutdown => Err(FillError::Canceled),
        result = fill_and_save(client, request, output, policy) => result,
    };

    let status = match &result {
        Ok(outcome) => Some(outcome.status),
        Err(e) => e.status(),
    };
    if let Some(status) = status {
        writeln!(out, "{}", status).map_err(|e| FillError::Other(e.into()))?;
    }

    result
}
