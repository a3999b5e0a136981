//! Operations on the download left behind by an earlier run

use relup_download::DownloadHandleStore;
use relup_errors::Error;
use relup_events::{AppEvent, DownloadEvent, EventEmitter};
use relup_types::DownloadId;
use tracing::{debug, info};

use crate::{DownloadReport, OpsCtx};

/// Report the persisted download and what the service knows about it
///
/// # Errors
///
/// Returns an error if the store or the download service fails.
pub async fn status(ctx: &OpsCtx) -> Result<DownloadReport, Error> {
    let handle = DownloadHandleStore::new(ctx.platform.store());
    let Some(id) = handle.load()? else {
        debug!("no persisted download");
        return Ok(DownloadReport::idle());
    };

    let status = ctx.platform.downloads().query(id).await?;
    Ok(DownloadReport {
        id: Some(id.get()),
        status,
    })
}

/// Remove the persisted download from the service and clear the store
///
/// # Errors
///
/// Returns an error if the store or the download service fails.
pub async fn cancel(ctx: &OpsCtx) -> Result<Option<DownloadId>, Error> {
    let handle = DownloadHandleStore::new(ctx.platform.store());
    let Some(id) = handle.load()? else {
        return Ok(None);
    };

    ctx.platform.downloads().remove(id).await?;
    handle.clear()?;
    info!(id = %id, "removed persisted download");
    ctx.emit(AppEvent::Download(DownloadEvent::Removed { id: id.get() }));
    Ok(Some(id))
}
