//! Permission gate run once at the start of every session.

use tracing::{info, warn};

use crate::error::{SyncError, SyncResult};
use crate::provider::{AccessGrant, AuthorizationStatus, Provider, Scope};

/// Request read access to events and read/write access to tasks in one go.
///
/// Any denial, or a provider failure while asking, is reported as
/// `PermissionDenied` without saying which scope was refused.
pub async fn authorize<P: Provider + ?Sized>(provider: &P) -> SyncResult<()> {
    match provider.request_access(&Scope::ALL).await {
        Ok(AccessGrant::Granted) => {
            info!("calendar and reminder access granted");
            Ok(())
        }
        Ok(AccessGrant::Denied) => {
            warn!("calendar or reminder access denied");
            Err(SyncError::PermissionDenied)
        }
        Err(e) => {
            warn!(error = %e, "access request failed");
            Err(SyncError::PermissionDenied)
        }
    }
}

/// True when every scope a run needs is currently authorized.
pub async fn is_authorized<P: Provider + ?Sized>(provider: &P) -> SyncResult<bool> {
    for scope in Scope::ALL {
        if provider.authorization_status(scope).await? != AuthorizationStatus::Authorized {
            return Ok(false);
        }
    }
    Ok(true)
}
