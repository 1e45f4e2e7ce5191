use std::any::Any;
use std::fmt;

use uuid::Uuid;

use super::error::CaptureError;

/// Single-use capability that permits opening one capture stream.
///
/// Issued by an `AuthorizationProvider` after the user consented. The token
/// wraps a host-specific grant (a media projection handle, a desktop consent
/// record, ...) that only the matching `CaptureProvider` knows how to use.
/// It is neither `Clone` nor `Copy`: handing it to `CaptureController::start`
/// moves it into the stream, and dropping the stream releases the grant.
pub struct AuthorizationToken {
    id: Uuid,
    grant: Box<dyn Any + Send>,
}

impl AuthorizationToken {
    pub fn new<G: Any + Send>(grant: G) -> Self {
        Self {
            id: Uuid::new_v4(),
            grant: Box::new(grant),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the wrapped grant is of type `G`.
    pub fn holds<G: Any + Send>(&self) -> bool {
        self.grant.is::<G>()
    }

    /// Consume the token and hand out the host-specific grant.
    ///
    /// Fails with `PermissionDenied` when the token was issued for a
    /// different backend; the grant is released in that case.
    pub fn into_grant<G: Any + Send>(self) -> Result<G, CaptureError> {
        let id = self.id;
        self.grant.downcast::<G>().map(|grant| *grant).map_err(|_| {
            CaptureError::PermissionDenied(format!(
                "authorization token {} was not issued for this capture provider",
                id
            ))
        })
    }
}

impl fmt::Debug for AuthorizationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationToken").field("id", &self.id).finish_non_exhaustive()
    }
}
