use crate::models::authorization::AuthorizationToken;
use crate::models::error::CaptureError;

/// Source of capture consent.
///
/// Stands in for the platform flow that asks the user whether system audio
/// may be captured. A provider may be asked for any number of tokens; each
/// token is good for exactly one session.
pub trait AuthorizationProvider: Send + Sync {
    /// Whether the process holds the permission to record audio at all.
    fn has_record_permission(&self) -> bool;

    /// Ask for consent and issue a fresh token.
    fn request_token(&self) -> Result<AuthorizationToken, CaptureError>;
}
