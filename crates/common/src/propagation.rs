//! Outbound credential propagation.
//!
//! When a handler calls another service on behalf of its caller, the
//! [`CredentialPropagator`] attaches the caller's credential to the outbound
//! call under `authorization`, byte-for-byte as it arrived. It never mints,
//! refreshes or rewrites a credential, and it never silently sends a call
//! without one: an empty or missing credential is an error at construction
//! time, before any RPC is made.
//!
//! The propagator implements [`tonic::service::Interceptor`], so it plugs into
//! any generated client via `with_interceptor`. Any existing `authorization`
//! entry on the outbound request is replaced.

use crate::call_context::{is_visible_ascii, CallContext};
use crate::credential::{Credential, AUTHORIZATION_METADATA_KEY};
use std::fmt;
use thiserror::Error;
use tonic::metadata::AsciiMetadataValue;
use tonic::service::Interceptor;
use tonic::{Request, Status};

/// Errors attaching a credential to an outbound call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PropagationError {
    /// The inbound call carried no credential to forward.
    #[error("No credential available to forward")]
    MissingCredential,

    /// The credential to forward is the empty string.
    #[error("Refusing to forward an empty credential")]
    EmptyCredential,

    /// A key or value is not valid ASCII metadata.
    #[error("Invalid metadata for key '{0}'")]
    InvalidMetadata(String),
}

impl From<PropagationError> for Status {
    fn from(err: PropagationError) -> Self {
        // Forwarding failures are server-side faults, not caller auth failures
        Status::internal(err.to_string())
    }
}

/// Client interceptor that forwards one credential on every outbound call.
///
/// Cheap to clone; each clone carries the same pre-parsed header value.
#[derive(Clone)]
pub struct CredentialPropagator {
    authorization: AsciiMetadataValue,
}

impl CredentialPropagator {
    /// Build a propagator for an explicit credential.
    ///
    /// # Errors
    ///
    /// - `PropagationError::EmptyCredential` - the credential is empty
    /// - `PropagationError::InvalidMetadata` - it contains non-ASCII or control bytes
    pub fn new(credential: &Credential) -> Result<Self, PropagationError> {
        if credential.is_empty() {
            return Err(PropagationError::EmptyCredential);
        }

        // Header parsing accepts obs-text, which the receiver would drop
        if !is_visible_ascii(credential.expose()) {
            return Err(PropagationError::InvalidMetadata(
                AUTHORIZATION_METADATA_KEY.to_string(),
            ));
        }

        let mut authorization = AsciiMetadataValue::try_from(credential.expose())
            .map_err(|_| PropagationError::InvalidMetadata(AUTHORIZATION_METADATA_KEY.to_string()))?;
        authorization.set_sensitive(true);

        Ok(Self { authorization })
    }

    /// Build a propagator that forwards the credential of an inbound call.
    ///
    /// # Errors
    ///
    /// Returns `PropagationError::MissingCredential` when the inbound context
    /// has no `authorization` entry, otherwise the errors of [`Self::new`].
    pub fn forward(inbound: &CallContext) -> Result<Self, PropagationError> {
        let credential = inbound
            .authorization()
            .ok_or(PropagationError::MissingCredential)?;
        Self::new(&credential)
    }

    /// Attach the credential to an outbound request, replacing any existing
    /// `authorization` entry.
    pub fn attach<T>(&self, request: &mut Request<T>) {
        request
            .metadata_mut()
            .insert(AUTHORIZATION_METADATA_KEY, self.authorization.clone());
    }
}

impl Interceptor for CredentialPropagator {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        self.attach(&mut request);
        Ok(request)
    }
}

impl fmt::Debug for CredentialPropagator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPropagator")
            .field("authorization", &"[REDACTED]")
            .finish()
    }
}

/// Return `request` with `credential` attached under `authorization`.
///
/// # Errors
///
/// Same as [`CredentialPropagator::new`]. On error the request is dropped and
/// no call is made.
pub fn wrap<T>(mut request: Request<T>, credential: &Credential) -> Result<Request<T>, PropagationError> {
    CredentialPropagator::new(credential)?.attach(&mut request);
    Ok(request)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn outbound_authorization<T>(request: &Request<T>) -> Option<String> {
        request
            .metadata()
            .get(AUTHORIZATION_METADATA_KEY)
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[test]
    fn test_wrap_attaches_credential_verbatim() {
        let credential = Credential::bearer("good-token");
        let request = wrap(Request::new(()), &credential).unwrap();

        assert_eq!(
            outbound_authorization(&request).as_deref(),
            Some("Bearer good-token")
        );
    }

    #[test]
    fn test_wrap_does_not_normalize_value() {
        // Odd but valid values are forwarded untouched
        let credential = Credential::new("bearer  Mixed.Case.Token");
        let request = wrap(Request::new(()), &credential).unwrap();

        assert_eq!(
            outbound_authorization(&request).as_deref(),
            Some("bearer  Mixed.Case.Token")
        );
    }

    #[test]
    fn test_wrap_replaces_existing_authorization() {
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert(AUTHORIZATION_METADATA_KEY, "Bearer stale".parse().unwrap());

        let request = wrap(request, &Credential::bearer("fresh")).unwrap();

        assert_eq!(outbound_authorization(&request).as_deref(), Some("Bearer fresh"));
        assert_eq!(
            request
                .metadata()
                .get_all(AUTHORIZATION_METADATA_KEY)
                .iter()
                .count(),
            1
        );
    }

    #[test]
    fn test_wrap_rejects_empty_credential() {
        let result = wrap(Request::new(()), &Credential::new(""));
        assert_eq!(result.unwrap_err(), PropagationError::EmptyCredential);
    }

    #[test]
    fn test_wrap_rejects_non_ascii_credential() {
        let result = wrap(Request::new(()), &Credential::new("Bearer tok\u{e9}n"));
        assert!(matches!(result, Err(PropagationError::InvalidMetadata(_))));
    }

    #[test]
    fn test_non_visible_credential_never_reaches_the_wire() {
        for raw in ["Bearer tok\u{e9}n", "Bearer \u{ff}", "Bearer tab\there", "Bearer del\u{7f}"] {
            let mut request = Request::new(());
            let result = CredentialPropagator::new(&Credential::new(raw));
            assert!(
                matches!(result, Err(PropagationError::InvalidMetadata(_))),
                "{raw:?} should be refused"
            );
            if let Ok(propagator) = result {
                propagator.attach(&mut request);
            }
            assert!(request.metadata().get(AUTHORIZATION_METADATA_KEY).is_none());
        }
    }

    #[test]
    fn test_forward_from_inbound_context() {
        let mut inbound = CallContext::new();
        inbound.insert("Authorization", "Bearer good-token");
        inbound.insert("x-tenant", "acme");

        let mut propagator = CredentialPropagator::forward(&inbound).unwrap();
        let request = propagator.call(Request::new(())).unwrap();

        assert_eq!(
            outbound_authorization(&request).as_deref(),
            Some("Bearer good-token")
        );
        // Only the credential is forwarded, not arbitrary inbound metadata
        assert!(request.metadata().get("x-tenant").is_none());
    }

    #[test]
    fn test_forward_without_credential_fails() {
        let inbound = CallContext::new();
        assert_eq!(
            CredentialPropagator::forward(&inbound).unwrap_err(),
            PropagationError::MissingCredential
        );
    }

    #[test]
    fn test_propagated_value_reads_back_identically() {
        let original = Credential::bearer("eyJhbGciOiJIUzI1NiJ9.e30.sig");
        let request = wrap(Request::new(()), &original).unwrap();

        let received = CallContext::from_metadata(request.metadata())
            .authorization()
            .unwrap();
        assert_eq!(received.expose(), original.expose());
    }

    #[test]
    fn test_error_maps_to_internal_status() {
        let status: Status = PropagationError::MissingCredential.into();
        assert_eq!(status.code(), tonic::Code::Internal);
    }

    #[test]
    fn test_debug_redacts_credential() {
        let propagator = CredentialPropagator::new(&Credential::bearer("secret-token")).unwrap();
        let debug_str = format!("{propagator:?}");
        assert!(!debug_str.contains("secret-token"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}
