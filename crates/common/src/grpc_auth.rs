//! Server-side per-method authorization for gRPC.
//!
//! Every inbound call passes through the same sequence before any handler
//! code runs:
//!
//! ```text
//! Received -> PolicyChecked -> Authorized -> Dispatched
//!                           \-> Rejected   -> Terminated
//! ```
//!
//! [`Authorizer`] holds the synchronous decision: look the method up in the
//! [`MethodPolicyRegistry`], and when it requires authentication, validate the
//! `authorization` entry of the [`CallContext`]. [`GrpcAuthLayer`] wraps that
//! decision in tower middleware placed in front of a tonic router. Tonic's own
//! `Interceptor` cannot see the request path, so per-method policy has to live
//! at the HTTP layer.
//!
//! # Security
//!
//! - A rejected call never reaches the inner service
//! - Every rejection carries the same `UNAUTHENTICATED` message; the specific
//!   reason only goes to logs and metrics
//! - Credential values are never logged

use crate::call_context::CallContext;
use crate::credential::Credential;
use crate::jwt::CredentialClaims;
use crate::observability::{record_auth_decision, record_validation_duration};
use crate::policy::{MethodId, MethodPolicyRegistry, PolicyDecision, PolicySource};
use crate::propagation::{CredentialPropagator, PropagationError};
use crate::revocation::RevocationCheck;
use crate::validator::{CredentialValidator, RejectReason, ValidationOutcome};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tonic::body::BoxBody;
use tonic::Status;
use tower::{Layer, Service};

/// Message returned to every rejected caller.
pub const UNAUTHENTICATED_MESSAGE: &str = "Authentication required";

/// Default bound on a revocation lookup.
pub const DEFAULT_REVOCATION_TIMEOUT: Duration = Duration::from_millis(250);

/// Stage of a single call inside the authorization layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Received,
    PolicyChecked,
    Authorized,
    Rejected,
    Dispatched,
    Terminated,
}

impl AuthStage {
    /// Stage that follows this one given the call's decision.
    ///
    /// Past the policy check an anonymous call skips `Authorized` and goes
    /// straight to `Dispatched`.
    #[must_use]
    pub fn next(self, decision: &AuthDecision) -> AuthStage {
        match (self, decision) {
            (AuthStage::Received, _) => AuthStage::PolicyChecked,
            (AuthStage::PolicyChecked, AuthDecision::Dispatch(Authorization::Anonymous { .. })) => {
                AuthStage::Dispatched
            }
            (AuthStage::PolicyChecked, AuthDecision::Dispatch(Authorization::Authenticated(_))) => {
                AuthStage::Authorized
            }
            (AuthStage::PolicyChecked | AuthStage::Authorized, AuthDecision::Reject(_)) => {
                AuthStage::Rejected
            }
            (AuthStage::Authorized, AuthDecision::Dispatch(_)) | (AuthStage::Dispatched, _) => {
                AuthStage::Dispatched
            }
            (AuthStage::Rejected | AuthStage::Terminated, _) => AuthStage::Terminated,
        }
    }

    /// True once the call has left the layer.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, AuthStage::Dispatched | AuthStage::Terminated)
    }
}

/// Identity of an authenticated call, available to handlers through the
/// request extensions.
#[derive(Clone, Debug)]
pub struct AuthenticatedCall {
    /// Method the credential was checked for.
    pub method: MethodId,
    /// Verified claims.
    pub claims: CredentialClaims,
    /// Credential exactly as received, for forwarding.
    pub credential: Credential,
    /// Whether the method was registered or fell to the default policy.
    pub policy_source: PolicySource,
}

impl AuthenticatedCall {
    /// Propagator that forwards this call's credential downstream.
    ///
    /// # Errors
    ///
    /// See [`CredentialPropagator::new`].
    pub fn propagator(&self) -> Result<CredentialPropagator, PropagationError> {
        CredentialPropagator::new(&self.credential)
    }
}

/// Why the call is allowed through.
#[derive(Clone, Debug)]
pub enum Authorization {
    /// The method needs no credential; none was inspected.
    Anonymous { policy_source: PolicySource },
    /// The credential verified.
    Authenticated(AuthenticatedCall),
}

impl Authorization {
    fn policy_source(&self) -> PolicySource {
        match self {
            Authorization::Anonymous { policy_source } => *policy_source,
            Authorization::Authenticated(call) => call.policy_source,
        }
    }
}

/// A refused call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rejection {
    pub reason: RejectReason,
    pub policy_source: PolicySource,
}

impl Rejection {
    /// The generic status sent to the caller.
    #[must_use]
    pub fn into_status(self) -> Status {
        Status::unauthenticated(UNAUTHENTICATED_MESSAGE)
    }

    fn into_response(self) -> http::Response<BoxBody> {
        self.into_status().into_http()
    }
}

/// Outcome of [`Authorizer::authorize`].
#[derive(Clone, Debug)]
pub enum AuthDecision {
    Dispatch(Authorization),
    Reject(Rejection),
}

impl AuthDecision {
    /// True for [`AuthDecision::Dispatch`].
    #[must_use]
    pub fn is_dispatch(&self) -> bool {
        matches!(self, AuthDecision::Dispatch(_))
    }

    /// Reject reason, if rejected.
    #[must_use]
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            AuthDecision::Dispatch(_) => None,
            AuthDecision::Reject(rejection) => Some(rejection.reason),
        }
    }
}

/// Synchronous per-call authorization.
///
/// Cheap to clone; holds only `Arc`s to immutable state.
#[derive(Clone)]
pub struct Authorizer {
    registry: Arc<MethodPolicyRegistry>,
    validator: Arc<dyn CredentialValidator>,
}

impl fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorizer")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Authorizer {
    #[must_use]
    pub fn new(registry: Arc<MethodPolicyRegistry>, validator: Arc<dyn CredentialValidator>) -> Self {
        Self {
            registry,
            validator,
        }
    }

    /// Decide whether a call may reach its handler.
    ///
    /// Methods that need no credential are dispatched without looking at the
    /// context at all.
    pub fn authorize(&self, method: &MethodId, ctx: &CallContext) -> AuthDecision {
        let resolution = self.registry.requires_auth(method);

        if resolution.source == PolicySource::Default {
            tracing::debug!(
                target: "common.grpc_auth",
                method = %method,
                decision = ?resolution.decision,
                "Unregistered method resolved by default policy"
            );
        }

        if resolution.decision == PolicyDecision::NoAuthRequired {
            return AuthDecision::Dispatch(Authorization::Anonymous {
                policy_source: resolution.source,
            });
        }

        let Some(credential) = ctx.authorization() else {
            return AuthDecision::Reject(Rejection {
                reason: RejectReason::Missing,
                policy_source: resolution.source,
            });
        };

        match self.validator.validate(&credential) {
            ValidationOutcome::Valid(claims) => {
                AuthDecision::Dispatch(Authorization::Authenticated(AuthenticatedCall {
                    method: method.clone(),
                    claims,
                    credential,
                    policy_source: resolution.source,
                }))
            }
            ValidationOutcome::Invalid(reason) => AuthDecision::Reject(Rejection {
                reason,
                policy_source: resolution.source,
            }),
        }
    }
}

#[derive(Clone)]
struct RevocationSettings {
    check: Arc<dyn RevocationCheck>,
    timeout: Duration,
}

/// Tower layer applying per-method authorization to gRPC requests.
#[derive(Clone)]
pub struct GrpcAuthLayer {
    authorizer: Authorizer,
    revocation: Option<RevocationSettings>,
}

impl GrpcAuthLayer {
    #[must_use]
    pub fn new(authorizer: Authorizer) -> Self {
        Self {
            authorizer,
            revocation: None,
        }
    }

    /// Run `check` on every authenticated call, rejecting with
    /// `ValidationTimeout` when it does not answer within `timeout`.
    #[must_use]
    pub fn with_revocation(mut self, check: Arc<dyn RevocationCheck>, timeout: Duration) -> Self {
        self.revocation = Some(RevocationSettings { check, timeout });
        self
    }
}

impl fmt::Debug for GrpcAuthLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrpcAuthLayer")
            .field("authorizer", &self.authorizer)
            .field(
                "revocation_timeout",
                &self.revocation.as_ref().map(|settings| settings.timeout),
            )
            .finish()
    }
}

impl<S> Layer<S> for GrpcAuthLayer {
    type Service = GrpcAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GrpcAuthService {
            inner,
            authorizer: self.authorizer.clone(),
            revocation: self.revocation.clone(),
        }
    }
}

/// Tower service produced by [`GrpcAuthLayer`].
#[derive(Clone)]
pub struct GrpcAuthService<S> {
    inner: S,
    authorizer: Authorizer,
    revocation: Option<RevocationSettings>,
}

impl<S, ReqBody> Service<http::Request<ReqBody>> for GrpcAuthService<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<BoxBody>>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<ReqBody>) -> Self::Future {
        // The clone may not be ready; swap so the polled service handles this call
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let authorizer = self.authorizer.clone();
        let revocation = self.revocation.clone();

        Box::pin(async move {
            let method = MethodId::from_path(req.uri().path());
            let ctx = CallContext::from_headers(req.headers());
            let started = Instant::now();

            let mut decision = authorizer.authorize(&method, &ctx);

            let revoked = match (&revocation, &decision) {
                (Some(settings), AuthDecision::Dispatch(Authorization::Authenticated(call))) => {
                    check_revocation(call, settings).await
                }
                _ => None,
            };
            if let Some(rejection) = revoked {
                decision = AuthDecision::Reject(rejection);
            }

            // Received -> PolicyChecked -> outcome -> final stage
            let outcome = AuthStage::Received.next(&decision).next(&decision);
            let stage = outcome.next(&decision);

            match decision {
                AuthDecision::Reject(rejection) => {
                    if rejection.reason != RejectReason::Missing {
                        record_validation_duration("invalid", started.elapsed());
                    }
                    record_auth_decision(
                        "rejected",
                        rejection.reason.as_str(),
                        rejection.policy_source.as_str(),
                    );
                    tracing::debug!(
                        target: "common.grpc_auth",
                        method = %method,
                        reason = %rejection.reason,
                        policy_source = rejection.policy_source.as_str(),
                        stage = ?stage,
                        "Call rejected"
                    );
                    Ok(rejection.into_response())
                }
                AuthDecision::Dispatch(authorization) => {
                    let policy_source = authorization.policy_source().as_str();
                    let (mut parts, body) = req.into_parts();
                    match authorization {
                        Authorization::Authenticated(call) => {
                            record_validation_duration("valid", started.elapsed());
                            record_auth_decision("dispatched", "none", policy_source);
                            parts.extensions.insert(call);
                        }
                        Authorization::Anonymous { .. } => {
                            record_auth_decision("dispatched", "anonymous", policy_source);
                        }
                    }
                    tracing::trace!(
                        target: "common.grpc_auth",
                        method = %method,
                        stage = ?stage,
                        "Call dispatched"
                    );
                    inner.call(http::Request::from_parts(parts, body)).await
                }
            }
        })
    }
}

async fn check_revocation(
    call: &AuthenticatedCall,
    settings: &RevocationSettings,
) -> Option<Rejection> {
    let reason = match tokio::time::timeout(settings.timeout, settings.check.is_revoked(&call.claims))
        .await
    {
        Ok(false) => return None,
        Ok(true) => RejectReason::Revoked,
        Err(_) => {
            tracing::warn!(
                target: "common.grpc_auth",
                method = %call.method,
                timeout_ms = u64::try_from(settings.timeout.as_millis()).unwrap_or(u64::MAX),
                "Revocation check timed out"
            );
            RejectReason::ValidationTimeout
        }
    };
    Some(Rejection {
        reason,
        policy_source: call.policy_source,
    })
}
