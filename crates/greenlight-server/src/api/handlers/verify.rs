//! Credential verification handler
//!
//! Per-request flow: decode the raw credential, check the signature
//! against the current trust snapshot, then evaluate policy rules. The
//! snapshot references are loaded once at the start of processing; a
//! refresh committing mid-request never mixes old and new trust material
//! into one request.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, info};

use greenlight_core::{decode, verify_signature};

use crate::api::error::ApiError;
use crate::config::ServerConfig;
use crate::policy;
use crate::trust::store::TrustContext;

/// Application state shared across handlers
pub struct AppState {
    /// Owner of the published trust and policy snapshots
    pub context: Arc<TrustContext>,
    /// Server configuration
    pub config: ServerConfig,
}

/// Query parameters of `GET /v1/verify`
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    /// The encoded credential string
    pub dgc: Option<String>,
}

/// Verify an encoded credential
///
/// GET /v1/verify?dgc=HC1:...
///
/// Plain-text response: `200` with the rule message on acceptance, `400`
/// with a category-prefixed message on any rejection.
pub async fn verify_credential(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let Some(raw) = params.dgc else {
        return ApiError::MissingCredential.into_response();
    };

    let credential = match decode(&raw) {
        Ok(credential) => credential,
        Err(err) => {
            debug!(error = %err, "credential decode failed");
            return ApiError::Decode(err).into_response();
        }
    };

    let snapshot = state.context.trust();
    let check = verify_signature(&credential, &snapshot);
    if !check.trusted {
        info!(
            kind = credential.kind.name(),
            kid = credential.kid.as_deref().unwrap_or("-"),
            certificates = snapshot.certificate_count(),
            "no trusted certificate validates the signature"
        );
        return ApiError::UntrustedSignature.into_response();
    }

    let policy_snapshot = state.context.policy();
    let result = policy::evaluate(&policy_snapshot, &credential);

    info!(
        kind = credential.kind.name(),
        accepted = result.accepted,
        message = %result.message,
        "credential evaluated"
    );

    let message = if state.config.add_holder_details {
        let holder = &credential.holder;
        format!(
            "{} - {} {} ({})",
            result.message, holder.surname, holder.forename, holder.date_of_birth
        )
    } else {
        result.message
    };

    let status = if result.accepted {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };

    (status, message).into_response()
}
