// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error kinds surfaced by the hub's agent-facing and UI-facing APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HubError {
    KeyIoError,
    BadRequest,
    Unauthorized,
    FingerprintMismatch,
    TokenExpired,
    SystemExists,
    SystemNotFound,
    AlertNotFound,
    TransportTimeout,
    BadClient,
    ProtocolViolation,
    StoreError,
    UpgradeFailed,
}

impl HubError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::KeyIoError => 500,
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::FingerprintMismatch => 401,
            Self::TokenExpired => 401,
            Self::SystemExists => 409,
            Self::SystemNotFound => 404,
            Self::AlertNotFound => 404,
            Self::TransportTimeout => 504,
            Self::BadClient => 502,
            Self::ProtocolViolation => 400,
            Self::StoreError => 500,
            Self::UpgradeFailed => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeyIoError => "KEY_IO_ERROR",
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::FingerprintMismatch => "FINGERPRINT_MISMATCH",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::SystemExists => "SYSTEM_EXISTS",
            Self::SystemNotFound => "SYSTEM_NOT_FOUND",
            Self::AlertNotFound => "ALERT_NOT_FOUND",
            Self::TransportTimeout => "TRANSPORT_TIMEOUT",
            Self::BadClient => "BAD_CLIENT",
            Self::ProtocolViolation => "PROTOCOL_VIOLATION",
            Self::StoreError => "STORE_ERROR",
            Self::UpgradeFailed => "UPGRADE_FAILED",
        }
    }

    pub fn to_error_body(&self, message: impl Into<String>) -> ErrorBody {
        ErrorBody { code: self.as_str().to_owned(), message: message.into() }
    }

    pub fn to_http_response(
        &self,
        message: impl Into<String>,
    ) -> (StatusCode, Json<ErrorResponse>) {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse { error: self.to_error_body(message) };
        (status, Json(body))
    }
}

impl fmt::Display for HubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for HubError {}

/// Top-level error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body with machine-readable code and human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
