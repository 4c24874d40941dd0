// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Length-prefixed, typed frame codec shared by every WebSocket connection.
//!
//! A frame is a 4-byte big-endian length prefix covering everything that
//! follows, a 1-byte action tag, then a JSON payload. The length prefix
//! means both sides always know exactly where one frame ends and the next
//! begins even if a transport ever concatenates writes; the tag means the
//! payload's shape is known before it is parsed.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::HubError;

/// Discriminates the payload carried by a [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    CheckFingerprint,
    GetData,
    ConfigUpdate,
    FingerprintResponse,
    CombinedData,
}

impl FrameAction {
    fn tag(self) -> u8 {
        match self {
            Self::CheckFingerprint => 0,
            Self::GetData => 1,
            Self::ConfigUpdate => 2,
            Self::FingerprintResponse => 3,
            Self::CombinedData => 4,
        }
    }

    fn from_tag(tag: u8) -> Result<Self, HubError> {
        match tag {
            0 => Ok(Self::CheckFingerprint),
            1 => Ok(Self::GetData),
            2 => Ok(Self::ConfigUpdate),
            3 => Ok(Self::FingerprintResponse),
            4 => Ok(Self::CombinedData),
            _ => Err(HubError::ProtocolViolation),
        }
    }
}

/// A decoded frame: its action tag plus the still-serialized JSON payload.
pub struct Frame {
    pub action: FrameAction,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, HubError> {
        serde_json::from_slice(&self.payload).map_err(|_| HubError::ProtocolViolation)
    }
}

/// Encode `payload` as a frame with the given action tag.
///
/// Layout: `[len: u32 BE][tag: u8][json bytes]`, where `len` counts the tag
/// byte plus the JSON bytes.
pub fn encode(action: FrameAction, payload: &impl Serialize) -> Result<Vec<u8>, HubError> {
    let json = serde_json::to_vec(payload).map_err(|_| HubError::ProtocolViolation)?;
    let len = (json.len() + 1) as u32;

    let mut out = Vec::with_capacity(4 + json.len() + 1);
    out.extend_from_slice(&len.to_be_bytes());
    out.push(action.tag());
    out.extend_from_slice(&json);
    Ok(out)
}

/// Decode a single frame from a complete in-memory buffer (e.g. one
/// WebSocket binary message).
pub fn decode(bytes: &[u8]) -> Result<Frame, HubError> {
    if bytes.len() < 5 {
        return Err(HubError::ProtocolViolation);
    }

    let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    if len == 0 || 4 + len != bytes.len() {
        return Err(HubError::ProtocolViolation);
    }

    let action = FrameAction::from_tag(bytes[4])?;
    let payload = bytes[5..].to_vec();
    Ok(Frame { action, payload })
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
