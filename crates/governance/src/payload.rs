//! Byte-size validation for request and response payloads.

use serde::Serialize;

use crate::error::ToolError;

/// Fixed byte cap applied to file-content payloads on both the write path
/// (request arguments, before dispatch) and the read path (response body,
/// before it is returned or cached).
#[derive(Debug, Clone, Copy)]
pub struct PayloadGuard {
    max_bytes: usize,
}

impl PayloadGuard {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn check_bytes(&self, len: usize) -> Result<(), ToolError> {
        if len > self.max_bytes {
            return Err(ToolError::PayloadTooLarge {
                actual: len,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Checks the serialized JSON size of a payload.
    pub fn check<T: Serialize>(&self, payload: &T) -> Result<(), ToolError> {
        let len = serde_json::to_vec(payload).map(|b| b.len()).unwrap_or(0);
        self.check_bytes(len)
    }
}
