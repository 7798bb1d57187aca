//! TIL section: the type library payload.
//!
//! Only the `IDATIL` signature is checked here; the payload is kept
//! verbatim for a type-information layer to decode.

use crate::idb::constants::TIL_SIGNATURE;
use crate::IdbError;

/// Parsed TIL section: a signature-validated opaque payload.
#[derive(Debug)]
pub struct Til {
    contents: Vec<u8>,
}

impl Til {
    /// Parse the TIL section from its framed payload.
    pub fn parse(buf: Vec<u8>) -> Result<Self, IdbError> {
        if !buf.starts_with(TIL_SIGNATURE) {
            return Err(IdbError::Format("TIL: bad signature".to_string()));
        }
        Ok(Til { contents: buf })
    }

    /// The full section payload, signature included.
    pub fn data(&self) -> &[u8] {
        &self.contents
    }

    /// Re-check the signature.
    pub fn validate(&self) -> Result<(), IdbError> {
        if !self.contents.starts_with(TIL_SIGNATURE) {
            return Err(IdbError::Format("TIL: bad signature".to_string()));
        }
        Ok(())
    }
}
