//! Hex formatting helpers.
//!
//! B-tree keys and values are raw byte strings; lookups and debug output
//! render them as compact hex.

/// Format bytes as a compact hex string (e.g., "4a2f00ff").
pub fn format_bytes(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}
