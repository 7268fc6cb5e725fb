//! Event-shape descriptor for the tracked `Transfer` event.
//!
//! The ABI JSON is parsed once into an [`EventShape`]; the decoder keeps the
//! shape and its precomputed topic0 for its whole lifetime.
//!
//! The topic0 of an EVM event is the keccak256 hash of its canonical
//! signature string:
//!   keccak256("Transfer(address,address,uint256)")
//!   → 0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef

use serde::Deserialize;
use tiny_keccak::{Hasher, Keccak};

use nfttrack_core::error::TrackerError;
use nfttrack_core::B256;

/// ABI of the ERC-721 `Transfer` event. All three parameters are indexed.
pub const TRANSFER_EVENT_ABI: &str = r#"[
    {
        "anonymous": false,
        "inputs": [
            { "indexed": true, "internalType": "address", "name": "from", "type": "address" },
            { "indexed": true, "internalType": "address", "name": "to", "type": "address" },
            { "indexed": true, "internalType": "uint256", "name": "tokenId", "type": "uint256" }
        ],
        "name": "Transfer",
        "type": "event"
    }
]"#;

/// One event input as declared in the ABI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventParam {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub indexed: bool,
}

#[derive(Debug, Deserialize)]
struct AbiItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    inputs: Vec<EventParam>,
    #[serde(default)]
    anonymous: bool,
}

/// A parsed event declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventShape {
    pub name: String,
    pub inputs: Vec<EventParam>,
    pub anonymous: bool,
}

impl EventShape {
    /// Parse `event_name` out of an ABI JSON array.
    pub fn from_abi_json(abi: &str, event_name: &str) -> Result<Self, TrackerError> {
        let items: Vec<AbiItem> = serde_json::from_str(abi)
            .map_err(|e| TrackerError::Config(format!("invalid event ABI: {e}")))?;

        items
            .into_iter()
            .find(|item| item.kind == "event" && item.name.as_deref() == Some(event_name))
            .map(|item| Self {
                name: event_name.to_string(),
                inputs: item.inputs,
                anonymous: item.anonymous,
            })
            .ok_or_else(|| TrackerError::Config(format!("event '{event_name}' not found in ABI")))
    }

    /// The built-in `Transfer(address,address,uint256)` shape, validated.
    pub fn transfer() -> Result<Self, TrackerError> {
        let shape = Self::from_abi_json(TRANSFER_EVENT_ABI, "Transfer")?;
        shape.validate_transfer()?;
        Ok(shape)
    }

    /// Canonical signature, e.g. `Transfer(address,address,uint256)`.
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self.inputs.iter().map(|p| p.ty.as_str()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// keccak256 of the canonical signature (the expected `topics[0]`).
    pub fn topic0(&self) -> B256 {
        keccak256_signature(&self.signature())
    }

    /// Number of indexed inputs, i.e. topics after topic0.
    pub fn indexed_count(&self) -> usize {
        self.inputs.iter().filter(|p| p.indexed).count()
    }

    /// The decoder reads every field from topics, so the shape must be
    /// `(address indexed, address indexed, uint256 indexed)` and not anonymous.
    pub fn validate_transfer(&self) -> Result<(), TrackerError> {
        if self.anonymous {
            return Err(TrackerError::Config(format!("event '{}' is anonymous", self.name)));
        }
        let types: Vec<&str> = self.inputs.iter().map(|p| p.ty.as_str()).collect();
        if types != ["address", "address", "uint256"] {
            return Err(TrackerError::Config(format!(
                "unexpected transfer shape {}",
                self.signature()
            )));
        }
        if let Some(p) = self.inputs.iter().find(|p| !p.indexed) {
            return Err(TrackerError::Config(format!(
                "transfer parameter '{}' is not indexed",
                p.name
            )));
        }
        Ok(())
    }
}

/// Compute the keccak256 hash of an event signature string.
pub fn keccak256_signature(signature: &str) -> B256 {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(signature.as_bytes());
    hasher.finalize(&mut output);
    B256::from(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_signature_and_topic0() {
        let shape = EventShape::transfer().unwrap();
        assert_eq!(shape.signature(), "Transfer(address,address,uint256)");
        assert_eq!(
            format!("{:#x}", shape.topic0()),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
        assert_eq!(shape.indexed_count(), 3);
    }

    #[test]
    fn missing_event_is_config_error() {
        let err = EventShape::from_abi_json(TRANSFER_EVENT_ABI, "Approval").unwrap_err();
        assert!(matches!(err, TrackerError::Config(_)));
    }

    #[test]
    fn erc20_style_transfer_is_rejected() {
        // ERC-20 Transfer keeps the amount in the data payload.
        let abi = r#"[{"type":"event","name":"Transfer","anonymous":false,"inputs":[
            {"indexed":true,"name":"from","type":"address"},
            {"indexed":true,"name":"to","type":"address"},
            {"indexed":false,"name":"value","type":"uint256"}]}]"#;
        let shape = EventShape::from_abi_json(abi, "Transfer").unwrap();
        assert_eq!(shape.topic0(), EventShape::transfer().unwrap().topic0());
        assert!(shape.validate_transfer().is_err());
    }

    #[test]
    fn malformed_abi_is_config_error() {
        assert!(EventShape::from_abi_json("{not json", "Transfer").is_err());
    }
}
