//! Lookup table from 4-byte error selectors to their canonical signatures.

use std::{collections::HashMap, path::Path};

use serde_json::Value;
use sha3::{Digest, Keccak256};

use crate::{Error, Result};

/// Maps `keccak256(signature)[..4]` to `signature` for every `error` entry of an ABI
#[derive(Debug, Clone, Default)]
pub struct SelectorTable {
    signatures: HashMap<[u8; 4], String>,
}

impl SelectorTable {
    /// Build a table from an ABI, given either as an artifact object with an `abi` key or as
    /// the bare ABI array
    pub fn from_abi(abi: &Value) -> Result<Self> {
        let entries = match abi {
            Value::Array(entries) => entries,
            Value::Object(artifact) => match artifact.get("abi") {
                Some(Value::Array(entries)) => entries,
                _ => {
                    return Err(Error::InvalidArgument(
                        "ABI artifact has no `abi` array".to_owned(),
                    ))
                }
            },
            _ => {
                return Err(Error::InvalidArgument(
                    "ABI must be an array or an artifact object".to_owned(),
                ))
            }
        };

        let signatures = entries
            .iter()
            .filter(|entry| entry.get("type").and_then(Value::as_str) == Some("error"))
            .map(|entry| {
                let signature = error_signature(entry);
                (selector(&signature), signature)
            })
            .collect();

        Ok(Self { signatures })
    }

    pub fn try_load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let abi = serde_json::from_str::<Value>(&raw)?;
        Self::from_abi(&abi)
    }

    /// Load the table from a file, falling back to an empty table if the file is missing or
    /// malformed. Decoding then simply reports no signatures.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(table) => {
                tracing::info!(path = %path.display(), errors = table.len(), "loaded error ABI");
                table
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), ?err, "failed to load error ABI");
                Self::default()
            }
        }
    }

    /// Merge another table into this one. Entries from `other` win on collision
    pub fn extend(&mut self, other: SelectorTable) {
        self.signatures.extend(other.signatures);
    }

    pub fn get(&self, selector: &[u8; 4]) -> Option<&str> {
        self.signatures.get(selector).map(String::as_str)
    }

    /// Look up a selector given as hex text (`0x` prefix optional, case-insensitive)
    pub fn lookup(&self, selector_hex: &str) -> Option<&str> {
        let digits = selector_hex.strip_prefix("0x").unwrap_or(selector_hex);
        let bytes = hex::decode(digits).ok()?;
        let selector: [u8; 4] = bytes.try_into().ok()?;
        self.get(&selector)
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

/// First four bytes of the keccak256 hash of a canonical signature
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// Canonical signature of an ABI `error` entry, e.g. `UnknownMerkleRoot(bytes32)`
pub fn error_signature(entry: &Value) -> String {
    let name = entry
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or("UnknownError");

    let inputs = entry
        .get("inputs")
        .and_then(Value::as_array)
        .map(|inputs| inputs.iter().map(canonical_type).collect::<Vec<_>>())
        .unwrap_or_default();

    format!("{name}({})", inputs.join(","))
}

/// Tuples are written out as their parenthesised component list, keeping any array suffix
fn canonical_type(param: &Value) -> String {
    let ty = param.get("type").and_then(Value::as_str).unwrap_or_default();

    match ty.strip_prefix("tuple") {
        Some(suffix) => {
            let components = param
                .get("components")
                .and_then(Value::as_array)
                .map(|components| components.iter().map(canonical_type).collect::<Vec<_>>())
                .unwrap_or_default();
            format!("({}){suffix}", components.join(","))
        }
        None => ty.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn well_known_selectors() {
        assert_eq!(hex::encode(selector("Error(string)")), "08c379a0");
        assert_eq!(hex::encode(selector("Panic(uint256)")), "4e487b71");
    }

    #[test]
    fn builds_table_from_bare_array() {
        let abi = json!([
            { "type": "function", "name": "deposit", "inputs": [] },
            {
                "type": "error",
                "name": "Foo",
                "inputs": [{ "name": "x", "type": "uint256" }]
            }
        ]);

        let table = SelectorTable::from_abi(&abi).unwrap();
        assert_eq!(table.len(), 1);

        let expected = Keccak256::digest(b"Foo(uint256)");
        let hex_selector = format!("0x{}", hex::encode(&expected[..4]));
        assert_eq!(table.lookup(&hex_selector), Some("Foo(uint256)"));
        assert_eq!(table.lookup(&hex_selector.to_uppercase().replace("0X", "0x")), Some("Foo(uint256)"));
    }

    #[test]
    fn builds_table_from_artifact() {
        let abi: Value = serde_json::from_str(crate::POOL_CONTRACT_JSON).unwrap();
        let table = SelectorTable::from_abi(&abi).unwrap();

        assert_eq!(
            table.get(&selector("NullifierAlreadySpent(bytes32)")),
            Some("NullifierAlreadySpent(bytes32)")
        );
        assert_eq!(table.get(&selector("InvalidProof()")), Some("InvalidProof()"));
    }

    #[test]
    fn tuples_are_expanded() {
        let entry = json!({
            "type": "error",
            "name": "Bad",
            "inputs": [
                {
                    "type": "tuple[]",
                    "components": [
                        { "type": "address" },
                        { "type": "tuple", "components": [{ "type": "uint8" }, { "type": "bytes" }] }
                    ]
                },
                { "type": "bool" }
            ]
        });

        assert_eq!(error_signature(&entry), "Bad((address,(uint8,bytes))[],bool)");
    }

    #[test]
    fn missing_name_defaults() {
        let entry = json!({ "type": "error", "inputs": [] });
        assert_eq!(error_signature(&entry), "UnknownError()");
    }

    #[test]
    fn rejects_non_abi_values() {
        assert!(SelectorTable::from_abi(&json!("nope")).is_err());
        assert!(SelectorTable::from_abi(&json!({ "bytecode": "0x" })).is_err());
    }

    #[test]
    fn missing_file_loads_empty_table() {
        let table = SelectorTable::load("/definitely/not/here.json");
        assert!(table.is_empty());
        assert_eq!(table.lookup("0x08c379a0"), None);
    }
}
