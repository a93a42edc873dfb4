//! Recovery of structured revert reasons from opaque node errors.
//!
//! Nodes and client libraries bury revert data at different depths of their error payloads,
//! so the error is first flattened into a JSON graph ([`error_graph`]) and then searched for
//! hex strings that look like ABI-encoded revert data ([`extract_revert_data`]).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use web3::ethabi::{self, ParamType, Token};

use crate::{
    constants::{MAX_REPORTED_CANDIDATES, WRAPPED_REASON_SELECTORS},
    selectors::SelectorTable,
};

/// Everything that could be decoded from a failed call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevertDebug {
    pub revert_data: String,
    pub outer_selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_reason_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decode_error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hex_candidates: Vec<HexCandidate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexCandidate {
    pub hex: String,
    pub length: usize,
}

impl HexCandidate {
    fn new(hex: &str) -> Self {
        Self {
            hex: hex.to_owned(),
            length: hex.len(),
        }
    }
}

/// All `0x`-prefixed hex runs in `text` that could be revert data.
///
/// Runs shorter than a selector, with an odd number of digits, or exactly as long as an
/// address are skipped.
pub fn likely_hexes(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut hexes = Vec::new();
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] != b'0' || bytes[i + 1] != b'x' {
            i += 1;
            continue;
        }

        let digits = bytes[i + 2..]
            .iter()
            .take_while(|b| b.is_ascii_hexdigit())
            .count();

        if digits == 0 {
            i += 1;
            continue;
        }

        let end = i + 2 + digits;
        let candidate = &text[i..end];
        if candidate.len() >= 10 && candidate.len() != 42 && digits % 2 == 0 {
            hexes.push(candidate);
        }

        i = end;
    }

    hexes
}

/// Search the error graph for revert data.
///
/// Returns the longest candidate (if any) and every candidate sorted longest first.
pub fn extract_revert_data(graph: &Value) -> (Option<String>, Vec<HexCandidate>) {
    let mut visited = HashSet::<*const Value>::new();
    let mut stack = vec![graph];
    let mut candidates = Vec::new();

    while let Some(current) = stack.pop() {
        if !visited.insert(current as *const Value) {
            continue;
        }

        match current {
            Value::String(text) => {
                candidates.extend(likely_hexes(text).into_iter().map(HexCandidate::new));
            }
            Value::Array(values) => stack.extend(values.iter()),
            Value::Object(map) => stack.extend(map.values()),
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }

    // Stable, so equally long candidates keep discovery order
    candidates.sort_by(|a, b| b.length.cmp(&a.length));

    let data = candidates.first().map(|c| c.hex.clone());
    (data, candidates)
}

/// Decode the revert reason carried somewhere in `graph`.
///
/// Never fails: anything that cannot be decoded is reported in
/// [`RevertDebug::decode_error`]. Returns `None` when the graph holds no revert data at all.
pub fn build_revert_debug(graph: &Value, selectors: &SelectorTable) -> Option<RevertDebug> {
    let (data, candidates) = extract_revert_data(graph);
    let data = data?.to_ascii_lowercase();
    let outer_selector = data[..10].to_owned();

    let mut debug = RevertDebug {
        revert_data: data.clone(),
        outer_selector: outer_selector.clone(),
        ..Default::default()
    };

    if WRAPPED_REASON_SELECTORS.contains(&outer_selector.as_str()) {
        match unwrap_reason(&data[10..]) {
            Ok(inner) => {
                if inner.len() >= 4 {
                    let inner_selector = format!("0x{}", hex::encode(&inner[..4]));
                    debug.inner_signature = selectors.lookup(&inner_selector).map(str::to_owned);
                    debug.inner_selector = Some(inner_selector);
                }
                debug.inner_reason_data = Some(format!("0x{}", hex::encode(&inner)));
            }
            Err(err) => debug.decode_error = Some(err),
        }
    } else {
        debug.outer_signature = selectors.lookup(&outer_selector).map(str::to_owned);
    }

    if candidates.len() > 1 {
        debug.hex_candidates = candidates
            .into_iter()
            .take(MAX_REPORTED_CANDIDATES)
            .collect();
    }

    Some(debug)
}

/// Decode the single `bytes` argument of a wrapping error
fn unwrap_reason(encoded_hex: &str) -> Result<Vec<u8>, String> {
    let encoded = hex::decode(encoded_hex).map_err(|err| err.to_string())?;
    let mut tokens =
        ethabi::decode(&[ParamType::Bytes], &encoded).map_err(|err| err.to_string())?;

    match tokens.pop() {
        Some(Token::Bytes(inner)) => Ok(inner),
        other => Err(format!("expected a bytes argument, got {other:?}")),
    }
}

/// Flatten an error and its source chain into JSON for [`build_revert_debug`].
///
/// JSON-RPC error payloads are kept structurally so their `data` field is searched as-is.
pub fn error_graph(err: &(dyn std::error::Error + 'static)) -> Value {
    let mut causes = Vec::new();
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);

    while let Some(err) = current {
        let mut node = json!({
            "message": err.to_string(),
            "debug": format!("{err:?}"),
        });

        if let Some(rpc) = rpc_error(err) {
            node["rpc"] = serde_json::to_value(rpc).unwrap_or(Value::Null);
        }

        causes.push(node);
        current = err.source();
    }

    json!({
        "message": err.to_string(),
        "causes": causes,
    })
}

fn rpc_error<'a>(
    err: &'a (dyn std::error::Error + 'static),
) -> Option<&'a jsonrpc_core::Error> {
    if let Some(web3::Error::Rpc(rpc)) = err.downcast_ref::<web3::Error>() {
        return Some(rpc);
    }

    if let Some(web3::contract::Error::Api(web3::Error::Rpc(rpc))) =
        err.downcast_ref::<web3::contract::Error>()
    {
        return Some(rpc);
    }

    if let Some(crate::Error::Web3(web3::Error::Rpc(rpc))) = err.downcast_ref::<crate::Error>() {
        return Some(rpc);
    }

    if let Some(crate::Error::Web3Contract(web3::contract::Error::Api(web3::Error::Rpc(rpc)))) =
        err.downcast_ref::<crate::Error>()
    {
        return Some(rpc);
    }

    None
}
