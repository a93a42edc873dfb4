use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use web3::{
    ethabi::{self, ParamType, Token},
    types::{Address, U256},
};

use crate::{Error, Result};

/// A contract call described as JSON: the function name plus its arguments keyed by ABI
/// parameter name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCall {
    pub function_name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl ContractCall {
    /// Tokenize the arguments in the order the function declares its inputs
    pub fn tokens(&self, function: &ethabi::Function) -> Result<Vec<Token>> {
        function
            .inputs
            .iter()
            .map(|param| {
                let value = self.args.get(&param.name).ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "{}: missing argument `{}`",
                        self.function_name, param.name
                    ))
                })?;

                token_from_json(&param.kind, value).map_err(|err| {
                    Error::InvalidArgument(format!("{}.{}: {err}", self.function_name, param.name))
                })
            })
            .collect()
    }
}

/// Convert a JSON argument into the token for `kind`.
///
/// Integers may be JSON numbers, decimal strings or `0x` hex strings. Byte types are `0x` hex;
/// fixed-size byte arrays shorter than their width are left-padded.
pub fn token_from_json(kind: &ParamType, value: &Value) -> Result<Token, String> {
    match (kind, value) {
        (ParamType::Address, Value::String(s)) => {
            let digits = strip_0x(s);
            digits
                .parse::<Address>()
                .map(Token::Address)
                .map_err(|err| format!("invalid address {s:?}: {err}"))
        }
        (ParamType::FixedBytes(width), Value::String(s)) => {
            let bytes = decode_hex(s)?;
            if bytes.len() > *width {
                return Err(format!("{s:?} does not fit in bytes{width}"));
            }

            let mut padded = vec![0u8; *width - bytes.len()];
            padded.extend_from_slice(&bytes);
            Ok(Token::FixedBytes(padded))
        }
        (ParamType::Bytes, Value::String(s)) => decode_hex(s).map(Token::Bytes),
        (ParamType::Uint(_), value) => parse_uint(value).map(Token::Uint),
        (ParamType::Int(_), value) => parse_uint(value).map(Token::Int),
        (ParamType::Bool, Value::Bool(b)) => Ok(Token::Bool(*b)),
        (ParamType::String, Value::String(s)) => Ok(Token::String(s.clone())),
        (ParamType::Array(inner), Value::Array(values)) => values
            .iter()
            .map(|v| token_from_json(inner, v))
            .collect::<Result<_, _>>()
            .map(Token::Array),
        (ParamType::FixedArray(inner, len), Value::Array(values)) => {
            if values.len() != *len {
                return Err(format!("expected {len} elements, got {}", values.len()));
            }

            values
                .iter()
                .map(|v| token_from_json(inner, v))
                .collect::<Result<_, _>>()
                .map(Token::FixedArray)
        }
        (ParamType::Tuple(kinds), Value::Array(values)) => {
            if values.len() != kinds.len() {
                return Err(format!(
                    "expected a {}-tuple, got {} elements",
                    kinds.len(),
                    values.len()
                ));
            }

            kinds
                .iter()
                .zip(values)
                .map(|(kind, v)| token_from_json(kind, v))
                .collect::<Result<_, _>>()
                .map(Token::Tuple)
        }
        (kind, value) => Err(format!("cannot encode {value} as {kind}")),
    }
}

fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}

fn decode_hex(s: &str) -> Result<Vec<u8>, String> {
    hex::decode(strip_0x(s)).map_err(|err| format!("invalid hex {s:?}: {err}"))
}

fn parse_uint(value: &Value) -> Result<U256, String> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| format!("{n} is not an unsigned integer")),
        Value::String(s) => match s.strip_prefix("0x") {
            Some(digits) => U256::from_str_radix(digits, 16)
                .map_err(|err| format!("invalid hex integer {s:?}: {err:?}")),
            None => U256::from_dec_str(s)
                .map_err(|err| format!("invalid decimal integer {s:?}: {err:?}")),
        },
        other => Err(format!("{other} is not an integer")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_signed_action_shape() {
        let call: ContractCall = serde_json::from_value(json!({
            "functionName": "withdrawV2b",
            "args": { "proof": "0x01", "publicInputs": [], "ciphertext": "0x02" }
        }))
        .unwrap();

        assert_eq!(call.function_name, "withdrawV2b");
        assert_eq!(call.args.len(), 3);
    }

    #[test]
    fn fixed_bytes_are_left_padded() {
        let token = token_from_json(&ParamType::FixedBytes(32), &json!("0xabcd")).unwrap();
        let mut expected = vec![0u8; 30];
        expected.extend([0xab, 0xcd]);

        assert_eq!(token, Token::FixedBytes(expected));
        assert!(token_from_json(&ParamType::FixedBytes(1), &json!("0xabcd")).is_err());
    }

    #[test]
    fn integers_accept_all_shapes() {
        let kind = ParamType::Uint(256);

        assert_eq!(token_from_json(&kind, &json!(500)).unwrap(), Token::Uint(500.into()));
        assert_eq!(token_from_json(&kind, &json!("500")).unwrap(), Token::Uint(500.into()));
        assert_eq!(token_from_json(&kind, &json!("0x1f4")).unwrap(), Token::Uint(500.into()));
        assert!(token_from_json(&kind, &json!("five")).is_err());
        assert!(token_from_json(&kind, &json!(-1)).is_err());
    }

    #[test]
    fn arrays_and_addresses() {
        let kind = ParamType::Array(Box::new(ParamType::FixedBytes(32)));
        let token = token_from_json(&kind, &json!(["0x01", "0x02"])).unwrap();
        assert!(matches!(token, Token::Array(ref items) if items.len() == 2));

        let address = format!("0x{}", "12".repeat(20));
        let token = token_from_json(&ParamType::Address, &json!(address)).unwrap();
        assert_eq!(token, Token::Address(Address::repeat_byte(0x12)));
    }

    #[test]
    fn orders_arguments_by_abi() {
        let contract: ethabi::Contract = serde_json::from_value(
            serde_json::from_str::<Value>(crate::POOL_CONTRACT_JSON).unwrap()["abi"].clone(),
        )
        .unwrap();
        let function = contract.function("deposit").unwrap();

        let call: ContractCall = serde_json::from_value(json!({
            "functionName": "deposit",
            "args": { "amount": "7", "commitment": "0x01" }
        }))
        .unwrap();

        let tokens = call.tokens(function).unwrap();
        assert!(matches!(tokens[0], Token::FixedBytes(_)));
        assert_eq!(tokens[1], Token::Uint(7.into()));

        let missing: ContractCall = serde_json::from_value(json!({
            "functionName": "deposit",
            "args": { "amount": "7" }
        }))
        .unwrap();
        assert!(missing.tokens(function).is_err());
    }
}
