use ethnum::U256;
use serde_json::Value;

use crate::Element;

/// An error produced while turning external data into an [`Element`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// The input had a recognised shape, but its contents are not a valid field element
    /// (bad hex, overflow, or a value `>= p`)
    #[error("malformed field element: {0}")]
    MalformedField(String),

    /// The input did not have any shape that can carry a field element
    #[error("unrecognized field encoding: {0}")]
    UnrecognizedFieldEncoding(String),
}

/// A field element in one of the shapes a proving backend is known to accept or return
///
/// Call [`FieldValue::normalize`] to reduce any of these to a canonical [`Element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// An already-parsed element (still checked against the modulus)
    Element(Element),
    /// A small integer, e.g. a `u32` circuit input
    Integer(u128),
    /// A base-10 string
    Decimal(String),
    /// A `0x`-prefixed hex string of any digit count
    Hex(String),
    /// A big-endian byte array
    Bytes(Vec<u8>),
    /// An object of the form `{ value: ... }`
    Wrapped(Box<FieldValue>),
}

impl FieldValue {
    /// Classify a bare string: `0x`/`0X` prefixed strings are hex, everything else is decimal
    #[must_use]
    pub fn from_text(s: &str) -> Self {
        if s.starts_with("0x") || s.starts_with("0X") {
            Self::Hex(s.to_owned())
        } else {
            Self::Decimal(s.to_owned())
        }
    }

    /// Map a JSON value onto a [`FieldValue`]
    ///
    /// ```rust
    /// # use zk_primitives::*;
    /// let value = serde_json::json!({ "value": { "value": [0, 1, 0] } });
    /// let field = FieldValue::from_json(&value).unwrap();
    ///
    /// assert_eq!(field.normalize().unwrap(), Element::new(256));
    /// ```
    pub fn from_json(value: &Value) -> Result<Self, FieldError> {
        match value {
            Value::String(s) => Ok(Self::from_text(s)),
            Value::Number(n) => n
                .as_u64()
                .map(|n| Self::Integer(n.into()))
                .ok_or_else(|| FieldError::UnrecognizedFieldEncoding(n.to_string())),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect::<Option<Vec<u8>>>()
                .map(Self::Bytes)
                .ok_or_else(|| FieldError::UnrecognizedFieldEncoding(value.to_string())),
            Value::Object(map) => match map.get("value") {
                Some(inner) => Ok(Self::Wrapped(Box::new(Self::from_json(inner)?))),
                None => Err(FieldError::UnrecognizedFieldEncoding(value.to_string())),
            },
            Value::Null | Value::Bool(_) => {
                Err(FieldError::UnrecognizedFieldEncoding(value.to_string()))
            }
        }
    }

    /// Reduce this value to a canonical [`Element`], unwrapping `{ value }` layers until a
    /// terminal representation is reached
    pub fn normalize(&self) -> Result<Element, FieldError> {
        let mut current = self;

        loop {
            match current {
                Self::Element(element) => return element.ensure_canonical(),
                Self::Integer(i) => return Element::from(*i).ensure_canonical(),
                Self::Decimal(s) => return parse_decimal(s),
                Self::Hex(s) => return parse_hex(s),
                Self::Bytes(bytes) => return Element::from_be_slice(bytes),
                Self::Wrapped(inner) => current = inner,
            }
        }
    }
}

impl From<Element> for FieldValue {
    fn from(value: Element) -> Self {
        Self::Element(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Integer(value.into())
    }
}

impl Element {
    /// Strictly decode the canonical wire form
    ///
    /// The input must be `0x` followed by a non-empty, even number of hex digits (at most 64),
    /// and must decode to a value below [`Element::MODULUS`].
    ///
    /// ```rust
    /// # use zk_primitives::*;
    /// assert_eq!(Element::from_hex("0x0a").unwrap(), Element::new(10));
    /// assert!(Element::from_hex("0xa").is_err());
    /// assert!(Element::from_hex("0a").is_err());
    /// assert!(Element::from_hex(&Element::MODULUS.to_hex()).is_err());
    /// ```
    pub fn from_hex(s: &str) -> Result<Self, FieldError> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| FieldError::MalformedField(format!("missing 0x prefix: {s:?}")))?;

        if digits.is_empty() || digits.len() % 2 != 0 || digits.len() > 64 {
            return Err(FieldError::MalformedField(format!(
                "expected an even number of hex digits (at most 64): {s:?}"
            )));
        }

        let bytes =
            hex::decode(digits).map_err(|err| FieldError::MalformedField(format!("{s:?}: {err}")))?;

        Self::from_be_slice(&bytes)
    }

    /// Decode a big-endian integer of any length into a canonical [`Element`]
    ///
    /// Leading zero bytes are ignored
    pub fn from_be_slice(bytes: &[u8]) -> Result<Self, FieldError> {
        let first_nonzero = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        let significant = &bytes[first_nonzero..];

        if significant.len() > 32 {
            return Err(FieldError::MalformedField(format!(
                "{} significant bytes do not fit in a field element",
                significant.len()
            )));
        }

        let mut padded = [0; 32];
        padded[32 - significant.len()..].copy_from_slice(significant);

        Self::from_be_bytes(padded).ensure_canonical()
    }

    /// Return `self` if it is below [`Element::MODULUS`], otherwise [`FieldError::MalformedField`]
    pub fn ensure_canonical(self) -> Result<Self, FieldError> {
        match self.is_canonical() {
            true => Ok(self),
            false => Err(FieldError::MalformedField(format!(
                "{} is not less than the field modulus",
                self.to_hex()
            ))),
        }
    }
}

fn parse_decimal(s: &str) -> Result<Element, FieldError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FieldError::MalformedField(format!("not a decimal integer: {s:?}")));
    }

    let value = U256::from_str_radix(s, 10)
        .map_err(|err| FieldError::MalformedField(format!("{s:?}: {err}")))?;

    Element::from(value).ensure_canonical()
}

fn parse_hex(s: &str) -> Result<Element, FieldError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);

    if digits.is_empty() {
        return Err(FieldError::MalformedField(format!("empty hex string: {s:?}")));
    }

    let bytes = if digits.len() % 2 == 0 {
        hex::decode(digits)
    } else {
        hex::decode(format!("0{digits}"))
    }
    .map_err(|err| FieldError::MalformedField(format!("{s:?}: {err}")))?;

    Element::from_be_slice(&bytes)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_strategy::proptest;

    use super::*;

    #[proptest]
    fn hex_round_trip(mut element: Element) {
        element.canonicalize();

        assert_eq!(Element::from_hex(&element.to_hex()).unwrap(), element);
    }

    #[test]
    fn from_hex_rejects_bad_shapes() {
        let too_long = format!("0x{}", "00".repeat(33));

        for input in ["", "0x", "0x1", "12", "0xzz", too_long.as_str()] {
            assert!(
                matches!(Element::from_hex(input), Err(FieldError::MalformedField(_))),
                "{input:?}"
            );
        }
    }

    #[test]
    fn from_hex_rejects_modulus_but_accepts_predecessor() {
        let below = Element::from(Element::MODULUS.to_u256() - 1);

        assert!(Element::from_hex(&Element::MODULUS.to_hex()).is_err());
        assert_eq!(Element::from_hex(&below.to_hex()).unwrap(), below);
    }

    #[test]
    fn normalize_accepts_every_shape() {
        let expected = Element::new(0xdef456);

        let shapes = [
            FieldValue::Decimal("14611542".to_owned()),
            FieldValue::Hex("0xdef456".to_owned()),
            FieldValue::Hex("0XDEF456".to_owned()),
            FieldValue::Bytes(vec![0, 0, 0xde, 0xf4, 0x56]),
            FieldValue::Integer(0xdef456),
            FieldValue::Element(expected),
            FieldValue::Wrapped(Box::new(FieldValue::Wrapped(Box::new(FieldValue::Hex(
                "0xdef456".to_owned(),
            ))))),
        ];

        for shape in shapes {
            assert_eq!(shape.normalize().unwrap(), expected, "{shape:?}");
        }
    }

    #[test]
    fn normalize_rejects_out_of_field_values() {
        let too_big = FieldValue::Bytes(Element::MAX.to_be_bytes().to_vec());
        assert!(matches!(
            too_big.normalize(),
            Err(FieldError::MalformedField(_))
        ));

        let overflow = FieldValue::Decimal("9".repeat(80));
        assert!(matches!(
            overflow.normalize(),
            Err(FieldError::MalformedField(_))
        ));

        let not_decimal = FieldValue::Decimal("12a".to_owned());
        assert!(not_decimal.normalize().is_err());
    }

    #[test]
    fn from_json_fails_closed() {
        for value in [json!(null), json!(true), json!({"other": 1}), json!(-1), json!([300])] {
            assert!(
                matches!(
                    FieldValue::from_json(&value),
                    Err(FieldError::UnrecognizedFieldEncoding(_))
                ),
                "{value}"
            );
        }

        let nested = json!({"value": "0x2a"});
        assert_eq!(
            FieldValue::from_json(&nested).unwrap().normalize().unwrap(),
            Element::new(42)
        );
    }
}
