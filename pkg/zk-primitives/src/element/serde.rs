use ethnum::U256;
use serde::{Deserialize, Deserializer, Serializer};

pub(super) fn serialize<S>(u: &U256, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("0x{}", hex::encode(u.to_be_bytes())))
}

pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let vec = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
    if vec.len() > 32 {
        return Err(serde::de::Error::custom("Invalid length"));
    }

    let mut bytes = [0; 32];
    bytes[32 - vec.len()..].copy_from_slice(&vec);
    Ok(U256::from_be_bytes(bytes))
}
