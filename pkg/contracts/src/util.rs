use ethereum_types::{H160, H256, U256};
use zk_primitives::Element;

pub fn convert_element_to_h256(element: &Element) -> H256 {
    H256::from_slice(&element.to_be_bytes())
}

pub fn convert_element_to_u256(element: &Element) -> U256 {
    U256::from_big_endian(&element.to_be_bytes())
}

pub fn convert_h256_to_element(h256: &H256) -> Element {
    Element::from_be_bytes(h256.0)
}

pub fn convert_h160_to_element(h160: &H160) -> Element {
    let mut h256 = [0u8; 32];
    h256[12..32].copy_from_slice(&h160.0);

    Element::from_be_bytes(h256)
}
