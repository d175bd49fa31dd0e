//! Serializes emitted code plus its constant pool into the binary
//! container both front ends produce. Layout:
//!
//! ```text
//! [0..4)   magic           4 bytes, caller-supplied ("PBO3" or "NBO2")
//! [4..8)   entry offset    u32 LE, always 0 — execution starts at byte 0
//!          of the code section
//! [8..12)  data length     u32 LE, byte length of the data section
//! [12..16) code length     u32 LE, byte length of the code section
//! [16..)   data section, then code section, back to back
//! ```
//!
//! Each constant in the data section is `length: u32 LE` followed by its
//! encoded bytes, in pool order.

use crate::bytecode::constant_pool::{ConstValue, ConstantPool};

const HEADER_LEN: usize = 16;

pub fn assemble(magic: &[u8; 4], code: &[u8], constants: &ConstantPool) -> Vec<u8> {
    let data = encode_data_section(constants);

    let mut out = Vec::with_capacity(HEADER_LEN + data.len() + code.len());
    out.extend_from_slice(magic);
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&(code.len() as u32).to_le_bytes());
    out.extend_from_slice(&data);
    out.extend_from_slice(code);
    out
}

fn encode_data_section(constants: &ConstantPool) -> Vec<u8> {
    let mut out = Vec::new();
    for value in constants.values() {
        let encoded = encode_const(value);
        out.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
        out.extend_from_slice(&encoded);
    }
    out
}

fn encode_const(value: &ConstValue) -> Vec<u8> {
    match value {
        ConstValue::Str(s) => s.as_bytes().to_vec(),
        ConstValue::Number(n) => n.to_le_bytes().to_vec(),
        ConstValue::Bool(b) => vec![if *b { 1 } else { 0 }],
        // `null` and `undefined` share the single-byte 0x00 encoding the
        // interface specifies; a reader cannot tell them apart from the
        // data section alone (disambiguated, where it matters, by the
        // opcode that pushes the constant).
        ConstValue::Null | ConstValue::Undefined => vec![0x00],
        ConstValue::BigInt(n) => n.to_le_bytes().to_vec(),
        ConstValue::Object(entries) => to_json_value(entries).to_string().into_bytes(),
    }
}

/// Builds the canonical JSON serialization of an object constant. Key
/// order follows `serde_json::Map`'s default `BTreeMap` backing, so two
/// objects with the same entries in different insertion order serialize
/// identically.
fn to_json_value(entries: &[(String, ConstValue)]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (key, value) in entries {
        map.insert(key.clone(), const_to_json(value));
    }
    serde_json::Value::Object(map)
}

fn const_to_json(value: &ConstValue) -> serde_json::Value {
    match value {
        ConstValue::Number(n) => {
            serde_json::Number::from_f64(*n).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null)
        }
        ConstValue::Str(s) => serde_json::Value::String(s.clone()),
        ConstValue::Bool(b) => serde_json::Value::Bool(*b),
        ConstValue::Null | ConstValue::Undefined => serde_json::Value::Null,
        ConstValue::BigInt(n) => serde_json::Value::Number((*n).into()),
        ConstValue::Object(entries) => to_json_value(entries),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_fields_round_trip() {
        let mut constants = ConstantPool::new();
        constants.intern(ConstValue::Number(1.0));
        let code = vec![0x01, 0x02, 0x03];
        let bytes = assemble(b"PBO3", &code, &constants);

        assert_eq!(&bytes[0..4], b"PBO3");
        let entry = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(entry, 0);
        let data_len = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        let code_len = u32::from_le_bytes(bytes[12..16].try_into().unwrap());
        assert_eq!(code_len as usize, code.len());
        assert_eq!(bytes.len(), HEADER_LEN + data_len as usize + code_len as usize);
        assert_eq!(&bytes[bytes.len() - code.len()..], &code[..]);
    }

    #[test]
    fn string_constant_is_length_prefixed_utf8() {
        let mut constants = ConstantPool::new();
        constants.intern(ConstValue::Str("hi".into()));
        let bytes = assemble(b"PBO3", &[], &constants);
        let data = &bytes[HEADER_LEN..];
        let len = u32::from_le_bytes(data[0..4].try_into().unwrap());
        assert_eq!(len, 2);
        assert_eq!(&data[4..6], b"hi");
    }

    #[test]
    fn number_constant_is_eight_byte_ieee754_le() {
        let mut constants = ConstantPool::new();
        constants.intern(ConstValue::Number(3.5));
        let bytes = assemble(b"PBO3", &[], &constants);
        let data = &bytes[HEADER_LEN..];
        let len = u32::from_le_bytes(data[0..4].try_into().unwrap());
        assert_eq!(len, 8);
        let n = f64::from_le_bytes(data[4..12].try_into().unwrap());
        assert_eq!(n, 3.5);
    }

    #[test]
    fn empty_pool_produces_zero_length_data_section() {
        let constants = ConstantPool::new();
        let bytes = assemble(b"NBO2", &[0xFF], &constants);
        let data_len = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        assert_eq!(data_len, 0);
    }
}
