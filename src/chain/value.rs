//! Conversions from dynamically decoded SCALE values into plain Rust / JSON.

use serde_json::{Map, Value as Json};
use subxt::ext::scale_value::{Composite, Primitive, Value, ValueDef};
use subxt::utils::AccountId32;

use super::CallArg;

/// Render a call's fields as named arguments.
pub fn call_args(fields: &Composite<u32>) -> Vec<CallArg> {
    match fields {
        Composite::Named(named) => named
            .iter()
            .map(|(name, value)| CallArg {
                name: name.clone(),
                value: to_json(value),
            })
            .collect(),
        Composite::Unnamed(values) => values
            .iter()
            .enumerate()
            .map(|(i, value)| CallArg {
                name: format!("arg{i}"),
                value: to_json(value),
            })
            .collect(),
    }
}

/// Convert a decoded value to JSON.
///
/// 32-byte arrays become SS58 addresses, other byte sequences become `0x`
/// hex, and single-field tuple wrappers (`NetUid(u16)`, `Compact<T>`) are
/// flattened to their inner value.
pub fn to_json<T>(value: &Value<T>) -> Json {
    if let Some(account) = as_account_id(value) {
        return Json::String(account.to_string());
    }

    match &value.value {
        ValueDef::Composite(composite) => composite_to_json(composite),
        ValueDef::Variant(variant) => {
            let mut map = Map::new();
            map.insert(variant.name.clone(), composite_to_json(&variant.values));
            Json::Object(map)
        }
        ValueDef::Primitive(p) => primitive_to_json(p),
        ValueDef::BitSequence(bits) => Json::Array(bits.iter().map(Json::Bool).collect()),
    }
}

fn composite_to_json<T>(composite: &Composite<T>) -> Json {
    match composite {
        Composite::Named(named) => {
            let map: Map<String, Json> = named
                .iter()
                .map(|(name, value)| (name.clone(), to_json(value)))
                .collect();
            Json::Object(map)
        }
        Composite::Unnamed(values) => {
            if values.len() == 1 {
                return to_json(&values[0]);
            }
            if let Some(bytes) = byte_values(values) {
                if !bytes.is_empty() {
                    return Json::String(to_hex(&bytes));
                }
            }
            Json::Array(values.iter().map(to_json).collect())
        }
    }
}

fn primitive_to_json(p: &Primitive) -> Json {
    match p {
        Primitive::Bool(b) => Json::Bool(*b),
        Primitive::Char(c) => Json::String(c.to_string()),
        Primitive::String(s) => Json::String(s.clone()),
        Primitive::U128(n) => match u64::try_from(*n) {
            Ok(small) => Json::from(small),
            Err(_) => Json::String(n.to_string()),
        },
        Primitive::I128(n) => match i64::try_from(*n) {
            Ok(small) => Json::from(small),
            Err(_) => Json::String(n.to_string()),
        },
        Primitive::U256(bytes) | Primitive::I256(bytes) => Json::String(to_hex(bytes)),
    }
}

/// Unsigned integer inside a value, looking through single-field wrappers.
pub fn as_u128<T>(value: &Value<T>) -> Option<u128> {
    match &value.value {
        ValueDef::Primitive(Primitive::U128(n)) => Some(*n),
        ValueDef::Composite(c) if c.len() == 1 => c.values().next().and_then(as_u128),
        _ => None,
    }
}

/// Interpret a value as an `AccountId32`, looking through single-field wrappers.
pub fn as_account_id<T>(value: &Value<T>) -> Option<AccountId32> {
    let ValueDef::Composite(composite) = &value.value else {
        return None;
    };

    match composite {
        Composite::Unnamed(values) if values.len() == 32 => {
            let bytes: [u8; 32] = byte_values(values)?.try_into().ok()?;
            Some(AccountId32(bytes))
        }
        _ if composite.len() == 1 => composite.values().next().and_then(as_account_id),
        _ => None,
    }
}

/// Decode the signer of an extrinsic from its encoded `MultiAddress`.
///
/// `MultiAddress::Id` (variant 0 followed by 32 bytes) becomes SS58; any
/// other address form is returned as hex.
pub fn decode_address(bytes: &[u8]) -> String {
    match bytes {
        [0, rest @ ..] if rest.len() == 32 => {
            let mut id = [0u8; 32];
            id.copy_from_slice(rest);
            AccountId32(id).to_string()
        }
        _ => to_hex(bytes),
    }
}

fn byte_values<T>(values: &[Value<T>]) -> Option<Vec<u8>> {
    values
        .iter()
        .map(|v| match &v.value {
            ValueDef::Primitive(Primitive::U128(n)) => u8::try_from(*n).ok(),
            _ => None,
        })
        .collect()
}

fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
