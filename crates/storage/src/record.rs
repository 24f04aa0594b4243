//! Tuple codec: `[u16 field_count][(u8 tag [, payload])...]`. All
//! multi-byte integers are little-endian regardless of host.

use common::{DbError, DbResult};
use types::Value;

const TAG_NULL: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_DOUBLE: u8 = 2;
const TAG_STRING: u8 = 3;
const TAG_BOOL: u8 = 4;

pub fn serialized_size(values: &[Value]) -> usize {
    let mut size = 2; // field count
    for value in values {
        size += 1; // tag
        size += match value {
            Value::Null => 0,
            Value::Int(_) => 4,
            Value::Double(_) => 8,
            Value::Text(s) => 2 + s.len(),
            Value::Bool(_) => 1,
        };
    }
    size
}

pub fn encode(values: &[Value]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(serialized_size(values));
    buf.extend_from_slice(&(values.len() as u16).to_le_bytes());
    for value in values {
        match value {
            Value::Null => buf.push(TAG_NULL),
            Value::Int(v) => {
                buf.push(TAG_INT);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Value::Double(v) => {
                buf.push(TAG_DOUBLE);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Value::Text(s) => {
                buf.push(TAG_STRING);
                buf.extend_from_slice(&(s.len() as u16).to_le_bytes());
                buf.extend_from_slice(s.as_bytes());
            }
            Value::Bool(b) => {
                buf.push(TAG_BOOL);
                buf.push(*b as u8);
            }
        }
    }
    buf
}

pub fn decode(data: &[u8]) -> DbResult<Vec<Value>> {
    if data.len() < 2 {
        return Err(DbError::Storage("record too small".into()));
    }
    let field_count = u16::from_le_bytes(data[0..2].try_into().unwrap());
    let mut offset = 2usize;
    let mut values = Vec::with_capacity(field_count as usize);

    for _ in 0..field_count {
        let tag = *data
            .get(offset)
            .ok_or_else(|| DbError::Storage("record truncated before tag".into()))?;
        offset += 1;

        let value = match tag {
            TAG_NULL => Value::Null,
            TAG_INT => {
                let bytes = data
                    .get(offset..offset + 4)
                    .ok_or_else(|| DbError::Storage("record truncated int".into()))?;
                offset += 4;
                Value::Int(i32::from_le_bytes(bytes.try_into().unwrap()))
            }
            TAG_DOUBLE => {
                let bytes = data
                    .get(offset..offset + 8)
                    .ok_or_else(|| DbError::Storage("record truncated double".into()))?;
                offset += 8;
                Value::Double(f64::from_le_bytes(bytes.try_into().unwrap()))
            }
            TAG_STRING => {
                let len_bytes = data
                    .get(offset..offset + 2)
                    .ok_or_else(|| DbError::Storage("record truncated string length".into()))?;
                let len = u16::from_le_bytes(len_bytes.try_into().unwrap()) as usize;
                offset += 2;
                let bytes = data
                    .get(offset..offset + len)
                    .ok_or_else(|| DbError::Storage("record truncated string data".into()))?;
                offset += len;
                Value::Text(
                    String::from_utf8(bytes.to_vec())
                        .map_err(|e| DbError::Storage(format!("invalid utf8 in record: {e}")))?,
                )
            }
            TAG_BOOL => {
                let b = *data
                    .get(offset)
                    .ok_or_else(|| DbError::Storage("record truncated bool".into()))?;
                offset += 1;
                Value::Bool(b != 0)
            }
            other => return Err(DbError::Storage(format!("unknown record tag {other}"))),
        };
        values.push(value);
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        let values = vec![
            Value::Null,
            Value::Int(-7),
            Value::Double(3.5),
            Value::Text("hi".into()),
            Value::Bool(true),
        ];
        let encoded = encode(&values);
        assert_eq!(encoded.len(), serialized_size(&values));
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn empty_tuple_round_trips() {
        let encoded = encode(&[]);
        assert_eq!(decode(&encoded).unwrap(), Vec::<Value>::new());
    }

    #[test]
    fn rejects_truncated_buffers() {
        let values = vec![Value::Text("hello".into())];
        let mut encoded = encode(&values);
        encoded.truncate(encoded.len() - 1);
        assert!(decode(&encoded).is_err());
    }
}
