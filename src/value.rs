/*!
Type/value codec (§4.B): maps a logical value to the serialized bound encoding used in
`lower-bounds`/`upper-bounds` and reverses it, and defines the per-type ordering bounds-overlap
reasoning (§4.K) relies on. Grounded in the teacher's `model/types.rs` `Value` enum, which
enumerated the same logical value space but had no encode/decode/compare behavior attached.
*/
use std::cmp::Ordering;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use uuid::Uuid;

use crate::error::{IcebergError, Result};
use crate::model::decimal::Decimal;
use crate::model::types::PrimitiveType;

/// A decoded logical value for one of the primitive types.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `boolean`.
    Boolean(bool),
    /// `int`.
    Int(i32),
    /// `long`.
    Long(i64),
    /// `float`.
    Float(f32),
    /// `double`.
    Double(f64),
    /// `decimal(P,S)`.
    Decimal(Decimal),
    /// `date`, days since 1970-01-01.
    Date(NaiveDate),
    /// `time`, microseconds since midnight.
    Time(NaiveTime),
    /// `timestamp`, microseconds since epoch, no timezone.
    Timestamp(NaiveDateTime),
    /// `timestamptz`, microseconds since epoch.
    Timestampz(NaiveDateTime),
    /// `string`.
    String(String),
    /// `uuid`.
    Uuid(Uuid),
    /// `fixed(N)`.
    Fixed(Vec<u8>),
    /// `binary`.
    Binary(Vec<u8>),
}

impl Value {
    /// Encodes this value as the opaque byte string used for a bound.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Value::Boolean(b) => vec![if *b { 1 } else { 0 }],
            Value::Int(i) => i.to_le_bytes().to_vec(),
            Value::Long(l) => l.to_le_bytes().to_vec(),
            Value::Float(f) => f.to_le_bytes().to_vec(),
            Value::Double(d) => d.to_le_bytes().to_vec(),
            Value::Decimal(d) => d.to_be_bytes(),
            Value::Date(d) => {
                let days = (*d - epoch_date()).num_days() as i32;
                days.to_le_bytes().to_vec()
            }
            Value::Time(t) => {
                let micros = time_to_micros(t);
                micros.to_le_bytes().to_vec()
            }
            Value::Timestamp(ts) | Value::Timestampz(ts) => {
                let micros = timestamp_to_micros(ts);
                micros.to_le_bytes().to_vec()
            }
            Value::String(s) => s.as_bytes().to_vec(),
            Value::Uuid(u) => u.as_bytes().to_vec(),
            Value::Fixed(bytes) | Value::Binary(bytes) => bytes.clone(),
        }
    }

    /// Decodes a bound byte string into a [Value] given its declared type.
    pub fn decode(ty: &PrimitiveType, bytes: &[u8]) -> Result<Value> {
        let err = |msg: &str| IcebergError::Message(format!("cannot decode {ty}: {msg}"));
        Ok(match ty {
            PrimitiveType::Boolean => {
                Value::Boolean(*bytes.first().ok_or_else(|| err("empty"))? != 0)
            }
            PrimitiveType::Int => Value::Int(i32::from_le_bytes(
                bytes.try_into().map_err(|_| err("expected 4 bytes"))?,
            )),
            PrimitiveType::Long => Value::Long(i64::from_le_bytes(
                bytes.try_into().map_err(|_| err("expected 8 bytes"))?,
            )),
            PrimitiveType::Float => Value::Float(f32::from_le_bytes(
                bytes.try_into().map_err(|_| err("expected 4 bytes"))?,
            )),
            PrimitiveType::Double => Value::Double(f64::from_le_bytes(
                bytes.try_into().map_err(|_| err("expected 8 bytes"))?,
            )),
            PrimitiveType::Decimal { scale, .. } => {
                Value::Decimal(Decimal::from_be_bytes(bytes, *scale as u32)?)
            }
            PrimitiveType::Date => {
                let days = i32::from_le_bytes(bytes.try_into().map_err(|_| err("expected 4 bytes"))?);
                Value::Date(epoch_date() + chrono::Duration::days(days as i64))
            }
            PrimitiveType::Time => {
                let micros = i64::from_le_bytes(bytes.try_into().map_err(|_| err("expected 8 bytes"))?);
                Value::Time(micros_to_time(micros))
            }
            PrimitiveType::Timestamp => {
                let micros = i64::from_le_bytes(bytes.try_into().map_err(|_| err("expected 8 bytes"))?);
                Value::Timestamp(micros_to_timestamp(micros))
            }
            PrimitiveType::Timestampz => {
                let micros = i64::from_le_bytes(bytes.try_into().map_err(|_| err("expected 8 bytes"))?);
                Value::Timestampz(micros_to_timestamp(micros))
            }
            PrimitiveType::String => {
                Value::String(String::from_utf8(bytes.to_vec()).map_err(|e| err(&e.to_string()))?)
            }
            PrimitiveType::Uuid => {
                Value::Uuid(Uuid::from_slice(bytes).map_err(|e| err(&e.to_string()))?)
            }
            PrimitiveType::Fixed(_) => Value::Fixed(bytes.to_vec()),
            PrimitiveType::Binary => Value::Binary(bytes.to_vec()),
        })
    }

    /// Orders two values of the same type. NaN compares greater than every other value of its
    /// type (Iceberg bound convention) and `false < true` for booleans.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Long(a), Value::Long(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => compare_float(*a as f64, *b as f64),
            (Value::Double(a), Value::Double(b)) => compare_float(*a, *b),
            (Value::Decimal(a), Value::Decimal(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Time(a), Value::Time(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::Timestampz(a), Value::Timestampz(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Uuid(a), Value::Uuid(b)) => a.cmp(b),
            (Value::Fixed(a), Value::Fixed(b)) => a.cmp(b),
            (Value::Binary(a), Value::Binary(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

fn compare_float(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

fn epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
}

fn time_to_micros(t: &NaiveTime) -> i64 {
    let secs = t.num_seconds_from_midnight() as i64;
    secs * 1_000_000 + (t.nanosecond() as i64) / 1_000
}

fn micros_to_time(micros: i64) -> NaiveTime {
    let secs = (micros / 1_000_000) as u32;
    let nanos = ((micros % 1_000_000) * 1_000) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos).unwrap_or_default()
}

fn timestamp_to_micros(ts: &NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_micros()
}

fn micros_to_timestamp(micros: i64) -> NaiveDateTime {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    NaiveDateTime::from_timestamp_opt(secs, nanos).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    #[test]
    fn int_round_trips() {
        let v = Value::Int(-42);
        let bytes = v.encode();
        let back = Value::decode(&PrimitiveType::Int, &bytes).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn string_round_trips() {
        let v = Value::String("hello".to_string());
        let bytes = v.encode();
        let back = Value::decode(&PrimitiveType::String, &bytes).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn decimal_round_trips() {
        let dec = Decimal::new(BigInt::from(12345), 5, 2).unwrap();
        let v = Value::Decimal(dec.clone());
        let bytes = v.encode();
        let back = Value::decode(&PrimitiveType::Decimal { precision: 5, scale: 2 }, &bytes).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn date_round_trips() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let v = Value::Date(d);
        let bytes = v.encode();
        let back = Value::decode(&PrimitiveType::Date, &bytes).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn nan_orders_greater_than_everything() {
        let nan = Value::Double(f64::NAN);
        let one = Value::Double(1.0);
        assert_eq!(nan.compare(&one), Ordering::Greater);
        assert_eq!(one.compare(&nan), Ordering::Less);
    }

    #[test]
    fn false_orders_before_true() {
        assert_eq!(Value::Boolean(false).compare(&Value::Boolean(true)), Ordering::Less);
    }
}
