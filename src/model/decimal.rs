/*!
Arbitrary precision decimal values, carried over from the teacher's `model/decimal.rs` and
extended with the two's-complement byte encoding [crate::value] needs for bound serialization.
*/
use num_bigint::{BigInt, Sign};

use crate::error::{IcebergError, Result};

/// A decimal value: an unscaled [BigInt] plus a precision and scale.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Decimal {
    value: BigInt,
    /// Number of digits in the number. Must be 38 or less.
    precision: u8,
    /// Number of digits to the right of the decimal point.
    scale: u32,
}

impl Decimal {
    /// Creates a new [Decimal], validating precision and scale against the unscaled value.
    pub fn new(value: BigInt, precision: u8, scale: u32) -> Result<Self> {
        if precision > 38 {
            return Err(IcebergError::Message(format!(
                "Precision {precision} must be 38 or less"
            )));
        }
        if scale > precision as u32 {
            return Err(IcebergError::Message(format!(
                "Scale {scale} is greater than precision {precision}"
            )));
        }
        let bytes: usize = f64::ceil(value.bits() as f64 / 8_f64) as usize;
        if max_prec_for_len(bytes)? < precision as usize {
            return Err(IcebergError::Message(format!(
                "{bytes} bytes cannot hold precision {precision}"
            )));
        }
        Ok(Decimal { value, precision, scale })
    }

    /// The unscaled value.
    pub fn unscaled(&self) -> &BigInt {
        &self.value
    }

    /// Number of digits to the right of the decimal point.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Encodes the unscaled value as two's-complement big-endian bytes, the minimum number
    /// of bytes required, per the bound-encoding rule for decimal values.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        self.value.to_signed_bytes_be()
    }

    /// Decodes two's-complement big-endian bytes back into a [Decimal] with the given scale.
    /// Precision is recomputed from the byte length.
    pub fn from_be_bytes(bytes: &[u8], scale: u32) -> Result<Self> {
        let value = BigInt::from_signed_bytes_be(bytes);
        let precision = max_prec_for_len(bytes.len())?.min(38) as u8;
        Decimal::new(value, precision, scale)
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

fn max_prec_for_len(len: usize) -> Result<usize> {
    let len = i32::try_from(len).map_err(|e| IcebergError::Message(e.to_string()))?;
    if len == 0 {
        return Ok(0);
    }
    Ok((2.0_f64.powi(8 * len - 1) - 1.0).log10().floor() as usize)
}

/// Sign-aware zero check, used when comparing a decimal bound to zero.
pub fn is_zero(value: &BigInt) -> bool {
    value.sign() == Sign::NoSign
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_scale_greater_than_precision() {
        let value = BigInt::new(Sign::Plus, vec![123]);
        assert!(Decimal::new(value, 2, 3).is_err());
    }

    #[test]
    fn rejects_precision_over_38() {
        let value = BigInt::new(Sign::Plus, vec![123]);
        assert!(Decimal::new(value, 39, 3).is_err());
    }

    #[test]
    fn max_prec_for_16_bytes_is_38() {
        assert_eq!(max_prec_for_len(16).unwrap(), 38);
    }

    #[test]
    fn round_trips_through_bytes() {
        let value = BigInt::from(-12345);
        let dec = Decimal::new(value.clone(), 5, 2).unwrap();
        let bytes = dec.to_be_bytes();
        let back = Decimal::from_be_bytes(&bytes, 2).unwrap();
        assert_eq!(back.unscaled(), &value);
    }
}
