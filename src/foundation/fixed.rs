use crate::foundation::error::{MosaicError, MosaicResult};

/// Number of decimal digits carried through the fixed-point geometry encoding.
///
/// Kernels exchange geometry with the host as `i32` buffers only, so every
/// real-valued field is quantized by `10^digits` before transfer. The bound of
/// 9 digits keeps the multiplier itself inside `i32`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Precision {
    digits: u32,
}

impl Precision {
    pub const MAX_DIGITS: u32 = 9;

    pub fn new(digits: u32) -> MosaicResult<Self> {
        if digits > Self::MAX_DIGITS {
            return Err(MosaicError::validation(format!(
                "Precision digits must be <= {}, got {digits}",
                Self::MAX_DIGITS
            )));
        }
        Ok(Self { digits })
    }

    pub fn digits(self) -> u32 {
        self.digits
    }

    pub fn multiplier(self) -> i64 {
        10i64.pow(self.digits)
    }

    /// Quantize a real-valued geometry field to `round(value * 10^digits)`.
    ///
    /// Errors with [`MosaicError::PrecisionOverflow`] when the input is not
    /// finite or the scaled value falls outside `i32`; quantization must never
    /// silently truncate.
    pub fn encode(self, value: f64) -> MosaicResult<i32> {
        if !value.is_finite() {
            return Err(MosaicError::precision_overflow(format!(
                "cannot encode non-finite value {value}"
            )));
        }
        let scaled = (value * self.multiplier() as f64).round();
        if scaled < i32::MIN as f64 || scaled > i32::MAX as f64 {
            return Err(MosaicError::precision_overflow(format!(
                "{value} * 10^{} does not fit i32",
                self.digits
            )));
        }
        Ok(scaled as i32)
    }

    pub fn decode(self, raw: i32) -> f64 {
        f64::from(raw) / self.multiplier() as f64
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self { digits: 3 }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/fixed.rs"]
mod tests;
