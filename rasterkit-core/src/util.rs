//! Utility types, used throughout the crate.

/// A layer or group opacity. Always finite and within `0.0..=1.0`.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug)]
#[repr(transparent)]
pub struct Opacity(f32);
impl Opacity {
    pub const TRANSPARENT: Self = Self(0.0);
    pub const OPAQUE: Self = Self(1.0);
    /// Create an opacity, clamping finite values into `0.0..=1.0`.
    pub fn new(val: f32) -> Result<Self, OpacityError> {
        if val.is_finite() {
            Ok(Self(val.clamp(0.0, 1.0)))
        } else {
            Err(OpacityError::NotFinite)
        }
    }
    #[must_use]
    pub fn get(self) -> f32 {
        self.0
    }
    /// Combine two opacities, as when a layer sits inside a translucent group.
    #[must_use]
    pub fn multiply(self, other: Self) -> Self {
        // Product of two values in 0..=1 stays in range.
        Self(self.0 * other.0)
    }
    /// Scale an 8-bit alpha by this opacity, rounding to nearest.
    #[must_use]
    pub fn apply_to_alpha(self, alpha: u8) -> u8 {
        use az::SaturatingAs;
        (f32::from(alpha) * self.0).round().saturating_as::<u8>()
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Self::OPAQUE
    }
}

impl TryFrom<f32> for Opacity {
    type Error = OpacityError;
    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
impl From<Opacity> for f32 {
    fn from(value: Opacity) -> Self {
        value.get()
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpacityError {
    #[error("not finite")]
    NotFinite,
}

// Never NaN, so PartialEq is reflexive.
impl Eq for Opacity {}
impl std::hash::Hash for Opacity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // -0.0 == 0.0, so fold it before hashing the bits.
        state.write_u32((self.0 + 0.0).to_bits());
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn clamps() {
        assert_eq!(Opacity::new(2.0).unwrap(), Opacity::OPAQUE);
        assert_eq!(Opacity::new(-1.0).unwrap(), Opacity::TRANSPARENT);
        assert_eq!(Opacity::new(f32::NAN), Err(OpacityError::NotFinite));
        assert_eq!(Opacity::new(f32::INFINITY), Err(OpacityError::NotFinite));
    }
    #[test]
    fn scales_alpha() {
        let half = Opacity::new(0.5).unwrap();
        assert_eq!(half.apply_to_alpha(255), 128);
        assert_eq!(Opacity::OPAQUE.apply_to_alpha(17), 17);
        assert_eq!(Opacity::TRANSPARENT.apply_to_alpha(255), 0);
        assert_eq!(half.multiply(half).get(), 0.25);
    }
}
