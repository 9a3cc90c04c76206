/// An 8-bit-per-channel color with *straight* (non-premultiplied) alpha.
///
/// Every pixel buffer in this crate stores this type, row-major, so a buffer can be viewed as raw RGBA8
/// bytes with [`bytemuck`]. Colors compare by all four channels, so two fully transparent colors with
/// different RGB are not equal. Use [`Color::is_transparent`] where only coverage matters.
#[repr(C)]
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, Default, Debug, bytemuck::Pod, bytemuck::Zeroable,
)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}
impl Color {
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
    /// Fully opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }
    #[must_use]
    pub const fn is_transparent(self) -> bool {
        self.a == 0
    }
    #[must_use]
    pub const fn as_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
    #[must_use]
    pub const fn from_array([r, g, b, a]: [u8; 4]) -> Self {
        Self::rgba(r, g, b, a)
    }
    /// Same color with the alpha channel replaced.
    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self::rgba(self.r, self.g, self.b, a)
    }
}
impl From<[u8; 4]> for Color {
    fn from(value: [u8; 4]) -> Self {
        Self::from_array(value)
    }
}
impl From<Color> for [u8; 4] {
    fn from(value: Color) -> Self {
        value.as_array()
    }
}
