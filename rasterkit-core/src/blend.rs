//! # Blending
//!
//! Straight-alpha "source over" compositing, the only blend the merge machinery needs.

use crate::{color::Color, util::Opacity};

/// Composite `above` over `below`, with each color's alpha first scaled by its layer opacity.
///
/// Operates in straight alpha: color channels are un-weighted by the resulting alpha again before
/// being stored. A fully transparent result is normalized to [`Color::TRANSPARENT`].
#[must_use]
pub fn alpha_over(below: Color, below_opacity: Opacity, above: Color, above_opacity: Opacity) -> Color {
    let src_a = f32::from(above.a) / 255.0 * above_opacity.get();
    let dst_a = f32::from(below.a) / 255.0 * below_opacity.get();

    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return Color::TRANSPARENT;
    }

    let channel = |src: u8, dst: u8| -> u8 {
        use az::SaturatingAs;
        let weighted = f32::from(src) * src_a + f32::from(dst) * dst_a * (1.0 - src_a);
        (weighted / out_a).round().saturating_as::<u8>()
    };

    use az::SaturatingAs;
    Color::rgba(
        channel(above.r, below.r),
        channel(above.g, below.g),
        channel(above.b, below.b),
        (out_a * 255.0).round().saturating_as::<u8>(),
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn opaque_above_wins() {
        let red = Color::rgb(255, 0, 0);
        let blue = Color::rgb(0, 0, 255);
        assert_eq!(alpha_over(blue, Opacity::OPAQUE, red, Opacity::OPAQUE), red);
    }
    #[test]
    fn transparent_above_keeps_below() {
        let blue = Color::rgb(0, 0, 255);
        assert_eq!(
            alpha_over(blue, Opacity::OPAQUE, Color::TRANSPARENT, Opacity::OPAQUE),
            blue
        );
        // Zero opacity hides an opaque pixel just the same.
        assert_eq!(
            alpha_over(blue, Opacity::OPAQUE, Color::WHITE, Opacity::TRANSPARENT),
            blue
        );
    }
    #[test]
    fn half_over_opaque() {
        let half = Opacity::new(0.5).unwrap();
        let out = alpha_over(Color::BLACK, Opacity::OPAQUE, Color::WHITE, half);
        assert_eq!(out.a, 255);
        assert!((127..=128).contains(&out.r));
        assert_eq!(out.r, out.g);
        assert_eq!(out.g, out.b);
    }
    #[test]
    fn both_empty() {
        assert_eq!(
            alpha_over(
                Color::rgba(10, 20, 30, 0),
                Opacity::OPAQUE,
                Color::TRANSPARENT,
                Opacity::OPAQUE
            ),
            Color::TRANSPARENT
        );
    }
}
