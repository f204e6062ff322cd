use crate::config::HsvColor;
use anyhow::Result;
use embedded_graphics::{pixelcolor::Rgb888, prelude::DrawTarget};
use smart_leds::hsv::{hsv2rgb, Hsv};
use std::convert::Infallible;

pub trait Render<D>
where
    D: DrawTarget<Color = Rgb888, Error = Infallible>,
{
    fn render(&self, canvas: &mut D) -> Result<()>;
}

fn to_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl From<HsvColor> for Rgb888 {
    fn from(color: HsvColor) -> Self {
        // Hue wraps around, 1.0 is the same red as 0.0
        let hue = color.hue.rem_euclid(1.0);
        let rgb = hsv2rgb(Hsv {
            hue: (hue * 256.0).min(255.0) as u8,
            sat: to_channel(color.sat),
            val: to_channel(color.val),
        });

        Rgb888::new(rgb.r, rgb.g, rgb.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::prelude::RgbColor;

    #[test]
    fn hsv_highlight_is_red() {
        let color: Rgb888 = HsvColor::new(0.0, 1.0, 0.5).into();

        assert!(color.r() > 0);
        assert_eq!(color.g(), 0);
        assert_eq!(color.b(), 0);
    }

    #[test]
    fn zero_value_is_black() {
        let color: Rgb888 = HsvColor::new(0.4, 1.0, 0.0).into();
        assert_eq!(color, Rgb888::BLACK);
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        let wrapped: Rgb888 = HsvColor::new(1.0, 2.0, 5.0).into();
        let red: Rgb888 = HsvColor::new(0.0, 1.0, 1.0).into();
        assert_eq!(wrapped, red);
    }
}
