use crate::{config::HsvColor, config::RingConfig, render::Render};
use anyhow::Result;
use embedded_graphics::{
    pixelcolor::Rgb888,
    prelude::{DrawTarget, Point, RgbColor},
    Pixel,
};
use std::convert::Infallible;

/// Rainbow around the ring with the 12 o'clock LED drawn white.
///
/// Used to check that the strip runs clockwise and to find the right offset.
pub struct HueRing {
    num_leds: usize,
    offset: i32,
    sat: f32,
    val: f32,
}

impl HueRing {
    pub fn new(config: &RingConfig) -> Self {
        Self {
            num_leds: config.num_leds,
            offset: config.offset,
            sat: 1.0,
            val: 0.8,
        }
    }

    fn physical_index(&self, index: usize) -> usize {
        (index as i64 + i64::from(self.offset)).rem_euclid(self.num_leds as i64) as usize
    }
}

impl<D> Render<D> for HueRing
where
    D: DrawTarget<Color = Rgb888, Error = Infallible>,
{
    fn render(&self, canvas: &mut D) -> Result<()> {
        if self.num_leds == 0 {
            return Ok(());
        }

        let pixels = (0..self.num_leds).map(|index| {
            let color = if index == 0 {
                Rgb888::WHITE
            } else {
                HsvColor::new(index as f32 / self.num_leds as f32, self.sat, self.val).into()
            };

            Pixel(Point::new(self.physical_index(index) as i32, 0), color)
        });

        canvas.draw_iter(pixels)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::RingCanvas;

    #[test]
    fn lights_every_led() {
        let ring = HueRing::new(&RingConfig::default());
        let mut canvas = RingCanvas::new(96);
        ring.render(&mut canvas).unwrap();

        assert_eq!(canvas.lit().len(), 96);
        assert_eq!(canvas.get(0), Some(Rgb888::WHITE));
        assert_ne!(canvas.get(1), canvas.get(48));
    }

    #[test]
    fn marker_follows_the_offset() {
        let ring = HueRing::new(&RingConfig {
            num_leds: 12,
            offset: -3,
            ..Default::default()
        });
        let mut canvas = RingCanvas::new(12);
        ring.render(&mut canvas).unwrap();

        assert_eq!(canvas.get(9), Some(Rgb888::WHITE));
        assert_ne!(canvas.get(0), Some(Rgb888::WHITE));
    }
}
