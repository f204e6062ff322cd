use crate::render::Render;
use anyhow::Result;
use embedded_graphics::{
    pixelcolor::Rgb888,
    prelude::{DrawTarget, OriginDimensions, Point, RgbColor, Size},
    Pixel,
};
use std::convert::Infallible;

const MINUTES_PER_HOUR: u32 = 60;
const SECONDS_PER_HOUR: u32 = 3600;

/// Map a minute past the hour onto the LED that sits at that minute on the clock face.
///
/// `offset` is the number of LEDs the strip is rotated away from 12 o'clock and may be negative.
pub fn minute_to_position(minute: u32, num_leds: usize, offset: i32) -> usize {
    assert!(num_leds > 0, "LED ring must have at least one LED");

    let scaled = (u64::from(minute) * num_leds as u64 / u64::from(MINUTES_PER_HOUR)) as i64;
    let num_leds = num_leds as i64;

    (scaled.rem_euclid(num_leds) + i64::from(offset)).rem_euclid(num_leds) as usize
}

/// Minute past the hour at which something `wait_secs` from now happens
pub fn arrival_minute(second_of_hour: u32, wait_secs: i64) -> u32 {
    let at = i64::from(second_of_hour % SECONDS_PER_HOUR) + wait_secs;
    (at.div_euclid(i64::from(MINUTES_PER_HOUR))).rem_euclid(i64::from(MINUTES_PER_HOUR)) as u32
}

/// LED positions of all the given waits, sorted and without duplicates
pub fn departure_positions(
    waits: &[i64],
    second_of_hour: u32,
    num_leds: usize,
    offset: i32,
) -> Vec<usize> {
    let mut positions = waits
        .iter()
        .map(|wait| minute_to_position(arrival_minute(second_of_hour, *wait), num_leds, offset))
        .collect::<Vec<_>>();
    positions.sort_unstable();
    positions.dedup();
    positions
}

/// Frame for the LED ring. The LED index is the x coordinate, the ring is one pixel high.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingCanvas {
    pixels: Box<[Rgb888]>,
}

impl RingCanvas {
    pub fn new(num_leds: usize) -> Self {
        Self {
            pixels: vec![Rgb888::BLACK; num_leds].into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[Rgb888] {
        &self.pixels
    }

    pub fn get(&self, index: usize) -> Option<Rgb888> {
        self.pixels.get(index).copied()
    }

    pub fn set(&mut self, index: usize, color: Rgb888) {
        if let Some(pixel) = self.pixels.get_mut(index) {
            *pixel = color;
        }
    }

    /// Indices of every LED that is not black
    pub fn lit(&self) -> Vec<usize> {
        self.pixels
            .iter()
            .enumerate()
            .filter(|(_, color)| **color != Rgb888::BLACK)
            .map(|(index, _)| index)
            .collect()
    }

    fn convert_point_to_index(&self, point: Point) -> Option<usize> {
        if point.y == 0 && point.x >= 0 && (point.x as usize) < self.pixels.len() {
            Some(point.x as usize)
        } else {
            None
        }
    }
}

impl OriginDimensions for RingCanvas {
    fn size(&self) -> Size {
        Size::new(self.pixels.len() as u32, 1)
    }
}

impl DrawTarget for RingCanvas {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels.into_iter() {
            if let Some(index) = self.convert_point_to_index(point) {
                self.pixels[index] = color;
            }
        }

        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.pixels.fill(color);
        Ok(())
    }
}

impl<D> Render<D> for RingCanvas
where
    D: DrawTarget<Color = Rgb888, Error = Infallible>,
{
    fn render(&self, canvas: &mut D) -> Result<()> {
        let pixels = self
            .pixels
            .iter()
            .enumerate()
            .map(|(index, color)| Pixel(Point::new(index as i32, 0), *color));

        canvas.draw_iter(pixels)?;

        Ok(())
    }
}
