use super::HardwareDriver;
use crate::ring::RingCanvas;
use anyhow::Result;
use embedded_graphics::{
    pixelcolor::Rgb888,
    prelude::{DrawTarget, Point, RgbColor, Size},
    primitives::{Circle, Primitive, PrimitiveStyleBuilder},
    Drawable,
};
use embedded_graphics_simulator::{
    OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
};
use std::f32::consts::PI;

const DISPLAY_SIZE: Size = Size {
    width: 160,
    height: 160,
};

const RING_RADIUS: f32 = 70.0;
const LED_DIAMETER: u32 = 5;

/// Shows the ring as a circle of LEDs in a desktop window
pub struct SimulatorDriver {
    window: Window,
    display: SimulatorDisplay<Rgb888>,
    open: bool,
}

impl SimulatorDriver {
    /// Centre of LED `index`, LED 0 at 12 o'clock running clockwise
    fn led_center(index: usize, num_leds: usize) -> Point {
        let angle = 2.0 * PI * index as f32 / num_leds as f32;
        let center = Point::new(
            DISPLAY_SIZE.width as i32 / 2,
            DISPLAY_SIZE.height as i32 / 2,
        );

        center
            + Point::new(
                (RING_RADIUS * angle.sin()).round() as i32,
                -(RING_RADIUS * angle.cos()).round() as i32,
            )
    }
}

impl HardwareDriver for SimulatorDriver {
    type Config = ();

    fn new(_config: Self::Config, _num_leds: usize) -> Result<Self> {
        let output_settings = OutputSettingsBuilder::new().scale(4).max_fps(30).build();

        Ok(Self {
            window: Window::new("Metro Ring Clock", &output_settings),
            display: SimulatorDisplay::<Rgb888>::new(DISPLAY_SIZE),
            open: true,
        })
    }

    fn display(&mut self, canvas: &RingCanvas) -> Result<()> {
        self.display.clear(Rgb888::BLACK)?;

        for (index, color) in canvas.pixels().iter().enumerate() {
            let style = PrimitiveStyleBuilder::new()
                .fill_color(*color)
                .stroke_color(Rgb888::new(48, 48, 48))
                .stroke_width(1)
                .build();

            Circle::with_center(Self::led_center(index, canvas.len()), LED_DIAMETER)
                .into_styled(style)
                .draw(&mut self.display)?;
        }

        self.window.update(&self.display);

        if self.window.events().any(|event| matches!(event, SimulatorEvent::Quit)) {
            self.open = false;
        }

        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
