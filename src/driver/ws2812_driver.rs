use super::HardwareDriver;
use crate::{
    config::{ColorOrder, HardwareConfig},
    ring::RingCanvas,
};
use anyhow::{anyhow, Context, Result};
use embedded_graphics::prelude::RgbColor;
use linux_embedded_hal::{
    spidev::{SpiModeFlags, SpidevOptions},
    SpidevBus,
};
use log::debug;
use smart_leds::{SmartLedsWrite, RGB8};
use ws2812_spi::Ws2812;

/// WS2812 bit patterns are generated at this SPI clock
const SPI_SPEED_HZ: u32 = 3_800_000;

/// WS2812 / NeoPixel strip on a Linux SPI bus, e.g. a Raspberry Pi
pub struct Ws2812Driver {
    strip: Ws2812<SpidevBus>,
    color_order: ColorOrder,
}

impl HardwareDriver for Ws2812Driver {
    type Config = HardwareConfig;

    fn new(config: Self::Config, num_leds: usize) -> Result<Self> {
        let mut spi = SpidevBus::open(&config.spi_device)
            .map_err(|e| anyhow!("Can not open SPI device {}: {e:?}", config.spi_device))?;

        spi.0
            .configure(
                &SpidevOptions::new()
                    .bits_per_word(8)
                    .max_speed_hz(SPI_SPEED_HZ)
                    .mode(SpiModeFlags::SPI_MODE_0)
                    .build(),
            )
            .context("Invalid SPI configuration provided")?;

        debug!(
            "Driving {num_leds} LEDs on {} ({})",
            config.spi_device,
            config.color_order.as_ref()
        );

        Ok(Self {
            strip: Ws2812::new(spi),
            color_order: config.color_order,
        })
    }

    fn display(&mut self, canvas: &RingCanvas) -> Result<()> {
        let color_order = self.color_order;

        // The strip driver clocks out green, red, blue
        let pixels = canvas.pixels().iter().map(|color| {
            let [first, second, third] = color_order.arrange(color.r(), color.g(), color.b());
            RGB8 {
                g: first,
                r: second,
                b: third,
            }
        });

        self.strip
            .write(pixels)
            .map_err(|e| anyhow!("Failed to write to LED strip: {e:?}"))
    }
}
