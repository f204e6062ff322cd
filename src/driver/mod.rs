use crate::{render::Render, ring::RingCanvas};
use anyhow::{anyhow, Result};
use embedded_graphics::{pixelcolor::Rgb888, prelude::DrawTarget, prelude::RgbColor};
use log::{debug, error, info, trace};
use std::{
    marker::PhantomData,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

#[cfg(feature = "simulator")]
mod simulator_driver;
#[cfg(feature = "rpi")]
mod ws2812_driver;

#[cfg(feature = "simulator")]
pub use simulator_driver::SimulatorDriver;
#[cfg(feature = "rpi")]
pub use ws2812_driver::Ws2812Driver;

pub trait HardwareDriver: Sized + 'static {
    type Config: Send + 'static;

    fn new(config: Self::Config, num_leds: usize) -> Result<Self>;

    /// Push a frame out to the LEDs
    fn display(&mut self, canvas: &RingCanvas) -> Result<()>;

    /// False once the output went away, e.g. the simulator window was closed
    fn is_open(&self) -> bool {
        true
    }
}

pub struct RingDriver<D: HardwareDriver> {
    /// Flag used to gracefully terminate the driver thread
    alive: Arc<AtomicBool>,

    /// Handle to the driver thread
    driver_thread_handle: Option<thread::JoinHandle<Result<()>>>,

    _driver: PhantomData<D>,
}

impl<D: HardwareDriver> RingDriver<D> {
    pub fn new(
        render: Box<dyn Render<RingCanvas> + Send + Sync>,
        config: D::Config,
        num_leds: usize,
        frame_interval: Duration,
    ) -> Result<Self> {
        let alive = Arc::new(AtomicBool::new(true));
        let alive_driver = alive.clone();

        let driver_thread_handle = thread::spawn(move || -> Result<()> {
            debug!("Started LED ring driver thread");

            let mut hardware_driver = D::new(config, num_leds)?;
            let mut canvas = RingCanvas::new(num_leds);

            while alive_driver.load(Ordering::SeqCst) {
                canvas.clear(Rgb888::BLACK)?;
                render.render(&mut canvas)?;
                hardware_driver.display(&canvas)?;

                if !hardware_driver.is_open() {
                    info!("LED ring output closed");
                    break;
                }

                trace!("Frame pushed, lit LEDs: {:?}", canvas.lit());
                thread::park_timeout(frame_interval);
            }

            alive_driver.store(false, Ordering::SeqCst);
            Ok(())
        });

        Ok(Self {
            alive,
            driver_thread_handle: Some(driver_thread_handle),
            _driver: PhantomData,
        })
    }

    /// True once the driver thread has stopped, on its own or because of an error
    pub fn is_finished(&self) -> bool {
        self.driver_thread_handle
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }
}

impl<D: HardwareDriver> RingDriver<D> {
    /// Stop the driver thread and hand back how it ended
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        // Stop the thread
        self.alive.store(false, Ordering::SeqCst);

        match self.driver_thread_handle.take() {
            Some(driver_handle) => {
                driver_handle.thread().unpark();
                driver_handle
                    .join()
                    .map_err(|_| anyhow!("Failed to join the driver thread"))?
            }
            None => Ok(()),
        }
    }
}

impl<D: HardwareDriver> Drop for RingDriver<D> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!("Driver thread encountered an error: {e:#}");
        }
    }
}

/// Driver without hardware, logs the lit LEDs whenever they change
pub struct LogDriver {
    last_frame: Option<RingCanvas>,
}

impl HardwareDriver for LogDriver {
    type Config = ();

    fn new(_config: Self::Config, num_leds: usize) -> Result<Self> {
        info!("Logging a ring of {num_leds} LEDs instead of driving hardware");
        Ok(Self { last_frame: None })
    }

    fn display(&mut self, canvas: &RingCanvas) -> Result<()> {
        if self.last_frame.as_ref() != Some(canvas) {
            let lit = canvas
                .pixels()
                .iter()
                .enumerate()
                .filter(|(_, color)| **color != Rgb888::BLACK)
                .map(|(index, color)| {
                    format!("{index}:#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b())
                })
                .collect::<Vec<_>>();
            info!("LED ring: [{}]", lit.join(", "));

            self.last_frame = Some(canvas.clone());
        }

        Ok(())
    }
}
