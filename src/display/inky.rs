use std::thread;
use std::time::{Duration, Instant};

use rppal::{gpio, spi};
use thiserror::Error;

use super::Display;
use crate::image::{Bitmap, Ink};

#[derive(Error, Debug)]
pub enum InkyError {
    #[error("GPIO: {0}")]
    Gpio(#[from] gpio::Error),

    #[error("SPI: {0}")]
    Spi(#[from] spi::Error),

    #[error("panel still busy after {0:?}")]
    Timeout(Duration),

    #[error("image is {0}x{1}, panel is 400x300")]
    Size(usize, usize),

    #[error("no image staged")]
    NoImage,
}

/// Pimoroni Inky wHAT, the 400x300 red/black/white variant with an SSD1683 controller.
///
/// The update waveforms come from the controller's OTP, so no LUT is uploaded.
pub struct InkyWhat {
    hardware_interface: Box<dyn HardwareInterface>,
    border: Ink,
    planes: Option<(Vec<u8>, Vec<u8>)>,
}

impl InkyWhat {
    const PIN_DC: u8 = 22; // Data/command pin (high = data, low = command)
    const PIN_RST: u8 = 27; // External reset pin (low = reset)
    const PIN_BUSY: u8 = 17; // Busy output pin (high = busy)

    const SPI_CLOCK: u32 = 488_000;
    const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

    pub const DISPLAY_WIDTH: usize = 400;
    pub const DISPLAY_HEIGHT: usize = 300;

    pub fn new() -> Result<Self, InkyError> {
        let gpio = gpio::Gpio::new()?;

        Ok(Self::with_interface(Box::new(DisplayHardwareInterface {
            spi: spi::Spi::new(
                spi::Bus::Spi0,
                spi::SlaveSelect::Ss0,
                Self::SPI_CLOCK,
                spi::Mode::Mode0,
            )?,
            pin_dc: gpio.get(Self::PIN_DC)?.into_output(),
            pin_rst: gpio.get(Self::PIN_RST)?.into_output(),
            pin_busy: gpio.get(Self::PIN_BUSY)?.into_input(),
        })))
    }

    fn with_interface(hardware_interface: Box<dyn HardwareInterface>) -> Self {
        Self {
            hardware_interface,
            border: Ink::White,
            planes: None,
        }
    }

    fn reset(&mut self) {
        self.hardware_interface
            .set_level(GpioOutputPin::Reset, gpio::Level::Low);
        self.hardware_interface.sleep(Duration::from_millis(100));
        self.hardware_interface
            .set_level(GpioOutputPin::Reset, gpio::Level::High);
        self.hardware_interface.sleep(Duration::from_millis(100));
    }

    fn wait_for_busy(&mut self) -> Result<(), InkyError> {
        let started = Instant::now();

        if self.hardware_interface.get_level(GpioInputPin::Busy) == gpio::Level::High {
            log::debug!("Waiting for panel...");
            while self.hardware_interface.get_level(GpioInputPin::Busy) == gpio::Level::High {
                if started.elapsed() > Self::BUSY_TIMEOUT {
                    return Err(InkyError::Timeout(Self::BUSY_TIMEOUT));
                }
                self.hardware_interface.sleep(Duration::from_millis(50));
            }
            log::debug!("Panel ready after {:?}", started.elapsed());
        }

        Ok(())
    }

    fn send(&mut self, command: u8, data: &[u8]) -> Result<(), InkyError> {
        self.send_command(command)?;
        if !data.is_empty() {
            self.send_data(data)?;
        }
        Ok(())
    }

    fn send_command(&mut self, command: u8) -> Result<(), InkyError> {
        self.hardware_interface
            .set_level(GpioOutputPin::DataCommand, gpio::Level::Low);
        self.hardware_interface.write_to_spi(&[command])?;
        Ok(())
    }

    fn send_data(&mut self, data: &[u8]) -> Result<(), InkyError> {
        self.hardware_interface
            .set_level(GpioOutputPin::DataCommand, gpio::Level::High);
        for chunk in data.chunks(4096) {
            self.hardware_interface.write_to_spi(chunk)?;
        }
        Ok(())
    }

    fn init(&mut self) -> Result<(), InkyError> {
        self.reset();

        // soft reset
        self.send(0x12, &[])?;
        self.wait_for_busy()?;

        // analog block control
        self.send(0x74, &[0x54])?;

        // digital block control
        self.send(0x7E, &[0x3B])?;

        // gate setting: 300 rows
        self.send(0x01, &[0x2B, 0x01, 0x00])?;

        // dummy line period
        self.send(0x3A, &[0x07])?;

        // gate line width
        self.send(0x3B, &[0x04])?;

        // data entry mode: X increment, Y increment
        self.send(0x11, &[0x03])?;

        // set vcom value
        self.send(0x2C, &[0x3C])?;

        // set border
        self.send(0x3C, &[border_waveform(self.border)])?;

        // use internal temperature sensor
        self.send(0x18, &[0x80])?;

        // setting X direction start/end position of RAM, in bytes
        self.send(0x44, &[0x00, (Self::DISPLAY_WIDTH / 8 - 1) as u8])?;

        // setting Y direction start/end position of RAM
        self.send(0x45, &[0x00, 0x00, 0x2B, 0x01])
    }

    fn sleep(&mut self) -> Result<(), InkyError> {
        self.send(0x10, &[0x01])
    }
}

impl Display for InkyWhat {
    type Err = InkyError;

    fn set_border(&mut self, border: Ink) {
        self.border = border;
    }

    fn set_image(&mut self, image: &Bitmap) -> Result<(), Self::Err> {
        if (image.width(), image.height()) != self.dimensions() {
            return Err(InkyError::Size(image.width(), image.height()));
        }

        self.planes = Some(pack_planes(image));
        Ok(())
    }

    fn show(&mut self) -> Result<(), Self::Err> {
        let (black, red) = self.planes.clone().ok_or(InkyError::NoImage)?;

        self.init()?;

        for (register, plane) in [(0x24, &black), (0x26, &red)] {
            self.send(0x4E, &[0x00])?;
            self.send(0x4F, &[0x00, 0x00])?;
            self.send(register, plane)?;
        }

        // load temperature and waveform from OTP, then display
        self.send(0x22, &[0xF7])?;
        self.send(0x20, &[])?;
        self.hardware_interface.sleep(Duration::from_millis(50));
        self.wait_for_busy()?;

        self.sleep()
    }

    fn dimensions(&self) -> (usize, usize) {
        (Self::DISPLAY_WIDTH, Self::DISPLAY_HEIGHT)
    }
}

fn border_waveform(border: Ink) -> u8 {
    match border {
        Ink::Black => 0b0000_0000,
        Ink::Red => 0b0111_0011,
        Ink::White => 0b0011_0001,
    }
}

/// Pack a frame into the controller's two RAM planes, MSB first. In the black/white plane a set
/// bit is white; in the red plane a set bit is red.
fn pack_planes(image: &Bitmap) -> (Vec<u8>, Vec<u8>) {
    let bytes = (image.width() + 7) / 8 * image.height();
    let mut black = Vec::with_capacity(bytes);
    let mut red = Vec::with_capacity(bytes);

    for row in image.rows() {
        for chunk in row.chunks(8) {
            let mut black_byte = 0xFF;
            let mut red_byte = 0x00;

            for (bit, ink) in chunk.iter().enumerate() {
                let mask = 0x80 >> bit;
                if *ink == Ink::Black {
                    black_byte &= !mask;
                }
                if *ink == Ink::Red {
                    red_byte |= mask;
                }
            }

            black.push(black_byte);
            red.push(red_byte);
        }
    }

    (black, red)
}

struct DisplayHardwareInterface {
    spi: spi::Spi,
    pin_dc: gpio::OutputPin,
    pin_rst: gpio::OutputPin,
    pin_busy: gpio::InputPin,
}

impl HardwareInterface for DisplayHardwareInterface {
    fn set_level(&mut self, pin: GpioOutputPin, level: gpio::Level) {
        match pin {
            GpioOutputPin::Reset => &mut self.pin_rst,
            GpioOutputPin::DataCommand => &mut self.pin_dc,
        }
        .write(level)
    }

    fn get_level(&self, pin: GpioInputPin) -> gpio::Level {
        match pin {
            GpioInputPin::Busy => &self.pin_busy,
        }
        .read()
    }

    fn write_to_spi(&mut self, buffer: &[u8]) -> Result<usize, spi::Error> {
        self.spi.write(buffer)
    }

    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

trait HardwareInterface {
    fn set_level(&mut self, pin: GpioOutputPin, level: gpio::Level);

    fn get_level(&self, pin: GpioInputPin) -> gpio::Level;

    fn write_to_spi(&mut self, data: &[u8]) -> Result<usize, spi::Error>;

    fn sleep(&mut self, duration: Duration);
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum GpioOutputPin {
    Reset,
    DataCommand,
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum GpioInputPin {
    Busy,
}
