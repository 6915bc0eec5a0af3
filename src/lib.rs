//! Codec for the cyclic CAN messages of PSB programmable power supply/sink
//! devices.
//!
//! The controller sends three frames (CONTROL, SET_VALUES_1_PS and
//! SET_VALUES_1_EL) and the device answers with status, measured values and
//! echoes of the setpoints. [`PsbCodec`] keeps the commanded setpoints,
//! builds the outgoing frames from them and decodes what comes back into
//! physical units.
//!
//! ```
//! use psb_can::{PsbCodec, PsbConfig, SourceUpdate};
//!
//! let mut codec = PsbCodec::new(PsbConfig::default()).unwrap();
//! let frame = codec.set_source_params(SourceUpdate::new().u(48.0).i(10.0)).unwrap();
//! assert_eq!(frame.id(), 0x201);
//! ```

pub mod codec;
pub mod config;
pub mod conn;
pub mod decode;
pub mod encode;
pub mod ids;
pub mod message;
pub mod params;
pub mod scale;

use std::time::Duration;

use thiserror::Error;

pub use codec::PsbCodec;
pub use config::PsbConfig;
pub use conn::{recv_and_decode, send_cycle, Conn, Loopback, Transport};
pub use decode::{ActualValues, Decoded, Dispatch, SinkValues, SourceValues, StatusFlags};
pub use ids::{CycleReadId, CycleSendId};
pub use message::WireMessage;
pub use params::{SinkParams, SinkUpdate, SourceParams, SourceUpdate, StatusParams};
pub use scale::{Quantity, ScaleTable, DEFAULT_DEVICE_COUNT};

#[derive(Error, Debug)]
pub enum PsbError {
    #[error("Unsupported message id: {0:#x}")]
    UnsupportedMessageId(u32),

    #[error("Wrong arbitration id: expected {expected:#x}, got {got:#x}")]
    IdMismatch { expected: u32, got: u32 },

    #[error("Payload of message {id:#x} too short: expected {expected} bytes, got {got}")]
    PayloadTooShort { id: u32, expected: usize, got: usize },

    #[error("Payload of {0} bytes does not fit a CAN frame")]
    PayloadTooLong(usize),

    #[error("{quantity} = {value} does not fit a 16 bit raw count")]
    RawOutOfRange { quantity: Quantity, value: f64 },

    #[error("Device count must be positive, got {0}")]
    InvalidDeviceCount(u32),

    #[error("No message received for {0:?}")]
    ReceiveTimeout(Duration),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("Frame layout error: {0}")]
    Binrw(#[from] binrw::Error),
}

pub type Result<T> = std::result::Result<T, PsbError>;
