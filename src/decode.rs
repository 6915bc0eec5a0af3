//! Parsers for the device -> controller frames.
//!
//! ACTUAL_VALUES and STATUS are big-endian, while the setpoint echoes
//! (SET_VALUES_PS / SET_VALUES_EL) come back little-endian.

use std::io::Cursor;

use binrw::{binrw, BinRead};
use serde::{Deserialize, Serialize};

use crate::ids::CycleReadId;
use crate::message::WireMessage;
use crate::scale::{Quantity, ScaleTable};
use crate::{PsbError, Result};

/// The four decodable read categories, plus everything else.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    Status,
    ActualValues,
    SetValuesPs,
    SetValuesEl,
    Unsupported(u32),
}

impl Dispatch {
    pub fn classify(id: u32) -> Self {
        match CycleReadId::try_from(id) {
            Ok(CycleReadId::Status) => Dispatch::Status,
            Ok(CycleReadId::ActualValues) => Dispatch::ActualValues,
            Ok(CycleReadId::SetValuesPs) => Dispatch::SetValuesPs,
            Ok(CycleReadId::SetValuesEl) => Dispatch::SetValuesEl,
            Ok(CycleReadId::Limits1Ps | CycleReadId::Limits2Ps | CycleReadId::Limits1El)
            | Err(_) => Dispatch::Unsupported(id),
        }
    }

    pub fn read_id(self) -> Option<CycleReadId> {
        match self {
            Dispatch::Status => Some(CycleReadId::Status),
            Dispatch::ActualValues => Some(CycleReadId::ActualValues),
            Dispatch::SetValuesPs => Some(CycleReadId::SetValuesPs),
            Dispatch::SetValuesEl => Some(CycleReadId::SetValuesEl),
            Dispatch::Unsupported(_) => None,
        }
    }
}

/// Measured output of the device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActualValues {
    pub u: f64,
    pub i: f64,
    pub p: f64,
}

/// Source setpoints as echoed back by the device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceValues {
    pub u: f64,
    pub i: f64,
    pub p: f64,
    pub r: f64,
}

/// Sink setpoints as echoed back by the device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SinkValues {
    pub i: f64,
    pub p: f64,
    pub r: f64,
}

/// Single-bit flags of the STATUS frame.
///
/// Several bits encode one of two states; both readings are exposed
/// (`uip_mode`/`uir_mode`, `master`/`slave` and so on). The multi-bit fields
/// (interface access, bits 19-23; alarm_pf, bits 10-12; regulation mode,
/// bits 1-2) are not decoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFlags {
    pub remote_control: bool,
    pub dc_input_terminal: bool,
    pub uir_mode: bool,
    pub uip_mode: bool,
    pub alarms: bool,
    pub alarm_msp_map: bool,
    pub alarm_ocd: bool,
    pub alarm_ocp: bool,
    pub alarm_opd: bool,
    pub alarm_opp: bool,
    pub alarm_ot: bool,
    pub alarm_ovd: bool,
    pub alarm_ovp: bool,
    pub rem_sb: bool,
    pub alarm_ucd: bool,
    pub alarm_uvd: bool,
    pub external_remote_sensing: bool,
    pub internal_remote_sensing: bool,
    pub function_gen_active: bool,
    pub master: bool,
    pub slave: bool,
    pub input_output: bool,
    pub sink_mode: bool,
    pub sour_mode: bool,
}

fn bit(word: u64, idx: u32) -> bool {
    (word >> idx) & 1 == 1
}

impl StatusFlags {
    pub fn from_word(word: u64) -> Self {
        Self {
            remote_control: bit(word, 31),
            dc_input_terminal: bit(word, 30),
            uir_mode: !bit(word, 28),
            uip_mode: bit(word, 28),
            alarms: bit(word, 27),
            alarm_msp_map: bit(word, 26),
            alarm_ocd: bit(word, 25),
            alarm_ocp: bit(word, 24),
            alarm_opd: bit(word, 18),
            alarm_opp: bit(word, 17),
            alarm_ot: bit(word, 16),
            alarm_ovd: bit(word, 14),
            alarm_ovp: bit(word, 13),
            rem_sb: bit(word, 9),
            alarm_ucd: bit(word, 8),
            alarm_uvd: bit(word, 7),
            external_remote_sensing: bit(word, 6),
            internal_remote_sensing: !bit(word, 6),
            function_gen_active: bit(word, 5),
            master: bit(word, 4),
            slave: !bit(word, 4),
            input_output: bit(word, 3),
            sink_mode: bit(word, 0),
            sour_mode: !bit(word, 0),
        }
    }
}

/// Result of decoding one supported frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Decoded {
    Status(StatusFlags),
    ActualValues(ActualValues),
    SourceValues(SourceValues),
    SinkValues(SinkValues),
}

impl Decoded {
    pub fn read_id(&self) -> CycleReadId {
        match self {
            Decoded::Status(_) => CycleReadId::Status,
            Decoded::ActualValues(_) => CycleReadId::ActualValues,
            Decoded::SourceValues(_) => CycleReadId::SetValuesPs,
            Decoded::SinkValues(_) => CycleReadId::SetValuesEl,
        }
    }
}

#[binrw]
#[brw(big)]
#[derive(Debug)]
struct ActualValuesFrame {
    u: u16,
    i: u16,
    p: u16,
}

#[binrw]
#[brw(little)]
#[derive(Debug)]
struct SourceEchoFrame {
    u: u16,
    i: u16,
    p: u16,
    r: u16,
}

#[binrw]
#[brw(little)]
#[derive(Debug)]
struct SinkEchoFrame {
    i: u16,
    p: u16,
    r: u16,
}

fn expect_id(msg: &WireMessage, expected: CycleReadId) -> Result<()> {
    if msg.id() != expected.raw() {
        return Err(PsbError::IdMismatch {
            expected: expected.raw(),
            got: msg.id(),
        });
    }
    Ok(())
}

fn fields<'a>(msg: &'a WireMessage, len: usize) -> Result<Cursor<&'a [u8]>> {
    let data = msg.data();
    if data.len() < len {
        return Err(PsbError::PayloadTooShort {
            id: msg.id(),
            expected: len,
            got: data.len(),
        });
    }
    Ok(Cursor::new(&data[..len]))
}

pub fn decode_actual_values(msg: &WireMessage, table: &ScaleTable) -> Result<ActualValues> {
    expect_id(msg, CycleReadId::ActualValues)?;
    let frame = ActualValuesFrame::read(&mut fields(msg, 6)?)?;
    Ok(ActualValues {
        u: table.to_physical(Quantity::U, frame.u),
        i: table.to_physical(Quantity::I, frame.i),
        p: table.to_physical(Quantity::P, frame.p),
    })
}

/// The whole payload is read as one big-endian integer, so bit 0 is the
/// least significant bit of the last byte.
pub fn decode_status(msg: &WireMessage) -> Result<StatusFlags> {
    expect_id(msg, CycleReadId::Status)?;
    let word = msg
        .data()
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | *byte as u64);
    Ok(StatusFlags::from_word(word))
}

pub fn decode_source_values(msg: &WireMessage, table: &ScaleTable) -> Result<SourceValues> {
    expect_id(msg, CycleReadId::SetValuesPs)?;
    let frame = SourceEchoFrame::read(&mut fields(msg, 8)?)?;
    Ok(SourceValues {
        u: table.to_physical(Quantity::U, frame.u),
        i: table.to_physical(Quantity::I, frame.i),
        p: table.to_physical(Quantity::P, frame.p),
        r: table.to_physical(Quantity::R, frame.r),
    })
}

pub fn decode_sink_values(msg: &WireMessage, table: &ScaleTable) -> Result<SinkValues> {
    expect_id(msg, CycleReadId::SetValuesEl)?;
    let frame = SinkEchoFrame::read(&mut fields(msg, 6)?)?;
    Ok(SinkValues {
        i: table.to_physical(Quantity::I, frame.i),
        p: table.to_physical(Quantity::P, frame.p),
        r: table.to_physical(Quantity::R, frame.r),
    })
}
