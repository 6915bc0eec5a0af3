//! Builders for the controller -> device frames.
//!
//! Everything the controller sends is big-endian and padded to a full 8 byte
//! frame.

use std::io::Cursor;

use binrw::{binrw, BinWrite};

use crate::ids::CycleSendId;
use crate::message::{WireMessage, MAX_PAYLOAD_LEN};
use crate::params::{SinkParams, SourceParams, StatusParams};
use crate::scale::{Quantity, ScaleTable};
use crate::Result;

#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ControlFrame {
    pub(crate) word: u16,
}

impl ControlFrame {
    pub(crate) fn from_status(status: &StatusParams) -> Self {
        let value = (status.output as u16) * 2 + status.remote_control as u16;
        Self { word: value << 8 }
    }
}

#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SourceSetFrame {
    pub(crate) u: u16,
    pub(crate) i: u16,
    pub(crate) p: u16,
    pub(crate) r: u16,
}

impl SourceSetFrame {
    pub(crate) fn from_params(params: &SourceParams, table: &ScaleTable) -> Result<Self> {
        Ok(Self {
            u: table.to_raw(Quantity::U, params.u)?,
            i: table.to_raw(Quantity::I, params.i)?,
            p: table.to_raw(Quantity::P, params.power())?,
            r: table.to_raw(Quantity::R, params.r)?,
        })
    }
}

#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SinkSetFrame {
    pub(crate) i: u16,
    pub(crate) p: u16,
    pub(crate) r: u16,
}

impl SinkSetFrame {
    pub(crate) fn from_params(params: &SinkParams, table: &ScaleTable) -> Result<Self> {
        Ok(Self {
            i: table.to_raw(Quantity::I, params.i)?,
            p: table.to_raw(Quantity::P, params.p)?,
            r: table.to_raw(Quantity::R, params.r)?,
        })
    }
}

fn pack(
    id: CycleSendId,
    write: impl FnOnce(&mut Cursor<&mut [u8]>) -> binrw::BinResult<()>,
) -> Result<WireMessage> {
    let mut buf = [0u8; MAX_PAYLOAD_LEN];
    write(&mut Cursor::new(&mut buf[..]))?;
    Ok(WireMessage::padded(id, buf))
}

/// CONTROL frame: `output * 2 + remote_control` in the high byte.
pub fn control_message(status: &StatusParams) -> Result<WireMessage> {
    pack(CycleSendId::Control, |c| {
        ControlFrame::from_status(status).write(c)
    })
}

/// SET_VALUES_1_PS frame: `(u, i, p, r)` raw counts.
pub fn source_message(params: &SourceParams, table: &ScaleTable) -> Result<WireMessage> {
    let frame = SourceSetFrame::from_params(params, table)?;
    pack(CycleSendId::SetValues1Ps, |c| frame.write(c))
}

/// SET_VALUES_1_EL frame: `(i, p, r)` raw counts.
pub fn sink_message(params: &SinkParams, table: &ScaleTable) -> Result<WireMessage> {
    let frame = SinkSetFrame::from_params(params, table)?;
    pack(CycleSendId::SetValues1El, |c| frame.write(c))
}
