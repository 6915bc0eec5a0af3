use crate::PsbError;

/// Ids the device transmits cyclically (device -> controller).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CycleReadId {
    Status,
    ActualValues,
    SetValuesPs,
    Limits1Ps,
    Limits2Ps,
    SetValuesEl,
    Limits1El,
}

impl CycleReadId {
    pub const BASE: u32 = 0x100;

    /// The read ids this crate knows how to decode.
    pub const SUPPORTED: [CycleReadId; 4] = [
        CycleReadId::ActualValues,
        CycleReadId::Status,
        CycleReadId::SetValuesPs,
        CycleReadId::SetValuesEl,
    ];

    pub fn raw(self) -> u32 {
        match self {
            Self::Status => 0x100,
            Self::ActualValues => 0x101,
            Self::SetValuesPs => 0x102,
            Self::Limits1Ps => 0x103,
            Self::Limits2Ps => 0x104,
            Self::SetValuesEl => 0x105,
            Self::Limits1El => 0x106,
        }
    }
}

impl TryFrom<u32> for CycleReadId {
    type Error = PsbError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        match id {
            0x100 => Ok(Self::Status),
            0x101 => Ok(Self::ActualValues),
            0x102 => Ok(Self::SetValuesPs),
            0x103 => Ok(Self::Limits1Ps),
            0x104 => Ok(Self::Limits2Ps),
            0x105 => Ok(Self::SetValuesEl),
            0x106 => Ok(Self::Limits1El),
            _ => Err(PsbError::UnsupportedMessageId(id)),
        }
    }
}

impl From<CycleReadId> for u32 {
    fn from(id: CycleReadId) -> u32 {
        id.raw()
    }
}

/// Ids the controller transmits cyclically (controller -> device).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CycleSendId {
    Control,
    SetValues1Ps,
    SetValues1El,
}

impl CycleSendId {
    pub const BASE: u32 = 0x200;

    pub const ALL: [CycleSendId; 3] = [
        CycleSendId::Control,
        CycleSendId::SetValues1Ps,
        CycleSendId::SetValues1El,
    ];

    pub fn raw(self) -> u32 {
        match self {
            Self::Control => 0x200,
            Self::SetValues1Ps => 0x201,
            Self::SetValues1El => 0x202,
        }
    }
}

impl TryFrom<u32> for CycleSendId {
    type Error = PsbError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        match id {
            0x200 => Ok(Self::Control),
            0x201 => Ok(Self::SetValues1Ps),
            0x202 => Ok(Self::SetValues1El),
            _ => Err(PsbError::UnsupportedMessageId(id)),
        }
    }
}

impl From<CycleSendId> for u32 {
    fn from(id: CycleSendId) -> u32 {
        id.raw()
    }
}
