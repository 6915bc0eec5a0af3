use crate::{PsbError, Result};

pub const MAX_PAYLOAD_LEN: usize = 8;

/// A classic CAN data frame as handed to or received from a transport.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WireMessage {
    id: u32,
    len: u8,
    data: [u8; MAX_PAYLOAD_LEN],
}

impl WireMessage {
    /// Copies `payload` into a new message. Payloads over 8 bytes are
    /// rejected.
    pub fn new(id: impl Into<u32>, payload: &[u8]) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(PsbError::PayloadTooLong(payload.len()));
        }

        let mut data = [0u8; MAX_PAYLOAD_LEN];
        data[..payload.len()].copy_from_slice(payload);

        Ok(Self {
            id: id.into(),
            len: payload.len() as u8,
            data,
        })
    }

    /// Builds a full length message, used by the encoder for its fixed
    /// 8 byte frames.
    pub(crate) fn padded(id: impl Into<u32>, data: [u8; MAX_PAYLOAD_LEN]) -> Self {
        Self {
            id: id.into(),
            len: MAX_PAYLOAD_LEN as u8,
            data,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    pub fn dlc(&self) -> usize {
        self.len as usize
    }
}

impl std::fmt::Debug for WireMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WireMessage {{ id: {:#05x}, data: [", self.id)?;
        for (idx, byte) in self.data().iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        f.write_str("] }")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_limited_to_eight_bytes() {
        assert!(WireMessage::new(0x100u32, &[0; 8]).is_ok());
        assert!(matches!(
            WireMessage::new(0x100u32, &[0; 9]),
            Err(PsbError::PayloadTooLong(9))
        ));
    }

    #[test]
    fn short_payload_keeps_its_length() {
        let msg = WireMessage::new(0x105u32, &[1, 2, 3]).unwrap();
        assert_eq!(msg.data(), &[1, 2, 3]);
        assert_eq!(msg.dlc(), 3);
        assert_eq!(msg.id(), 0x105);
    }

    #[test]
    fn debug_prints_hex() {
        let msg = WireMessage::new(0x200u32, &[0x03, 0x00]).unwrap();
        assert_eq!(format!("{msg:?}"), "WireMessage { id: 0x200, data: [03 00] }");
    }
}
