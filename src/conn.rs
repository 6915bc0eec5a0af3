use std::collections::VecDeque;
use std::io;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use socketcan::{EmbeddedFrame, ExtendedId, Id, Socket, StandardId};
use tracing::{debug, trace};

use crate::decode::Decoded;
use crate::message::WireMessage;
use crate::{PsbCodec, PsbError, Result};

/// Something that moves [`WireMessage`]s to and from a device.
pub trait Transport {
    fn send(&self, msg: &WireMessage) -> Result<()>;

    /// Blocks until the next inbound message, or fails with
    /// [`PsbError::IOError`] when the transport times out.
    fn recv(&self) -> Result<WireMessage>;
}

fn raw_id(id: Id) -> u32 {
    match id {
        Id::Standard(sid) => sid.as_raw() as u32,
        Id::Extended(eid) => eid.as_raw(),
    }
}

fn to_can_id(id: u32) -> Result<Id> {
    let can_id = if id <= StandardId::MAX.as_raw() as u32 {
        StandardId::new(id as u16).map(Id::Standard)
    } else {
        ExtendedId::new(id).map(Id::Extended)
    };
    can_id.ok_or_else(|| PsbError::ConnectionError(format!("id {id:#x} does not fit a CAN id")))
}

fn mk_can_frame(msg: &WireMessage) -> Result<socketcan::CanDataFrame> {
    let id = to_can_id(msg.id())?;
    socketcan::CanDataFrame::new(id, msg.data())
        .ok_or_else(|| PsbError::ConnectionError(format!("cannot build frame for {msg:?}")))
}

fn from_can_frame(frame: socketcan::CanFrame) -> Result<WireMessage> {
    match frame {
        socketcan::CanFrame::Data(data) => WireMessage::new(raw_id(data.id()), data.data()),
        socketcan::CanFrame::Remote(remote) => Err(PsbError::ConnectionError(format!(
            "remote frame for id {:#x}",
            raw_id(remote.id())
        ))),
        socketcan::CanFrame::Error(err) => Err(PsbError::ConnectionError(format!(
            "bus error frame {err:?}"
        ))),
    }
}

/// SocketCAN connection to the bus the device sits on.
#[derive(Debug)]
pub struct Conn {
    socket: socketcan::CanSocket,
}

impl Conn {
    pub fn new(interface_name: &str) -> Result<Self> {
        let socket = socketcan::CanSocket::open(interface_name)
            .map_err(|e| PsbError::ConnectionError(format!("{interface_name}: {e}")))?;
        debug!(interface = interface_name, "opened CAN socket");
        Ok(Conn { socket })
    }

    pub fn set_read_timeout(&self, timeout: Duration) -> Result<()> {
        self.socket.set_read_timeout(timeout)?;
        Ok(())
    }

    pub fn set_write_timeout(&self, timeout: Duration) -> Result<()> {
        self.socket.set_write_timeout(timeout)?;
        Ok(())
    }
}

impl Transport for Conn {
    fn send(&self, msg: &WireMessage) -> Result<()> {
        let frame = mk_can_frame(msg)?;
        self.socket.write_frame_insist(&frame)?;
        trace!(?msg, "sent");
        Ok(())
    }

    fn recv(&self) -> Result<WireMessage> {
        let frame = self.socket.read_frame()?;
        let msg = from_can_frame(frame)?;
        trace!(?msg, "received");
        Ok(msg)
    }
}

/// In-memory transport: whatever is sent is received again in order.
#[derive(Debug, Default)]
pub struct Loopback {
    queue: Mutex<VecDeque<WireMessage>>,
}

impl Loopback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Transport for Loopback {
    fn send(&self, msg: &WireMessage) -> Result<()> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(*msg);
        Ok(())
    }

    fn recv(&self) -> Result<WireMessage> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| {
                PsbError::IOError(io::Error::new(
                    io::ErrorKind::WouldBlock,
                    "loopback queue is empty",
                ))
            })
    }
}

/// Sends every current outgoing frame once, in id order. The device expects
/// these cyclically; call this from the host's send timer.
pub fn send_cycle<T: Transport + ?Sized>(codec: &PsbCodec, transport: &T) -> Result<usize> {
    for msg in codec.outgoing().values() {
        transport.send(msg)?;
    }
    Ok(codec.outgoing().len())
}

/// Receives one frame and decodes it when it is one of ours.
pub fn recv_and_decode<T: Transport + ?Sized>(
    codec: &mut PsbCodec,
    transport: &T,
) -> Result<Option<Decoded>> {
    let msg = transport.recv()?;
    codec.decode_if_supported(&msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_map_to_standard_or_extended() {
        assert_eq!(to_can_id(0x100).unwrap(), Id::Standard(StandardId::new(0x100).unwrap()));
        assert!(matches!(to_can_id(0x800).unwrap(), Id::Extended(_)));
        assert!(to_can_id(0x2000_0000).is_err());
    }

    #[test]
    fn can_frame_keeps_payload() {
        let msg = WireMessage::new(0x201u32, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let frame = mk_can_frame(&msg).unwrap();
        let back = from_can_frame(frame.into()).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn empty_loopback_times_out() {
        let lb = Loopback::new();
        assert!(lb.is_empty());
        assert!(matches!(lb.recv(), Err(PsbError::IOError(e)) if e.kind() == io::ErrorKind::WouldBlock));
    }
}
