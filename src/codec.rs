use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::PsbConfig;
use crate::decode::{
    self, ActualValues, Decoded, Dispatch, SinkValues, SourceValues, StatusFlags,
};
use crate::encode;
use crate::ids::{CycleReadId, CycleSendId};
use crate::message::WireMessage;
use crate::params::{SinkParams, SinkUpdate, SourceParams, SourceUpdate, StatusParams};
use crate::scale::ScaleTable;
use crate::{PsbError, Result};

/// Parameter store, encoder and decoder for one PSB device.
///
/// New setpoints go in through the setters, each of which returns the
/// rebuilt frame for its send id. The same frames stay available through
/// [`PsbCodec::outgoing`] for cyclic transmission. Inbound frames go through
/// [`PsbCodec::decode`], which keeps the last good value per category along
/// with its receive time.
///
/// The codec does no I/O and has no interior locking; share it behind a
/// single lock if more than one task needs it.
#[derive(Debug, Clone)]
pub struct PsbCodec {
    table: ScaleTable,
    source: SourceParams,
    sink: SinkParams,
    status: StatusParams,
    outgoing: BTreeMap<CycleSendId, WireMessage>,
    last_recv: HashMap<CycleReadId, Instant>,
    actual_vals: Option<ActualValues>,
    source_vals: Option<SourceValues>,
    sink_vals: Option<SinkValues>,
    status_vals: Option<StatusFlags>,
}

impl PsbCodec {
    pub fn new(config: PsbConfig) -> Result<Self> {
        let table = ScaleTable::new(config.device_count)?;

        let mut outgoing = BTreeMap::new();
        outgoing.insert(CycleSendId::Control, encode::control_message(&config.status)?);
        outgoing.insert(
            CycleSendId::SetValues1Ps,
            encode::source_message(&config.source, &table)?,
        );
        outgoing.insert(
            CycleSendId::SetValues1El,
            encode::sink_message(&config.sink, &table)?,
        );

        let now = Instant::now();
        let last_recv = CycleReadId::SUPPORTED
            .iter()
            .map(|id| (*id, now))
            .collect();

        debug!(device_count = table.device_count(), "created PSB codec");

        Ok(Self {
            table,
            source: config.source,
            sink: config.sink,
            status: config.status,
            outgoing,
            last_recv,
            actual_vals: None,
            source_vals: None,
            sink_vals: None,
            status_vals: None,
        })
    }

    pub fn scale_table(&self) -> &ScaleTable {
        &self.table
    }

    pub fn device_count(&self) -> u32 {
        self.table.device_count()
    }

    /* Setters */

    pub fn set_source_params(&mut self, update: SourceUpdate) -> Result<WireMessage> {
        let source = self.source.merged(update);
        let msg = encode::source_message(&source, &self.table)?;
        self.source = source;
        self.outgoing.insert(CycleSendId::SetValues1Ps, msg);
        debug!(?update, ?msg, "set source params");
        Ok(msg)
    }

    /// The sink shares its voltage rail with the source, so a voltage in
    /// `update` goes to the source setpoints and rebuilds that frame too.
    pub fn set_sink_params(&mut self, update: SinkUpdate) -> Result<WireMessage> {
        let sink = self.sink.merged(update);
        // build before touching the source so a bad sink value changes nothing
        let msg = encode::sink_message(&sink, &self.table)?;
        if let Some(u) = update.u {
            self.set_source_params(SourceUpdate::new().u(u))?;
        }
        self.sink = sink;
        self.outgoing.insert(CycleSendId::SetValues1El, msg);
        debug!(?update, ?msg, "set sink params");
        Ok(msg)
    }

    pub fn set_remote(&mut self, on: bool) -> Result<WireMessage> {
        self.status.remote_control = on;
        self.update_control()
    }

    pub fn set_output(&mut self, on: bool) -> Result<WireMessage> {
        self.status.output = on;
        self.update_control()
    }

    pub fn remote_on(&mut self) -> Result<WireMessage> {
        self.set_remote(true)
    }

    pub fn remote_off(&mut self) -> Result<WireMessage> {
        self.set_remote(false)
    }

    pub fn output_on(&mut self) -> Result<WireMessage> {
        self.set_output(true)
    }

    pub fn output_off(&mut self) -> Result<WireMessage> {
        self.set_output(false)
    }

    fn update_control(&mut self) -> Result<WireMessage> {
        let msg = encode::control_message(&self.status)?;
        self.outgoing.insert(CycleSendId::Control, msg);
        debug!(status = ?self.status, ?msg, "set status params");
        Ok(msg)
    }

    pub fn source_params(&self) -> SourceParams {
        self.source
    }

    pub fn sink_params(&self) -> SinkParams {
        self.sink
    }

    pub fn status_params(&self) -> StatusParams {
        self.status
    }

    /// Current frame for every send id, in id order.
    pub fn outgoing(&self) -> &BTreeMap<CycleSendId, WireMessage> {
        &self.outgoing
    }

    pub fn outgoing_message(&self, id: CycleSendId) -> Option<&WireMessage> {
        self.outgoing.get(&id)
    }

    /* Decoding */

    /// Decodes `msg` and caches the result. Ids other than STATUS,
    /// ACTUAL_VALUES, SET_VALUES_PS and SET_VALUES_EL are rejected with
    /// [`PsbError::UnsupportedMessageId`]. Nothing is cached or timestamped
    /// when decoding fails.
    pub fn decode(&mut self, msg: &WireMessage) -> Result<Decoded> {
        let decoded = match Dispatch::classify(msg.id()) {
            Dispatch::Status => decode::decode_status(msg).map(Decoded::Status),
            Dispatch::ActualValues => {
                decode::decode_actual_values(msg, &self.table).map(Decoded::ActualValues)
            }
            Dispatch::SetValuesPs => {
                decode::decode_source_values(msg, &self.table).map(Decoded::SourceValues)
            }
            Dispatch::SetValuesEl => {
                decode::decode_sink_values(msg, &self.table).map(Decoded::SinkValues)
            }
            Dispatch::Unsupported(id) => Err(PsbError::UnsupportedMessageId(id)),
        }
        .inspect_err(|e| warn!(id = msg.id(), "rejected message: {e}"))?;

        match decoded {
            Decoded::Status(flags) => self.status_vals = Some(flags),
            Decoded::ActualValues(vals) => self.actual_vals = Some(vals),
            Decoded::SourceValues(vals) => self.source_vals = Some(vals),
            Decoded::SinkValues(vals) => self.sink_vals = Some(vals),
        }
        self.last_recv.insert(decoded.read_id(), Instant::now());
        debug!(?decoded, "decoded message");

        Ok(decoded)
    }

    /// Like [`PsbCodec::decode`], but frames that are not ours yield
    /// `Ok(None)` instead of an error.
    pub fn decode_if_supported(&mut self, msg: &WireMessage) -> Result<Option<Decoded>> {
        if Dispatch::classify(msg.id()).read_id().is_none() {
            return Ok(None);
        }
        self.decode(msg).map(Some)
    }

    pub fn get_actual_values(&self) -> Option<ActualValues> {
        self.actual_vals
    }

    pub fn actual_values(&self) -> Option<ActualValues> {
        self.actual_vals
    }

    pub fn source_values(&self) -> Option<SourceValues> {
        self.source_vals
    }

    pub fn sink_values(&self) -> Option<SinkValues> {
        self.sink_vals
    }

    pub fn status_values(&self) -> Option<StatusFlags> {
        self.status_vals
    }

    /* Staleness */

    /// Age of the last successful decode of `id`. `None` for ids that are
    /// never decoded.
    pub fn time_since_recv(&self, id: CycleReadId) -> Option<Duration> {
        self.last_recv.get(&id).map(Instant::elapsed)
    }

    /// Age of the stalest supported read id. Receive times start at
    /// construction.
    pub fn longest_time_since_recv(&self) -> Duration {
        self.last_recv
            .values()
            .min()
            .map(Instant::elapsed)
            .unwrap_or_default()
    }

    /// Turns the staleness age into [`PsbError::ReceiveTimeout`] once it
    /// exceeds `max_age`. The codec never calls this on its own.
    pub fn ensure_fresh(&self, max_age: Duration) -> Result<()> {
        let age = self.longest_time_since_recv();
        if age > max_age {
            return Err(PsbError::ReceiveTimeout(age));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::Quantity;

    fn codec() -> PsbCodec {
        PsbCodec::new(PsbConfig::default()).unwrap()
    }

    #[test]
    fn construction_builds_every_send_frame() {
        let codec = codec();
        assert_eq!(codec.device_count(), 3);
        let ids: Vec<_> = codec.outgoing().keys().copied().collect();
        assert_eq!(ids, CycleSendId::ALL.to_vec());
        // remote on, output off
        assert_eq!(
            codec.outgoing_message(CycleSendId::Control).unwrap().data()[0],
            1
        );
    }

    #[test]
    fn control_word_follows_setters() {
        let mut codec = codec();
        codec.set_output(true).unwrap();
        let msg = codec.set_remote(false).unwrap();
        assert_eq!(msg.data()[0], 2);

        codec.set_output(false).unwrap();
        let msg = codec.set_remote(true).unwrap();
        assert_eq!(msg.data()[0], 1);

        let msg = codec.output_on().unwrap();
        assert_eq!(msg.data()[0], 3);
        assert_eq!(codec.outgoing_message(CycleSendId::Control), Some(&msg));
    }

    #[test]
    fn sink_voltage_lands_on_source() {
        let mut codec = codec();
        let before = *codec.outgoing_message(CycleSendId::SetValues1Ps).unwrap();
        codec.set_sink_params(SinkUpdate::new().u(5.0).i(1.0)).unwrap();
        assert_eq!(codec.source_params().u, 5.0);
        assert_eq!(codec.sink_params().i, 1.0);
        let after = *codec.outgoing_message(CycleSendId::SetValues1Ps).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn failed_encode_leaves_store_untouched() {
        let mut codec = codec();
        codec.set_source_params(SourceUpdate::new().u(10.0)).unwrap();
        let frame = *codec.outgoing_message(CycleSendId::SetValues1Ps).unwrap();

        let err = codec
            .set_source_params(SourceUpdate::new().u(10_000.0))
            .unwrap_err();
        assert!(matches!(
            err,
            PsbError::RawOutOfRange {
                quantity: Quantity::U,
                ..
            }
        ));
        assert_eq!(codec.source_params().u, 10.0);
        assert_eq!(
            codec.outgoing_message(CycleSendId::SetValues1Ps),
            Some(&frame)
        );
    }

    #[test]
    fn bad_sink_current_does_not_forward_voltage() {
        let mut codec = codec();
        assert!(codec
            .set_sink_params(SinkUpdate::new().u(5.0).i(1_000.0))
            .is_err());
        assert_eq!(codec.source_params().u, 0.0);
        assert_eq!(codec.sink_params().i, 0.0);
    }

    #[test]
    fn unsupported_id_changes_nothing() {
        let mut codec = codec();
        let msg = WireMessage::new(CycleReadId::Limits1Ps, &[0; 8]).unwrap();
        assert!(matches!(
            codec.decode(&msg),
            Err(PsbError::UnsupportedMessageId(0x103))
        ));
        assert_eq!(codec.decode_if_supported(&msg).unwrap(), None);
        assert_eq!(codec.actual_values(), None);
        assert_eq!(codec.source_values(), None);
        assert_eq!(codec.sink_values(), None);
        assert_eq!(codec.status_values(), None);
    }

    #[test]
    fn decode_caches_by_category() {
        let mut codec = codec();
        let msg = WireMessage::new(CycleReadId::ActualValues, &[0, 10, 0, 20, 0, 30]).unwrap();
        let decoded = codec.decode(&msg).unwrap();
        let Decoded::ActualValues(vals) = decoded else {
            panic!("expected actual values, got {decoded:?}");
        };
        assert_eq!(codec.get_actual_values(), Some(vals));
        assert_eq!(codec.status_values(), None);
    }

    #[test]
    fn ensure_fresh_reports_timeout() {
        let codec = codec();
        std::thread::sleep(Duration::from_millis(5));
        assert!(matches!(
            codec.ensure_fresh(Duration::from_millis(1)),
            Err(PsbError::ReceiveTimeout(_))
        ));
        assert!(codec.ensure_fresh(Duration::from_secs(60)).is_ok());
    }

    #[test]
    fn current_boundary_reaches_the_wire() {
        let mut codec = codec();
        let frame = codec
            .set_source_params(SourceUpdate::new().i(0.050354765999999995))
            .unwrap();
        assert_eq!(&frame.data()[2..4], &[0, 11]);
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn warnings_while(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn rejected_frames_are_logged() {
        let mut codec = codec();
        let short = WireMessage::new(CycleReadId::SetValuesEl, &[0; 2]).unwrap();
        let limits = WireMessage::new(CycleReadId::Limits1El, &[0; 8]).unwrap();

        let logged = warnings_while(|| {
            assert!(matches!(
                codec.decode(&short),
                Err(PsbError::PayloadTooShort { id: 0x105, .. })
            ));
            assert!(codec.decode(&limits).is_err());
        });
        let lines: Vec<_> = logged.lines().collect();
        assert_eq!(lines.len(), 2, "{logged}");
        assert!(lines[0].contains("WARN") && lines[0].contains("too short"));
        assert!(lines[1].contains("Unsupported message id: 0x106"));
        assert_eq!(codec.sink_values(), None);

        let quiet = warnings_while(|| {
            assert_eq!(codec.decode_if_supported(&limits).unwrap(), None);
        });
        assert!(quiet.is_empty(), "{quiet}");
    }

    #[test]
    fn limits_have_no_receive_time() {
        let codec = codec();
        assert_eq!(codec.time_since_recv(CycleReadId::Limits2Ps), None);
        assert!(codec.time_since_recv(CycleReadId::Status).is_some());
    }
}
