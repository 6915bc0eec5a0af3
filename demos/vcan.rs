//! Sends the control frames cyclically on a real bus and prints what the
//! device reports.
//!
//! `cargo run --example vcan -- can0`

use std::time::Duration;

use psb_can::{
    recv_and_decode, send_cycle, Conn, PsbCodec, PsbConfig, PsbError, SourceUpdate,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> psb_can::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let iface = std::env::args().nth(1).unwrap_or_else(|| "vcan0".to_owned());
    let conn = Conn::new(&iface)?;
    conn.set_read_timeout(Duration::from_millis(50))?;

    let mut codec = PsbCodec::new(PsbConfig::default())?;
    codec.set_source_params(SourceUpdate::new().u(24.0).i(1.0))?;

    loop {
        send_cycle(&codec, &conn)?;
        match recv_and_decode(&mut codec, &conn) {
            Ok(Some(decoded)) => info!(?decoded, "device"),
            Ok(None) | Err(PsbError::IOError(_)) => {}
            Err(e) => warn!("{e}"),
        }
        if let Err(e) = codec.ensure_fresh(Duration::from_secs(2)) {
            warn!("{e}");
        }
    }
}
