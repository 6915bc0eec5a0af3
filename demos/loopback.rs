//! Drives the codec against an in-memory bus, playing both sides.
//!
//! `RUST_LOG=psb_can=debug cargo run --example loopback`

use psb_can::{
    recv_and_decode, send_cycle, CycleReadId, Loopback, PsbCodec, PsbConfig, SinkUpdate,
    SourceUpdate, Transport, WireMessage,
};
use tracing_subscriber::EnvFilter;

fn main() -> psb_can::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut codec = PsbCodec::new(PsbConfig::default())?;
    codec.set_source_params(SourceUpdate::new().u(400.0).i(20.0))?;
    codec.set_sink_params(SinkUpdate::new().i(10.0).p(4000.0))?;
    codec.output_on()?;

    let bus = Loopback::new();
    send_cycle(&codec, &bus)?;
    while let Ok(msg) = bus.recv() {
        println!("-> {msg:?}");
    }

    // roughly what a device running at 400 V / 12 A reports
    bus.send(&WireMessage::new(
        CycleReadId::ActualValues,
        &[0x51, 0xEB, 0x0A, 0xAA, 0x0A, 0xF2, 0, 0],
    )?)?;
    bus.send(&WireMessage::new(
        CycleReadId::Status,
        &[0, 0, 0, 0, 0x80, 0, 0, 0x08],
    )?)?;
    while !bus.is_empty() {
        if let Some(decoded) = recv_and_decode(&mut codec, &bus)? {
            println!("<- {decoded:?}");
        }
    }

    println!("stalest id last seen {:?} ago", codec.longest_time_since_recv());
    Ok(())
}
