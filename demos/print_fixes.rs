//! Drives the engine over an in-memory transport that plays the role of a
//! receiver, printing every decoded position fix.
//!
//! Run with: `cargo run --example print_fixes`

use std::time::Duration;

use tokio::io::{duplex, split, AsyncWriteExt};
use tokio::sync::oneshot;

use gnss_link::{
    link, GnssEngine, NmeaDispatch, NmeaRecord, OwnerId, TaskManager, TimedStream, UbxDispatch,
    UbxFrame, UbxRecord,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gnss_link=debug".into()),
        )
        .init();

    let (local, mut receiver) = duplex(4096);

    // Simulated receiver: an ACK for a config write, then a burst of fixes
    // with some line noise mixed in.
    tokio::spawn(async move {
        receiver
            .write_all(&UbxFrame::new(0x05, 0x01, vec![0x06, 0x01]).encode())
            .await
            .unwrap();
        for wire in [
            b"$GPGLL,4916.45,N,12311.12,W,225444,A*31\r\n".as_slice(),
            &[0x00, 0xFF, 0x00],
            b"$GPGLL,4916.46,N,12311.10,W,225445,A*36\r\n",
            b"$GPGSV,3,1,11,03,03,111,00*74\r\n",
        ] {
            receiver.write_all(wire).await.unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    });

    let (r, w) = split(local);
    let mut engine = GnssEngine::new(TimedStream::new(r, w));

    engine.set_ubx_callback(|class, id, dispatch| match dispatch {
        UbxDispatch::Record(UbxRecord::AckAck(ack)) => {
            println!(
                "receiver acknowledged {:#04x}/{:#04x}",
                ack.class_id, ack.message_id
            );
        }
        UbxDispatch::Record(record) => println!("binary message: {record:?}"),
        UbxDispatch::Unhandled(payload) => {
            println!(
                "unhandled binary {:#04x}/{:#04x} ({} bytes)",
                class,
                id,
                payload.len()
            );
        }
    });

    engine.set_nmea_callback(|talker, id, dispatch| match dispatch {
        NmeaDispatch::Record(NmeaRecord::Gll(fix)) => {
            println!(
                "fix at {} UTC: {:.6}, {:.6}",
                fix.time_utc,
                fix.signed_latitude(),
                fix.signed_longitude()
            );
        }
        NmeaDispatch::Record(record) => println!("sentence: {record:?}"),
        NmeaDispatch::Unhandled(fields) => {
            println!("unhandled sentence {talker}{id} with {} fields", fields.len());
        }
    });

    let manager = TaskManager::new();
    let owner = OwnerId::next();
    let (end_tx, end_rx) = oneshot::channel();
    link::spawn_reader(&manager, owner, engine, move |outcome| {
        let _ = end_tx.send(outcome);
    });

    // Let the session run, then tear it down the way a closing UI would.
    tokio::time::sleep(Duration::from_secs(1)).await;
    manager.cancel_owner(owner);

    let outcome = end_rx.await.expect("reader outcome");
    println!("session over: {outcome:?}");
}
