//! # gnss-link
//!
//! Protocol engine for GNSS receivers that interleave the UBX binary
//! protocol and NMEA 0183 sentences on a single serial byte stream (for
//! example a u-blox receiver behind a Bluetooth serial link).
//!
//! ## Architecture
//!
//! - **Stream**: [`TimedStream`] bounds every read so a silent peer can
//!   never hang the worker
//! - **Decoders**: [`protocol::ubx`] and [`protocol::nmea`] each recognize
//!   and consume one complete frame, validating structure and checksum
//! - **Registry**: [`MessageRegistry`] turns validated frames into typed
//!   records; unregistered ids surface raw
//! - **Engine**: [`GnssEngine::step`] runs one decode-and-dispatch cycle,
//!   invoking the registered callbacks synchronously in stream order
//! - **Tasks**: [`TaskManager`] runs the read loop (and connection setup)
//!   off the foreground context, cancelable by owner and by category
//!
//! ## Example
//!
//! ```ignore
//! use gnss_link::{GnssEngine, NmeaDispatch, NmeaRecord, TimedStream};
//! use gnss_link::{link, OwnerId, TaskManager};
//!
//! let stream = TimedStream::new(reader, writer);
//! let mut engine = GnssEngine::new(stream);
//! engine.set_nmea_callback(|talker, id, dispatch| {
//!     if let NmeaDispatch::Record(NmeaRecord::Gll(fix)) = dispatch {
//!         println!("{}{}: {} {}", talker, id, fix.latitude, fix.longitude);
//!     }
//! });
//!
//! let manager = TaskManager::new();
//! let owner = OwnerId::next();
//! link::spawn_reader(&manager, owner, engine, |outcome| {
//!     println!("reader finished: {:?}", outcome);
//! });
//!
//! // Tear everything down when the owning surface goes away:
//! manager.cancel_owner(owner);
//! ```

pub mod engine;
pub mod error;
pub mod link;
pub mod messages;
pub mod protocol;
pub mod stream;
pub mod task;

pub use engine::{GnssEngine, MAX_RESYNC_SCAN};
pub use error::{GnssError, Result};
pub use messages::{
    GgaFix, GllFix, MessageRegistry, NavPosLlh, NmeaDispatch, NmeaRecord, RmcFix, UbxAck,
    UbxDispatch, UbxRecord,
};
pub use protocol::{Sentence, UbxFrame};
pub use stream::{TimedStream, DEFAULT_READ_TIMEOUT};
pub use task::{OwnerId, TaskCategory, TaskId, TaskManager, TaskOutcome, TaskState};
