//! Protocol module - the two framings multiplexed onto one stream.
//!
//! A GNSS receiver interleaves two independently-framed sub-protocols on a
//! single serial link:
//! - [`ubx`] - the binary command/telemetry protocol (class/id addressed,
//!   length-prefixed, Fletcher checksum)
//! - [`nmea`] - the ASCII sentence protocol (talker/sentence addressed,
//!   comma-delimited, XOR checksum, CRLF terminated)
//!
//! Routing between the two is done by the engine on the first unread byte.

pub mod nmea;
pub mod ubx;

pub use nmea::{read_sentence, Sentence, MAX_SENTENCE_LEN};
pub use ubx::{read_frame, UbxFrame, MAX_UBX_PAYLOAD, SYNC1, SYNC2};
