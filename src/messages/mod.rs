//! Message registry - from validated frames to typed records.
//!
//! The registry maps a decoded (class, id) or (talker, sentence) pair to a
//! typed record constructor. The message set is closed and known at build
//! time, so records are tagged unions and constructors are plain function
//! pointers rather than trait objects.
//!
//! Unregistered ids are not errors: dispatch carries the raw payload or
//! fields as `Unhandled`, so a caller can observe traffic without a
//! registry entry for every id the receiver emits.

mod nmea;
mod ubx;

use std::collections::HashMap;

use bytes::Bytes;

use crate::error::Result;
use crate::protocol::nmea::Sentence;
use crate::protocol::ubx::UbxFrame;

pub use nmea::{decode_gga, decode_gll, decode_rmc, GgaFix, GllFix, RmcFix};
pub use ubx::{
    decode_ack_ack, decode_ack_nak, decode_nav_posllh, NavPosLlh, UbxAck, CLASS_ACK, CLASS_NAV,
    ID_ACK_ACK, ID_ACK_NAK, ID_NAV_POSLLH,
};

/// Talkers the standard sentence set is registered under.
const STANDARD_TALKERS: [&str; 5] = ["GP", "GN", "GL", "GA", "GB"];

/// Typed records for the binary protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum UbxRecord {
    /// ACK-ACK: message accepted.
    AckAck(UbxAck),
    /// ACK-NAK: message rejected.
    AckNak(UbxAck),
    /// NAV-POSLLH: geodetic position solution.
    NavPosLlh(NavPosLlh),
}

/// Typed records for the sentence protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum NmeaRecord {
    /// GLL: geographic position.
    Gll(GllFix),
    /// GGA: fix data.
    Gga(GgaFix),
    /// RMC: recommended minimum data.
    Rmc(RmcFix),
}

/// What the engine hands to the binary callback.
#[derive(Debug, Clone, PartialEq)]
pub enum UbxDispatch {
    /// The id was registered and its payload decoded.
    Record(UbxRecord),
    /// No registry entry for this id; raw payload attached.
    Unhandled(Bytes),
}

/// What the engine hands to the sentence callback.
#[derive(Debug, Clone, PartialEq)]
pub enum NmeaDispatch {
    /// The id was registered and its fields decoded.
    Record(NmeaRecord),
    /// No registry entry for this id; raw fields attached.
    Unhandled(Vec<String>),
}

/// Constructor for a registered binary message.
pub type UbxCtor = fn(&UbxFrame) -> Result<UbxRecord>;
/// Constructor for a registered sentence.
pub type NmeaCtor = fn(&Sentence) -> Result<NmeaRecord>;

/// Registry mapping message ids to typed record constructors.
pub struct MessageRegistry {
    ubx: HashMap<(u8, u8), UbxCtor>,
    nmea: HashMap<(String, String), NmeaCtor>,
}

impl MessageRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            ubx: HashMap::new(),
            nmea: HashMap::new(),
        }
    }

    /// Create a registry with the standard message set: UBX ACK-ACK,
    /// ACK-NAK, and NAV-POSLLH, plus GLL/GGA/RMC for the common talkers.
    pub fn with_standard_messages() -> Self {
        let mut registry = Self::new();

        registry.register_ubx(CLASS_ACK, ID_ACK_ACK, decode_ack_ack);
        registry.register_ubx(CLASS_ACK, ID_ACK_NAK, decode_ack_nak);
        registry.register_ubx(CLASS_NAV, ID_NAV_POSLLH, decode_nav_posllh);

        for talker in STANDARD_TALKERS {
            registry.register_sentence(talker, "GLL", decode_gll);
            registry.register_sentence(talker, "GGA", decode_gga);
            registry.register_sentence(talker, "RMC", decode_rmc);
        }

        registry
    }

    /// Register a binary message constructor for (class, id).
    pub fn register_ubx(&mut self, class_id: u8, message_id: u8, ctor: UbxCtor) {
        self.ubx.insert((class_id, message_id), ctor);
    }

    /// Register a sentence constructor for (talker, sentence).
    pub fn register_sentence(&mut self, talker: &str, sentence: &str, ctor: NmeaCtor) {
        self.nmea
            .insert((talker.to_owned(), sentence.to_owned()), ctor);
    }

    /// Look up the constructor for a binary (class, id), if registered.
    pub fn resolve_binary(&self, class_id: u8, message_id: u8) -> Option<UbxCtor> {
        self.ubx.get(&(class_id, message_id)).copied()
    }

    /// Look up the constructor for a (talker, sentence) pair, if registered.
    pub fn resolve_sentence(&self, talker: &str, sentence: &str) -> Option<NmeaCtor> {
        self.nmea
            .get(&(talker.to_owned(), sentence.to_owned()))
            .copied()
    }
}

impl Default for MessageRegistry {
    fn default() -> Self {
        Self::with_standard_messages()
    }
}
