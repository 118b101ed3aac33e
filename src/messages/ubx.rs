//! Typed UBX records and their constructors.
//!
//! Constructors take a checksum-validated [`UbxFrame`] and parse its
//! little-endian payload, failing with [`GnssError::PayloadDecode`] when
//! the payload length does not match the registered (class, id).

use serde::{Deserialize, Serialize};

use super::UbxRecord;
use crate::error::{GnssError, Result};
use crate::protocol::ubx::UbxFrame;

/// ACK message class.
pub const CLASS_ACK: u8 = 0x05;
/// ACK-NAK message id.
pub const ID_ACK_NAK: u8 = 0x00;
/// ACK-ACK message id.
pub const ID_ACK_ACK: u8 = 0x01;

/// NAV message class.
pub const CLASS_NAV: u8 = 0x01;
/// NAV-POSLLH message id.
pub const ID_NAV_POSLLH: u8 = 0x02;

/// Acknowledgement payload: the (class, id) of the message being
/// acknowledged or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UbxAck {
    /// Class of the acknowledged message.
    pub class_id: u8,
    /// Id of the acknowledged message.
    pub message_id: u8,
}

/// Geodetic position solution (NAV-POSLLH).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavPosLlh {
    /// GPS time of week, milliseconds.
    pub itow_ms: u32,
    /// Longitude, degrees scaled by 1e7.
    pub lon_1e7: i32,
    /// Latitude, degrees scaled by 1e7.
    pub lat_1e7: i32,
    /// Height above ellipsoid, millimetres.
    pub height_mm: i32,
    /// Height above mean sea level, millimetres.
    pub hmsl_mm: i32,
    /// Horizontal accuracy estimate, millimetres.
    pub h_acc_mm: u32,
    /// Vertical accuracy estimate, millimetres.
    pub v_acc_mm: u32,
}

impl NavPosLlh {
    /// Longitude in decimal degrees.
    pub fn lon_deg(&self) -> f64 {
        self.lon_1e7 as f64 * 1e-7
    }

    /// Latitude in decimal degrees.
    pub fn lat_deg(&self) -> f64 {
        self.lat_1e7 as f64 * 1e-7
    }
}

/// Construct an ACK-ACK record (2-byte payload).
pub fn decode_ack_ack(frame: &UbxFrame) -> Result<UbxRecord> {
    let ack = decode_ack_payload(frame, "ACK-ACK")?;
    Ok(UbxRecord::AckAck(ack))
}

/// Construct an ACK-NAK record (2-byte payload).
pub fn decode_ack_nak(frame: &UbxFrame) -> Result<UbxRecord> {
    let ack = decode_ack_payload(frame, "ACK-NAK")?;
    Ok(UbxRecord::AckNak(ack))
}

fn decode_ack_payload(frame: &UbxFrame, what: &str) -> Result<UbxAck> {
    let payload: &[u8; 2] = frame
        .payload
        .as_ref()
        .try_into()
        .map_err(|_| shape_error(what, 2, frame.payload.len()))?;
    Ok(UbxAck {
        class_id: payload[0],
        message_id: payload[1],
    })
}

/// Construct a NAV-POSLLH record (28-byte payload).
pub fn decode_nav_posllh(frame: &UbxFrame) -> Result<UbxRecord> {
    let p = &frame.payload;
    if p.len() != 28 {
        return Err(shape_error("NAV-POSLLH", 28, p.len()));
    }
    Ok(UbxRecord::NavPosLlh(NavPosLlh {
        itow_ms: u32::from_le_bytes(p[0..4].try_into().unwrap()),
        lon_1e7: i32::from_le_bytes(p[4..8].try_into().unwrap()),
        lat_1e7: i32::from_le_bytes(p[8..12].try_into().unwrap()),
        height_mm: i32::from_le_bytes(p[12..16].try_into().unwrap()),
        hmsl_mm: i32::from_le_bytes(p[16..20].try_into().unwrap()),
        h_acc_mm: u32::from_le_bytes(p[20..24].try_into().unwrap()),
        v_acc_mm: u32::from_le_bytes(p[24..28].try_into().unwrap()),
    }))
}

fn shape_error(what: &str, want: usize, got: usize) -> GnssError {
    GnssError::PayloadDecode(format!("{what}: expected {want} payload bytes, got {got}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ack_ack() {
        let frame = UbxFrame::new(CLASS_ACK, ID_ACK_ACK, vec![0x06, 0x01]);
        let UbxRecord::AckAck(ack) = decode_ack_ack(&frame).unwrap() else {
            panic!("expected ACK-ACK record");
        };
        assert_eq!(ack.class_id, 0x06);
        assert_eq!(ack.message_id, 0x01);
    }

    #[test]
    fn test_decode_ack_wrong_length() {
        let frame = UbxFrame::new(CLASS_ACK, ID_ACK_ACK, vec![0x06]);
        assert!(matches!(
            decode_ack_ack(&frame).unwrap_err(),
            GnssError::PayloadDecode(_)
        ));
    }

    #[test]
    fn test_decode_nav_posllh() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1000u32.to_le_bytes()); // itow
        payload.extend_from_slice(&(-1_231_853_330i32).to_le_bytes()); // lon
        payload.extend_from_slice(&492_741_660i32.to_le_bytes()); // lat
        payload.extend_from_slice(&52_000i32.to_le_bytes()); // height
        payload.extend_from_slice(&31_000i32.to_le_bytes()); // hmsl
        payload.extend_from_slice(&2_500u32.to_le_bytes()); // hAcc
        payload.extend_from_slice(&3_200u32.to_le_bytes()); // vAcc

        let frame = UbxFrame::new(CLASS_NAV, ID_NAV_POSLLH, payload);
        let UbxRecord::NavPosLlh(pos) = decode_nav_posllh(&frame).unwrap() else {
            panic!("expected NAV-POSLLH record");
        };

        assert_eq!(pos.itow_ms, 1000);
        assert!((pos.lat_deg() - 49.274166).abs() < 1e-6);
        assert!((pos.lon_deg() + 123.185333).abs() < 1e-6);
        assert_eq!(pos.hmsl_mm, 31_000);
    }

    #[test]
    fn test_decode_nav_posllh_wrong_length() {
        let frame = UbxFrame::new(CLASS_NAV, ID_NAV_POSLLH, vec![0u8; 4]);
        assert!(matches!(
            decode_nav_posllh(&frame).unwrap_err(),
            GnssError::PayloadDecode(_)
        ));
    }
}
