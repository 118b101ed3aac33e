//! Typed NMEA records and their constructors.
//!
//! Each constructor takes a checksum-validated [`Sentence`] and produces a
//! typed record, failing with [`GnssError::PayloadDecode`] when the field
//! layout does not match the sentence id. Coordinates arrive as
//! `ddmm.mmmm` / `dddmm.mmmm` and are converted to unsigned decimal
//! degrees; the hemisphere indicator is kept alongside as on the wire.

use serde::{Deserialize, Serialize};

use super::NmeaRecord;
use crate::error::{GnssError, Result};
use crate::protocol::nmea::Sentence;

/// Geographic position from a GLL sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GllFix {
    /// Latitude in decimal degrees, unsigned.
    pub latitude: f64,
    /// Hemisphere indicator, `N` or `S`.
    pub ns: char,
    /// Longitude in decimal degrees, unsigned.
    pub longitude: f64,
    /// Hemisphere indicator, `E` or `W`.
    pub ew: char,
    /// UTC time of the fix, `hhmmss[.sss]`, as transmitted.
    pub time_utc: String,
    /// Whether the receiver flagged the fix as valid (`A`).
    pub valid: bool,
}

impl GllFix {
    /// Latitude with the hemisphere applied (south negative).
    pub fn signed_latitude(&self) -> f64 {
        if self.ns == 'S' {
            -self.latitude
        } else {
            self.latitude
        }
    }

    /// Longitude with the hemisphere applied (west negative).
    pub fn signed_longitude(&self) -> f64 {
        if self.ew == 'W' {
            -self.longitude
        } else {
            self.longitude
        }
    }
}

/// Fix data from a GGA sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GgaFix {
    /// UTC time of the fix, as transmitted.
    pub time_utc: String,
    /// Latitude in decimal degrees, unsigned.
    pub latitude: f64,
    /// Hemisphere indicator, `N` or `S`.
    pub ns: char,
    /// Longitude in decimal degrees, unsigned.
    pub longitude: f64,
    /// Hemisphere indicator, `E` or `W`.
    pub ew: char,
    /// Fix quality (0 = no fix, 1 = GPS, 2 = differential, ...).
    pub quality: u8,
    /// Number of satellites in use.
    pub satellites: u8,
    /// Horizontal dilution of precision, if transmitted.
    pub hdop: Option<f64>,
    /// Antenna altitude above mean sea level, metres, if transmitted.
    pub altitude_m: Option<f64>,
}

/// Recommended minimum data from an RMC sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RmcFix {
    /// UTC time of the fix, as transmitted.
    pub time_utc: String,
    /// Whether the receiver flagged the fix as valid (`A`).
    pub valid: bool,
    /// Latitude in decimal degrees, unsigned.
    pub latitude: f64,
    /// Hemisphere indicator, `N` or `S`.
    pub ns: char,
    /// Longitude in decimal degrees, unsigned.
    pub longitude: f64,
    /// Hemisphere indicator, `E` or `W`.
    pub ew: char,
    /// Speed over ground in knots, if transmitted.
    pub speed_knots: Option<f64>,
    /// Course over ground in degrees true, if transmitted.
    pub course_deg: Option<f64>,
    /// Date of the fix, `ddmmyy`, as transmitted.
    pub date: String,
}

/// Construct a [`GllFix`] from a validated sentence.
///
/// Field layout: lat, N/S, lon, E/W, time, status, [mode].
pub fn decode_gll(s: &Sentence) -> Result<NmeaRecord> {
    if s.fields.len() < 6 {
        return Err(shape_error("GLL", 6, s.fields.len()));
    }
    Ok(NmeaRecord::Gll(GllFix {
        latitude: parse_angle(field(s, 0)?)?,
        ns: hemisphere(field(s, 1)?, &['N', 'S'])?,
        longitude: parse_angle(field(s, 2)?)?,
        ew: hemisphere(field(s, 3)?, &['E', 'W'])?,
        time_utc: field(s, 4)?.to_owned(),
        valid: field(s, 5)? == "A",
    }))
}

/// Construct a [`GgaFix`] from a validated sentence.
///
/// Field layout: time, lat, N/S, lon, E/W, quality, sats, hdop, alt, ...
pub fn decode_gga(s: &Sentence) -> Result<NmeaRecord> {
    if s.fields.len() < 9 {
        return Err(shape_error("GGA", 9, s.fields.len()));
    }
    Ok(NmeaRecord::Gga(GgaFix {
        time_utc: field(s, 0)?.to_owned(),
        latitude: parse_angle(field(s, 1)?)?,
        ns: hemisphere(field(s, 2)?, &['N', 'S'])?,
        longitude: parse_angle(field(s, 3)?)?,
        ew: hemisphere(field(s, 4)?, &['E', 'W'])?,
        quality: required_num(field(s, 5)?, "fix quality")?,
        satellites: required_num(field(s, 6)?, "satellite count")?,
        hdop: optional_f64(field(s, 7)?)?,
        altitude_m: optional_f64(field(s, 8)?)?,
    }))
}

/// Construct an [`RmcFix`] from a validated sentence.
///
/// Field layout: time, status, lat, N/S, lon, E/W, speed, course, date, ...
pub fn decode_rmc(s: &Sentence) -> Result<NmeaRecord> {
    if s.fields.len() < 9 {
        return Err(shape_error("RMC", 9, s.fields.len()));
    }
    Ok(NmeaRecord::Rmc(RmcFix {
        time_utc: field(s, 0)?.to_owned(),
        valid: field(s, 1)? == "A",
        latitude: parse_angle(field(s, 2)?)?,
        ns: hemisphere(field(s, 3)?, &['N', 'S'])?,
        longitude: parse_angle(field(s, 4)?)?,
        ew: hemisphere(field(s, 5)?, &['E', 'W'])?,
        speed_knots: optional_f64(field(s, 6)?)?,
        course_deg: optional_f64(field(s, 7)?)?,
        date: field(s, 8)?.to_owned(),
    }))
}

/// Convert a `[d]ddmm.mmmm` angle field to unsigned decimal degrees.
fn parse_angle(raw: &str) -> Result<f64> {
    let dot = raw.find('.').unwrap_or(raw.len());
    if dot < 3 || !raw.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return Err(GnssError::PayloadDecode(format!(
            "invalid coordinate field: {raw:?}"
        )));
    }
    let degrees: f64 = raw[..dot - 2]
        .parse()
        .map_err(|_| GnssError::PayloadDecode(format!("invalid coordinate field: {raw:?}")))?;
    let minutes: f64 = raw[dot - 2..]
        .parse()
        .map_err(|_| GnssError::PayloadDecode(format!("invalid coordinate field: {raw:?}")))?;
    Ok(degrees + minutes / 60.0)
}

fn field<'a>(s: &'a Sentence, index: usize) -> Result<&'a str> {
    s.fields
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| GnssError::PayloadDecode(format!("missing field {index}")))
}

fn hemisphere(raw: &str, allowed: &[char]) -> Result<char> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if allowed.contains(&c) => Ok(c),
        _ => Err(GnssError::PayloadDecode(format!(
            "invalid hemisphere indicator: {raw:?}"
        ))),
    }
}

fn required_num<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| GnssError::PayloadDecode(format!("invalid {what}: {raw:?}")))
}

fn optional_f64(raw: &str) -> Result<Option<f64>> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| GnssError::PayloadDecode(format!("invalid numeric field: {raw:?}")))
}

fn shape_error(id: &str, want: usize, got: usize) -> GnssError {
    GnssError::PayloadDecode(format!("{id}: expected at least {want} fields, got {got}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(id: &str, fields: &[&str]) -> Sentence {
        Sentence::new("GP", id, fields.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_parse_angle() {
        // 49 degrees 16.45 minutes
        let lat = parse_angle("4916.45").unwrap();
        assert!((lat - 49.274166).abs() < 1e-5);

        // 123 degrees 11.12 minutes
        let lon = parse_angle("12311.12").unwrap();
        assert!((lon - 123.185333).abs() < 1e-5);

        assert!(parse_angle("").is_err());
        assert!(parse_angle("12").is_err());
        assert!(parse_angle("49N6.45").is_err());
    }

    #[test]
    fn test_decode_gll() {
        let s = sentence("GLL", &["4916.45", "N", "12311.12", "W", "225444", "A"]);
        let NmeaRecord::Gll(fix) = decode_gll(&s).unwrap() else {
            panic!("expected GLL record");
        };

        assert!((fix.latitude - 49.274166).abs() < 1e-5);
        assert_eq!(fix.ns, 'N');
        assert!((fix.longitude - 123.185333).abs() < 1e-5);
        assert_eq!(fix.ew, 'W');
        assert_eq!(fix.time_utc, "225444");
        assert!(fix.valid);

        assert!(fix.signed_latitude() > 0.0);
        assert!(fix.signed_longitude() < 0.0);
    }

    #[test]
    fn test_decode_gll_wrong_shape() {
        let s = sentence("GLL", &["4916.45", "N"]);
        let err = decode_gll(&s).unwrap_err();
        assert!(matches!(err, GnssError::PayloadDecode(_)));
    }

    #[test]
    fn test_decode_gll_bad_hemisphere() {
        let s = sentence("GLL", &["4916.45", "Q", "12311.12", "W", "225444", "A"]);
        assert!(matches!(
            decode_gll(&s).unwrap_err(),
            GnssError::PayloadDecode(_)
        ));
    }

    #[test]
    fn test_decode_gga() {
        let s = sentence(
            "GGA",
            &[
                "092750.000",
                "5321.6802",
                "N",
                "00630.3372",
                "W",
                "1",
                "8",
                "1.03",
                "61.7",
                "M",
                "55.2",
                "M",
                "",
                "",
            ],
        );
        let NmeaRecord::Gga(fix) = decode_gga(&s).unwrap() else {
            panic!("expected GGA record");
        };

        assert_eq!(fix.quality, 1);
        assert_eq!(fix.satellites, 8);
        assert_eq!(fix.hdop, Some(1.03));
        assert_eq!(fix.altitude_m, Some(61.7));
        assert!((fix.latitude - 53.361336).abs() < 1e-5);
    }

    #[test]
    fn test_decode_rmc_with_empty_optionals() {
        let s = sentence(
            "RMC",
            &[
                "123519", "A", "4807.038", "N", "01131.000", "E", "", "", "230394",
            ],
        );
        let NmeaRecord::Rmc(fix) = decode_rmc(&s).unwrap() else {
            panic!("expected RMC record");
        };

        assert!(fix.valid);
        assert_eq!(fix.speed_knots, None);
        assert_eq!(fix.course_deg, None);
        assert_eq!(fix.date, "230394");
    }

    #[test]
    fn test_non_numeric_where_numeric_expected() {
        let s = sentence(
            "GGA",
            &[
                "092750", "5321.68", "N", "00630.33", "W", "one", "8", "", "",
            ],
        );
        assert!(matches!(
            decode_gga(&s).unwrap_err(),
            GnssError::PayloadDecode(_)
        ));
    }
}
