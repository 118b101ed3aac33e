//! NMEA 0183 sentence codec.
//!
//! Implements the text sub-protocol sharing the stream with UBX:
//!
//! ```text
//! $ GPGLL,4916.45,N,12311.12,W,225444,A, * 1D \r\n
//! │ └──────────────┬───────────────────┘ │ └┬┘
//! │          interior (checksummed)      │ hex checksum + CRLF
//! └ start delimiter            checksum delimiter
//! ```
//!
//! The checksum is the XOR of every byte between `$` and `*`, exclusive,
//! rendered as two uppercase hex digits. The first comma-separated field is
//! the address: a two-character talker code followed by the sentence code.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{GnssError, Result};
use crate::stream::TimedStream;

/// Sentence start delimiter.
pub const START: u8 = b'$';
/// Checksum delimiter.
pub const CHECKSUM_DELIMITER: u8 = b'*';
/// Maximum sentence length per NMEA 0183, `$` through CRLF inclusive.
pub const MAX_SENTENCE_LEN: usize = 82;

/// Length of the talker code prefixing the address field.
const TALKER_LEN: usize = 2;

/// A decoded NMEA sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// Talker code, e.g. `GP` (GPS), `GN` (combined GNSS).
    pub talker: String,
    /// Sentence code, e.g. `GLL`, `GGA`.
    pub sentence: String,
    /// Data fields, in wire order, commas removed. Empty fields are kept.
    pub fields: Vec<String>,
    /// Checksum byte as carried on the wire.
    pub checksum: u8,
}

impl Sentence {
    /// Build a sentence from parts, computing the checksum.
    pub fn new<T, S>(talker: T, sentence: S, fields: Vec<String>) -> Self
    where
        T: Into<String>,
        S: Into<String>,
    {
        let talker = talker.into();
        let sentence = sentence.into();
        let checksum = xor_checksum(interior(&talker, &sentence, &fields).as_bytes());
        Self {
            talker,
            sentence,
            fields,
            checksum,
        }
    }

    /// The combined address field, e.g. `GPGLL`.
    pub fn address(&self) -> String {
        format!("{}{}", self.talker, self.sentence)
    }

    /// Encode to wire bytes, including delimiters, checksum, and CRLF.
    pub fn encode(&self) -> Vec<u8> {
        let interior = interior(&self.talker, &self.sentence, &self.fields);
        let mut out = Vec::with_capacity(interior.len() + 6);
        out.push(START);
        out.extend_from_slice(interior.as_bytes());
        out.push(CHECKSUM_DELIMITER);
        out.extend_from_slice(format!("{:02X}", xor_checksum(interior.as_bytes())).as_bytes());
        out.extend_from_slice(b"\r\n");
        out
    }
}

/// The checksummed region: address plus comma-joined fields.
fn interior(talker: &str, sentence: &str, fields: &[String]) -> String {
    let mut s = String::with_capacity(8 + fields.len() * 8);
    s.push_str(talker);
    s.push_str(sentence);
    for field in fields {
        s.push(',');
        s.push_str(field);
    }
    s
}

/// XOR-accumulated checksum of `bytes`.
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, &b| acc ^ b)
}

/// Read one complete sentence from the stream.
///
/// Expects the stream to be positioned at `$`. Consumes through the
/// trailing LF on success. Fails with [`GnssError::DelimiterNotFound`] if
/// `$`, `*`, or CRLF are missing within the sentence length bound (an
/// absent checksum is an error, never ignored),
/// [`GnssError::MalformedField`] for a bad address or non-hex checksum
/// digits, [`GnssError::ChecksumMismatch`] when the XOR disagrees, and
/// propagates `Timeout`/`Closed` from the stream.
pub async fn read_sentence<R, W>(stream: &mut TimedStream<R, W>) -> Result<Sentence>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if stream.read_byte().await? != START {
        return Err(GnssError::DelimiterNotFound);
    }

    // Accumulate the interior until the checksum delimiter.
    let mut interior = Vec::with_capacity(MAX_SENTENCE_LEN);
    loop {
        let b = stream.read_byte().await?;
        match b {
            CHECKSUM_DELIMITER => break,
            // A terminator before `*` means the sentence carries no checksum.
            b'\r' | b'\n' => return Err(GnssError::DelimiterNotFound),
            _ => interior.push(b),
        }
        if interior.len() > MAX_SENTENCE_LEN {
            return Err(GnssError::DelimiterNotFound);
        }
    }

    // Two hex digits, then CRLF.
    let mut ck_hex = [0u8; 2];
    stream.read_exact(&mut ck_hex).await?;
    let ck_str = std::str::from_utf8(&ck_hex)
        .map_err(|_| GnssError::MalformedField("non-ASCII checksum digits".into()))?;
    let wire_checksum = u8::from_str_radix(ck_str, 16)
        .map_err(|_| GnssError::MalformedField(format!("invalid checksum digits: {ck_str:?}")))?;

    let mut crlf = [0u8; 2];
    stream.read_exact(&mut crlf).await?;
    if &crlf != b"\r\n" {
        return Err(GnssError::DelimiterNotFound);
    }

    let computed = xor_checksum(&interior);
    if computed != wire_checksum {
        return Err(GnssError::ChecksumMismatch {
            expected: wire_checksum as u16,
            computed: computed as u16,
        });
    }

    let interior = String::from_utf8(interior)
        .map_err(|_| GnssError::MalformedField("sentence is not valid ASCII".into()))?;

    let mut tokens = interior.split(',');
    let address = tokens.next().unwrap_or_default();
    if address.len() < TALKER_LEN + 3 || !address.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(GnssError::MalformedField(format!(
            "invalid address field: {address:?}"
        )));
    }

    let (talker, sentence) = address.split_at(TALKER_LEN);
    let fields: Vec<String> = tokens.map(str::to_owned).collect();

    Ok(Sentence {
        talker: talker.to_owned(),
        sentence: sentence.to_owned(),
        fields,
        checksum: wire_checksum,
    })
}
