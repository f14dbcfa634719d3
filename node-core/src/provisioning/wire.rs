//! Wire decoding for the control payloads.
//!
//! Provisioning payloads carry a leading type byte followed by stage-specific
//! fields; update triggers carry exactly three identity bytes. Trailing bytes
//! beyond a stage's fields are tolerated, since senders may pad frames to a
//! fixed length.

use core::fmt;

use winnow::Parser;
use winnow::binary::u8 as byte;
use winnow::combinator::{dispatch, fail};
use winnow::error::{EmptyError, ModalResult};
use winnow::token::{rest, take};

/// Start-of-transfer type byte.
pub const TYPE_START: u8 = 0x01;
/// Ssid fragment type byte.
pub const TYPE_SSID_CHUNK: u8 = 0x02;
/// Password fragment type byte.
pub const TYPE_PASSWORD_CHUNK: u8 = 0x03;
/// Commit type byte.
pub const TYPE_COMMIT: u8 = 0x04;

const KNOWN_TYPES: [u8; 4] = [TYPE_START, TYPE_SSID_CHUNK, TYPE_PASSWORD_CHUNK, TYPE_COMMIT];

/// Length of an update-trigger identity fragment.
pub const TRIGGER_FRAGMENT_LEN: usize = 3;

/// One decoded provisioning stage.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ProvisioningMessage<'a> {
    Start { ssid_len: u8, password_len: u8 },
    SsidChunk(&'a [u8]),
    PasswordChunk(&'a [u8]),
    Commit { checksum: u8 },
}

/// Errors raised while decoding a control payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DecodeError {
    /// Leading type byte is not part of the sub-protocol.
    UnknownType(u8),
    /// Payload ends before the stage's fields are complete.
    Truncated,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnknownType(kind) => write!(f, "unknown control type 0x{kind:02X}"),
            DecodeError::Truncated => f.write_str("truncated control payload"),
        }
    }
}

type WireResult<T> = ModalResult<T, EmptyError>;

fn message<'a>(input: &mut &'a [u8]) -> WireResult<ProvisioningMessage<'a>> {
    dispatch!(byte;
        TYPE_START => (byte, byte).map(|(ssid_len, password_len)| ProvisioningMessage::Start {
            ssid_len,
            password_len,
        }),
        TYPE_SSID_CHUNK => rest.map(ProvisioningMessage::SsidChunk),
        TYPE_PASSWORD_CHUNK => rest.map(ProvisioningMessage::PasswordChunk),
        TYPE_COMMIT => byte.map(|checksum| ProvisioningMessage::Commit { checksum }),
        _ => fail,
    )
    .parse_next(input)
}

fn trigger(input: &mut &[u8]) -> WireResult<[u8; TRIGGER_FRAGMENT_LEN]> {
    take(TRIGGER_FRAGMENT_LEN)
        .map(|bytes: &[u8]| [bytes[0], bytes[1], bytes[2]])
        .parse_next(input)
}

/// Decodes one provisioning payload.
///
/// # Errors
///
/// Returns [`DecodeError::UnknownType`] for an unrecognized type byte and
/// [`DecodeError::Truncated`] when the stage's fields are incomplete.
pub fn decode_provisioning(payload: &[u8]) -> Result<ProvisioningMessage<'_>, DecodeError> {
    let mut input = payload;
    if let Ok(message) = message.parse_next(&mut input) {
        return Ok(message);
    }
    match payload.first() {
        Some(&kind) if !KNOWN_TYPES.contains(&kind) => Err(DecodeError::UnknownType(kind)),
        _ => Err(DecodeError::Truncated),
    }
}

/// Decodes an update-trigger payload into its identity fragment.
///
/// # Errors
///
/// Returns [`DecodeError::Truncated`] when fewer than three bytes arrive.
pub fn decode_update_trigger(payload: &[u8]) -> Result<[u8; TRIGGER_FRAGMENT_LEN], DecodeError> {
    let mut input = payload;
    trigger
        .parse_next(&mut input)
        .map_err(|_| DecodeError::Truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_payload_decodes_both_lengths() {
        assert_eq!(
            decode_provisioning(&[TYPE_START, 3, 8]),
            Ok(ProvisioningMessage::Start {
                ssid_len: 3,
                password_len: 8,
            })
        );
    }

    #[test]
    fn chunk_payloads_expose_the_fragment() {
        assert_eq!(
            decode_provisioning(&[TYPE_SSID_CHUNK, b'N', b'E', b'T']),
            Ok(ProvisioningMessage::SsidChunk(b"NET"))
        );
        assert_eq!(
            decode_provisioning(&[TYPE_PASSWORD_CHUNK]),
            Ok(ProvisioningMessage::PasswordChunk(b""))
        );
    }

    #[test]
    fn commit_payload_decodes_the_checksum() {
        assert_eq!(
            decode_provisioning(&[TYPE_COMMIT, 0x5A]),
            Ok(ProvisioningMessage::Commit { checksum: 0x5A })
        );
    }

    #[test]
    fn trailing_padding_is_tolerated() {
        assert_eq!(
            decode_provisioning(&[TYPE_START, 3, 8, 0, 0, 0]),
            Ok(ProvisioningMessage::Start {
                ssid_len: 3,
                password_len: 8,
            })
        );
    }

    #[test]
    fn unknown_type_and_truncation_are_distinguished() {
        assert_eq!(
            decode_provisioning(&[0x09, 1, 2]),
            Err(DecodeError::UnknownType(0x09))
        );
        assert_eq!(
            decode_provisioning(&[TYPE_START, 3]),
            Err(DecodeError::Truncated)
        );
        assert_eq!(decode_provisioning(&[]), Err(DecodeError::Truncated));
    }

    #[test]
    fn trigger_needs_exactly_three_bytes() {
        assert_eq!(decode_update_trigger(&[0xAB, 0xCD, 0xEF]), Ok([0xAB, 0xCD, 0xEF]));
        assert_eq!(
            decode_update_trigger(&[0xAB, 0xCD]),
            Err(DecodeError::Truncated)
        );
        // Longer payloads are tolerated; the fragment is the first three.
        assert_eq!(
            decode_update_trigger(&[1, 2, 3, 4]),
            Ok([1, 2, 3])
        );
    }
}
