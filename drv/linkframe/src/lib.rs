// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Physical-layer framing (component I): `STX`/`ETX` delimiting with `DLE`
//! byte-stuffing and a one's-complement checksum. Pure, `no_std`, and
//! allocation-free — callers supply the output buffer.

#![cfg_attr(not(test), no_std)]

use abi::phys::{DLE, ETX, STX};

/// Returned by [`encode`] when the destination buffer is too small to hold
/// the stuffed frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BufferTooSmall;

/// The outcome of decoding one physical frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DecodeOutcome {
    /// `body` occupies `out[..len]`; checksum verified.
    Ok { len: usize },
    /// The frame did not open with `STX`, or no unescaped `ETX` was found
    /// before the input ran out.
    Malformed,
    /// `ETX` was found but the trailing checksum byte didn't match.
    ChecksumMismatch,
    /// The unstuffed body (plus checksum) didn't fit in `out`.
    BufferTooSmall,
}

fn checksum(bytes: &[u8]) -> u8 {
    !bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

fn needs_stuffing(b: u8) -> bool {
    b == STX || b == ETX || b == DLE
}

/// Encodes `body` as `STX · stuffed(body) · stuffed(checksum) · ETX`,
/// writing into `out` and returning the number of bytes written.
pub fn encode(body: &[u8], out: &mut [u8]) -> Result<usize, BufferTooSmall> {
    let cksum = checksum(body);
    let mut idx = 0;
    let mut put = |out: &mut [u8], idx: &mut usize, b: u8| -> Result<(), BufferTooSmall> {
        if *idx >= out.len() {
            return Err(BufferTooSmall);
        }
        out[*idx] = b;
        *idx += 1;
        Ok(())
    };

    put(out, &mut idx, STX)?;
    for &b in body.iter().chain(core::iter::once(&cksum)) {
        if needs_stuffing(b) {
            put(out, &mut idx, DLE)?;
        }
        put(out, &mut idx, b)?;
    }
    put(out, &mut idx, ETX)?;
    Ok(idx)
}

/// Decodes one physical frame from `wire` (which must begin with `STX`),
/// writing the recovered body (sans checksum) into `out`.
pub fn decode(wire: &[u8], out: &mut [u8]) -> DecodeOutcome {
    let mut input = match wire.split_first() {
        Some((&STX, rest)) => rest.iter(),
        _ => return DecodeOutcome::Malformed,
    };

    let mut unstuffed = [0u8; 128];
    let mut n = 0;
    let mut found_etx = false;
    while let Some(&b) = input.next() {
        let b = if b == DLE {
            match input.next() {
                Some(&literal) => literal,
                None => return DecodeOutcome::Malformed,
            }
        } else if b == ETX {
            found_etx = true;
            break;
        } else {
            b
        };
        if n >= unstuffed.len() {
            return DecodeOutcome::BufferTooSmall;
        }
        unstuffed[n] = b;
        n += 1;
    }
    if !found_etx || n == 0 {
        return DecodeOutcome::Malformed;
    }

    let body = &unstuffed[..n - 1];
    let received_cksum = unstuffed[n - 1];

    if checksum(body) != received_cksum {
        return DecodeOutcome::ChecksumMismatch;
    }
    if body.len() > out.len() {
        return DecodeOutcome::BufferTooSmall;
    }
    out[..body.len()].copy_from_slice(body);
    DecodeOutcome::Ok { len: body.len() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s3_physical_framing() {
        let body = [0x02, 0x10, 0x03, 0x41];
        let mut out = [0u8; 32];
        let n = encode(&body, &mut out).unwrap();
        // 02 10 02 10 10 10 03 41 <ck-stuffed...> 03
        assert_eq!(&out[..8], &[0x02, 0x10, 0x02, 0x10, 0x10, 0x10, 0x03, 0x41]);
        assert_eq!(out[n - 1], ETX);
    }

    #[test]
    fn encode_then_decode_recovers_original_body() {
        for body in [
            &b""[..],
            &b"hi"[..],
            &[0x02, 0x10, 0x03, 0x41][..],
            &[0xFF; 16][..],
        ] {
            let mut wire = [0u8; 64];
            let n = encode(body, &mut wire).unwrap();
            let mut recovered = [0u8; 32];
            match decode(&wire[..n], &mut recovered) {
                DecodeOutcome::Ok { len } => assert_eq!(&recovered[..len], body),
                other => panic!("unexpected decode outcome: {other:?}"),
            }
        }
    }

    #[test]
    fn corrupted_checksum_is_dropped_silently() {
        let body = b"hello";
        let mut wire = [0u8; 32];
        let n = encode(body, &mut wire).unwrap();
        wire[n - 2] ^= 0xFF; // flip a bit in the checksum byte
        let mut recovered = [0u8; 32];
        assert_eq!(decode(&wire[..n], &mut recovered), DecodeOutcome::ChecksumMismatch);
    }

    #[test]
    fn missing_stx_is_malformed() {
        let mut recovered = [0u8; 32];
        assert_eq!(decode(&[0x41, ETX], &mut recovered), DecodeOutcome::Malformed);
    }
}
