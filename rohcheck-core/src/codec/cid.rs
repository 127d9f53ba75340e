//! Context identifier encoding for small and large CIDs

use crate::constants::rohc::{ADD_CID, PADDING};
use crate::types::CidMode;
use bytes::{BufMut, BytesMut};

/// Add-CID octet for a non-zero small CID
pub const fn add_cid_octet(cid: u16) -> u8 {
    ADD_CID | (cid as u8 & 0x0F)
}

/// Whether `byte` is an Add-CID octet carrying a non-zero CID
pub const fn is_add_cid(byte: u8) -> bool {
    byte & 0xF0 == ADD_CID && byte != PADDING
}

/// Write `cid` as a self-describing variable-length value (1 or 2 octets)
pub fn put_large_cid(buf: &mut BytesMut, cid: u16) {
    if cid < 0x80 {
        buf.put_u8(cid as u8);
    } else {
        buf.put_u8(0x80 | ((cid >> 8) as u8 & 0x3F));
        buf.put_u8(cid as u8);
    }
}

/// Read a large CID, returning the CID and the number of octets used
pub fn read_large_cid(data: &[u8]) -> Option<(u16, usize)> {
    let first = *data.first()?;
    if first & 0x80 == 0 {
        Some((first as u16, 1))
    } else if first & 0xC0 == 0x80 {
        let second = *data.get(1)?;
        Some((((first as u16 & 0x3F) << 8) | second as u16, 2))
    } else {
        None
    }
}

/// Encode a feedback element acknowledging `cid`
pub fn feedback_element(cid_mode: CidMode, cid: u16, payload: u8) -> BytesMut {
    let mut buf = BytesMut::with_capacity(3);
    match cid_mode {
        CidMode::Small if cid != 0 => buf.put_u8(add_cid_octet(cid)),
        CidMode::Small => {}
        CidMode::Large => put_large_cid(&mut buf, cid),
    }
    buf.put_u8(payload);
    buf
}

/// Split a feedback element into its CID and feedback data
pub fn parse_feedback_element(cid_mode: CidMode, element: &[u8]) -> Option<(u16, &[u8])> {
    match cid_mode {
        CidMode::Small => match element.first() {
            Some(&b) if is_add_cid(b) => Some(((b & 0x0F) as u16, &element[1..])),
            Some(_) => Some((0, element)),
            None => None,
        },
        CidMode::Large => {
            let (cid, used) = read_large_cid(element)?;
            Some((cid, &element[used..]))
        }
    }
}
