//! Minimal wire-format DNS: a single A-record question out, the first
//! A answer back. Enough for the DoT transport; nothing more.

use std::net::Ipv4Addr;

const FLAGS_RD: [u8; 2] = [0x01, 0x00];
const QTYPE_A: u16 = 1;

/// Build a standard recursion-desired query for an A record.
pub fn build_query(id: u16, hostname: &str) -> Vec<u8> {
    let mut query = Vec::with_capacity(17 + hostname.len());

    query.extend_from_slice(&id.to_be_bytes());
    query.extend_from_slice(&FLAGS_RD);
    // QDCOUNT=1, ANCOUNT/NSCOUNT/ARCOUNT=0
    query.extend_from_slice(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

    for label in hostname.split('.') {
        query.push(label.len() as u8);
        query.extend_from_slice(label.as_bytes());
    }
    query.push(0x00);

    query.extend_from_slice(&QTYPE_A.to_be_bytes());
    query.extend_from_slice(&1u16.to_be_bytes()); // IN

    query
}

fn read_u16(data: &[u8], pos: usize) -> Option<u16> {
    let bytes = data.get(pos..pos + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Walk a response for the first A answer. Names may be literal label
/// sequences or 2-byte compression pointers; everything else is skipped
/// by its declared length.
pub fn parse_response(response: &[u8]) -> Option<Ipv4Addr> {
    // skip header
    let mut pos = 12usize;

    // skip the question name
    while *response.get(pos)? != 0 {
        pos = pos.checked_add(*response.get(pos)? as usize + 1)?;
    }
    // terminator + QTYPE + QCLASS
    pos = pos.checked_add(5)?;

    while pos < response.len() {
        // resource record name
        if *response.get(pos)? & 0xC0 == 0xC0 {
            pos += 2;
        } else {
            while *response.get(pos)? != 0 {
                pos = pos.checked_add(*response.get(pos)? as usize + 1)?;
            }
            pos += 1;
        }

        let record_type = read_u16(response, pos)?;
        // CLASS + TTL
        pos = pos.checked_add(2 + 2 + 4)?;

        let data_len = read_u16(response, pos)? as usize;
        pos += 2;

        if record_type == QTYPE_A && data_len == 4 {
            let octets = response.get(pos..pos + 4)?;
            return Some(Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]));
        }

        pos = pos.checked_add(data_len)?;
    }

    None
}
