//! Minimal TLS record inspection: just enough parsing to recognize a
//! ClientHello and pull the SNI out of it. Every length field comes off
//! the wire untrusted; any read past the buffer aborts the walk.

const RECORD_HANDSHAKE: u8 = 0x16;
const HANDSHAKE_CLIENT_HELLO: u8 = 0x01;
const EXT_SERVER_NAME: u16 = 0x0000;

pub fn is_tls_handshake(data: &[u8]) -> bool {
    data.len() >= 6
        && data[0] == RECORD_HANDSHAKE
        && data[1] == 0x03
        && (0x01..=0x03).contains(&data[2])
}

pub fn is_client_hello(data: &[u8]) -> bool {
    is_tls_handshake(data) && data.len() >= 10 && data[5] == HANDSHAKE_CLIENT_HELLO
}

fn read_u16(data: &[u8], pos: usize) -> Option<u16> {
    let bytes = data.get(pos..pos + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Walk a ClientHello and return the first server_name entry of host_name
/// type, with any leading NUL stripped. Returns `None` when the buffer is
/// not a ClientHello or any length field points past the end.
pub fn extract_sni(data: &[u8]) -> Option<&str> {
    if !is_client_hello(data) {
        return None;
    }

    // record header + handshake header
    let mut pos: usize = 5 + 4;

    // protocol version
    pos = pos.checked_add(2).filter(|&p| p <= data.len())?;
    // random
    pos = pos.checked_add(32).filter(|&p| p <= data.len())?;

    let session_id_len = *data.get(pos)? as usize;
    pos = pos.checked_add(1 + session_id_len).filter(|&p| p <= data.len())?;

    let cipher_suites_len = read_u16(data, pos)? as usize;
    pos = pos.checked_add(2 + cipher_suites_len).filter(|&p| p <= data.len())?;

    let compression_len = *data.get(pos)? as usize;
    pos = pos.checked_add(1 + compression_len).filter(|&p| p <= data.len())?;

    let extensions_len = read_u16(data, pos)? as usize;
    pos += 2;

    let end = pos.checked_add(extensions_len)?;
    while pos + 4 <= end && pos + 4 <= data.len() {
        let ext_type = read_u16(data, pos)?;
        let ext_len = read_u16(data, pos + 2)? as usize;
        pos += 4;

        if ext_type == EXT_SERVER_NAME {
            let sni_list_len = read_u16(data, pos)? as usize;
            let list_end = pos + 2 + sni_list_len;
            let mut p = pos + 2;
            while p + 3 <= list_end && p + 3 <= data.len() {
                let name_type = data[p];
                let name_len = read_u16(data, p + 1)? as usize;
                p += 3;
                if name_type == 0x00 {
                    let name = data.get(p..p + name_len)?;
                    let name = std::str::from_utf8(name).ok()?;
                    return Some(name.trim_start_matches('\0'));
                }
                p += name_len;
            }
            return None;
        }

        pos = pos.checked_add(ext_len)?;
    }

    None
}
