//! First-bytes protocol identification. Detectors run in a fixed order;
//! the first match wins, and an unmatched connection is closed.

const HTTP_METHODS: [&[u8]; 8] = [
    b"GET ", b"POST ", b"PUT ", b"DELETE ", b"HEAD ", b"CONNECT ", b"OPTIONS ", b"PATCH ",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Socks5,
    WebSocket,
}

impl Protocol {
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Http => "HTTP",
            Protocol::Socks5 => "SOCKS5",
            Protocol::WebSocket => "WebSocket",
        }
    }
}

fn is_ws_upgrade(first_bytes: &[u8]) -> bool {
    let text = String::from_utf8_lossy(first_bytes).to_ascii_lowercase();
    text.contains("upgrade: websocket")
}

/// Order is HTTP, SOCKS5, WebSocket. An HTTP request carrying a
/// `Upgrade: websocket` header is left for the WebSocket detector, which
/// runs the tunnel handshake instead of the plain forward path.
pub fn detect(first_bytes: &[u8]) -> Option<Protocol> {
    let upgrade = is_ws_upgrade(first_bytes);

    if HTTP_METHODS.iter().any(|m| first_bytes.starts_with(m)) && !upgrade {
        return Some(Protocol::Http);
    }
    if first_bytes.len() >= 2 && first_bytes[0] == 0x05 {
        return Some(Protocol::Socks5);
    }
    if upgrade {
        return Some(Protocol::WebSocket);
    }
    None
}
