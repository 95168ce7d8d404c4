mod fragment;
mod inspect;

pub use fragment::{Fragment, Fragmenter};
pub use inspect::{extract_sni, is_client_hello, is_tls_handshake};
