pub mod alerts;
pub mod handshake;

pub use alerts::AlertService;
pub use handshake::HandshakeClient;
