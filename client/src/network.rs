use log::debug;
use protocol::{encode_string, read_frame, write_frame, FrameError, Packet};
use std::time::Duration;
use thiserror::Error;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::timeout;

/// Failures of the test client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect: {0}")]
    Connect(#[source] std::io::Error),
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("no packet from server within {0:?}")]
    Timeout(Duration),
    #[error("expected {expected}, got {got:?}")]
    Unexpected { expected: &'static str, got: Packet },
}

/// One framed TCP connection to the server
pub struct Client {
    stream: TcpStream,
    read_timeout: Duration,
}

impl Client {
    /// Opens a TCP connection with a 5 second read timeout
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(ClientError::Connect)?;
        if let Ok(peer) = stream.peer_addr() {
            debug!("Connected to server at {}", peer);
        }

        Ok(Self {
            stream,
            read_timeout: Duration::from_secs(5),
        })
    }

    /// Bounds how long `receive_packet` waits for the next frame
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Sends one already-encoded packet as a frame
    pub async fn send_packet(&mut self, packet: &[u8]) -> Result<(), ClientError> {
        write_frame(&mut self.stream, packet).await?;
        Ok(())
    }

    /// Sends `text` as a string packet
    pub async fn send_text(&mut self, text: &str) -> Result<(), ClientError> {
        self.send_packet(&encode_string(text)).await
    }

    /// Waits for the next frame and decodes it
    pub async fn receive_packet(&mut self) -> Result<Packet, ClientError> {
        let frame = timeout(self.read_timeout, read_frame(&mut self.stream))
            .await
            .map_err(|_| ClientError::Timeout(self.read_timeout))??;
        Ok(Packet::decode(&frame))
    }

    /// Like `receive_packet`, but only accepts a string packet
    pub async fn receive_text(&mut self) -> Result<String, ClientError> {
        match self.receive_packet().await? {
            Packet::Text(body) => Ok(body),
            got => Err(ClientError::Unexpected {
                expected: "string packet",
                got,
            }),
        }
    }
}
