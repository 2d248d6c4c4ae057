//! Length-prefixed framing over a byte stream
//!
//! A frame is a 4-byte little-endian length followed by exactly that many
//! payload bytes. One frame carries one packet. Both helpers are generic over
//! tokio's async IO traits so they work with socket halves as well as
//! in-memory buffers.

use crate::error::FrameError;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest accepted frame payload (1 MiB)
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Reads one frame and returns its payload.
///
/// Returns `FrameError::Closed` if the stream ends while the length prefix is
/// being read and `FrameError::Oversized` if the prefix exceeds
/// `MAX_FRAME_LEN`. A stream that ends mid-payload surfaces as an
/// `UnexpectedEof` IO error.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut len_buf).await {
        return Err(match e.kind() {
            io::ErrorKind::UnexpectedEof => FrameError::Closed,
            _ => FrameError::Io(e),
        });
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(FrameError::Oversized {
            len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Writes the length prefix followed by the payload and flushes the writer
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(FrameError::Oversized {
            len: payload.len(),
            max: MAX_FRAME_LEN,
        });
    }

    writer
        .write_all(&(payload.len() as u32).to_le_bytes())
        .await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    async fn roundtrip(payload: &[u8]) -> Vec<u8> {
        let mut wire = Vec::new();
        write_frame(&mut wire, payload).await.unwrap();
        assert_eq!(wire.len(), payload.len() + 4);

        let mut reader = &wire[..];
        read_frame(&mut reader).await.unwrap()
    }

    #[tokio::test]
    async fn test_roundtrip_boundary_sizes() {
        assert!(roundtrip(&[]).await.is_empty());
        assert_eq!(roundtrip(&[0x42]).await, vec![0x42]);

        let max: Vec<u8> = (0..MAX_FRAME_LEN).map(|i| (i % 251) as u8).collect();
        assert_eq!(roundtrip(&max).await, max);
    }

    #[tokio::test]
    async fn test_prefix_is_little_endian() {
        let mut writer = Builder::new()
            .write(&[3, 0, 0, 0])
            .write(b"abc")
            .build();
        write_frame(&mut writer, b"abc").await.unwrap();
    }

    #[tokio::test]
    async fn test_reads_payload_split_across_segments() {
        let mut reader = Builder::new()
            .read(&[5, 0])
            .read(&[0, 0, b'h', b'e'])
            .read(b"llo")
            .build();
        assert_eq!(read_frame(&mut reader).await.unwrap(), b"hello".to_vec());
    }

    #[tokio::test]
    async fn test_multiple_frames_in_sequence() {
        let mut wire = Vec::new();
        for payload in [&b"first"[..], &b"second"[..], &b"third"[..]] {
            write_frame(&mut wire, payload).await.unwrap();
        }

        let mut reader = &wire[..];
        assert_eq!(read_frame(&mut reader).await.unwrap(), b"first".to_vec());
        assert_eq!(read_frame(&mut reader).await.unwrap(), b"second".to_vec());
        assert_eq!(read_frame(&mut reader).await.unwrap(), b"third".to_vec());
        assert!(matches!(read_frame(&mut reader).await, Err(FrameError::Closed)));
    }

    #[tokio::test]
    async fn test_rejects_oversized_prefix() {
        let prefix = ((MAX_FRAME_LEN + 1) as u32).to_le_bytes();
        let mut reader = Builder::new().read(&prefix).build();

        match read_frame(&mut reader).await {
            Err(FrameError::Oversized { len, max }) => {
                assert_eq!(len, MAX_FRAME_LEN + 1);
                assert_eq!(max, MAX_FRAME_LEN);
            }
            other => panic!("Expected oversized error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejects_oversized_write() {
        let payload = vec![0u8; MAX_FRAME_LEN + 1];
        let mut wire = Vec::new();
        assert!(matches!(
            write_frame(&mut wire, &payload).await,
            Err(FrameError::Oversized { .. })
        ));
        assert!(wire.is_empty());
    }

    #[tokio::test]
    async fn test_empty_stream_is_closed() {
        let mut reader: &[u8] = &[];
        assert!(matches!(read_frame(&mut reader).await, Err(FrameError::Closed)));
    }

    #[tokio::test]
    async fn test_partial_prefix_is_closed() {
        let mut reader: &[u8] = &[4, 0];
        assert!(matches!(read_frame(&mut reader).await, Err(FrameError::Closed)));
    }

    #[tokio::test]
    async fn test_truncated_payload_is_io_error() {
        let mut reader: &[u8] = &[4, 0, 0, 0, 1, 2];
        match read_frame(&mut reader).await {
            Err(FrameError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("Expected io error, got {:?}", other),
        }
    }
}
