//! Wire format and framing
//!
//! # TCP Protocol
//!
//! Both endpoints use a length-prefixed framing protocol with JSON bodies:
//!
//! ```text
//! ┌──────────────────┬──────────────────────────┐
//! │ Length (4 bytes) │ Body (variable)          │
//! │ Big-endian u32   │                          │
//! └──────────────────┴──────────────────────────┘
//! ```
//!
//! Published reports carry a topic in front of the JSON payload:
//!
//! ```text
//! [length][topic bytes][0x00][JSON payload]
//! ```
//!
//! Control requests and responses are plain `[length][JSON]` frames.
//!
//! ## Error Handling
//!
//! - **Oversized frame**: rejected before the body is read, connection closed
//! - **Bad JSON**: reported to the caller, connection stays open
//! - **Read timeout**: not an error while idle, the caller polls again;
//!   fatal once part of a frame has been consumed

use crate::error::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{ErrorKind, Read, Write};

/// Largest accepted frame body
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Serialize a message to JSON bytes
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(msg)?)
}

/// Deserialize JSON bytes to a message
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Build `[length][topic\0][payload]` into `buffer`, reusing its allocation
pub fn topic_frame(topic: &str, payload: &[u8], buffer: &mut Vec<u8>) {
    let frame_length = (topic.len() + 1 + payload.len()) as u32;

    buffer.clear();
    buffer.reserve(4 + frame_length as usize);
    buffer.extend_from_slice(&frame_length.to_be_bytes());
    buffer.extend_from_slice(topic.as_bytes());
    buffer.push(0);
    buffer.extend_from_slice(payload);
}

/// Split a topic frame body into topic and payload
pub fn split_topic(body: &[u8]) -> Option<(&str, &[u8])> {
    let nul = body.iter().position(|&b| b == 0)?;
    let topic = std::str::from_utf8(&body[..nul]).ok()?;
    Some((topic, &body[nul + 1..]))
}

/// Write one `[length][body]` frame
pub fn write_frame<W: Write>(writer: &mut W, body: &[u8]) -> Result<()> {
    if body.len() > MAX_FRAME_LEN {
        return Err(Error::PayloadTooLarge {
            size: body.len(),
            max: MAX_FRAME_LEN,
        });
    }
    writer.write_all(&(body.len() as u32).to_be_bytes())?;
    writer.write_all(body)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame body into `buffer`
///
/// Returns `Ok(false)` if the read timed out before any byte of the length
/// prefix arrived. Once a frame has started, a timeout is an error: the
/// stream is no longer frame-aligned and the connection must be closed.
pub fn read_frame<R: Read>(reader: &mut R, buffer: &mut Vec<u8>) -> Result<bool> {
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        match reader.read(&mut len_buf[filled..]) {
            Ok(0) => return Err(Error::Io(ErrorKind::UnexpectedEof.into())),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) if filled == 0 && is_timeout(&e) => return Ok(false),
            Err(e) => return Err(Error::Io(e)),
        }
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(Error::PayloadTooLarge {
            size: len,
            max: MAX_FRAME_LEN,
        });
    }

    buffer.clear();
    buffer.resize(len, 0);
    reader.read_exact(buffer)?;
    Ok(true)
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::messages::{ControlRequest, POWER_TOPIC};
    use std::io::Cursor;

    #[test]
    fn test_topic_frame_layout() {
        let mut buffer = Vec::new();
        topic_frame(POWER_TOPIC, b"{}", &mut buffer);
        assert_eq!(&buffer[..4], &8u32.to_be_bytes());
        assert_eq!(&buffer[4..], b"power\0{}");

        let (topic, payload) = split_topic(&buffer[4..]).unwrap();
        assert_eq!(topic, "power");
        assert_eq!(payload, b"{}");
        assert!(split_topic(b"no-separator").is_none());
    }

    #[test]
    fn test_request_frames_through_stream() {
        let request = ControlRequest::Write {
            payload: "charging=1\n".to_string(),
        };
        let mut stream = Vec::new();
        write_frame(&mut stream, &encode(&request).unwrap()).unwrap();
        write_frame(&mut stream, &encode(&ControlRequest::Read { offset: 0 }).unwrap()).unwrap();

        let mut cursor = Cursor::new(stream);
        let mut body = Vec::new();
        assert!(read_frame(&mut cursor, &mut body).unwrap());
        assert_eq!(decode::<ControlRequest>(&body).unwrap(), request);
        assert!(read_frame(&mut cursor, &mut body).unwrap());
        assert_eq!(
            decode::<ControlRequest>(&body).unwrap(),
            ControlRequest::Read { offset: 0 }
        );
        // Stream exhausted
        assert!(matches!(
            read_frame(&mut cursor, &mut body),
            Err(Error::Io(ref e)) if e.kind() == ErrorKind::UnexpectedEof
        ));
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut stream = ((MAX_FRAME_LEN + 1) as u32).to_be_bytes().to_vec();
        stream.extend_from_slice(b"ignored");
        let mut body = Vec::new();
        assert!(matches!(
            read_frame(&mut Cursor::new(stream), &mut body),
            Err(Error::PayloadTooLarge { .. })
        ));
        assert!(decode::<ControlRequest>(b"{not json").is_err());
    }

    /// Hands out queued chunks, then times out like an idle socket
    struct Trickle {
        chunks: Vec<Vec<u8>>,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.chunks.is_empty() {
                return Err(ErrorKind::WouldBlock.into());
            }
            let chunk = &mut self.chunks[0];
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            chunk.drain(..n);
            if chunk.is_empty() {
                self.chunks.remove(0);
            }
            Ok(n)
        }
    }

    #[test]
    fn test_idle_timeout_is_not_an_error() {
        let mut body = Vec::new();
        let mut idle = Trickle { chunks: Vec::new() };
        assert!(!read_frame(&mut idle, &mut body).unwrap());
    }

    #[test]
    fn test_split_prefix_is_reassembled() {
        let mut frame = Vec::new();
        write_frame(&mut frame, b"{}").unwrap();
        let mut reader = Trickle {
            chunks: vec![frame[..1].to_vec(), frame[1..3].to_vec(), frame[3..].to_vec()],
        };
        let mut body = Vec::new();
        assert!(read_frame(&mut reader, &mut body).unwrap());
        assert_eq!(body, b"{}");
        assert!(!read_frame(&mut reader, &mut body).unwrap());
    }

    #[test]
    fn test_timeout_inside_frame_is_fatal() {
        let mut body = Vec::new();
        let mut half_prefix = Trickle {
            chunks: vec![vec![0, 0]],
        };
        assert!(matches!(
            read_frame(&mut half_prefix, &mut body),
            Err(Error::Io(ref e)) if e.kind() == ErrorKind::WouldBlock
        ));

        let mut half_body = Trickle {
            chunks: vec![vec![0, 0, 0, 4, b'{']],
        };
        assert!(read_frame(&mut half_body, &mut body).is_err());
    }
}
