use bytes::BytesMut;
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};

/// Size of the buffer for a UDP response.  No EDNS0 is advertised, so
/// nameservers must truncate anything bigger.
pub const UDP_BUFFER_SIZE: usize = 512;

/// Read a DNS message from a TCP stream.
///
/// A DNS TCP message is slightly different to a DNS UDP message: it
/// has a big-endian u16 prefix giving the total length of the
/// message, so the entire message can be read before parsing begins.
pub async fn read_tcp_bytes(stream: &mut TcpStream) -> Result<BytesMut, TcpError> {
    let expected = stream
        .read_u16()
        .await
        .map_err(|error| TcpError::IO { id: None, error })? as usize;

    let mut bytes = BytesMut::with_capacity(expected);
    while bytes.len() < expected {
        match stream.read_buf(&mut bytes).await {
            Ok(0) => {
                return Err(TcpError::TooShort {
                    id: message_id(&bytes),
                    expected,
                    actual: bytes.len(),
                });
            }
            Err(error) => {
                return Err(TcpError::IO {
                    id: message_id(&bytes),
                    error,
                });
            }
            Ok(_) => (),
        }
    }

    Ok(bytes)
}

fn message_id(bytes: &[u8]) -> Option<u16> {
    if bytes.len() >= 2 {
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    } else {
        None
    }
}

/// An error that can occur when reading a DNS TCP message.
#[derive(Debug, thiserror::Error)]
pub enum TcpError {
    #[error("expected {expected} octets but got {actual}")]
    TooShort {
        id: Option<u16>,
        expected: usize,
        actual: usize,
    },
    #[error("{error}")]
    IO { id: Option<u16>, error: io::Error },
}

/// Write a serialised message to a connected UDP socket.  Requests
/// which do not fit in a single datagram are refused rather than
/// truncated.
pub async fn send_udp_bytes(sock: &UdpSocket, bytes: &[u8]) -> Result<(), io::Error> {
    if bytes.len() > UDP_BUFFER_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "message too long for UDP",
        ));
    }

    sock.send(bytes).await?;
    Ok(())
}

/// Write a serialised message to a TCP channel, with the two-byte
/// length prefix (big-endian u16).
pub async fn send_tcp_bytes(stream: &mut TcpStream, bytes: &[u8]) -> Result<(), io::Error> {
    let len: u16 = bytes
        .len()
        .try_into()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "message too long for TCP"))?;

    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(bytes).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_id_needs_two_octets() {
        assert_eq!(None, message_id(&[]));
        assert_eq!(None, message_id(&[0x12]));
        assert_eq!(Some(0x1234), message_id(&[0x12, 0x34, 0x00]));
    }
}
