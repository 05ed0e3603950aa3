use crate::error::IngestError;
use crate::frame::{rgb_len, Frame};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Size of the per-frame header: width then height, both little-endian u32
pub const HEADER_LEN: usize = 8;

/// Largest body accepted by default (4K RGB)
pub const DEFAULT_MAX_FRAME_BYTES: usize = 3840 * 2160 * 3;

/// Frame header preceding every RGB body on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub width: u32,
    pub height: u32,
}

impl FrameHeader {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn for_frame(frame: &Frame) -> Self {
        Self::new(frame.width(), frame.height())
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[..4].copy_from_slice(&self.width.to_le_bytes());
        bytes[4..].copy_from_slice(&self.height.to_le_bytes());
        bytes
    }

    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Self {
        let width = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let height = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Self { width, height }
    }

    /// Body length this header announces, if it is acceptable
    pub fn body_len(&self, max_frame_bytes: usize) -> Result<usize, IngestError> {
        let malformed = |details: String| IngestError::MalformedHeader {
            width: self.width,
            height: self.height,
            details,
        };

        if self.width == 0 || self.height == 0 {
            return Err(malformed("zero dimension".to_string()));
        }

        let len = rgb_len(self.width, self.height)
            .ok_or_else(|| malformed("body size overflows".to_string()))?;

        if len > max_frame_bytes {
            return Err(malformed(format!(
                "body of {} bytes exceeds limit of {}",
                len, max_frame_bytes
            )));
        }

        Ok(len)
    }
}

/// Header and body bytes for one frame
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + frame.len());
    bytes.extend_from_slice(&FrameHeader::for_frame(frame).encode());
    bytes.extend_from_slice(frame.pixels());
    bytes
}

/// Read one frame from the stream.
///
/// Returns `Ok(None)` when the peer closes the stream between frames.
/// A stream that ends partway through a header or body is `Truncated`.
pub async fn read_frame<R>(reader: &mut R, max_frame_bytes: usize) -> Result<Option<Frame>, IngestError>
where
    R: AsyncRead + Unpin,
{
    let mut header_bytes = [0u8; HEADER_LEN];
    let received = read_full(reader, &mut header_bytes).await?;
    if received == 0 {
        return Ok(None);
    }
    if received < HEADER_LEN {
        return Err(IngestError::Truncated {
            section: "header",
            received,
            expected: HEADER_LEN,
        });
    }

    let header = FrameHeader::decode(&header_bytes);
    let body_len = header.body_len(max_frame_bytes)?;

    let mut body = vec![0u8; body_len];
    let received = read_full(reader, &mut body).await?;
    if received < body_len {
        return Err(IngestError::Truncated {
            section: "body",
            received,
            expected: body_len,
        });
    }

    Ok(Some(Frame::new(header.width, header.height, body)?))
}

/// Fill `buf` until it is full or the stream ends; returns bytes read
async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout_is_little_endian() {
        let header = FrameHeader::new(640, 360);
        assert_eq!(header.encode(), [0x80, 0x02, 0, 0, 0x68, 0x01, 0, 0]);
        assert_eq!(FrameHeader::decode(&header.encode()), header);
    }

    #[test]
    fn test_body_len_rejects_bad_headers() {
        assert_eq!(FrameHeader::new(2, 2).body_len(100).unwrap(), 12);
        assert!(matches!(
            FrameHeader::new(0, 10).body_len(100),
            Err(IngestError::MalformedHeader { .. })
        ));
        assert!(matches!(
            FrameHeader::new(10, 10).body_len(100),
            Err(IngestError::MalformedHeader { .. })
        ));
        assert!(FrameHeader::new(u32::MAX, u32::MAX)
            .body_len(usize::MAX)
            .is_err());
    }

    #[tokio::test]
    async fn test_read_frame_reconstructs_pixels() {
        let pixels: Vec<u8> = (0..(3 * 2 * 3)).map(|i| i as u8).collect();
        let frame = Frame::new(3, 2, pixels.clone()).unwrap();
        let bytes = encode_frame(&frame);

        let mut reader = bytes.as_slice();
        let decoded = read_frame(&mut reader, DEFAULT_MAX_FRAME_BYTES)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(&decoded.pixels()[..], pixels.as_slice());
        // Stream ends cleanly after the frame
        assert!(read_frame(&mut reader, DEFAULT_MAX_FRAME_BYTES)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_short_header_is_truncated() {
        let mut reader: &[u8] = &[1, 0, 0, 0, 1];
        match read_frame(&mut reader, DEFAULT_MAX_FRAME_BYTES).await {
            Err(IngestError::Truncated {
                section,
                received,
                expected,
            }) => {
                assert_eq!(section, "header");
                assert_eq!(received, 5);
                assert_eq!(expected, HEADER_LEN);
            }
            other => panic!("unexpected result {:?}", other.map(|f| f.map(|f| f.dimensions()))),
        }
    }

    #[tokio::test]
    async fn test_short_body_is_truncated() {
        let mut bytes = FrameHeader::new(4, 4).encode().to_vec();
        bytes.extend_from_slice(&[0u8; 47]);

        let mut reader = bytes.as_slice();
        assert!(matches!(
            read_frame(&mut reader, DEFAULT_MAX_FRAME_BYTES).await,
            Err(IngestError::Truncated {
                section: "body",
                received: 47,
                expected: 48,
            })
        ));
    }
}
