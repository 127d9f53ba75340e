//! Capture I/O: frame sources and sinks, classic pcap container
//!
//! The pipeline only sees [`FrameSource`] and [`FrameSink`]. [`PcapReader`]
//! and [`PcapWriter`] handle the libpcap file format, [`MemorySource`] and
//! [`MemorySink`] keep frames in memory for tests and benchmarks.

use crate::error::HarnessError;
use crate::types::{Frame, LinkType, Timestamp};
use crate::Result;
use bytes::{BufMut, Bytes, BytesMut};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

#[cfg(feature = "logging")]
use tracing::debug;

/// Microsecond-resolution pcap magic
const MAGIC_MICROS: u32 = 0xA1B2_C3D4;
/// Nanosecond-resolution pcap magic
const MAGIC_NANOS: u32 = 0xA1B2_3C4D;
/// Global header length
const GLOBAL_HEADER_LEN: usize = 24;
/// Record header length
const RECORD_HEADER_LEN: usize = 16;
/// Largest record libpcap accepts
const MAX_RECORD_LEN: u32 = 262_144;
/// Snapshot length written by [`PcapWriter`]
const WRITER_SNAPLEN: u32 = 65_535;

/// Ordered, finite, non-restartable sequence of frames
pub trait FrameSource {
    /// Link layer of every frame in this source
    fn link_type(&self) -> LinkType;

    /// Next frame, `Ok(None)` once the source is exhausted
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Destination for frames written during a run
pub trait FrameSink {
    /// Persist one frame
    fn write(&mut self, frame: &Frame) -> Result<()>;

    /// Flush buffered frames
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: FrameSource + ?Sized> FrameSource for &mut T {
    fn link_type(&self) -> LinkType {
        (**self).link_type()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }
}

impl<T: FrameSink + ?Sized> FrameSink for &mut T {
    fn write(&mut self, frame: &Frame) -> Result<()> {
        (**self).write(frame)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Reader for classic libpcap captures
pub struct PcapReader<R> {
    reader: R,
    swapped: bool,
    nanos: bool,
    link_type: LinkType,
}

impl PcapReader<BufReader<File>> {
    /// Open a capture file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> PcapReader<R> {
    /// Parse the global header of a capture
    ///
    /// Fails if the magic number is unknown or the link type is not one the
    /// harness can strip.
    pub fn new(mut reader: R) -> Result<Self> {
        let mut header = [0u8; GLOBAL_HEADER_LEN];
        let read = read_full(&mut reader, &mut header)?;
        if read != GLOBAL_HEADER_LEN {
            return Err(HarnessError::TruncatedCapture {
                expected: GLOBAL_HEADER_LEN,
                actual: read,
            });
        }

        let magic = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let (swapped, nanos) = match magic {
            MAGIC_MICROS => (false, false),
            MAGIC_NANOS => (false, true),
            m if m.swap_bytes() == MAGIC_MICROS => (true, false),
            m if m.swap_bytes() == MAGIC_NANOS => (true, true),
            other => return Err(HarnessError::BadCaptureMagic(other)),
        };

        let field = |at: usize| read_u32(&header[at..at + 4], swapped);
        let dlt = field(20);
        let link_type = LinkType::from_dlt(dlt)?;

        #[cfg(feature = "logging")]
        debug!(
            "pcap header: version {}.{}, snaplen {}, link type {}",
            u16::from_le_bytes([header[4], header[5]]),
            u16::from_le_bytes([header[6], header[7]]),
            field(16),
            dlt
        );

        Ok(Self {
            reader,
            swapped,
            nanos,
            link_type,
        })
    }

    fn read_record(&mut self) -> Result<Option<Frame>> {
        let mut header = [0u8; RECORD_HEADER_LEN];
        match read_full(&mut self.reader, &mut header)? {
            0 => return Ok(None),
            RECORD_HEADER_LEN => {}
            actual => {
                return Err(HarnessError::TruncatedCapture {
                    expected: RECORD_HEADER_LEN,
                    actual,
                })
            }
        }

        let field = |at: usize| read_u32(&header[at..at + 4], self.swapped);
        let secs = field(0);
        let fraction = field(4);
        let captured_len = field(8);
        let declared_len = field(12);

        if captured_len > MAX_RECORD_LEN {
            return Err(HarnessError::InvalidCapture(format!(
                "record of {} bytes exceeds {}",
                captured_len, MAX_RECORD_LEN
            )));
        }

        let mut data = vec![0u8; captured_len as usize];
        let read = read_full(&mut self.reader, &mut data)?;
        if read != data.len() {
            return Err(HarnessError::TruncatedCapture {
                expected: data.len(),
                actual: read,
            });
        }

        let nanos = if self.nanos { fraction } else { fraction.saturating_mul(1000) };

        Ok(Some(Frame {
            link_type: self.link_type,
            timestamp: Timestamp { secs, nanos },
            captured_len,
            declared_len,
            data: Bytes::from(data),
        }))
    }
}

impl<R: Read> FrameSource for PcapReader<R> {
    fn link_type(&self) -> LinkType {
        self.link_type
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.read_record()
    }
}

/// Writer for classic libpcap captures (microsecond timestamps, little endian)
pub struct PcapWriter<W: Write> {
    writer: W,
}

impl PcapWriter<BufWriter<File>> {
    /// Create a capture file, truncating any existing one
    pub fn create(path: impl AsRef<Path>, link_type: LinkType) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Self::new(BufWriter::new(file), link_type)
    }
}

impl<W: Write> PcapWriter<W> {
    /// Write the global header
    pub fn new(mut writer: W, link_type: LinkType) -> Result<Self> {
        let mut header = BytesMut::with_capacity(GLOBAL_HEADER_LEN);
        header.put_u32_le(MAGIC_MICROS);
        header.put_u16_le(2);
        header.put_u16_le(4);
        header.put_i32_le(0);
        header.put_u32_le(0);
        header.put_u32_le(WRITER_SNAPLEN);
        header.put_u32_le(link_type.dlt());
        writer.write_all(&header)?;
        Ok(Self { writer })
    }

    /// Give back the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FrameSink for PcapWriter<W> {
    fn write(&mut self, frame: &Frame) -> Result<()> {
        let mut record = BytesMut::with_capacity(RECORD_HEADER_LEN + frame.data.len());
        record.put_u32_le(frame.timestamp.secs);
        record.put_u32_le(frame.timestamp.nanos / 1000);
        record.put_u32_le(frame.data.len() as u32);
        record.put_u32_le(frame.declared_len);
        record.put_slice(&frame.data);
        self.writer.write_all(&record)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Frames held in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    link_type: LinkType,
    frames: VecDeque<Frame>,
    consumed: usize,
}

impl MemorySource {
    /// Build a source over `frames`
    pub fn new(link_type: LinkType, frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            link_type,
            frames: frames.into_iter().collect(),
            consumed: 0,
        }
    }

    /// Number of frames handed out so far
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

impl FrameSource for MemorySource {
    fn link_type(&self) -> LinkType {
        self.link_type
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let frame = self.frames.pop_front();
        if frame.is_some() {
            self.consumed += 1;
        }
        Ok(frame)
    }
}

/// Sink collecting frames in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    /// Frames written so far
    pub frames: Vec<Frame>,
}

impl FrameSink for MemorySink {
    fn write(&mut self, frame: &Frame) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }
}

fn read_u32(bytes: &[u8], swapped: bool) -> u32 {
    let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if swapped {
        u32::from_be_bytes(raw)
    } else {
        u32::from_le_bytes(raw)
    }
}

/// Fill `buf` as far as the reader allows, returning the number of bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_frame(byte: u8, len: usize) -> Frame {
        Frame::new(LinkType::Ethernet, Bytes::from(vec![byte; len])).with_timestamp(Timestamp {
            secs: 1_700_000_000,
            nanos: 250_000,
        })
    }

    #[test]
    fn write_then_read_back() {
        let mut writer = PcapWriter::new(Vec::new(), LinkType::Ethernet).unwrap();
        writer.write(&sample_frame(0x11, 60)).unwrap();
        writer.write(&sample_frame(0x22, 74)).unwrap();
        writer.finish().unwrap();
        let bytes = writer.into_inner();

        let mut reader = PcapReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.link_type(), LinkType::Ethernet);

        let first = reader.next_frame().unwrap().unwrap();
        assert_eq!(first.captured_len, 60);
        assert_eq!(first.declared_len, 60);
        assert_eq!(first.timestamp.nanos, 250_000);
        assert_eq!(first.data[0], 0x11);

        let second = reader.next_frame().unwrap().unwrap();
        assert_eq!(second.data.len(), 74);
        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn reads_big_endian_nanosecond_captures() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC_NANOS.to_be_bytes());
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.extend_from_slice(&4u16.to_be_bytes());
        bytes.extend_from_slice(&[0u8; 8]);
        bytes.extend_from_slice(&65535u32.to_be_bytes());
        bytes.extend_from_slice(&101u32.to_be_bytes());
        bytes.extend_from_slice(&7u32.to_be_bytes());
        bytes.extend_from_slice(&42u32.to_be_bytes());
        bytes.extend_from_slice(&3u32.to_be_bytes());
        bytes.extend_from_slice(&5u32.to_be_bytes());
        bytes.extend_from_slice(&[1, 2, 3]);

        let mut reader = PcapReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.link_type(), LinkType::Raw);
        let frame = reader.next_frame().unwrap().unwrap();
        assert_eq!(frame.timestamp, Timestamp { secs: 7, nanos: 42 });
        assert_eq!(frame.captured_len, 3);
        assert_eq!(frame.declared_len, 5);
    }

    #[test]
    fn rejects_unknown_magic() {
        let err = PcapReader::new(Cursor::new(vec![0u8; 24])).err().unwrap();
        assert!(matches!(err, HarnessError::BadCaptureMagic(0)));
    }

    #[test]
    fn rejects_unsupported_link_type() {
        let mut writer = PcapWriter::new(Vec::new(), LinkType::Raw).unwrap();
        writer.finish().unwrap();
        let mut bytes = writer.into_inner();
        bytes[20..24].copy_from_slice(&105u32.to_le_bytes());
        let err = PcapReader::new(Cursor::new(bytes)).err().unwrap();
        assert!(matches!(err, HarnessError::UnsupportedLinkType(105)));
    }

    #[test]
    fn truncated_record_is_an_error() {
        let mut writer = PcapWriter::new(Vec::new(), LinkType::Raw).unwrap();
        writer.write(&Frame::new(LinkType::Raw, Bytes::from_static(&[1, 2, 3, 4]))).unwrap();
        let mut bytes = writer.into_inner();
        bytes.truncate(bytes.len() - 2);

        let mut reader = PcapReader::new(Cursor::new(bytes)).unwrap();
        let err = reader.next_frame().unwrap_err();
        assert!(matches!(
            err,
            HarnessError::TruncatedCapture {
                expected: 4,
                actual: 2
            }
        ));
    }

    #[test]
    fn memory_source_counts_consumed_frames() {
        let mut source = MemorySource::new(
            LinkType::Raw,
            vec![
                Frame::new(LinkType::Raw, Bytes::from_static(&[1])),
                Frame::new(LinkType::Raw, Bytes::from_static(&[2])),
            ],
        );
        assert!(source.next_frame().unwrap().is_some());
        assert_eq!(source.consumed(), 1);
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());
        assert_eq!(source.consumed(), 2);
    }
}
