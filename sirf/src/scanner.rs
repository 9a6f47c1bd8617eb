//! Extraction of `A0 A2 | len | payload | checksum | B0 B3` frames from a
//! byte stream that may contain noise or corrupted frames.

use std::io;

use log::{debug, trace};

use crate::{
    checksum::SirfChecksumCalc,
    constants::{
        SIRF_END_CHAR_1, SIRF_END_CHAR_2, SIRF_FRAME_OVERHEAD, SIRF_HEADER_LEN,
        SIRF_MAX_FRAME_LEN, SIRF_MAX_PAYLOAD_LEN, SIRF_START_CHAR_1, SIRF_START_CHAR_2,
    },
    error::CodecError,
};

/// Source of raw bytes, typically a serial port or a file.
///
/// `Ok(0)` means that no bytes are available right now; the scanner reports
/// [`FramingStatus::NeedMoreData`] and the caller decides when to retry.
pub trait ByteSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }
}

/// In-memory source handing out at most `chunk` bytes per read
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
    chunk: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_chunk(data, usize::MAX)
    }

    /// Emulates short transport reads
    pub fn with_chunk(data: &'a [u8], chunk: usize) -> Self {
        Self {
            data,
            pos: 0,
            chunk: chunk.max(1),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos == self.data.len()
    }
}

impl ByteSource for SliceSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.chunk).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Adapter for any [`io::Read`]; timeouts read as "no data yet"
pub struct IoSource<R>(pub R);

impl<R: io::Read> ByteSource for IoSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.0.read(buf) {
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(0)
            },
            other => other,
        }
    }
}

/// One frame as found on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    pub payload: Vec<u8>,
    /// Checksum carried by the frame, not verified by the scanner
    pub checksum: u16,
    /// Noise bytes dropped before this frame started
    pub skipped: usize,
}

impl RawPacket {
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn validate_checksum(&self) -> Result<(), CodecError> {
        let mut calc = SirfChecksumCalc::new();
        calc.update(&self.payload);
        calc.validate_result(self.checksum)
    }
}

/// Why [`FrameScanner::scan_frame`] returned without a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingStatus {
    /// The source has nothing more right now; call again later
    NeedMoreData,
    /// A start marker turned out to be false (bad length or end marker).
    /// `skipped` counts the noise before it plus the marker byte dropped.
    FramingError { skipped: usize },
    SourceError(io::ErrorKind),
}

/// Fixed storage with head/tail cursors, compacted when the tail hits the end
pub struct ScanBuffer<const N: usize> {
    data: [u8; N],
    head: usize,
    tail: usize,
}

impl<const N: usize> ScanBuffer<N> {
    pub const fn new() -> Self {
        Self {
            data: [0; N],
            head: 0,
            tail: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.tail - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.head..self.tail]
    }

    /// Drops `count` bytes from the front
    pub fn consume(&mut self, count: usize) {
        self.head += count.min(self.len());
        if self.head == self.tail {
            self.head = 0;
            self.tail = 0;
        }
    }

    /// Moves the unread bytes to the front of the storage
    pub fn compact(&mut self) {
        if self.head > 0 {
            self.data.copy_within(self.head..self.tail, 0);
            self.tail -= self.head;
            self.head = 0;
        }
    }

    fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.tail..]
    }

    fn commit(&mut self, count: usize) {
        self.tail = (self.tail + count).min(N);
    }
}

impl<const N: usize> Default for ScanBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

enum Extract {
    Packet(RawPacket),
    Rejected(usize),
    Incomplete,
}

/// Pulls bytes from a [`ByteSource`] and cuts them into [`RawPacket`]s
pub struct FrameScanner<S, const N: usize = 2048> {
    source: S,
    buf: ScanBuffer<N>,
    skipped: usize,
}

impl<S: ByteSource, const N: usize> FrameScanner<S, N> {
    const CAPACITY_CHECK: () = assert!(
        N >= SIRF_MAX_FRAME_LEN,
        "scan buffer must hold a maximum size frame"
    );

    pub fn new(source: S) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_CHECK;
        Self {
            source,
            buf: ScanBuffer::new(),
            skipped: 0,
        }
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    /// Bytes read from the source but not yet handed out
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Locates the next complete frame.
    ///
    /// Returns the frame, or why there is none: the source is dry, a false
    /// start marker was dropped (scanning resumes one byte after it on the
    /// next call), or the source failed.
    pub fn scan_frame(&mut self) -> Result<RawPacket, FramingStatus> {
        loop {
            match self.extract() {
                Extract::Packet(packet) => return Ok(packet),
                Extract::Rejected(skipped) => return Err(FramingStatus::FramingError { skipped }),
                Extract::Incomplete => {},
            }

            if self.buf.spare_mut().is_empty() {
                self.buf.compact();
            }
            match self.source.read(self.buf.spare_mut()) {
                Ok(0) => return Err(FramingStatus::NeedMoreData),
                Ok(n) => {
                    trace!("scanner: {} bytes from source", n);
                    self.buf.commit(n);
                },
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
                Err(e) => {
                    debug!("scanner: source failed: {}", e);
                    return Err(FramingStatus::SourceError(e.kind()));
                },
            }
        }
    }

    /// Iterates over frames and framing errors until the source runs dry
    pub fn frames(&mut self) -> Frames<'_, S, N> {
        Frames {
            scanner: self,
            failed: false,
        }
    }

    fn extract(&mut self) -> Extract {
        let data = self.buf.as_slice();
        let start = data
            .windows(2)
            .position(|w| w == [SIRF_START_CHAR_1, SIRF_START_CHAR_2]);
        let garbage = match start {
            Some(pos) => pos,
            // a lone trailing start byte may still become a marker
            None if data.last() == Some(&SIRF_START_CHAR_1) => data.len() - 1,
            None => data.len(),
        };
        if garbage > 0 {
            self.skipped += garbage;
            self.buf.consume(garbage);
        }
        if start.is_none() {
            return Extract::Incomplete;
        }

        let data = self.buf.as_slice();
        if data.len() < SIRF_HEADER_LEN {
            return Extract::Incomplete;
        }
        let len = usize::from(u16::from_be_bytes([data[2], data[3]]));
        if len > SIRF_MAX_PAYLOAD_LEN {
            debug!("scanner: length {} too large, resync", len);
            return self.reject();
        }
        let total = len + SIRF_FRAME_OVERHEAD;
        if data.len() < total {
            return Extract::Incomplete;
        }
        if data[total - 2..total] != [SIRF_END_CHAR_1, SIRF_END_CHAR_2] {
            debug!("scanner: end marker missing for {} byte payload, resync", len);
            return self.reject();
        }

        let payload_end = SIRF_HEADER_LEN + len;
        let packet = RawPacket {
            payload: data[SIRF_HEADER_LEN..payload_end].to_vec(),
            checksum: u16::from_be_bytes([data[payload_end], data[payload_end + 1]]),
            skipped: core::mem::take(&mut self.skipped),
        };
        self.buf.consume(total);
        if packet.skipped > 0 {
            debug!("scanner: {} noise bytes before frame", packet.skipped);
        }
        Extract::Packet(packet)
    }

    fn reject(&mut self) -> Extract {
        self.buf.consume(1);
        Extract::Rejected(core::mem::take(&mut self.skipped) + 1)
    }
}

pub struct Frames<'a, S, const N: usize> {
    scanner: &'a mut FrameScanner<S, N>,
    failed: bool,
}

impl<S: ByteSource, const N: usize> Iterator for Frames<'_, S, N> {
    type Item = Result<RawPacket, FramingStatus>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.scanner.scan_frame() {
            Err(FramingStatus::NeedMoreData) => None,
            Err(e @ FramingStatus::SourceError(_)) => {
                self.failed = true;
                Some(Err(e))
            },
            other => Some(other),
        }
    }
}

/// Wraps a payload into a complete frame
pub fn frame_payload(payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    if payload.len() > SIRF_MAX_PAYLOAD_LEN {
        return Err(CodecError::Length {
            packet: "frame",
            expect: payload.len(),
            got: SIRF_MAX_PAYLOAD_LEN,
        });
    }
    let mut out = Vec::with_capacity(payload.len() + SIRF_FRAME_OVERHEAD);
    out.extend_from_slice(&[SIRF_START_CHAR_1, SIRF_START_CHAR_2]);
    out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&SirfChecksumCalc::compute(payload).to_be_bytes());
    out.extend_from_slice(&[SIRF_END_CHAR_1, SIRF_END_CHAR_2]);
    Ok(out)
}
