/// WAV decoding module
///
/// Parses a RIFF/WAVE byte buffer into normalized mono f32 samples for the
/// inference engine. 16-bit PCM only; multi-channel input keeps channel 0.

use thiserror::Error;
use tracing::{debug, warn};

/// Target sample rate for Whisper (16kHz)
pub const WHISPER_SAMPLE_RATE: u32 = 16000;

/// Audio sample format (f32 normalized to -1.0 to 1.0)
pub type AudioSample = f32;

/// Minimum size of a canonical WAV file (RIFF header + fmt chunk + empty data chunk)
const MIN_WAV_LEN: usize = 44;

/// Normalization divisor for 16-bit PCM
const PCM16_SCALE: f32 = 32768.0;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("buffer too short for a WAV header: {0} bytes")]
    TruncatedHeader(usize),

    #[error("missing RIFF magic")]
    NotRiff,

    #[error("missing WAVE magic")]
    NotWave,

    #[error("chunk overruns buffer at offset {0}")]
    MalformedChunk(usize),

    #[error("unsupported audio format code {0} (expected 1 = PCM)")]
    UnsupportedFormat(u16),

    #[error("unsupported bit depth {0} (expected 16)")]
    UnsupportedBitDepth(u16),

    #[error("no data chunk found")]
    NoDataChunk,
}

/// Parsed WAV format header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,

    /// Byte offset of the sample payload in the source buffer
    pub data_offset: usize,

    /// Byte length of the sample payload
    pub data_size: usize,
}

impl WavHeader {
    /// Number of frames in the data payload
    pub fn frame_count(&self) -> usize {
        self.data_size / 2 / self.channels as usize
    }
}

/// Decoded audio ready for transcription
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<AudioSample>,
    pub header: WavHeader,
}

impl DecodedAudio {
    pub fn sample_rate(&self) -> u32 {
        self.header.sample_rate
    }

    /// True when the file's rate differs from the engine's expected 16kHz.
    /// Mismatched audio is passed through unresampled.
    pub fn sample_rate_mismatch(&self) -> bool {
        self.header.sample_rate != WHISPER_SAMPLE_RATE
    }

    pub fn duration_secs(&self) -> f32 {
        if self.header.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.header.sample_rate as f32
    }
}

/// Bounds-checked reader over the input buffer.
///
/// Every read validates against the buffer end first, so a lying chunk size
/// surfaces as `MalformedChunk` instead of a slice panic.
struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::MalformedChunk(self.pos));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<(), DecodeError> {
        self.take(len).map(|_| ())
    }

    fn read_tag(&mut self) -> Result<[u8; 4], DecodeError> {
        let bytes = self.take(4)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn read_u16_le(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

/// Raw fmt-chunk fields before validation
struct FmtChunk {
    audio_format: u16,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

/// Parse and validate the container header without converting samples.
pub fn parse_header(bytes: &[u8]) -> Result<WavHeader, DecodeError> {
    if bytes.len() < MIN_WAV_LEN {
        return Err(DecodeError::TruncatedHeader(bytes.len()));
    }

    let mut cursor = ByteCursor::new(bytes);

    if cursor.read_tag()? != *b"RIFF" {
        return Err(DecodeError::NotRiff);
    }
    cursor.skip(4)?; // declared RIFF size, untrusted
    if cursor.read_tag()? != *b"WAVE" {
        return Err(DecodeError::NotWave);
    }

    let mut fmt: Option<FmtChunk> = None;
    let mut data: Option<(usize, usize)> = None;

    // Scan tag/size chunk pairs until both fmt and data are located.
    while cursor.remaining() >= 8 && (fmt.is_none() || data.is_none()) {
        let chunk_start = cursor.position();
        let tag = cursor.read_tag()?;
        let size = cursor.read_u32_le()? as usize;

        if size > cursor.remaining() {
            return Err(DecodeError::MalformedChunk(chunk_start));
        }

        match &tag {
            b"fmt " => {
                if size < 16 {
                    return Err(DecodeError::MalformedChunk(chunk_start));
                }
                let audio_format = cursor.read_u16_le()?;
                let channels = cursor.read_u16_le()?;
                let sample_rate = cursor.read_u32_le()?;
                cursor.skip(6)?; // byte rate + block align
                let bits_per_sample = cursor.read_u16_le()?;
                cursor.skip(size - 16)?; // extension fields, if any

                fmt = Some(FmtChunk {
                    audio_format,
                    channels,
                    sample_rate,
                    bits_per_sample,
                });
            }
            b"data" => {
                data = Some((cursor.position(), size));
                cursor.skip(size)?;
            }
            _ => {
                // Unknown chunk, skip by declared size
                cursor.skip(size)?;
            }
        }
    }

    let fmt = fmt.ok_or(DecodeError::MalformedChunk(cursor.position()))?;

    if fmt.audio_format != 1 {
        return Err(DecodeError::UnsupportedFormat(fmt.audio_format));
    }
    if fmt.bits_per_sample != 16 {
        return Err(DecodeError::UnsupportedBitDepth(fmt.bits_per_sample));
    }
    if fmt.channels == 0 {
        // zero channels would make the frame math meaningless
        return Err(DecodeError::MalformedChunk(cursor.position()));
    }

    let (data_offset, data_size) = data.ok_or(DecodeError::NoDataChunk)?;

    Ok(WavHeader {
        audio_format: fmt.audio_format,
        channels: fmt.channels,
        sample_rate: fmt.sample_rate,
        bits_per_sample: fmt.bits_per_sample,
        data_offset,
        data_size,
    })
}

/// Decode a WAV byte buffer into normalized mono f32 samples.
///
/// Multi-channel input keeps channel 0 and drops the rest. A sample rate
/// other than 16kHz is passed through with a warning, not resampled.
pub fn decode(bytes: &[u8]) -> Result<DecodedAudio, DecodeError> {
    let header = parse_header(bytes)?;

    if header.sample_rate != WHISPER_SAMPLE_RATE {
        warn!(
            "sample rate mismatch: file is {} Hz, engine expects {} Hz; not resampling",
            header.sample_rate, WHISPER_SAMPLE_RATE
        );
    }

    let payload = &bytes[header.data_offset..header.data_offset + header.data_size];
    let frame_stride = 2 * header.channels as usize;

    let mut samples = Vec::with_capacity(header.frame_count());
    for frame in payload.chunks_exact(frame_stride) {
        let raw = i16::from_le_bytes([frame[0], frame[1]]);
        samples.push(raw as f32 / PCM16_SCALE);
    }

    debug!(
        "decoded {} frames: {} Hz, {} channels, 16-bit PCM",
        samples.len(),
        header.sample_rate,
        header.channels
    );

    Ok(DecodedAudio { samples, header })
}
