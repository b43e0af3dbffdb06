//! Reusable deflate encoder
//!
//! Holds one `flate2::Compress` and one output buffer, both reset at the
//! start of every call. Gzip framing (RFC 1952 header, CRC-32 and size
//! trailer) is written around the raw deflate stream.

use std::io;

use flate2::{Compress, Compression, Crc, FlushCompress, Status};

use super::CompressionAlgorithm;

/// Gzip member header: deflate, no flags, no mtime, unknown OS
const GZIP_HEADER: [u8; 10] = [0x1f, 0x8b, 0x08, 0x00, 0, 0, 0, 0, 0x00, 0xff];

/// Minimum spare output capacity before each deflate step
const MIN_SPARE: usize = 256;

pub struct Encoder {
    algorithm: CompressionAlgorithm,
    deflate: Compress,
    crc: Crc,
    out: Vec<u8>,
}

impl Encoder {
    pub fn new(algorithm: CompressionAlgorithm, capacity: usize) -> Self {
        let zlib_header = algorithm == CompressionAlgorithm::Zlib;
        Self {
            algorithm,
            deflate: Compress::new(Compression::default(), zlib_header),
            crc: Crc::new(),
            out: Vec::with_capacity(capacity),
        }
    }

    /// Compress one message; the output is valid until the next call
    pub fn compress(&mut self, data: &[u8]) -> io::Result<&[u8]> {
        self.deflate.reset();
        self.out.clear();

        let gzip = self.algorithm == CompressionAlgorithm::Gzip;
        if gzip {
            self.crc.reset();
            self.crc.update(data);
            self.out.extend_from_slice(&GZIP_HEADER);
        }

        let mut input = data;
        loop {
            if self.out.capacity() - self.out.len() < MIN_SPARE {
                self.out.reserve(self.out.capacity().max(MIN_SPARE));
            }
            let before = self.deflate.total_in();
            let status = self
                .deflate
                .compress_vec(input, &mut self.out, FlushCompress::Finish)
                .map_err(io::Error::other)?;
            let consumed = (self.deflate.total_in() - before) as usize;
            input = &input[consumed..];
            if status == Status::StreamEnd {
                break;
            }
        }

        if gzip {
            self.out.extend_from_slice(&self.crc.sum().to_le_bytes());
            self.out.extend_from_slice(&self.crc.amount().to_le_bytes());
        }
        Ok(&self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::{GzDecoder, ZlibDecoder};
    use std::io::Read;

    fn gunzip(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_reused_encoder_starts_fresh() {
        let mut encoder = Encoder::new(CompressionAlgorithm::Gzip, 16);
        let first = encoder.compress(b"first message").unwrap().to_vec();
        let second = encoder.compress(b"second").unwrap().to_vec();
        assert_eq!(gunzip(&first), b"first message");
        assert_eq!(gunzip(&second), b"second");

        let again = encoder.compress(b"first message").unwrap();
        assert_eq!(again, first.as_slice());
    }

    #[test]
    fn test_output_grows_past_capacity() {
        let data: Vec<u8> = (0..200_000u32).flat_map(|i| i.wrapping_mul(2_654_435_761).to_le_bytes()).collect();
        let mut encoder = Encoder::new(CompressionAlgorithm::Zlib, 16);
        let compressed = encoder.compress(&data).unwrap();

        let mut out = Vec::new();
        ZlibDecoder::new(compressed).read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_empty_input() {
        let mut encoder = Encoder::new(CompressionAlgorithm::Gzip, 0);
        let compressed = encoder.compress(b"").unwrap().to_vec();
        assert!(gunzip(&compressed).is_empty());
    }
}
