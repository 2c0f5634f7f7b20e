//! Minimal MPEG audio stream reader: enough to compute a clip's duration.
//!
//! Handles ID3v2 prefixes, Xing/Info and VBRI headers, and falls back to
//! walking every frame when neither header is present.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Version {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    I,
    II,
    III,
}

/// A decoded 4-byte frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    version: Version,
    layer: Layer,
    pub bitrate: u32,
    pub sample_rate: u32,
    padding: bool,
    mono: bool,
}

const BITRATES_V1_L1: [u32; 15] = [
    0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448,
];
const BITRATES_V1_L2: [u32; 15] = [
    0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384,
];
const BITRATES_V1_L3: [u32; 15] = [
    0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];
const BITRATES_V2_L1: [u32; 15] = [
    0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256,
];
const BITRATES_V2_L23: [u32; 15] = [
    0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160,
];

impl FrameHeader {
    /// Parse a header from the first four bytes of `bytes`.
    /// Free-format (bitrate index 0) frames are rejected.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] & 0xE0 != 0xE0 {
            return None;
        }

        let version = match (bytes[1] >> 3) & 0x03 {
            0 => Version::Mpeg25,
            2 => Version::Mpeg2,
            3 => Version::Mpeg1,
            _ => return None,
        };
        let layer = match (bytes[1] >> 1) & 0x03 {
            1 => Layer::III,
            2 => Layer::II,
            3 => Layer::I,
            _ => return None,
        };

        let bitrate_index = (bytes[2] >> 4) as usize;
        if bitrate_index == 0 || bitrate_index == 15 {
            return None;
        }
        let table = match (version, layer) {
            (Version::Mpeg1, Layer::I) => &BITRATES_V1_L1,
            (Version::Mpeg1, Layer::II) => &BITRATES_V1_L2,
            (Version::Mpeg1, Layer::III) => &BITRATES_V1_L3,
            (_, Layer::I) => &BITRATES_V2_L1,
            (_, _) => &BITRATES_V2_L23,
        };
        let bitrate = table[bitrate_index] * 1000;

        let base_rate = match (bytes[2] >> 2) & 0x03 {
            0 => 44_100,
            1 => 48_000,
            2 => 32_000,
            _ => return None,
        };
        let sample_rate = match version {
            Version::Mpeg1 => base_rate,
            Version::Mpeg2 => base_rate / 2,
            Version::Mpeg25 => base_rate / 4,
        };

        Some(Self {
            version,
            layer,
            bitrate,
            sample_rate,
            padding: (bytes[2] >> 1) & 0x01 == 1,
            mono: bytes[3] >> 6 == 0x03,
        })
    }

    pub fn samples_per_frame(&self) -> u32 {
        match (self.layer, self.version) {
            (Layer::I, _) => 384,
            (Layer::II, _) => 1152,
            (Layer::III, Version::Mpeg1) => 1152,
            (Layer::III, _) => 576,
        }
    }

    /// Total frame length in bytes, header included
    pub fn frame_len(&self) -> usize {
        match self.layer {
            Layer::I => ((12 * self.bitrate / self.sample_rate + self.padding as u32) * 4) as usize,
            _ => {
                (self.samples_per_frame() / 8 * self.bitrate / self.sample_rate
                    + self.padding as u32) as usize
            }
        }
    }

    /// Offset of a Xing/Info tag from the frame start (after side info)
    fn xing_offset(&self) -> usize {
        let side_info = match (self.version, self.mono) {
            (Version::Mpeg1, true) => 17,
            (Version::Mpeg1, false) => 32,
            (_, true) => 9,
            (_, false) => 17,
        };
        4 + side_info
    }
}

/// Length of an ID3v2 tag at the start of `data`, or 0 if there is none.
fn id3v2_len(data: &[u8]) -> usize {
    if data.len() < 10 || &data[..3] != b"ID3" {
        return 0;
    }
    // Sizes are syncsafe: 7 significant bits per byte.
    let size = data[6..10]
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | (*b as usize & 0x7F));
    let footer = if data[5] & 0x10 != 0 { 10 } else { 0 };
    10 + size + footer
}

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Frame count advertised by a Xing/Info or VBRI header in the first frame
fn header_frame_count(frame: &[u8], header: &FrameHeader) -> Option<u32> {
    let xing = header.xing_offset();
    if let Some(tag) = frame.get(xing..xing + 4) {
        if tag == b"Xing" || tag == b"Info" {
            let flags = read_u32(frame, xing + 4)?;
            if flags & 0x01 != 0 {
                return read_u32(frame, xing + 8).filter(|n| *n > 0);
            }
            return None;
        }
    }

    // VBRI sits at a fixed offset of 32 bytes after the header.
    if frame.get(36..40) == Some(b"VBRI".as_slice()) {
        return read_u32(frame, 36 + 14).filter(|n| *n > 0);
    }

    None
}

/// Locate the next frame header at or after `from`.
fn find_frame(data: &[u8], from: usize) -> Option<(usize, FrameHeader)> {
    let mut pos = from;
    while pos + 4 <= data.len() {
        if data[pos] == 0xFF {
            if let Some(header) = FrameHeader::parse(&data[pos..]) {
                return Some((pos, header));
            }
        }
        pos += 1;
    }
    None
}

/// Duration of an MPEG audio stream in seconds, or `None` if no audio
/// frame can be found.
pub fn duration_secs(data: &[u8]) -> Option<f64> {
    let start = id3v2_len(data);
    let (first_pos, first) = find_frame(data, start)?;

    let first_frame = &data[first_pos..data.len().min(first_pos + first.frame_len())];
    if let Some(frames) = header_frame_count(first_frame, &first) {
        return Some(
            frames as f64 * first.samples_per_frame() as f64 / first.sample_rate as f64,
        );
    }

    // No summary header: walk the stream frame by frame.
    let mut seconds = 0f64;
    let mut pos = first_pos;
    while pos + 4 <= data.len() {
        if &data[pos..pos + 3] == b"TAG" {
            break;
        }
        match FrameHeader::parse(&data[pos..]) {
            Some(header) => {
                let len = header.frame_len();
                if len < 4 {
                    break;
                }
                seconds += header.samples_per_frame() as f64 / header.sample_rate as f64;
                pos += len;
            }
            None => match find_frame(data, pos + 1) {
                Some((next, _)) => pos = next,
                None => break,
            },
        }
    }

    Some(seconds)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// MPEG-1 Layer III, 128 kbit/s, 44.1 kHz, stereo, no padding: 417 bytes
    pub const HEADER_128K: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];

    /// Build a CBR stream of `frames` silent frames.
    pub fn cbr_stream(frames: usize) -> Vec<u8> {
        let len = FrameHeader::parse(&HEADER_128K).unwrap().frame_len();
        let mut data = Vec::with_capacity(frames * len);
        for _ in 0..frames {
            data.extend_from_slice(&HEADER_128K);
            data.resize(data.len() + len - 4, 0);
        }
        data
    }

    #[test]
    fn parses_mpeg1_layer3_header() {
        let header = FrameHeader::parse(&HEADER_128K).unwrap();
        assert_eq!(header.bitrate, 128_000);
        assert_eq!(header.sample_rate, 44_100);
        assert_eq!(header.samples_per_frame(), 1152);
        assert_eq!(header.frame_len(), 417);
    }

    #[test]
    fn parses_mpeg2_layer3_header() {
        // MPEG-2, Layer III, 64 kbit/s, 22.05 kHz, padded
        let header = FrameHeader::parse(&[0xFF, 0xF3, 0x82, 0xC0]).unwrap();
        assert_eq!(header.bitrate, 64_000);
        assert_eq!(header.sample_rate, 22_050);
        assert_eq!(header.samples_per_frame(), 576);
        assert_eq!(header.frame_len(), 72 * 64_000 / 22_050 + 1);
    }

    #[test]
    fn rejects_invalid_headers() {
        assert!(FrameHeader::parse(&[0x00, 0x00, 0x00, 0x00]).is_none());
        // reserved version
        assert!(FrameHeader::parse(&[0xFF, 0xEB, 0x90, 0x00]).is_none());
        // bad bitrate index
        assert!(FrameHeader::parse(&[0xFF, 0xFB, 0xF0, 0x00]).is_none());
        // reserved sample rate
        assert!(FrameHeader::parse(&[0xFF, 0xFB, 0x9C, 0x00]).is_none());
        assert!(FrameHeader::parse(&[0xFF, 0xFB]).is_none());
    }

    #[test]
    fn cbr_duration_sums_frames() {
        let data = cbr_stream(100);
        let expected = 100.0 * 1152.0 / 44_100.0;
        let got = duration_secs(&data).unwrap();
        assert!((got - expected).abs() < 1e-9, "got {got}");
    }

    #[test]
    fn skips_id3v2_tag_and_id3v1_trailer() {
        let mut data = vec![b'I', b'D', b'3', 3, 0, 0, 0, 0, 0x01, 0x00];
        // 128 bytes of tag body, filled with sync-looking noise
        data.extend(std::iter::repeat(0xFF).take(128));
        data.extend(cbr_stream(10));
        data.extend_from_slice(b"TAG");
        data.resize(data.len() + 125, 0);

        let expected = 10.0 * 1152.0 / 44_100.0;
        let got = duration_secs(&data).unwrap();
        assert!((got - expected).abs() < 1e-9, "got {got}");
    }

    #[test]
    fn xing_header_frame_count_wins() {
        let mut data = cbr_stream(3);
        // stereo MPEG-1: tag at 4 + 32
        data[36..40].copy_from_slice(b"Xing");
        data[40..44].copy_from_slice(&1u32.to_be_bytes());
        data[44..48].copy_from_slice(&1000u32.to_be_bytes());

        let expected = 1000.0 * 1152.0 / 44_100.0;
        let got = duration_secs(&data).unwrap();
        assert!((got - expected).abs() < 1e-9, "got {got}");
    }

    #[test]
    fn no_frames_means_no_duration() {
        assert!(duration_secs(b"definitely not audio").is_none());
        assert!(duration_secs(&[]).is_none());
    }
}
