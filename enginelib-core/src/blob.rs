//! Performance-data blob codecs
//!
//! The five blob columns a track row carries (track data, beat data, quick
//! cues, loops and the overview waveform) are each a zlib stream over a
//! fixed big-endian layout that the hardware parses directly. The codecs
//! here are pure: they depend only on their argument, and every decoder
//! rejects a payload whose length does not match its layout.
//!
//! Layouts:
//! - track data: `[sample_rate:f64][samples:i64][average_loudness:f64][key:i32]`, 28 bytes
//! - beat data: `[sample_rate:f64][samples:i64][is_beatgrid_set:u8]` then the
//!   default and adjusted grids, each `[count:i64]` + 24-byte markers
//! - quick cues: `[count:i64]` + cues, then `[default_main_cue:f64]`
//!   `[is_main_cue_adjusted:u8][adjusted_main_cue:f64]`
//! - loops: `[count:i64]` + loops
//! - waveform: `[entries:i64][samples_per_entry:i64]` + 6-byte entries

use crate::codec::{
    decode_bytes, decode_f64_be, decode_i32_be, decode_i64_be, decode_u8, encode_bytes,
    encode_f64_be, encode_i32_be, encode_i64_be, encode_u8, zlib_compress, zlib_uncompress,
};
use crate::error::{Error, Result};
use crate::track::{PadColor, WaveformEntry, WaveformPoint};

/// Number of hot-cue and loop slots per track
pub const SLOT_COUNT: usize = 8;

const TRACK_DATA_SIZE: usize = 28;
const BEAT_MARKER_SIZE: usize = 24;

fn expect_consumed(buf: &[u8], offset: usize, what: &str) -> Result<()> {
    if offset != buf.len() {
        return Err(Error::MalformedBlob(format!(
            "{what}: {} bytes left over after decoding",
            buf.len() - offset
        )));
    }
    Ok(())
}

/// Reject a record count that could not possibly fit in the bytes left,
/// before any allocation sized from it.
fn check_count(count: i64, min_record_size: usize, buf: &[u8], offset: usize) -> Result<usize> {
    if count < 0 {
        return Err(Error::MalformedBlob(format!("negative record count {count}")));
    }
    let remaining = buf.len().saturating_sub(offset);
    let count = count as usize;
    if count.checked_mul(min_record_size).map_or(true, |needed| needed > remaining) {
        return Err(Error::MalformedBlob(format!(
            "{count} records of at least {min_record_size} bytes cannot fit in {remaining} bytes"
        )));
    }
    Ok(count)
}

fn decode_label(buf: &[u8], offset: usize) -> Result<(String, usize)> {
    let (len, offset) = decode_i64_be(buf, offset)?;
    if len < 0 {
        return Err(Error::MalformedBlob(format!("negative label length {len}")));
    }
    let (bytes, offset) = decode_bytes(buf, offset, len as usize)?;
    let label = String::from_utf8(bytes)
        .map_err(|_| Error::MalformedBlob("label is not valid UTF-8".into()))?;
    Ok((label, offset))
}

/// Header blob: sampling information, loudness and key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackDataBlob {
    pub sample_rate: f64,
    /// Sample count; 0 means unknown
    pub samples: i64,
    pub average_loudness: f64,
    /// Integer key representation, 0 = none
    pub key: i32,
}

impl TrackDataBlob {
    pub fn to_blob(&self) -> Result<Vec<u8>> {
        let mut uncompressed = vec![0u8; TRACK_DATA_SIZE];
        let mut offset = 0;
        offset = encode_f64_be(self.sample_rate, &mut uncompressed, offset);
        offset = encode_i64_be(self.samples, &mut uncompressed, offset);
        offset = encode_f64_be(self.average_loudness, &mut uncompressed, offset);
        offset = encode_i32_be(self.key, &mut uncompressed, offset);
        debug_assert_eq!(offset, uncompressed.len());
        zlib_compress(&uncompressed)
    }

    pub fn from_blob(blob: &[u8]) -> Result<Self> {
        let uncompressed = zlib_uncompress(blob)?;
        if uncompressed.len() != TRACK_DATA_SIZE {
            return Err(Error::MalformedBlob(format!(
                "track data must be {TRACK_DATA_SIZE} bytes uncompressed, got {}",
                uncompressed.len()
            )));
        }
        let (sample_rate, offset) = decode_f64_be(&uncompressed, 0)?;
        let (samples, offset) = decode_i64_be(&uncompressed, offset)?;
        let (average_loudness, offset) = decode_f64_be(&uncompressed, offset)?;
        let (key, offset) = decode_i32_be(&uncompressed, offset)?;
        expect_consumed(&uncompressed, offset, "track data")?;
        Ok(Self {
            sample_rate,
            samples,
            average_loudness,
            key,
        })
    }
}

/// One marker of an on-disk beat grid.
///
/// The two trailing fields have no known meaning; they round-trip bit-exactly
/// and are written as zero for markers with no on-disk counterpart.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BeatGridMarkerBlob {
    pub sample_offset: f64,
    pub beat_number: i64,
    pub unknown1: i32,
    pub unknown2: i32,
}

impl BeatGridMarkerBlob {
    fn encode(&self, buf: &mut [u8], offset: usize) -> usize {
        let offset = encode_f64_be(self.sample_offset, buf, offset);
        let offset = encode_i64_be(self.beat_number, buf, offset);
        let offset = encode_i32_be(self.unknown1, buf, offset);
        encode_i32_be(self.unknown2, buf, offset)
    }

    fn decode(buf: &[u8], offset: usize) -> Result<(Self, usize)> {
        let (sample_offset, offset) = decode_f64_be(buf, offset)?;
        let (beat_number, offset) = decode_i64_be(buf, offset)?;
        let (unknown1, offset) = decode_i32_be(buf, offset)?;
        let (unknown2, offset) = decode_i32_be(buf, offset)?;
        Ok((
            Self {
                sample_offset,
                beat_number,
                unknown1,
                unknown2,
            },
            offset,
        ))
    }
}

/// Beat-grid blob: sampling information plus the analyzed and adjusted grids
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeatDataBlob {
    pub sample_rate: f64,
    pub samples: i64,
    pub is_beatgrid_set: bool,
    pub default_beat_grid: Vec<BeatGridMarkerBlob>,
    pub adjusted_beat_grid: Vec<BeatGridMarkerBlob>,
}

impl BeatDataBlob {
    pub fn to_blob(&self) -> Result<Vec<u8>> {
        let size = 8
            + 8
            + 1
            + 8
            + self.default_beat_grid.len() * BEAT_MARKER_SIZE
            + 8
            + self.adjusted_beat_grid.len() * BEAT_MARKER_SIZE;
        let mut uncompressed = vec![0u8; size];
        let mut offset = 0;
        offset = encode_f64_be(self.sample_rate, &mut uncompressed, offset);
        offset = encode_i64_be(self.samples, &mut uncompressed, offset);
        offset = encode_u8(self.is_beatgrid_set as u8, &mut uncompressed, offset);
        offset = encode_i64_be(self.default_beat_grid.len() as i64, &mut uncompressed, offset);
        for marker in &self.default_beat_grid {
            offset = marker.encode(&mut uncompressed, offset);
        }
        offset = encode_i64_be(self.adjusted_beat_grid.len() as i64, &mut uncompressed, offset);
        for marker in &self.adjusted_beat_grid {
            offset = marker.encode(&mut uncompressed, offset);
        }
        debug_assert_eq!(offset, uncompressed.len());
        zlib_compress(&uncompressed)
    }

    pub fn from_blob(blob: &[u8]) -> Result<Self> {
        let uncompressed = zlib_uncompress(blob)?;
        let (sample_rate, offset) = decode_f64_be(&uncompressed, 0)?;
        let (samples, offset) = decode_i64_be(&uncompressed, offset)?;
        let (is_set, offset) = decode_u8(&uncompressed, offset)?;
        let (default_beat_grid, offset) = Self::decode_grid(&uncompressed, offset)?;
        let (adjusted_beat_grid, offset) = Self::decode_grid(&uncompressed, offset)?;
        expect_consumed(&uncompressed, offset, "beat data")?;
        Ok(Self {
            sample_rate,
            samples,
            is_beatgrid_set: is_set != 0,
            default_beat_grid,
            adjusted_beat_grid,
        })
    }

    fn decode_grid(buf: &[u8], offset: usize) -> Result<(Vec<BeatGridMarkerBlob>, usize)> {
        let (count, mut offset) = decode_i64_be(buf, offset)?;
        let count = check_count(count, BEAT_MARKER_SIZE, buf, offset)?;
        let mut markers = Vec::with_capacity(count);
        for _ in 0..count {
            let (marker, next) = BeatGridMarkerBlob::decode(buf, offset)?;
            markers.push(marker);
            offset = next;
        }
        Ok((markers, offset))
    }
}

/// One hot-cue slot as stored on disk. An unset slot has a negative sample
/// offset, an empty label and a zero colour.
#[derive(Debug, Clone, PartialEq)]
pub struct QuickCueBlob {
    pub label: String,
    pub sample_offset: f64,
    pub color: PadColor,
}

impl QuickCueBlob {
    /// The representation of an unset slot
    pub fn empty() -> Self {
        Self {
            label: String::new(),
            sample_offset: -1.0,
            color: PadColor::default(),
        }
    }

    pub fn is_set(&self) -> bool {
        self.sample_offset >= 0.0
    }

    fn encoded_size(&self) -> usize {
        8 + self.label.len() + 8 + 4
    }

    fn encode(&self, buf: &mut [u8], offset: usize) -> usize {
        let offset = encode_i64_be(self.label.len() as i64, buf, offset);
        let offset = encode_bytes(self.label.as_bytes(), buf, offset);
        let offset = encode_f64_be(self.sample_offset, buf, offset);
        let offset = encode_u8(self.color.a, buf, offset);
        let offset = encode_u8(self.color.r, buf, offset);
        let offset = encode_u8(self.color.g, buf, offset);
        encode_u8(self.color.b, buf, offset)
    }

    fn decode(buf: &[u8], offset: usize) -> Result<(Self, usize)> {
        let (label, offset) = decode_label(buf, offset)?;
        let (sample_offset, offset) = decode_f64_be(buf, offset)?;
        let (a, offset) = decode_u8(buf, offset)?;
        let (r, offset) = decode_u8(buf, offset)?;
        let (g, offset) = decode_u8(buf, offset)?;
        let (b, offset) = decode_u8(buf, offset)?;
        Ok((
            Self {
                label,
                sample_offset,
                color: PadColor::new(a, r, g, b),
            },
            offset,
        ))
    }
}

impl Default for QuickCueBlob {
    fn default() -> Self {
        Self::empty()
    }
}

/// Quick-cues blob: the eight hot-cue slots plus the main cue pair
#[derive(Debug, Clone, PartialEq)]
pub struct QuickCuesBlob {
    pub quick_cues: Vec<QuickCueBlob>,
    pub default_main_cue: f64,
    pub is_main_cue_adjusted: bool,
    pub adjusted_main_cue: f64,
}

impl Default for QuickCuesBlob {
    fn default() -> Self {
        Self {
            quick_cues: (0..SLOT_COUNT).map(|_| QuickCueBlob::empty()).collect(),
            default_main_cue: 0.0,
            is_main_cue_adjusted: false,
            adjusted_main_cue: 0.0,
        }
    }
}

impl QuickCuesBlob {
    pub fn to_blob(&self) -> Result<Vec<u8>> {
        let size = 8
            + self
                .quick_cues
                .iter()
                .map(QuickCueBlob::encoded_size)
                .sum::<usize>()
            + 8
            + 1
            + 8;
        let mut uncompressed = vec![0u8; size];
        let mut offset = 0;
        offset = encode_i64_be(self.quick_cues.len() as i64, &mut uncompressed, offset);
        for cue in &self.quick_cues {
            offset = cue.encode(&mut uncompressed, offset);
        }
        offset = encode_f64_be(self.default_main_cue, &mut uncompressed, offset);
        offset = encode_u8(self.is_main_cue_adjusted as u8, &mut uncompressed, offset);
        offset = encode_f64_be(self.adjusted_main_cue, &mut uncompressed, offset);
        debug_assert_eq!(offset, uncompressed.len());
        zlib_compress(&uncompressed)
    }

    pub fn from_blob(blob: &[u8]) -> Result<Self> {
        let uncompressed = zlib_uncompress(blob)?;
        let (count, mut offset) = decode_i64_be(&uncompressed, 0)?;
        // Smallest possible cue: empty label, offset, colour.
        let count = check_count(count, 8 + 8 + 4, &uncompressed, offset)?;
        let mut quick_cues = Vec::with_capacity(count);
        for _ in 0..count {
            let (cue, next) = QuickCueBlob::decode(&uncompressed, offset)?;
            quick_cues.push(cue);
            offset = next;
        }
        let (default_main_cue, offset) = decode_f64_be(&uncompressed, offset)?;
        let (adjusted_flag, offset) = decode_u8(&uncompressed, offset)?;
        let (adjusted_main_cue, offset) = decode_f64_be(&uncompressed, offset)?;
        expect_consumed(&uncompressed, offset, "quick cues")?;
        Ok(Self {
            quick_cues,
            default_main_cue,
            is_main_cue_adjusted: adjusted_flag != 0,
            adjusted_main_cue,
        })
    }
}

/// One loop slot as stored on disk. A slot is unset when neither endpoint
/// flag is set.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopBlob {
    pub label: String,
    pub start_sample_offset: f64,
    pub end_sample_offset: f64,
    pub is_start_set: bool,
    pub is_end_set: bool,
    pub color: PadColor,
}

impl LoopBlob {
    /// The representation of an unset slot
    pub fn empty() -> Self {
        Self {
            label: String::new(),
            start_sample_offset: -1.0,
            end_sample_offset: -1.0,
            is_start_set: false,
            is_end_set: false,
            color: PadColor::default(),
        }
    }

    pub fn is_set(&self) -> bool {
        self.is_start_set && self.is_end_set
    }

    fn encoded_size(&self) -> usize {
        8 + self.label.len() + 8 + 8 + 1 + 1 + 4
    }

    fn encode(&self, buf: &mut [u8], offset: usize) -> usize {
        let offset = encode_i64_be(self.label.len() as i64, buf, offset);
        let offset = encode_bytes(self.label.as_bytes(), buf, offset);
        let offset = encode_f64_be(self.start_sample_offset, buf, offset);
        let offset = encode_f64_be(self.end_sample_offset, buf, offset);
        let offset = encode_u8(self.is_start_set as u8, buf, offset);
        let offset = encode_u8(self.is_end_set as u8, buf, offset);
        let offset = encode_u8(self.color.a, buf, offset);
        let offset = encode_u8(self.color.r, buf, offset);
        let offset = encode_u8(self.color.g, buf, offset);
        encode_u8(self.color.b, buf, offset)
    }

    fn decode(buf: &[u8], offset: usize) -> Result<(Self, usize)> {
        let (label, offset) = decode_label(buf, offset)?;
        let (start_sample_offset, offset) = decode_f64_be(buf, offset)?;
        let (end_sample_offset, offset) = decode_f64_be(buf, offset)?;
        let (start_flag, offset) = decode_u8(buf, offset)?;
        let (end_flag, offset) = decode_u8(buf, offset)?;
        let (a, offset) = decode_u8(buf, offset)?;
        let (r, offset) = decode_u8(buf, offset)?;
        let (g, offset) = decode_u8(buf, offset)?;
        let (b, offset) = decode_u8(buf, offset)?;
        Ok((
            Self {
                label,
                start_sample_offset,
                end_sample_offset,
                is_start_set: start_flag != 0,
                is_end_set: end_flag != 0,
                color: PadColor::new(a, r, g, b),
            },
            offset,
        ))
    }
}

impl Default for LoopBlob {
    fn default() -> Self {
        Self::empty()
    }
}

/// Loops blob: the eight loop slots
#[derive(Debug, Clone, PartialEq)]
pub struct LoopsBlob {
    pub loops: Vec<LoopBlob>,
}

impl Default for LoopsBlob {
    fn default() -> Self {
        Self {
            loops: (0..SLOT_COUNT).map(|_| LoopBlob::empty()).collect(),
        }
    }
}

impl LoopsBlob {
    pub fn to_blob(&self) -> Result<Vec<u8>> {
        let size = 8 + self.loops.iter().map(LoopBlob::encoded_size).sum::<usize>();
        let mut uncompressed = vec![0u8; size];
        let mut offset = 0;
        offset = encode_i64_be(self.loops.len() as i64, &mut uncompressed, offset);
        for l in &self.loops {
            offset = l.encode(&mut uncompressed, offset);
        }
        debug_assert_eq!(offset, uncompressed.len());
        zlib_compress(&uncompressed)
    }

    pub fn from_blob(blob: &[u8]) -> Result<Self> {
        let uncompressed = zlib_uncompress(blob)?;
        let (count, mut offset) = decode_i64_be(&uncompressed, 0)?;
        // Smallest possible loop: empty label, endpoints, flags, colour.
        let count = check_count(count, 8 + 8 + 8 + 2 + 4, &uncompressed, offset)?;
        let mut loops = Vec::with_capacity(count);
        for _ in 0..count {
            let (l, next) = LoopBlob::decode(&uncompressed, offset)?;
            loops.push(l);
            offset = next;
        }
        expect_consumed(&uncompressed, offset, "loops")?;
        Ok(Self { loops })
    }
}

/// Overview-waveform blob: fixed-resolution per-band amplitude data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverviewWaveformBlob {
    /// Number of audio samples each entry covers, a hardware constant for
    /// the track's sample rate
    pub samples_per_entry: i64,
    pub entries: Vec<WaveformEntry>,
}

impl OverviewWaveformBlob {
    pub fn to_blob(&self) -> Result<Vec<u8>> {
        let size = 8 + 8 + self.entries.len() * 6;
        let mut uncompressed = vec![0u8; size];
        let mut offset = 0;
        offset = encode_i64_be(self.entries.len() as i64, &mut uncompressed, offset);
        offset = encode_i64_be(self.samples_per_entry, &mut uncompressed, offset);
        for entry in &self.entries {
            offset = encode_u8(entry.low.value, &mut uncompressed, offset);
            offset = encode_u8(entry.low.opacity, &mut uncompressed, offset);
            offset = encode_u8(entry.mid.value, &mut uncompressed, offset);
            offset = encode_u8(entry.mid.opacity, &mut uncompressed, offset);
            offset = encode_u8(entry.high.value, &mut uncompressed, offset);
            offset = encode_u8(entry.high.opacity, &mut uncompressed, offset);
        }
        debug_assert_eq!(offset, uncompressed.len());
        zlib_compress(&uncompressed)
    }

    pub fn from_blob(blob: &[u8]) -> Result<Self> {
        let uncompressed = zlib_uncompress(blob)?;
        let (count, offset) = decode_i64_be(&uncompressed, 0)?;
        let (samples_per_entry, mut offset) = decode_i64_be(&uncompressed, offset)?;
        let count = check_count(count, 6, &uncompressed, offset)?;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let (low_value, next) = decode_u8(&uncompressed, offset)?;
            let (low_opacity, next) = decode_u8(&uncompressed, next)?;
            let (mid_value, next) = decode_u8(&uncompressed, next)?;
            let (mid_opacity, next) = decode_u8(&uncompressed, next)?;
            let (high_value, next) = decode_u8(&uncompressed, next)?;
            let (high_opacity, next) = decode_u8(&uncompressed, next)?;
            entries.push(WaveformEntry {
                low: WaveformPoint {
                    value: low_value,
                    opacity: low_opacity,
                },
                mid: WaveformPoint {
                    value: mid_value,
                    opacity: mid_opacity,
                },
                high: WaveformPoint {
                    value: high_value,
                    opacity: high_opacity,
                },
            });
            offset = next;
        }
        expect_consumed(&uncompressed, offset, "waveform")?;
        Ok(Self {
            samples_per_entry,
            entries,
        })
    }
}

/// Waveform resolution the hardware requires for a sample rate, in audio
/// samples per waveform entry. The two standard studio rates are pinned;
/// anything else scales from the 44.1 kHz figure.
pub fn required_waveform_samples_per_entry(sample_rate: f64) -> i64 {
    if sample_rate == 44100.0 {
        105
    } else if sample_rate == 48000.0 {
        115
    } else {
        (sample_rate * 105.0 / 44100.0).ceil() as i64
    }
}

/// Number of waveform entries a writer must produce for a sample count
pub fn waveform_entry_count(sample_count: i64, samples_per_entry: i64) -> i64 {
    if samples_per_entry <= 0 {
        return 0;
    }
    (sample_count + samples_per_entry - 1) / samples_per_entry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_data_roundtrip() {
        let blob = TrackDataBlob {
            sample_rate: 44100.0,
            samples: 16_140_600,
            average_loudness: 0.5,
            key: 9,
        };
        let encoded = blob.to_blob().unwrap();
        assert_eq!(TrackDataBlob::from_blob(&encoded).unwrap(), blob);
    }

    #[test]
    fn test_track_data_wrong_length_rejected() {
        let compressed = crate::codec::zlib_compress(&[0u8; 27]).unwrap();
        assert!(matches!(
            TrackDataBlob::from_blob(&compressed),
            Err(Error::MalformedBlob(_))
        ));
    }

    #[test]
    fn test_beat_data_roundtrip_preserves_unknown_fields() {
        let blob = BeatDataBlob {
            sample_rate: 44100.0,
            samples: 16_140_600,
            is_beatgrid_set: true,
            default_beat_grid: vec![
                BeatGridMarkerBlob {
                    sample_offset: -83316.78,
                    beat_number: -4,
                    unknown1: 0x5A5A_0001,
                    unknown2: -7,
                },
                BeatGridMarkerBlob {
                    sample_offset: 17_470_734.439,
                    beat_number: 812,
                    unknown1: 0,
                    unknown2: 0,
                },
            ],
            adjusted_beat_grid: vec![BeatGridMarkerBlob {
                sample_offset: 1000.0,
                beat_number: 1,
                unknown1: 42,
                unknown2: 43,
            }],
        };
        let encoded = blob.to_blob().unwrap();
        let decoded = BeatDataBlob::from_blob(&encoded).unwrap();
        assert_eq!(decoded, blob);
        assert_eq!(decoded.default_beat_grid[0].unknown1, 0x5A5A_0001);
        assert_eq!(decoded.default_beat_grid[0].unknown2, -7);
    }

    #[test]
    fn test_beat_data_truncated_rejected() {
        let blob = BeatDataBlob {
            sample_rate: 44100.0,
            samples: 1000,
            is_beatgrid_set: false,
            default_beat_grid: vec![BeatGridMarkerBlob::default()],
            adjusted_beat_grid: vec![],
        };
        let encoded = blob.to_blob().unwrap();
        let mut uncompressed = zlib_uncompress(&encoded).unwrap();
        uncompressed.truncate(uncompressed.len() - 4);
        let rewrapped = zlib_compress(&uncompressed).unwrap();
        assert!(BeatDataBlob::from_blob(&rewrapped).is_err());
    }

    #[test]
    fn test_quick_cues_roundtrip() {
        let mut blob = QuickCuesBlob::default();
        blob.quick_cues[0] = QuickCueBlob {
            label: "Cue 1".into(),
            sample_offset: 1_377_924.5,
            color: PadColor::new(0xFF, 0xEA, 0x8D, 0x16),
        };
        blob.default_main_cue = 2732.0;
        blob.adjusted_main_cue = 2732.0;
        blob.is_main_cue_adjusted = false;
        let encoded = blob.to_blob().unwrap();
        let decoded = QuickCuesBlob::from_blob(&encoded).unwrap();
        assert_eq!(decoded, blob);
        assert!(decoded.quick_cues[0].is_set());
        assert!(!decoded.quick_cues[1].is_set());
    }

    #[test]
    fn test_quick_cue_unicode_label() {
        let mut blob = QuickCuesBlob::default();
        blob.quick_cues[3] = QuickCueBlob {
            label: "ドロップ".into(),
            sample_offset: 44100.0,
            color: PadColor::new(0xFF, 0x04, 0xA9, 0xBE),
        };
        let encoded = blob.to_blob().unwrap();
        assert_eq!(QuickCuesBlob::from_blob(&encoded).unwrap(), blob);
    }

    #[test]
    fn test_loops_roundtrip() {
        let mut blob = LoopsBlob::default();
        blob.loops[0] = LoopBlob {
            label: "Loop 1".into(),
            start_sample_offset: 1144.012,
            end_sample_offset: 345_339.134,
            is_start_set: true,
            is_end_set: true,
            color: PadColor::new(0xFF, 0xEA, 0x8D, 0x16),
        };
        let encoded = blob.to_blob().unwrap();
        let decoded = LoopsBlob::from_blob(&encoded).unwrap();
        assert_eq!(decoded, blob);
        assert!(decoded.loops[0].is_set());
        assert!(!decoded.loops[7].is_set());
    }

    #[test]
    fn test_waveform_roundtrip() {
        let entry = WaveformEntry {
            low: WaveformPoint { value: 0, opacity: 255 },
            mid: WaveformPoint { value: 42, opacity: 255 },
            high: WaveformPoint { value: 255, opacity: 255 },
        };
        let blob = OverviewWaveformBlob {
            samples_per_entry: 105,
            entries: vec![entry; 1000],
        };
        let encoded = blob.to_blob().unwrap();
        let decoded = OverviewWaveformBlob::from_blob(&encoded).unwrap();
        assert_eq!(decoded, blob);
    }

    #[test]
    fn test_oversized_count_rejected() {
        let mut uncompressed = vec![0u8; 8];
        encode_i64_be(i64::MAX, &mut uncompressed, 0);
        let blob = zlib_compress(&uncompressed).unwrap();
        assert!(matches!(
            LoopsBlob::from_blob(&blob),
            Err(Error::MalformedBlob(_))
        ));
        assert!(matches!(
            QuickCuesBlob::from_blob(&blob),
            Err(Error::MalformedBlob(_))
        ));
    }

    #[test]
    fn test_samples_per_entry_table() {
        assert_eq!(required_waveform_samples_per_entry(44100.0), 105);
        assert_eq!(required_waveform_samples_per_entry(48000.0), 115);
        assert_eq!(required_waveform_samples_per_entry(88200.0), 210);
        assert_eq!(required_waveform_samples_per_entry(22050.0), 53);
    }

    #[test]
    fn test_waveform_entry_count() {
        assert_eq!(waveform_entry_count(16_140_600, 105), 153_720);
        assert_eq!(waveform_entry_count(1, 105), 1);
        assert_eq!(waveform_entry_count(0, 105), 0);
        assert_eq!(waveform_entry_count(106, 105), 2);
    }
}
