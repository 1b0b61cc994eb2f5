//! ProTracker MOD format parser.

use std::io::{Cursor, Read};

use arrayvec::ArrayString;
use binrw::BinRead;
use mp_ir::{Pattern, Sample, Song, DIVISIONS_PER_PATTERN, MAX_SEQUENCE_LEN};

use crate::division_parser::{parse_division, DIVISION_BYTES};
use crate::{FormatError, Layout, LoadOptions, LoadReport, SampleSlots};

const TITLE_BYTES: usize = 20;
const SAMPLE_HEADER_BYTES: usize = 30;
const SEQUENCE_BLOCK_BYTES: usize = 2 + MAX_SEQUENCE_LEN;
const TAG_OFFSET: usize = TITLE_BYTES + 31 * SAMPLE_HEADER_BYTES + SEQUENCE_BLOCK_BYTES;
const TAG_BYTES: usize = 4;

/// One entry of the sample table. Lengths are stored in 16-bit words.
#[derive(BinRead, Debug)]
#[br(big)]
struct SampleHeader {
    name: [u8; 22],
    length_words: u16,
    finetune: u8,
    volume: u8,
    loop_start_words: u16,
    loop_length_words: u16,
}

#[derive(BinRead, Debug)]
#[br(big)]
struct SequenceTable {
    length: u8,
    restart: u8,
    entries: [u8; MAX_SEQUENCE_LEN],
}

/// Load a MOD file from bytes with default options.
pub fn load_mod(data: &[u8]) -> Result<Song, FormatError> {
    load_mod_with(data, &LoadOptions::default()).map(|(song, _)| song)
}

/// Load a MOD file from a reader.
pub fn read_mod<R: Read>(
    mut reader: R,
    options: &LoadOptions,
) -> Result<(Song, LoadReport), FormatError> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    load_mod_with(&data, options)
}

/// Load a MOD file from bytes, reporting any recovered inconsistencies.
pub fn load_mod_with(
    data: &[u8],
    options: &LoadOptions,
) -> Result<(Song, LoadReport), FormatError> {
    let tag = data
        .get(TAG_OFFSET..TAG_OFFSET + TAG_BYTES)
        .and_then(|b| <[u8; TAG_BYTES]>::try_from(b).ok());
    let detected = tag.as_ref().and_then(Layout::from_tag);
    let layout = match detected {
        Some(layout) => layout,
        None => {
            let fallback = options.fallback_layout;
            if fallback.sample_slots == SampleSlots::Extended31 {
                tracing::warn!(
                    tag = ?tag.map(|t| String::from_utf8_lossy(&t).into_owned()),
                    channels = fallback.channels,
                    "unrecognized format tag, assuming fallback layout"
                );
            }
            fallback
        }
    };

    let slots = layout.sample_slots.count();
    let header_len = TITLE_BYTES
        + slots * SAMPLE_HEADER_BYTES
        + SEQUENCE_BLOCK_BYTES
        + match layout.sample_slots {
            SampleSlots::Legacy15 => 0,
            SampleSlots::Extended31 => TAG_BYTES,
        };
    ensure_len(data, header_len)?;

    let mut report = LoadReport {
        tag,
        recognized_tag: detected.is_some(),
        layout,
        invalid_sample_refs: 0,
        padded_samples: 0,
        clipped_loops: 0,
    };

    let mut cursor = Cursor::new(data);
    let mut title = [0u8; TITLE_BYTES];
    cursor.read_exact(&mut title)?;
    let mut song = Song::with_channels(&fixed_string::<TITLE_BYTES>(&title), layout.channels);

    let mut headers = Vec::with_capacity(slots);
    for _ in 0..slots {
        headers.push(SampleHeader::read(&mut cursor)?);
    }
    let table = SequenceTable::read(&mut cursor)?;

    let length = (table.length as usize).min(MAX_SEQUENCE_LEN);
    song.sequence = table.entries[..length].to_vec();
    song.restart_position = table.restart;

    // Unplayed entries past `length` still occupy pattern storage.
    let pattern_count = table.entries.iter().copied().max().unwrap_or(0) as usize + 1;
    let pattern_bytes = DIVISIONS_PER_PATTERN * layout.channels as usize * DIVISION_BYTES;
    let mut offset = header_len;
    ensure_len(data, offset + pattern_count * pattern_bytes)?;

    for _ in 0..pattern_count {
        let pattern = parse_pattern(
            &data[offset..offset + pattern_bytes],
            layout.channels,
            slots,
            &mut report.invalid_sample_refs,
        );
        song.patterns.push(pattern);
        offset += pattern_bytes;
    }
    if report.invalid_sample_refs > 0 {
        tracing::warn!(
            count = report.invalid_sample_refs,
            slots,
            "divisions reference samples outside the sample table"
        );
    }

    for (index, header) in headers.iter().enumerate() {
        let available = data.len().saturating_sub(offset);
        let (sample, consumed, padded) = build_sample(
            index,
            header,
            &data[offset..offset + available],
            options.allow_truncated_samples,
            &mut report,
        )?;
        if padded {
            report.padded_samples += 1;
        }
        offset += consumed;
        song.samples.push(sample);
    }

    tracing::debug!(
        title = %song.title,
        channels = layout.channels,
        samples = slots,
        patterns = pattern_count,
        sequence = length,
        "decoded MOD"
    );

    Ok((song, report))
}

fn ensure_len(data: &[u8], needed: usize) -> Result<(), FormatError> {
    if data.len() < needed {
        return Err(FormatError::UnexpectedEof {
            needed,
            available: data.len(),
        });
    }
    Ok(())
}

/// Decode a NUL-terminated, space-padded ASCII field.
fn fixed_string<const N: usize>(bytes: &[u8]) -> ArrayString<N> {
    let mut out = ArrayString::new();
    for &b in bytes.iter().take(N).take_while(|&&b| b != 0) {
        let c = if b.is_ascii_graphic() { b as char } else { ' ' };
        out.push(c);
    }
    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out
}

fn parse_pattern(data: &[u8], channels: u8, sample_count: usize, invalid: &mut usize) -> Pattern {
    let mut pattern = Pattern::new(channels);
    for (slot, bytes) in data.chunks_exact(DIVISION_BYTES).enumerate() {
        let packed = [bytes[0], bytes[1], bytes[2], bytes[3]];
        let (division, dropped) = parse_division(packed, sample_count);
        if dropped {
            *invalid += 1;
        }
        pattern.data[slot] = division;
    }
    pattern
}

/// Build a sample from its header and the PCM bytes that follow.
///
/// Returns the sample, the number of bytes consumed and whether the PCM
/// had to be padded.
fn build_sample(
    index: usize,
    header: &SampleHeader,
    pcm: &[u8],
    allow_truncated: bool,
    report: &mut LoadReport,
) -> Result<(Sample, usize, bool), FormatError> {
    let length = header.length_words as usize * 2;
    let consumed = length.min(pcm.len());
    let padded = consumed < length;
    if padded {
        if !allow_truncated {
            return Err(FormatError::TruncatedSample {
                index,
                expected: length,
                available: consumed,
            });
        }
        tracing::warn!(index, expected = length, available = consumed, "zero-padding truncated sample");
    }

    let mut data: Vec<f32> = pcm[..consumed]
        .iter()
        .map(|&b| b as i8 as f32 / 128.0)
        .collect();
    data.resize(length, 0.0);
    // The first word holds repeat information, not audio.
    if data.len() >= 2 {
        data[0] = 0.0;
        data[1] = 0.0;
    }

    let name = fixed_string::<22>(&header.name);
    let mut sample = Sample::from_pcm(&name, data);
    sample.set_finetune_nibble(header.finetune);
    sample.default_volume = header.volume.min(64);

    let loop_length = header.loop_length_words as u32 * 2;
    if loop_length > 2 {
        let loop_start = header.loop_start_words as u32 * 2;
        let len = length as u32;
        sample.loop_start = loop_start;
        sample.loop_length = loop_length;
        if loop_start + loop_length > len {
            sample.loop_length = len.saturating_sub(loop_start);
            report.clipped_loops += 1;
            tracing::warn!(index, loop_start, loop_length, len, "loop runs past sample end, clipped");
        }
    }

    Ok((sample, consumed, padded))
}
