//! Synthetic MOD files for the end-to-end tests.

#![allow(dead_code)]

/// One sample slot: name, signed PCM, volume and loop in frames.
pub struct SampleSpec {
    pub name: &'static str,
    pub pcm: Vec<i8>,
    pub volume: u8,
    pub finetune: u8,
    pub loop_start: usize,
    pub loop_length: usize,
}

impl SampleSpec {
    pub fn new(name: &'static str, pcm: Vec<i8>) -> Self {
        Self {
            name,
            pcm,
            volume: 64,
            finetune: 0,
            loop_start: 0,
            loop_length: 0,
        }
    }

    pub fn looped(mut self, start: usize, length: usize) -> Self {
        self.loop_start = start;
        self.loop_length = length;
        self
    }
}

/// A square wave, loud enough to survive the silenced lead-in frames.
pub fn square(frames: usize, half_period: usize) -> Vec<i8> {
    (0..frames)
        .map(|i| if (i / half_period) % 2 == 0 { 96 } else { -96 })
        .collect()
}

/// Builds a tagged MOD file note by note.
pub struct ModFile {
    tag: [u8; 4],
    channels: usize,
    samples: Vec<SampleSpec>,
    sequence: Vec<u8>,
    restart: u8,
    notes: Vec<(usize, usize, usize, [u8; 4])>,
}

impl ModFile {
    pub fn new(tag: &[u8; 4], channels: usize) -> Self {
        Self {
            tag: *tag,
            channels,
            samples: Vec::new(),
            sequence: vec![0],
            restart: 0,
            notes: Vec::new(),
        }
    }

    pub fn sample(mut self, sample: SampleSpec) -> Self {
        self.samples.push(sample);
        self
    }

    pub fn sequence(mut self, entries: &[u8]) -> Self {
        self.sequence = entries.to_vec();
        self
    }

    pub fn restart(mut self, entry: u8) -> Self {
        self.restart = entry;
        self
    }

    /// Place a note. `sample` is 1-based (0 = none); `effect` is the
    /// 12-bit command, e.g. `0xC20` for set-volume 32.
    pub fn note(
        mut self,
        pattern: usize,
        division: usize,
        channel: usize,
        sample: u8,
        period: u16,
        effect: u16,
    ) -> Self {
        let bytes = [
            (sample & 0xF0) | ((period >> 8) as u8 & 0x0F),
            period as u8,
            ((sample & 0x0F) << 4) | ((effect >> 8) as u8 & 0x0F),
            effect as u8,
        ];
        self.notes.push((pattern, division, channel, bytes));
        self
    }

    pub fn effect(self, pattern: usize, division: usize, channel: usize, effect: u16) -> Self {
        self.note(pattern, division, channel, 0, 0, effect)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut title = [0u8; 20];
        title[..9].copy_from_slice(b"synthetic");
        out.extend_from_slice(&title);

        for i in 0..31 {
            let mut header = [0u8; 30];
            if let Some(s) = self.samples.get(i) {
                header[..s.name.len()].copy_from_slice(s.name.as_bytes());
                header[22..24].copy_from_slice(&((s.pcm.len() / 2) as u16).to_be_bytes());
                header[24] = s.finetune;
                header[25] = s.volume;
                header[26..28].copy_from_slice(&((s.loop_start / 2) as u16).to_be_bytes());
                header[28..30].copy_from_slice(&((s.loop_length / 2) as u16).to_be_bytes());
            }
            out.extend_from_slice(&header);
        }

        out.push(self.sequence.len() as u8);
        out.push(self.restart);
        let mut table = [0u8; 128];
        table[..self.sequence.len()].copy_from_slice(&self.sequence);
        out.extend_from_slice(&table);
        out.extend_from_slice(&self.tag);

        let patterns = table.iter().copied().max().unwrap_or(0) as usize + 1;
        let pattern_bytes = 64 * self.channels * 4;
        let base = out.len();
        out.resize(base + patterns * pattern_bytes, 0);
        for &(p, d, c, bytes) in &self.notes {
            let at = base + p * pattern_bytes + (d * self.channels + c) * 4;
            out[at..at + 4].copy_from_slice(&bytes);
        }

        for s in &self.samples {
            out.extend(s.pcm.iter().map(|&v| v as u8));
        }
        out
    }
}
