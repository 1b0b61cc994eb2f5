//! End-to-end: synthetic MOD bytes → loader → sequencer → rendered audio.

mod common;

use approx::assert_relative_eq;
use common::{square, ModFile, SampleSpec};
use mp_engine::{PlayMode, Sequencer};
use mp_master::{Controller, PlaybackConfig};

/// Frames per division at 44100 Hz, 125 BPM, 6 ticks.
const SPD: usize = 5292;
const LIMIT: usize = 44100 * 20;

fn controller(file: &ModFile) -> Controller {
    let mut ctrl = Controller::new();
    ctrl.load_mod(&file.build()).unwrap();
    ctrl
}

fn render(file: &ModFile, mode: PlayMode) -> Vec<f32> {
    let config = PlaybackConfig {
        mode,
        ..PlaybackConfig::default()
    };
    controller(file).render_frames(&config, LIMIT).unwrap()
}

fn has_signal(frames: &[f32]) -> bool {
    frames.iter().any(|&s| s != 0.0)
}

fn square_song() -> ModFile {
    ModFile::new(b"M.K.", 4).sample(SampleSpec::new("square", square(4000, 32)))
}

#[test]
fn note_plays_and_stays_bounded() {
    let file = square_song().note(0, 0, 0, 1, 428, 0).effect(0, 1, 0, 0xD00);
    let frames = render(&file, PlayMode::PlayOnce);
    assert_eq!(frames.len(), 2 * SPD);
    assert!(has_signal(&frames));
    assert!(frames.iter().all(|s| s.abs() < 1.0));
}

#[test]
fn four_channels_stay_bounded() {
    let mut file = square_song();
    for ch in 0..4 {
        file = file.note(0, 0, ch, 1, 214 + ch as u16 * 50, 0);
    }
    let frames = render(&file.effect(0, 1, 0, 0xD00), PlayMode::PlayOnce);
    assert!(frames.iter().all(|s| s.abs() < 1.0));
    assert!(frames.iter().any(|s| s.abs() > 0.9));
}

#[test]
fn volume_zero_mutes_the_note() {
    let file = square_song().note(0, 0, 0, 1, 428, 0xC00).effect(0, 1, 0, 0xD00);
    let frames = render(&file, PlayMode::PlayOnce);
    assert_eq!(frames.len(), 2 * SPD);
    assert!(!has_signal(&frames));
}

#[test]
fn speed_and_tempo_effects_shorten_divisions() {
    let file = square_song()
        .effect(0, 0, 0, 0xF03)
        .effect(0, 0, 1, 0xFFA)
        .effect(0, 1, 0, 0xD00);
    let frames = render(&file, PlayMode::PlayOnce);
    // 3 ticks at 250 BPM
    assert_eq!(frames.len(), 2 * 1323);
}

#[test]
fn stop_effect_ends_play_once() {
    let file = square_song().note(0, 0, 0, 1, 428, 0).effect(0, 2, 0, 0xF00);
    assert_eq!(render(&file, PlayMode::PlayOnce).len(), 2 * SPD);
}

#[test]
fn position_jump_back_never_ends() {
    let file = square_song().effect(0, 3, 0, 0xB00);
    assert_eq!(render(&file, PlayMode::PlayOnce).len(), LIMIT);
}

#[test]
fn end_of_song_follows_mode_and_restart_entry() {
    let file = square_song()
        .sequence(&[0, 0])
        .effect(0, 0, 0, 0xD00)
        .restart(1);
    assert_eq!(render(&file, PlayMode::PlayOnce).len(), 2 * SPD);
    assert_eq!(render(&file, PlayMode::LoopOnlyIfDeclared).len(), LIMIT);

    let undeclared = square_song()
        .sequence(&[0, 0])
        .effect(0, 0, 0, 0xD00)
        .restart(127);
    assert_eq!(render(&undeclared, PlayMode::LoopOnlyIfDeclared).len(), 2 * SPD);
    assert_eq!(render(&undeclared, PlayMode::Loop).len(), LIMIT);
}

#[test]
fn missing_sample_reference_is_silent() {
    // only 31 slots exist
    let file = square_song().note(0, 0, 0, 32, 428, 0).effect(0, 1, 0, 0xD00);
    let ctrl = controller(&file);
    assert_eq!(ctrl.load_report().unwrap().invalid_sample_refs, 1);

    let config = PlaybackConfig {
        mode: PlayMode::PlayOnce,
        ..PlaybackConfig::default()
    };
    let frames = ctrl.render_frames(&config, LIMIT).unwrap();
    assert_eq!(frames.len(), 2 * SPD);
    assert!(!has_signal(&frames));
}

#[test]
fn eight_channel_module_plays_last_channel() {
    let file = ModFile::new(b"8CHN", 8)
        .sample(SampleSpec::new("square", square(4000, 32)))
        .note(0, 0, 7, 1, 428, 0)
        .effect(0, 1, 0, 0xD00);
    let ctrl = controller(&file);
    assert_eq!(ctrl.song().channels, 8);

    let mut seq = Sequencer::new(ctrl.song().clone(), 44100, PlayMode::PlayOnce, 125.0).unwrap();
    let mut buf = vec![0.0f32; SPD - 1];
    seq.generate(&mut buf);
    assert!(has_signal(&buf));
    assert!(seq.channel(7).unwrap().active);
    assert_eq!(seq.channel(7).unwrap().sample_name, "square");
}

#[test]
fn looping_sample_sustains() {
    let file = ModFile::new(b"M.K.", 4)
        .sample(SampleSpec::new("loop", square(64, 8)).looped(0, 64))
        .note(0, 0, 0, 1, 428, 0)
        .effect(0, 7, 0, 0xD00);
    let frames = render(&file, PlayMode::PlayOnce);
    assert_eq!(frames.len(), 8 * SPD);
    assert!(has_signal(&frames[frames.len() - 1000..]));
}

#[test]
fn one_shot_sample_runs_out() {
    let file = ModFile::new(b"M.K.", 4)
        .sample(SampleSpec::new("blip", square(64, 8)))
        .note(0, 0, 0, 1, 428, 0)
        .effect(0, 1, 0, 0xD00);
    let frames = render(&file, PlayMode::PlayOnce);
    // 64 frames at increment 8287/44100 last about 340 output frames
    assert!(has_signal(&frames[..400]));
    assert!(!has_signal(&frames[400..]));
}

#[test]
fn seeded_render_is_reproducible() {
    let mut file = ModFile::new(b"M.K.", 4)
        .sample(SampleSpec::new("loop", square(512, 16)).looped(0, 512))
        .note(0, 0, 0, 1, 428, 0xE43);
    for div in 1..16 {
        file = file.effect(0, div, 0, 0x488);
    }
    let file = file.effect(0, 16, 0, 0xD00);

    let ctrl = controller(&file);
    let config = PlaybackConfig {
        mode: PlayMode::PlayOnce,
        seed: 99,
        ..PlaybackConfig::default()
    };
    let a = ctrl.render_frames(&config, LIMIT).unwrap();
    let b = ctrl.render_frames(&config, LIMIT).unwrap();
    assert_eq!(a.len(), 17 * SPD);
    assert_eq!(a, b);
}

#[test]
fn wav_export_matches_render_length() {
    let file = square_song().note(0, 0, 0, 1, 428, 0).effect(0, 1, 0, 0xD00);
    let config = PlaybackConfig {
        mode: PlayMode::PlayOnce,
        ..PlaybackConfig::default()
    };
    let wav = controller(&file).render_to_wav(&config, 10).unwrap();
    assert_eq!(wav.len(), 44 + 2 * 2 * SPD);
    assert_eq!(&wav[36..40], b"data");
}

#[test]
fn unit_rate_note_reproduces_pcm_through_soft_clip() {
    let pcm: Vec<i8> = vec![100, 100, 64, -64, 127, -128, 32, -16];
    let file = ModFile::new(b"M.K.", 4)
        .sample(SampleSpec::new("pcm", pcm.clone()))
        .note(0, 0, 0, 1, 428, 0);
    let song = controller(&file).song().clone();

    // 8287 Hz at period 428 advances exactly one sample frame per output frame
    let mut seq = Sequencer::new(song, 8287, PlayMode::PlayOnce, 125.0).unwrap();
    let mut buf = vec![0.0f32; 10];
    seq.generate(&mut buf);

    assert_eq!(buf[0], 0.0);
    assert_eq!(buf[1], 0.0);
    for (i, &v) in pcm.iter().enumerate().skip(2) {
        assert_relative_eq!(buf[i], (v as f32 / 128.0).tanh(), epsilon = 1e-6);
    }
    assert_eq!(&buf[8..], &[0.0, 0.0]);
}
