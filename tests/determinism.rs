// Integration tests for repeatable rendering

use std::sync::Arc;

use wavemix::envelope::{start_note, DefaultHost, EnvelopeContext, NoteStart};
use wavemix::mixer::VoiceMixer;
use wavemix::voice::ChannelState;
use wavemix::{ControlMessage, Engine, Sample, SynthConfig, SystemMode, Voice};

fn saw_sample() -> Arc<Sample> {
    let data: Vec<i16> = (0..512).map(|i| ((i % 64) as i16 - 32) * 900).collect();
    Arc::new(
        Sample::new(data, 44100, 440.0)
            .with_loop(0, 512)
            .with_envelope(
                [1 << 29, 1 << 28, 1 << 28, 0, 0, 0],
                [1 << 23, 1 << 20, 1 << 20, 1 << 21, 1 << 21, 1 << 21],
            ),
    )
}

/// Play a short phrase with effects changing between blocks
fn render_phrase(config: SynthConfig) -> Vec<i32> {
    let mut engine = Engine::new(config).expect("valid config");
    let sender = engine.sender();
    let block = 2 * engine.config().block_size;
    let mut out = Vec::new();
    let mut buf = vec![0i32; block];

    let a = engine.note_on(0, 60, 100, saw_sample(), 20).expect("voice");
    engine.note_on(1, 67, 90, saw_sample(), 110).expect("voice");
    sender
        .send(ControlMessage::SetChannelSends { channel: 1, reverb: Some(100), chorus: Some(60), delay: Some(40) })
        .expect("queued");
    for i in 0..48 {
        match i {
            8 => sender.send(ControlMessage::SetReverbMacro { value: 4 }).expect("queued"),
            16 => engine.release_voice(a).expect("voice exists"),
            24 => sender.send(ControlMessage::SetChorusMacro { value: 2 }).expect("queued"),
            _ => {}
        }
        engine.render_block(&mut buf);
        out.extend_from_slice(&buf);
    }
    out
}

#[test]
fn test_identical_engines_render_identically() {
    let first = render_phrase(SynthConfig::default());
    let second = render_phrase(SynthConfig::default());
    assert!(first.iter().any(|&s| s != 0), "the phrase must be audible");
    assert_eq!(first, second, "same input must give the same output");
}

#[test]
fn test_xg_engines_render_identically() {
    let config = SynthConfig { system_mode: SystemMode::Xg, ..SynthConfig::default() };
    assert_eq!(render_phrase(config.clone()), render_phrase(config));
}

#[test]
fn test_restored_voice_remixes_identically() {
    let config = SynthConfig::default();
    let channel = ChannelState::default();
    let ctx = EnvelopeContext::new(&config, &channel, &DefaultHost);
    let mut voice = Voice::new(saw_sample(), 0, 64, 110);
    let start = NoteStart {
        panning: 40,
        master_volume: config.master_volume(),
        effects_active: config.effects_active(),
        pan_delay: false,
        filter: config.voice_filter,
    };
    start_note(&mut voice, &ctx, &start);

    let count = config.block_size;
    let mut mixer = VoiceMixer::new(&config);
    let mut warmup = vec![0i32; 2 * count];
    for _ in 0..5 {
        mixer.mix_voice(&mut warmup, &mut voice, &ctx, count);
    }

    let snapshot = voice.clone();
    let mut first = vec![0i32; 2 * count];
    mixer.mix_voice(&mut first, &mut voice, &ctx, count);

    let mut restored = snapshot;
    let mut second = vec![0i32; 2 * count];
    VoiceMixer::new(&config).mix_voice(&mut second, &mut restored, &ctx, count);

    assert!(first.iter().any(|&s| s != 0));
    assert_eq!(first, second, "a restored voice must render the same block");
}

#[test]
fn test_mixing_is_additive() {
    let config = SynthConfig::default();
    let channel = ChannelState::default();
    let ctx = EnvelopeContext::new(&config, &channel, &DefaultHost);
    let start = NoteStart {
        panning: 64,
        master_volume: config.master_volume(),
        effects_active: false,
        pan_delay: false,
        filter: config.voice_filter,
    };
    let mut voice = Voice::new(saw_sample(), 0, 60, 100);
    start_note(&mut voice, &ctx, &start);
    let count = config.block_size;

    let mut alone = vec![0i32; 2 * count];
    VoiceMixer::new(&config).mix_voice(&mut alone, &mut voice.clone(), &ctx, count);

    let mut offset = vec![1000i32; 2 * count];
    VoiceMixer::new(&config).mix_voice(&mut offset, &mut voice, &ctx, count);

    for (a, b) in alone.iter().zip(&offset) {
        assert_eq!(a + 1000, *b, "a voice adds into the buffer, never overwrites it");
    }
}
