// Integration tests for the GUS amplitude envelope over a held-then-released note

use std::sync::Arc;

use wavemix::config::VoiceFilterMode;
use wavemix::envelope::{finish_note, start_note, update_envelope, update_signal, DefaultHost, EnvelopeContext, NoteStart};
use wavemix::fixed::OFFSET_MAX;
use wavemix::voice::{ChannelState, Sample, Voice, VoiceStatus, EG_GUS_DECAY, EG_GUS_RELEASE1, EG_GUS_RELEASE2};

const ATTACK_RATE: i32 = OFFSET_MAX / 40;
const RELEASE_RATE: i32 = OFFSET_MAX / 500;
const HELD_BLOCKS: usize = 200;

/// Attack to full scale, decay and sustain already at their targets, release to zero
fn scenario_sample() -> Sample {
    Sample::new(vec![8000; 256], 44100, 440.0).with_loop(0, 256).with_envelope(
        [OFFSET_MAX, OFFSET_MAX, OFFSET_MAX, 0, 0, 0],
        [ATTACK_RATE, 1 << 20, 1 << 20, RELEASE_RATE, RELEASE_RATE, RELEASE_RATE],
    )
}

/// Channel without envelope-time controllers so the instrument rates apply as-is
fn plain_channel() -> ChannelState {
    ChannelState { envelope_rate: [None; 6], ..ChannelState::default() }
}

fn context(channel: &ChannelState) -> EnvelopeContext<'_> {
    EnvelopeContext {
        sample_rate: 44100.0,
        control_ratio: 44,
        min_sustain_time: 0,
        modulation_envelope: false,
        channel,
        host: &DefaultHost,
    }
}

fn start(ctx: &EnvelopeContext) -> Voice {
    let mut voice = Voice::new(Arc::new(scenario_sample()), 0, 60, 127);
    let note = NoteStart {
        panning: 64,
        master_volume: 1.0,
        effects_active: false,
        pan_delay: false,
        filter: VoiceFilterMode::Off,
    };
    start_note(&mut voice, ctx, &note);
    voice
}

#[test]
fn test_stage_transitions_on_expected_blocks() {
    let channel = plain_channel();
    let ctx = context(&channel);
    let mut voice = start(&ctx);
    assert_eq!(voice.envelope_stage, EG_GUS_DECAY, "note start enters the attack ramp");

    // The attack overshoots full scale on the first block past OFFSET_MAX / rate
    let attack_end = (OFFSET_MAX / ATTACK_RATE + 1) as usize;
    let mut last_stage = voice.envelope_stage;
    for block in 1..=HELD_BLOCKS {
        assert!(!update_signal(&mut voice, &ctx), "a held note must not end");
        assert!(voice.envelope_stage >= last_stage, "stage went backwards at block {block}");
        assert!((0..=OFFSET_MAX).contains(&voice.envelope_volume));
        last_stage = voice.envelope_stage;

        if block < attack_end {
            assert_eq!(voice.envelope_stage, EG_GUS_DECAY, "still attacking at block {block}");
        } else {
            assert_eq!(voice.envelope_stage, EG_GUS_RELEASE1, "parked before release at block {block}");
            assert_eq!(voice.envelope_volume, OFFSET_MAX);
        }
    }

    finish_note(&mut voice, &ctx);
    assert_eq!(voice.status, VoiceStatus::Off);
    assert_eq!(voice.envelope_stage, EG_GUS_RELEASE2, "key release enters the release ramp");
    assert_eq!(voice.envelope_increment, -RELEASE_RATE);
}

#[test]
fn test_release_time_matches_rate() {
    let channel = plain_channel();
    let ctx = context(&channel);
    let mut voice = start(&ctx);
    for _ in 0..HELD_BLOCKS {
        update_signal(&mut voice, &ctx);
    }
    finish_note(&mut voice, &ctx);
    assert_eq!(voice.status, VoiceStatus::Off, "a sounding note survives its key release");

    // Time the envelope ramp alone; the mix level may reach zero a little earlier
    let expected = OFFSET_MAX as f64 / RELEASE_RATE as f64;
    let mut blocks = 0usize;
    let mut last = voice.envelope_volume;
    while !update_envelope(&mut voice, &ctx) {
        blocks += 1;
        assert!(voice.envelope_volume <= last, "release must not rise");
        assert!(voice.envelope_volume >= 0);
        last = voice.envelope_volume;
        assert!(blocks < 10_000, "release never finished");
    }
    blocks += 1;
    assert!(
        (blocks as f64 - expected).abs() <= 1.0,
        "release took {blocks} blocks, expected {expected:.2}"
    );
    assert!(voice.is_free(), "a finished release returns the voice to the pool");
}

#[test]
fn test_audible_release_never_outlasts_envelope() {
    let channel = plain_channel();
    let ctx = context(&channel);
    let mut voice = start(&ctx);
    for _ in 0..HELD_BLOCKS {
        assert!(!update_signal(&mut voice, &ctx));
    }
    assert!(voice.left_mix > 0, "a held note at full scale is audible");
    finish_note(&mut voice, &ctx);

    let bound = (OFFSET_MAX as f64 / RELEASE_RATE as f64).ceil() as usize + 1;
    let mut blocks = 0usize;
    while !update_signal(&mut voice, &ctx) {
        blocks += 1;
        assert!(blocks <= bound, "voice still sounding after {blocks} blocks");
    }
    assert!(voice.is_free(), "silence after release frees the voice in the same block");
}
