// Integration tests for effect chain construction and replacement

use wavemix::config::{ReverbAlgorithm, SystemMode};
use wavemix::effects::{EffectChain, EffectContext, EffectType, GsInsertion};
use wavemix::engine::{SystemEffects, XgSlot};

#[test]
fn test_rebuild_leaves_only_last_chain() {
    let sequence = [
        vec![EffectType::StereoEq],
        vec![EffectType::Eq2, EffectType::Overdrive1],
        vec![EffectType::HexaChorus],
        vec![EffectType::DelayLcr, EffectType::Lofi, EffectType::AutoWah],
        vec![EffectType::Eq3],
    ];
    let mut chain = EffectChain::default();
    for types in &sequence {
        chain.rebuild(types);
        assert_eq!(&chain.types(), types, "chain should match the latest rebuild");
    }
    assert_eq!(chain.len(), 1, "exactly one stage from the final type survives");
}

#[test]
fn test_gs_insertion_type_changes() {
    let mut fx = SystemEffects::new(SystemMode::Gs, ReverbAlgorithm::Standard, 44100.0, 256);
    let changes = [(0x01, 0x00), (0x01, 0x10), (0x01, 0x40), (0x11, 0x03), (0x01, 0x11)];
    for &(msb, lsb) in &changes {
        fx.set_insertion_gs(msb, lsb).expect("supported insertion type");
    }
    assert_eq!(
        fx.insertion_gs.chain.types(),
        vec![EffectType::Eq2, EffectType::Distortion1],
        "only the chain of the last selected type remains"
    );

    let mut block: Vec<i32> = (0..512).map(|i| if (i / 2) % 50 < 25 { 1 << 24 } else { -(1 << 24) }).collect();
    fx.do_insertion_effect_gs(&mut block);
    assert!(block.iter().any(|&s| s != 0), "the rebuilt chain passes signal");
}

#[test]
fn test_unknown_type_bypasses() {
    let mut fx = SystemEffects::new(SystemMode::Gs, ReverbAlgorithm::Standard, 44100.0, 256);
    fx.set_insertion_gs(0x01, 0x10).expect("overdrive is supported");
    assert!(fx.set_insertion_gs(0x7e, 0x7e).is_err(), "an unknown pair is reported");
    assert!(fx.insertion_gs.chain.is_empty(), "the old chain is torn down");

    let input: Vec<i32> = (0..512).map(|i| (i as i32 - 256) << 12).collect();
    let mut block = input.clone();
    fx.do_insertion_effect_gs(&mut block);
    assert_eq!(block, input, "an empty chain is a pass-through");
}

#[test]
fn test_xg_slot_rebuilds() {
    let mut fx = SystemEffects::new(SystemMode::Xg, ReverbAlgorithm::Standard, 44100.0, 256);
    fx.set_xg_effect(XgSlot::Insertion(0), 0x43, 0x00).expect("flanger");
    fx.set_xg_effect(XgSlot::Insertion(0), 0x49, 0x00).expect("distortion");
    assert_eq!(
        fx.insertion_xg[0].chain.types(),
        vec![EffectType::StereoDistortion, EffectType::OdEq3],
        "the flanger chain is replaced by the distortion chain"
    );
    assert!(fx.set_xg_effect(XgSlot::Insertion(5), 0x49, 0x00).is_err(), "slot out of range");
}

#[test]
fn test_recompute_keeps_chain_shape() {
    let ctx = EffectContext::new(44100.0);
    let params = GsInsertion { type_msb: 0x01, type_lsb: 0x40, ..GsInsertion::default() };
    let mut chain = EffectChain::build(&params.chain_types());
    chain.recompute_gs(&params, &ctx);
    let before = chain.types();
    chain.recompute_gs(&params, &ctx);
    assert_eq!(chain.types(), before, "parameter changes never rebuild the chain");
}
