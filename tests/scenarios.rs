//! End-to-end scenarios from SPEC_FULL.md §8, driven through a committed `Topology`
//! rather than calling fixture blocks' `work()` directly.

use std::time::Duration;

use pothos_core::testing::{CollectorBlock, DifferentialDecoder, FeederBlock, GatewayBlock, GatewayMode, PreambleFramer, SporadicDropper};
use pothos_core::{DType, Topology};

fn settle(topology: &Topology) {
    assert!(topology.wait_inactive(Duration::from_millis(100), Duration::from_secs(5)), "topology never went idle");
}

#[test]
fn scenario_1_passthrough_forwards_bytes_and_labels() {
    let mut topology = Topology::with_default_pool();
    topology.add_block("feeder", Box::new(FeederBlock::counting_int32("feeder", 20)), 0).unwrap();
    topology.add_block("gateway", Box::new(GatewayBlock::new("gateway", DType::int32(), GatewayMode::Forward)), 0).unwrap();
    let (collector, state) = CollectorBlock::new("collector", DType::int32());
    topology.add_block("collector", Box::new(collector), 0).unwrap();

    topology.connect("feeder", "out0", "gateway", "in0").unwrap();
    topology.connect("gateway", "out0", "collector", "in0").unwrap();
    topology.commit().unwrap();

    settle(&topology);

    let state = state.lock();
    let expected: Vec<u8> = (0i32..20).flat_map(|i| i.to_le_bytes()).collect();
    assert_eq!(state.bytes, expected);
    assert!(state.messages.is_empty());

    let mut label_ids: Vec<(&str, usize)> = state.labels.iter().map(|l| (l.id(), l.index())).collect();
    label_ids.sort();
    assert_eq!(label_ids, vec![("lbl0", 3), ("lbl1", 5)]);
}

#[test]
fn scenario_2_drop_mode_yields_an_empty_collector() {
    let mut topology = Topology::with_default_pool();
    topology.add_block("feeder", Box::new(FeederBlock::counting_int32("feeder", 20)), 0).unwrap();
    topology.add_block("gateway", Box::new(GatewayBlock::new("gateway", DType::int32(), GatewayMode::Drop)), 0).unwrap();
    let (collector, state) = CollectorBlock::new("collector", DType::int32());
    topology.add_block("collector", Box::new(collector), 0).unwrap();

    topology.connect("feeder", "out0", "gateway", "in0").unwrap();
    topology.connect("gateway", "out0", "collector", "in0").unwrap();
    topology.commit().unwrap();

    settle(&topology);

    let state = state.lock();
    assert!(state.bytes.is_empty());
    assert!(state.labels.is_empty());
    assert!(state.messages.is_empty());
}

#[test]
fn scenario_3_differential_decoder_through_a_committed_topology() {
    let mut topology = Topology::with_default_pool();
    let feeder = FeederBlock::new("feeder", DType::uint8(), vec![0, 1, 1, 0, 1, 1]);
    topology.add_block("feeder", Box::new(feeder), 0).unwrap();
    topology.add_block("decoder", Box::new(DifferentialDecoder::new("decoder", 2)), 0).unwrap();
    let (collector, state) = CollectorBlock::new("collector", DType::uint8());
    topology.add_block("collector", Box::new(collector), 0).unwrap();

    topology.connect("feeder", "out0", "decoder", "in0").unwrap();
    topology.connect("decoder", "out0", "collector", "in0").unwrap();
    topology.commit().unwrap();

    settle(&topology);

    assert_eq!(state.lock().bytes, vec![0, 1, 0, 1, 1, 0]);
}

#[test]
fn scenario_4_preamble_framer_inserts_preamble_and_shifts_labels() {
    let input: Vec<u8> = (0..40).collect();
    let mut topology = Topology::with_default_pool();
    topology.add_block("feeder", Box::new(FeederBlock::new("feeder", DType::uint8(), input.clone())), 0).unwrap();
    topology
        .add_block("framer", Box::new(PreambleFramer::new("framer", vec![0, 1, 1, 1, 1, 0], 13, 5, 33)), 0)
        .unwrap();
    let (collector, state) = CollectorBlock::new("collector", DType::uint8());
    topology.add_block("collector", Box::new(collector), 0).unwrap();

    topology.connect("feeder", "out0", "framer", "in0").unwrap();
    topology.connect("framer", "out0", "collector", "in0").unwrap();
    topology.commit().unwrap();

    settle(&topology);

    let state = state.lock();
    assert_eq!(state.bytes.len(), 59);
    assert_eq!(&state.bytes[..5], &input[..5]);
    assert_eq!(&state.bytes[5..11], &[0, 1, 1, 1, 1, 0]);
    assert_eq!(&state.bytes[24..], &input[5..]);

    let mut label_ids: Vec<(&str, usize)> = state.labels.iter().map(|l| (l.id(), l.index())).collect();
    label_ids.sort();
    assert_eq!(label_ids, vec![("myFrameEnd", 52), ("myFrameStart", 5)]);
}

#[test]
fn scenario_5_sporadic_dropper_probability_zero_passes_everything() {
    let input: Vec<u8> = (0..16).collect();
    let mut topology = Topology::with_default_pool();
    topology.add_block("feeder", Box::new(FeederBlock::new("feeder", DType::uint8(), input.clone())), 0).unwrap();
    topology.add_block("dropper", Box::new(SporadicDropper::new("dropper", DType::uint8(), 0.0, 1)), 0).unwrap();
    let (collector, state) = CollectorBlock::new("collector", DType::uint8());
    topology.add_block("collector", Box::new(collector), 0).unwrap();

    topology.connect("feeder", "out0", "dropper", "in0").unwrap();
    topology.connect("dropper", "out0", "collector", "in0").unwrap();
    topology.commit().unwrap();

    settle(&topology);

    assert_eq!(state.lock().bytes, input);
}

#[test]
fn scenario_5_sporadic_dropper_probability_one_drops_everything() {
    let input: Vec<u8> = (0..16).collect();
    let mut topology = Topology::with_default_pool();
    topology.add_block("feeder", Box::new(FeederBlock::new("feeder", DType::uint8(), input)), 0).unwrap();
    topology.add_block("dropper", Box::new(SporadicDropper::new("dropper", DType::uint8(), 1.0, 1)), 0).unwrap();
    let (collector, state) = CollectorBlock::new("collector", DType::uint8());
    topology.add_block("collector", Box::new(collector), 0).unwrap();

    topology.connect("feeder", "out0", "dropper", "in0").unwrap();
    topology.connect("dropper", "out0", "collector", "in0").unwrap();
    topology.commit().unwrap();

    settle(&topology);

    let state = state.lock();
    assert!(state.bytes.is_empty());
    assert!(state.labels.is_empty());
}
