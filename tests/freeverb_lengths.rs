// Integration tests for Freeverb line sizing against the reverb time

use wavemix::engine::system::reverb::Freeverb;
use wavemix::engine::system::ReverbStatusGs;
use wavemix::fixed::{is_prime, next_prime};

const COMB_TUNINGS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const STEREO_SPREAD: usize = 23;

/// Comb length before rounding up to a prime
fn scaled_target(tuning: usize, sample_rate: f64, time: f64) -> f64 {
    (tuning as f64 * sample_rate * time / 44100.0).max(10.0)
}

fn check_lengths(status: &ReverbStatusGs, sample_rate: f64) {
    let mut reverb = Freeverb::new();
    reverb.update(status, sample_rate);
    let time = Freeverb::time_scale(status);
    let (left, right) = reverb.comb_lengths();

    for (i, &tuning) in COMB_TUNINGS.iter().enumerate() {
        for (len, tuning) in [(left[i], tuning), (right[i], tuning + STEREO_SPREAD)] {
            let target = scaled_target(tuning, sample_rate, time);
            assert!(is_prime(len as i32), "comb {i} length {len} is not prime");
            assert_eq!(
                len,
                next_prime(target as i32) as usize,
                "comb {i} should be the first prime at or above {target:.2}"
            );
            assert!(len as f64 >= target - 1.0, "comb {i} length {len} fell below {target:.2}");
        }
    }
}

#[test]
fn test_default_time_gives_prime_combs() {
    check_lengths(&ReverbStatusGs::default(), 44100.0);
}

#[test]
fn test_reverb_time_scales_lengths() {
    for time in [0x10, 0x40, 0x70, 0x7f] {
        let status = ReverbStatusGs { time, ..ReverbStatusGs::default() };
        check_lengths(&status, 44100.0);
        check_lengths(&status, 48000.0);
    }

    let short = ReverbStatusGs { time: 0x10, ..ReverbStatusGs::default() };
    let long = ReverbStatusGs { time: 0x7f, ..ReverbStatusGs::default() };
    let (mut a, mut b) = (Freeverb::new(), Freeverb::new());
    a.update(&short, 44100.0);
    b.update(&long, 44100.0);
    assert!(
        a.comb_lengths().0[7] < b.comb_lengths().0[7],
        "a longer reverb time must lengthen the combs"
    );
}

#[test]
fn test_right_side_is_spread() {
    let mut reverb = Freeverb::new();
    reverb.update(&ReverbStatusGs::default(), 44100.0);
    let (left, right) = reverb.comb_lengths();
    for i in 0..8 {
        assert!(right[i] > left[i], "right comb {i} should be longer than the left");
    }
}
