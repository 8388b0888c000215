use std::f32::consts::TAU;

use drop_settle::*;

const SAMPLES: usize = 5000;

/// Kolmogorov-Smirnov distance between `values` and the uniform law on `[0, 2π)`.
fn ks_distance(mut values: Vec<f32>) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len() as f64;
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let cdf = v as f64 / TAU as f64;
            let above = (i as f64 + 1.0) / n - cdf;
            let below = cdf - i as f64 / n;
            above.max(below)
        })
        .fold(0.0, f64::max)
}

fn draws(seed: u64) -> Vec<EulerAngles> {
    let mut sampler = OrientationSampler::from_seed(seed);
    (0..SAMPLES).map(|_| sampler.sample()).collect()
}

#[test]
fn every_angle_stays_in_half_open_range() {
    for angles in draws(1) {
        for angle in angles.to_array() {
            assert!((0.0..TAU).contains(&angle), "angle {angle} out of range");
        }
    }
}

#[test]
fn each_angle_is_uniform() {
    let samples = draws(2024);
    // alpha ~ 0.001
    let critical = 1.95 / (SAMPLES as f64).sqrt();

    let roll = ks_distance(samples.iter().map(|a| a.roll).collect());
    let pitch = ks_distance(samples.iter().map(|a| a.pitch).collect());
    let yaw = ks_distance(samples.iter().map(|a| a.yaw).collect());

    assert!(roll < critical, "roll D = {roll}");
    assert!(pitch < critical, "pitch D = {pitch}");
    assert!(yaw < critical, "yaw D = {yaw}");
}

#[test]
fn angles_are_uncorrelated() {
    let samples = draws(7);
    let correlation = |xs: Vec<f64>, ys: Vec<f64>| {
        let n = xs.len() as f64;
        let mx = xs.iter().sum::<f64>() / n;
        let my = ys.iter().sum::<f64>() / n;
        let cov: f64 = xs.iter().zip(&ys).map(|(x, y)| (x - mx) * (y - my)).sum();
        let vx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
        let vy: f64 = ys.iter().map(|y| (y - my).powi(2)).sum();
        cov / (vx * vy).sqrt()
    };
    let column = |f: fn(&EulerAngles) -> f32| samples.iter().map(|a| f(a) as f64).collect::<Vec<_>>();

    let pairs = [
        correlation(column(|a| a.roll), column(|a| a.pitch)),
        correlation(column(|a| a.pitch), column(|a| a.yaw)),
        correlation(column(|a| a.roll), column(|a| a.yaw)),
    ];
    for r in pairs {
        assert!(r.abs() < 0.06, "correlation {r}");
    }
}

#[test]
fn same_seed_same_sequence() {
    let a = draws(99);
    let b = draws(99);
    assert_eq!(a, b);
    assert_ne!(a, draws(100));
}

#[test]
fn sampled_orientation_is_a_unit_quaternion() {
    let mut sampler = OrientationSampler::from_seed(3);
    for index in 0..100 {
        let trial = DropTrial::sample(1.25, index, &mut sampler);
        let pose = trial.initial_pose();
        assert!(pose.orientation.is_normalized());
        assert_eq!(pose.position, Vec3::new(0.0, 0.0, 1.25));
        assert!(pose.orientation.abs_diff_eq(trial.euler.to_quat(), 1e-6));
    }
}
