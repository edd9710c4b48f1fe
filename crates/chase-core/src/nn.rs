//! Pursuer controller: 4 inputs → 16 hidden (ReLU) → 16 hidden (ReLU) → 2 outputs (tanh).
//! Stack-allocated, no heap. 386 parameters total, trained online with
//! single-sample gradient descent (no momentum, no weight decay).
//!
//! Inputs:  player position(2) + pursuer position(2) = 4
//! Outputs: movement direction(2), each component in [-1, 1]

use log::{trace, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use std::{error::Error, fmt};

pub const INPUT_SIZE: usize = 4;
pub const HIDDEN_SIZE: usize = 16;
pub const OUTPUT_SIZE: usize = 2;

pub const DEFAULT_LEARNING_RATE: f32 = 0.0005;

/// A slice handed to the controller had the wrong length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeError {
    pub what: &'static str,
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} must have {} elements, got {}",
            self.what, self.expected, self.actual
        )
    }
}

impl Error for ShapeError {}

/// Pre/post-activation values of the most recent forward pass.
#[derive(Clone, Debug, Default)]
struct Activations {
    h1_pre: [f32; HIDDEN_SIZE],
    h1: [f32; HIDDEN_SIZE],
    h2_pre: [f32; HIDDEN_SIZE],
    h2: [f32; HIDDEN_SIZE],
    out_pre: [f32; OUTPUT_SIZE],
    out: [f32; OUTPUT_SIZE],
}

#[inline]
fn relu(x: f32) -> f32 {
    x.max(0.0)
}

#[inline]
fn relu_grad(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else {
        0.0
    }
}

#[derive(Clone, Debug)]
pub struct NeuralController {
    // Total: 64 + 16 + 256 + 16 + 32 + 2 = 386 parameters
    w1: [[f32; HIDDEN_SIZE]; INPUT_SIZE],  // 4×16
    b1: [f32; HIDDEN_SIZE],                // 16
    w2: [[f32; HIDDEN_SIZE]; HIDDEN_SIZE], // 16×16
    b2: [f32; HIDDEN_SIZE],                // 16
    w3: [[f32; OUTPUT_SIZE]; HIDDEN_SIZE], // 16×2
    b3: [f32; OUTPUT_SIZE],                // 2
    learning_rate: f32,
    cache: Activations,
    last_output: [f32; OUTPUT_SIZE],
    last_loss: f32,
    diverged: bool,
    rng: ChaCha12Rng,
}

impl NeuralController {
    pub const PARAMETER_COUNT: usize = INPUT_SIZE * HIDDEN_SIZE
        + HIDDEN_SIZE
        + HIDDEN_SIZE * HIDDEN_SIZE
        + HIDDEN_SIZE
        + HIDDEN_SIZE * OUTPUT_SIZE
        + OUTPUT_SIZE;

    /// Seeded controller with the default learning rate.
    pub fn new(seed: u64) -> Self {
        Self::with_rng(ChaCha12Rng::seed_from_u64(seed), DEFAULT_LEARNING_RATE)
    }

    /// Controller whose weights (and every later `reset`) are drawn from `rng`.
    /// Weights are fully initialized before this returns.
    pub fn with_rng(rng: ChaCha12Rng, learning_rate: f32) -> Self {
        let mut controller = Self::zeroed(rng, learning_rate);
        controller.reset();
        controller
    }

    /// Create a controller from an iterator of parameters laid out as
    /// W1, b1, W2, b2, W3, b3 (row-major). Panics if fewer than
    /// `PARAMETER_COUNT` values. Later resets draw from a generator seeded with 0.
    pub fn from_weights(mut weights: impl Iterator<Item = f32>, learning_rate: f32) -> Self {
        let mut next = || {
            weights
                .next()
                .expect("insufficient weights: need PARAMETER_COUNT (386) elements")
        };

        let mut controller = Self::zeroed(ChaCha12Rng::seed_from_u64(0), learning_rate);
        for row in &mut controller.w1 {
            for w in row.iter_mut() {
                *w = next();
            }
        }
        for b in &mut controller.b1 {
            *b = next();
        }
        for row in &mut controller.w2 {
            for w in row.iter_mut() {
                *w = next();
            }
        }
        for b in &mut controller.b2 {
            *b = next();
        }
        for row in &mut controller.w3 {
            for w in row.iter_mut() {
                *w = next();
            }
        }
        for b in &mut controller.b3 {
            *b = next();
        }
        controller
    }

    fn zeroed(rng: ChaCha12Rng, learning_rate: f32) -> Self {
        Self {
            w1: [[0.0; HIDDEN_SIZE]; INPUT_SIZE],
            b1: [0.0; HIDDEN_SIZE],
            w2: [[0.0; HIDDEN_SIZE]; HIDDEN_SIZE],
            b2: [0.0; HIDDEN_SIZE],
            w3: [[0.0; OUTPUT_SIZE]; HIDDEN_SIZE],
            b3: [0.0; OUTPUT_SIZE],
            learning_rate,
            cache: Activations::default(),
            last_output: [0.0; OUTPUT_SIZE],
            last_loss: 0.0,
            diverged: false,
            rng,
        }
    }

    /// Flatten parameters in the same order `from_weights` consumes them.
    pub fn to_weight_vec(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(Self::PARAMETER_COUNT);
        for row in &self.w1 {
            out.extend_from_slice(row);
        }
        out.extend_from_slice(&self.b1);
        for row in &self.w2 {
            out.extend_from_slice(row);
        }
        out.extend_from_slice(&self.b2);
        for row in &self.w3 {
            out.extend_from_slice(row);
        }
        out.extend_from_slice(&self.b3);
        out
    }

    /// Re-draw every weight from `rng` with Xavier-style scaling
    /// (`U[-1, 1] * sqrt(2 / fan_in)`), zero all biases and clear cached state.
    pub fn initialize_from<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let scale1 = (2.0f32 / INPUT_SIZE as f32).sqrt();
        let scale2 = (2.0f32 / HIDDEN_SIZE as f32).sqrt();

        for row in &mut self.w1 {
            for w in row.iter_mut() {
                *w = rng.random_range(-1.0f32..=1.0) * scale1;
            }
        }
        // W2 and W3 rows are drawn interleaved, one hidden unit at a time.
        for (w2_row, w3_row) in self.w2.iter_mut().zip(self.w3.iter_mut()) {
            for w in w2_row.iter_mut() {
                *w = rng.random_range(-1.0f32..=1.0) * scale2;
            }
            for w in w3_row.iter_mut() {
                *w = rng.random_range(-1.0f32..=1.0) * scale2;
            }
        }

        self.b1 = [0.0; HIDDEN_SIZE];
        self.b2 = [0.0; HIDDEN_SIZE];
        self.b3 = [0.0; OUTPUT_SIZE];
        self.cache = Activations::default();
        self.last_output = [0.0; OUTPUT_SIZE];
        self.last_loss = 0.0;
        self.diverged = false;
    }

    /// Fresh weights from the controller's own generator stream.
    pub fn reset(&mut self) {
        let mut rng = self.rng.clone();
        self.initialize_from(&mut rng);
        self.rng = rng;
    }

    /// Re-seed the generator, then reset. Equal seeds give equal networks.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha12Rng::seed_from_u64(seed);
        self.reset();
    }

    fn forward_into(&self, input: &[f32; INPUT_SIZE], acts: &mut Activations) {
        acts.h1_pre = self.b1;
        for (i, &x) in input.iter().enumerate() {
            for (j, h) in acts.h1_pre.iter_mut().enumerate() {
                *h += x * self.w1[i][j];
            }
        }
        for (a, &z) in acts.h1.iter_mut().zip(&acts.h1_pre) {
            *a = relu(z);
        }

        acts.h2_pre = self.b2;
        for (i, &x) in acts.h1.iter().enumerate() {
            for (j, h) in acts.h2_pre.iter_mut().enumerate() {
                *h += x * self.w2[i][j];
            }
        }
        for (a, &z) in acts.h2.iter_mut().zip(&acts.h2_pre) {
            *a = relu(z);
        }

        acts.out_pre = self.b3;
        for (i, &x) in acts.h2.iter().enumerate() {
            for (j, o) in acts.out_pre.iter_mut().enumerate() {
                *o += x * self.w3[i][j];
            }
        }
        for (a, &z) in acts.out.iter_mut().zip(&acts.out_pre) {
            *a = z.tanh();
        }
    }

    /// Forward pass. Caches activations for the next `train_step` and
    /// records the result as `last_output`.
    pub fn predict(&mut self, input: &[f32; INPUT_SIZE]) -> [f32; OUTPUT_SIZE] {
        let mut acts = std::mem::take(&mut self.cache);
        self.forward_into(input, &mut acts);
        self.cache = acts;
        self.last_output = self.cache.out;
        self.last_output
    }

    /// Forward pass without side effects.
    pub fn evaluate(&self, input: &[f32; INPUT_SIZE]) -> [f32; OUTPUT_SIZE] {
        let mut acts = Activations::default();
        self.forward_into(input, &mut acts);
        acts.out
    }

    pub fn predict_slice(&mut self, input: &[f32]) -> Result<[f32; OUTPUT_SIZE], ShapeError> {
        let input = as_features(input)?;
        Ok(self.predict(input))
    }

    /// One gradient descent step on a single sample. Returns
    /// `0.5 * Σ(y - target)²` measured before the update.
    pub fn train_step(
        &mut self,
        input: &[f32; INPUT_SIZE],
        target: &[f32; OUTPUT_SIZE],
    ) -> f32 {
        let y = self.predict(input);

        let mut loss = 0.0f32;
        let mut delta_out = [0.0f32; OUTPUT_SIZE];
        for j in 0..OUTPUT_SIZE {
            let diff = y[j] - target[j];
            loss += diff * diff;
            // tanh' expressed through the activated output
            delta_out[j] = diff * (1.0 - y[j] * y[j]);
        }
        let loss = 0.5 * loss;
        self.last_loss = loss;

        if !self.diverged && (!loss.is_finite() || y.iter().any(|v| !v.is_finite())) {
            self.diverged = true;
            warn!("controller diverged: loss={loss}, output={y:?}");
        }

        let lr = self.learning_rate;
        let acts = &self.cache;

        // Each layer's deltas are computed from the pre-update weights
        // before that layer is modified.
        let mut delta2 = [0.0f32; HIDDEN_SIZE];
        for (i, d) in delta2.iter_mut().enumerate() {
            let back: f32 = self.w3[i]
                .iter()
                .zip(&delta_out)
                .map(|(w, e)| e * w)
                .sum();
            *d = back * relu_grad(acts.h2_pre[i]);
        }
        for (row, &h) in self.w3.iter_mut().zip(&acts.h2) {
            for (w, &e) in row.iter_mut().zip(&delta_out) {
                *w -= lr * e * h;
            }
        }
        for (b, &e) in self.b3.iter_mut().zip(&delta_out) {
            *b -= lr * e;
        }

        let mut delta1 = [0.0f32; HIDDEN_SIZE];
        for (i, d) in delta1.iter_mut().enumerate() {
            let back: f32 = self.w2[i]
                .iter()
                .zip(&delta2)
                .map(|(w, e)| e * w)
                .sum();
            *d = back * relu_grad(acts.h1_pre[i]);
        }
        for (row, &h) in self.w2.iter_mut().zip(&acts.h1) {
            for (w, &e) in row.iter_mut().zip(&delta2) {
                *w -= lr * e * h;
            }
        }
        for (b, &e) in self.b2.iter_mut().zip(&delta2) {
            *b -= lr * e;
        }

        for (row, &x) in self.w1.iter_mut().zip(input) {
            for (w, &e) in row.iter_mut().zip(&delta1) {
                *w -= lr * e * x;
            }
        }
        for (b, &e) in self.b1.iter_mut().zip(&delta1) {
            *b -= lr * e;
        }

        trace!("train step: loss={loss:.6}");
        loss
    }

    pub fn train_step_slice(&mut self, input: &[f32], target: &[f32]) -> Result<f32, ShapeError> {
        let input = as_features(input)?;
        let target: &[f32; OUTPUT_SIZE] = target.try_into().map_err(|_| ShapeError {
            what: "target",
            expected: OUTPUT_SIZE,
            actual: target.len(),
        })?;
        Ok(self.train_step(input, target))
    }

    pub fn last_output(&self) -> [f32; OUTPUT_SIZE] {
        self.last_output
    }

    pub fn last_loss(&self) -> f32 {
        self.last_loss
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Sticky flag: set once a training step produced a non-finite loss or
    /// output. Cleared only by re-initialization.
    pub fn diverged(&self) -> bool {
        self.diverged
    }
}

fn as_features(input: &[f32]) -> Result<&[f32; INPUT_SIZE], ShapeError> {
    input.try_into().map_err(|_| ShapeError {
        what: "features",
        expected: INPUT_SIZE,
        actual: input.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    const FEATURES: [f32; 4] = [0.0, -3.0, 0.0, 3.0];
    const TARGET: [f32; 2] = [0.0, -0.46875];
    const FIXTURE_OUTPUT: [f32; 2] = [0.131_985_89, -0.080_551_94];
    const FIXTURE_LOSS: f32 = 0.084_059_015;

    /// Deterministic parameter stream in [-0.25, 0.25), no generator involved.
    fn fixture_weights() -> impl Iterator<Item = f32> {
        (0..NeuralController::PARAMETER_COUNT)
            .map(|k| (((k * 37) % 101) as f32 / 101.0 - 0.5) * 0.5)
    }

    /// Reference single-pass update: accumulates each delta while mutating the
    /// weight it was read from.
    fn fused_train_step(c: &mut NeuralController, input: &[f32; 4], target: &[f32; 2]) {
        let y = c.predict(input);
        let lr = c.learning_rate;
        let acts = c.cache.clone();
        let mut delta_out = [0.0f32; 2];
        for j in 0..2 {
            let diff = y[j] - target[j];
            delta_out[j] = diff * (1.0 - y[j] * y[j]);
        }

        let mut delta2 = [0.0f32; 16];
        for i in 0..16 {
            let mut back = 0.0f32;
            for j in 0..2 {
                back += delta_out[j] * c.w3[i][j];
                c.w3[i][j] -= lr * delta_out[j] * acts.h2[i];
            }
            delta2[i] = back * relu_grad(acts.h2_pre[i]);
        }
        for j in 0..2 {
            c.b3[j] -= lr * delta_out[j];
        }

        let mut delta1 = [0.0f32; 16];
        for i in 0..16 {
            let mut back = 0.0f32;
            for j in 0..16 {
                back += delta2[j] * c.w2[i][j];
                c.w2[i][j] -= lr * delta2[j] * acts.h1[i];
            }
            delta1[i] = back * relu_grad(acts.h1_pre[i]);
        }
        for j in 0..16 {
            c.b2[j] -= lr * delta2[j];
        }

        for i in 0..4 {
            for j in 0..16 {
                c.w1[i][j] -= lr * delta1[j] * input[i];
            }
        }
        for j in 0..16 {
            c.b1[j] -= lr * delta1[j];
        }
    }

    #[test]
    fn output_stays_in_tanh_range() {
        let mut nn = NeuralController::new(3);
        let mut rng = ChaCha12Rng::seed_from_u64(11);
        for step in 0..500 {
            let input: [f32; 4] = std::array::from_fn(|_| rng.random_range(-50.0f32..50.0));
            let target: [f32; 2] = std::array::from_fn(|_| rng.random_range(-1.0f32..1.0));
            let out = nn.predict(&input);
            assert!(
                out.iter().all(|v| (-1.0..=1.0).contains(v)),
                "step {step}: {out:?}"
            );
            nn.train_step(&input, &target);
        }
    }

    #[test]
    fn predict_is_deterministic_without_training() {
        let mut nn = NeuralController::new(5);
        let a = nn.predict(&FEATURES);
        let b = nn.predict(&FEATURES);
        assert_eq!(a, b);
        assert_eq!(nn.evaluate(&FEATURES), a);
        assert_eq!(nn.last_output(), a);
    }

    #[test]
    fn loss_is_zero_only_on_exact_match() {
        let mut zero = NeuralController::from_weights(std::iter::repeat(0.0), 0.0005);
        assert_eq!(zero.train_step(&FEATURES, &[0.0, 0.0]), 0.0);
        let loss = zero.train_step(&FEATURES, &[0.5, 0.0]);
        assert!((loss - 0.125).abs() < 1e-7);
        assert!(loss > 0.0);
    }

    #[test]
    fn loss_is_never_negative() {
        let mut nn = NeuralController::new(21);
        let mut rng = ChaCha12Rng::seed_from_u64(4);
        for _ in 0..200 {
            let input: [f32; 4] = std::array::from_fn(|_| rng.random_range(-6.4f32..6.4));
            let target: [f32; 2] = std::array::from_fn(|_| rng.random_range(-1.0f32..1.0));
            assert!(nn.train_step(&input, &target) >= 0.0);
        }
    }

    #[test]
    fn repeated_steps_reduce_loss() {
        let mut nn = NeuralController::new(7);
        let first = nn.train_step(&FEATURES, &TARGET);
        let mut last = first;
        for _ in 1..50 {
            last = nn.train_step(&FEATURES, &TARGET);
        }
        assert!(last < first, "first={first}, last={last}");
    }

    #[test]
    fn same_seed_gives_same_network() {
        let mut a = NeuralController::new(42);
        let mut b = NeuralController::new(42);
        assert_eq!(a.to_weight_vec(), b.to_weight_vec());
        assert_eq!(a.predict(&FEATURES), b.predict(&FEATURES));

        a.train_step(&FEATURES, &TARGET);
        a.reseed(9);
        b.reseed(9);
        assert_eq!(a.to_weight_vec(), b.to_weight_vec());
    }

    #[test]
    fn initialization_is_scaled_and_biases_zeroed() {
        let nn = NeuralController::new(1);
        let w = nn.to_weight_vec();
        let scale1 = (2.0f32 / 4.0).sqrt();
        let scale2 = (2.0f32 / 16.0).sqrt();
        assert!(w[..64].iter().all(|v| v.abs() <= scale1));
        assert!(w[64..80].iter().all(|&v| v == 0.0));
        assert!(w[80..336].iter().all(|v| v.abs() <= scale2));
        assert!(w[336..352].iter().all(|&v| v == 0.0));
        assert!(w[352..384].iter().all(|v| v.abs() <= scale2));
        assert!(w[384..].iter().all(|&v| v == 0.0));
        assert!(w.iter().any(|&v| v != 0.0));
    }

    #[test]
    fn reset_draws_fresh_weights_and_clears_snapshots() {
        let mut nn = NeuralController::new(8);
        let before = nn.to_weight_vec();
        nn.train_step(&FEATURES, &TARGET);
        nn.reset();
        assert_ne!(nn.to_weight_vec(), before);
        assert_eq!(nn.last_output(), [0.0, 0.0]);
        assert_eq!(nn.last_loss(), 0.0);
        assert!(!nn.diverged());
    }

    #[test]
    fn weight_stream_round_trips() {
        let nn = NeuralController::from_weights(fixture_weights(), 0.001);
        let flat = nn.to_weight_vec();
        assert_eq!(flat.len(), NeuralController::PARAMETER_COUNT);
        assert!(flat.iter().copied().eq(fixture_weights()));
        assert_eq!(nn.learning_rate(), 0.001);
    }

    #[test]
    #[should_panic(expected = "insufficient weights")]
    fn short_weight_stream_panics() {
        let _ = NeuralController::from_weights(std::iter::repeat(0.1).take(10), 0.0005);
    }

    #[test]
    fn two_pass_update_matches_fused_loop() {
        let mut rng = ChaCha12Rng::seed_from_u64(77);
        let mut two_pass = NeuralController::new(13);
        let mut fused = two_pass.clone();
        for _ in 0..25 {
            let input: [f32; 4] = std::array::from_fn(|_| rng.random_range(-3.6f32..3.6));
            let target: [f32; 2] = std::array::from_fn(|_| rng.random_range(-0.5f32..0.5));
            two_pass.train_step(&input, &target);
            fused_train_step(&mut fused, &input, &target);
            assert_eq!(two_pass.to_weight_vec(), fused.to_weight_vec());
        }
    }

    #[test]
    fn fixed_weights_regression_fixture() {
        let mut nn = NeuralController::from_weights(fixture_weights(), DEFAULT_LEARNING_RATE);
        let y = nn.evaluate(&FEATURES);
        let expected_from_output = 0.5 * ((y[0] - 0.0).powi(2) + (y[1] + 0.46875).powi(2));

        let loss = nn.train_step(&FEATURES, &TARGET);
        assert!((loss - expected_from_output).abs() < 1e-7);
        assert!((loss - FIXTURE_LOSS).abs() < 1e-5, "loss={loss}");
        assert!((y[0] - FIXTURE_OUTPUT[0]).abs() < 1e-5, "y={y:?}");
        assert!((y[1] - FIXTURE_OUTPUT[1]).abs() < 1e-5, "y={y:?}");
    }

    #[test]
    fn seeded_initializer_regression_fixture() {
        let mut nn = NeuralController::new(42);
        let weights = nn.to_weight_vec();
        let expected_w1 = [-0.518_436_909f32, 0.037_557_728_6, -0.355_337_709];
        for (w, e) in weights[..3].iter().zip(expected_w1) {
            assert!((w - e).abs() < 1e-6, "w1={:?}", &weights[..3]);
        }
        // last W3 row, drawn interleaved with W2
        let n = NeuralController::PARAMETER_COUNT;
        let w3_last = &weights[n - 4..n - 2];
        assert!((w3_last[0] - -0.114_645_071).abs() < 1e-6, "w3={w3_last:?}");
        assert!((w3_last[1] - 0.255_569_816).abs() < 1e-6, "w3={w3_last:?}");

        let y = nn.predict(&FEATURES);
        assert!((y[0] - -0.044_752_058).abs() < 1e-6, "y={y:?}");
        assert!((y[1] - 0.336_189_54).abs() < 1e-6, "y={y:?}");
        let loss = nn.train_step(&FEATURES, &TARGET);
        assert!((loss - 0.324_965_21).abs() < 1e-6, "loss={loss}");
    }

    #[test]
    fn slice_inputs_are_shape_checked() {
        let mut nn = NeuralController::new(2);
        let err = nn.predict_slice(&[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            ShapeError {
                what: "features",
                expected: 4,
                actual: 3
            }
        );
        let err = nn
            .train_step_slice(&FEATURES, &[0.0, 0.0, 0.0])
            .unwrap_err();
        assert_eq!(err.what, "target");
        assert_eq!(err.to_string(), "target must have 2 elements, got 3");

        let out = nn.predict_slice(&FEATURES).unwrap();
        assert_eq!(out, nn.evaluate(&FEATURES));
    }

    #[test]
    fn non_finite_target_marks_divergence() {
        let mut nn = NeuralController::new(6);
        nn.train_step(&FEATURES, &[f32::NAN, 0.0]);
        assert!(nn.diverged());
        assert!(nn.last_loss().is_nan());
        nn.reset();
        assert!(!nn.diverged());
    }
}
