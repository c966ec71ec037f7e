use std::fs;
use std::path::Path;

use rand::Rng;

use crate::error::{DimensionError, ModelIoError};

/// Half-width of the uniform range weights are drawn from.
pub const WEIGHT_INIT_RANGE: f32 = 0.1;

const MAGIC: &[u8; 4] = b"HVNN";
const FORMAT_VERSION: u32 = 1;
/// magic + version + three dimensions
const HEADER_LEN: usize = 4 + 4 + 3 * 4;

/// Weights and biases of a [`ValueNetwork`], flat and row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkParameters {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    /// `hidden_size × input_size`
    pub w1: Vec<f32>,
    pub b1: Vec<f32>,
    /// `output_size × hidden_size`
    pub w2: Vec<f32>,
    pub b2: Vec<f32>,
}

impl NetworkParameters {
    /// All-zero parameters of the given shape.
    pub fn zeros(input_size: usize, hidden_size: usize, output_size: usize) -> Self {
        NetworkParameters {
            input_size,
            hidden_size,
            output_size,
            w1: vec![0.0; hidden_size * input_size],
            b1: vec![0.0; hidden_size],
            w2: vec![0.0; output_size * hidden_size],
            b2: vec![0.0; output_size],
        }
    }

    fn validate(&self) -> Result<(), DimensionError> {
        let checks = [
            ("w1", self.hidden_size * self.input_size, self.w1.len()),
            ("b1", self.hidden_size, self.b1.len()),
            ("w2", self.output_size * self.hidden_size, self.w2.len()),
            ("b2", self.output_size, self.b2.len()),
        ];
        for (what, expected, actual) in checks {
            if expected != actual {
                return Err(DimensionError {
                    what,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    fn float_count(&self) -> usize {
        self.w1.len() + self.b1.len() + self.w2.len() + self.b2.len()
    }
}

/// Two-layer feed-forward value approximator.
///
/// ```text
/// hidden = ReLU(W1 · x + b1)
/// output = W2 · hidden + b2
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ValueNetwork {
    params: NetworkParameters,
}

impl ValueNetwork {
    /// New network with uniformly random weights and zero biases.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        rng: &mut R,
    ) -> Self {
        let mut network = ValueNetwork {
            params: NetworkParameters::zeros(input_size, hidden_size, output_size),
        };
        network.randomize_weights(rng);
        network
    }

    pub fn from_parameters(params: NetworkParameters) -> Result<Self, DimensionError> {
        params.validate()?;
        Ok(ValueNetwork { params })
    }

    pub fn parameters(&self) -> &NetworkParameters {
        &self.params
    }

    /// `(input_size, hidden_size, output_size)`
    pub fn dims(&self) -> (usize, usize, usize) {
        (
            self.params.input_size,
            self.params.hidden_size,
            self.params.output_size,
        )
    }

    pub fn input_size(&self) -> usize {
        self.params.input_size
    }

    pub fn output_size(&self) -> usize {
        self.params.output_size
    }

    /// Redraw every weight from `U(-0.1, 0.1)` and zero the biases.
    pub fn randomize_weights<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let p = &mut self.params;
        for w in p.w1.iter_mut().chain(p.w2.iter_mut()) {
            *w = rng.random_range(-WEIGHT_INIT_RANGE..=WEIGHT_INIT_RANGE);
        }
        p.b1.fill(0.0);
        p.b2.fill(0.0);
    }

    fn check_input(&self, input: &[f32]) -> Result<(), DimensionError> {
        if input.len() != self.params.input_size {
            return Err(DimensionError {
                what: "input",
                expected: self.params.input_size,
                actual: input.len(),
            });
        }
        Ok(())
    }

    /// Pre-activation of the hidden layer, `W1 · x + b1`.
    fn hidden_pre_activation(&self, input: &[f32]) -> Vec<f32> {
        let p = &self.params;
        if p.input_size == 0 {
            return p.b1.clone();
        }
        p.w1.chunks_exact(p.input_size)
            .zip(&p.b1)
            .map(|(row, &b)| b + dot(row, input))
            .collect()
    }

    fn output_from_hidden(&self, hidden: &[f32]) -> Vec<f32> {
        let p = &self.params;
        if p.hidden_size == 0 {
            return p.b2.clone();
        }
        p.w2.chunks_exact(p.hidden_size)
            .zip(&p.b2)
            .map(|(row, &b)| b + dot(row, hidden))
            .collect()
    }

    pub fn forward(&self, input: &[f32]) -> Result<Vec<f32>, DimensionError> {
        self.check_input(input)?;
        let hidden: Vec<f32> = self
            .hidden_pre_activation(input)
            .into_iter()
            .map(relu)
            .collect();
        Ok(self.output_from_hidden(&hidden))
    }

    /// Mean squared error of the current prediction against `target`.
    pub fn loss(&self, input: &[f32], target: &[f32]) -> Result<f32, DimensionError> {
        self.check_target(target)?;
        let output = self.forward(input)?;
        if output.is_empty() {
            return Ok(0.0);
        }
        let sum: f32 = output
            .iter()
            .zip(target)
            .map(|(o, t)| (o - t) * (o - t))
            .sum();
        Ok(sum / output.len() as f32)
    }

    fn check_target(&self, target: &[f32]) -> Result<(), DimensionError> {
        if target.len() != self.params.output_size {
            return Err(DimensionError {
                what: "target",
                expected: self.params.output_size,
                actual: target.len(),
            });
        }
        Ok(())
    }

    /// One gradient-descent step on `½‖forward(input) − target‖²`.
    pub fn update(
        &mut self,
        input: &[f32],
        target: &[f32],
        learning_rate: f32,
    ) -> Result<(), DimensionError> {
        self.check_input(input)?;
        self.check_target(target)?;

        let pre = self.hidden_pre_activation(input);
        let hidden: Vec<f32> = pre.iter().copied().map(relu).collect();
        let output = self.output_from_hidden(&hidden);

        let (inputs, hiddens) = (self.params.input_size, self.params.hidden_size);
        let delta_out: Vec<f32> = output.iter().zip(target).map(|(o, t)| o - t).collect();

        // Backpropagate through W2 before it changes.
        let mut delta_hidden = vec![0.0f32; hiddens];
        for (k, &d) in delta_out.iter().enumerate() {
            let row = &self.params.w2[k * hiddens..(k + 1) * hiddens];
            for (dh, &w) in delta_hidden.iter_mut().zip(row) {
                *dh += w * d;
            }
        }
        for (dh, &z) in delta_hidden.iter_mut().zip(&pre) {
            if z <= 0.0 {
                *dh = 0.0;
            }
        }

        let p = &mut self.params;
        for (k, &d) in delta_out.iter().enumerate() {
            let row = &mut p.w2[k * hiddens..(k + 1) * hiddens];
            for (w, &h) in row.iter_mut().zip(&hidden) {
                *w -= learning_rate * d * h;
            }
            p.b2[k] -= learning_rate * d;
        }
        for (j, &d) in delta_hidden.iter().enumerate() {
            if d == 0.0 {
                continue;
            }
            let row = &mut p.w1[j * inputs..(j + 1) * inputs];
            for (w, &x) in row.iter_mut().zip(input) {
                *w -= learning_rate * d * x;
            }
            p.b1[j] -= learning_rate * d;
        }
        Ok(())
    }

    /// Write the network in the versioned little-endian model format.
    pub fn save(&self, path: &Path) -> Result<(), ModelIoError> {
        let p = &self.params;
        let mut bytes = Vec::with_capacity(HEADER_LEN + 4 * p.float_count());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        for dim in [p.input_size, p.hidden_size, p.output_size] {
            bytes.extend_from_slice(&(dim as u32).to_le_bytes());
        }
        for v in p.w1.iter().chain(&p.b1).chain(&p.w2).chain(&p.b2) {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        fs::write(path, bytes).map_err(|source| ModelIoError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Replace this network's parameters with those stored at `path`. The
    /// file must declare exactly this network's dimensions; on any error the
    /// current parameters are left untouched.
    pub fn load(&mut self, path: &Path) -> Result<(), ModelIoError> {
        let bytes = fs::read(path).map_err(|source| ModelIoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let truncated = |expected: usize| ModelIoError::Truncated {
            path: path.to_path_buf(),
            expected,
            actual: bytes.len(),
        };
        if bytes.len() < HEADER_LEN {
            return Err(truncated(HEADER_LEN));
        }
        if &bytes[..4] != MAGIC {
            return Err(ModelIoError::BadMagic {
                path: path.to_path_buf(),
            });
        }
        let version = read_u32(&bytes, 4);
        if version != FORMAT_VERSION {
            return Err(ModelIoError::UnsupportedVersion {
                path: path.to_path_buf(),
                version,
            });
        }
        let found = (
            read_u32(&bytes, 8) as usize,
            read_u32(&bytes, 12) as usize,
            read_u32(&bytes, 16) as usize,
        );
        if found != self.dims() {
            return Err(ModelIoError::ShapeMismatch {
                path: path.to_path_buf(),
                expected: self.dims(),
                found,
            });
        }

        let expected_len = HEADER_LEN + 4 * self.params.float_count();
        if bytes.len() < expected_len {
            return Err(truncated(expected_len));
        }
        if bytes.len() > expected_len {
            return Err(ModelIoError::TrailingData {
                path: path.to_path_buf(),
                extra: bytes.len() - expected_len,
            });
        }

        let mut floats = bytes[HEADER_LEN..]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]));
        let p = &mut self.params;
        for slot in p
            .w1
            .iter_mut()
            .chain(p.b1.iter_mut())
            .chain(p.w2.iter_mut())
            .chain(p.b2.iter_mut())
        {
            // Length was checked above, so the iterator cannot run dry.
            if let Some(v) = floats.next() {
                *slot = v;
            }
        }
        Ok(())
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn relu(x: f32) -> f32 {
    x.max(0.0)
}
