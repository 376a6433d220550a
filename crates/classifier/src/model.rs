//! Stacked GRU sequence classifier with a softmax head.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use eeg_types::{BandPowers, RecordingSettings, NUM_BANDS};
use ndarray::{s, Array2, Array3, ArrayD, ArrayViewMutD, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ModelError, ModelResult};
use crate::layers::{Dense, Gru, GruCache};

/// Bumped whenever the saved layout changes.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Clamp applied to probabilities inside the log loss.
const PROB_EPSILON: f64 = 1e-7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Time steps per input sequence
    pub sequence_length: usize,
    /// Values per time step
    pub num_features: usize,
    /// Units of each recurrent layer, input side first
    pub hidden_sizes: Vec<usize>,
    pub num_classes: usize,
}

impl ModelConfig {
    pub fn validate(&self) -> ModelResult<()> {
        if self.sequence_length == 0 || self.num_features == 0 {
            return Err(ModelError::InvalidConfig(
                "sequence length and feature count must be positive".into(),
            ));
        }
        if self.hidden_sizes.is_empty() || self.hidden_sizes.contains(&0) {
            return Err(ModelError::InvalidConfig(format!(
                "hidden sizes must be non-empty and positive, got {:?}",
                self.hidden_sizes
            )));
        }
        if self.num_classes == 0 {
            return Err(ModelError::InvalidConfig("at least one class is required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceClassifier {
    config: ModelConfig,
    recurrent: Vec<Gru>,
    head: Dense,
    /// Feature settings of the training data. Inference must use the same.
    #[serde(default)]
    recording: Option<RecordingSettings>,
}

/// Everything a backward pass needs from the forward pass.
pub(crate) struct ForwardCache {
    caches: Vec<GruCache>,
    last_hidden: Array2<f64>,
}

#[derive(Serialize)]
struct ArtifactRef<'a> {
    format_version: u32,
    model: &'a SequenceClassifier,
}

#[derive(Deserialize)]
struct Artifact {
    format_version: u32,
    model: SequenceClassifier,
}

impl SequenceClassifier {
    /// Freshly initialised network. The same seed gives the same weights.
    pub fn new(config: ModelConfig, seed: Option<u64>) -> ModelResult<Self> {
        config.validate()?;
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let layers = config.hidden_sizes.len();
        let mut recurrent = Vec::with_capacity(layers);
        let mut input_dim = config.num_features;
        for (i, &units) in config.hidden_sizes.iter().enumerate() {
            // Every layer but the last feeds a full sequence to the next one
            recurrent.push(Gru::new(input_dim, units, i + 1 < layers, &mut rng));
            input_dim = units;
        }
        let head = Dense::new(input_dim, config.num_classes, &mut rng);

        debug!(?config, "initialised sequence classifier");
        Ok(Self {
            config,
            recurrent,
            head,
            recording: None,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn recording(&self) -> Option<&RecordingSettings> {
        self.recording.as_ref()
    }

    pub fn set_recording(&mut self, recording: Option<RecordingSettings>) {
        self.recording = recording;
    }

    /// Checks that the layers chain together and match the config.
    fn check_layers(&self) -> ModelResult<()> {
        let config = &self.config;
        if self.recurrent.len() != config.hidden_sizes.len() {
            return Err(ModelError::InvalidConfig(format!(
                "{} recurrent layers for hidden sizes {:?}",
                self.recurrent.len(),
                config.hidden_sizes
            )));
        }
        let mut input_dim = config.num_features;
        for (i, (layer, &units)) in self.recurrent.iter().zip(&config.hidden_sizes).enumerate() {
            let last = i + 1 == self.recurrent.len();
            if layer.input_dim() != input_dim
                || layer.units() != units
                || layer.returns_sequences() == last
                || !layer.shapes_agree()
            {
                return Err(ModelError::InvalidConfig(format!(
                    "recurrent layer {} does not take {} inputs to {} units",
                    i, input_dim, units
                )));
            }
            input_dim = units;
        }
        if self.head.inputs() != input_dim
            || self.head.outputs() != config.num_classes
            || !self.head.shapes_agree()
        {
            return Err(ModelError::InvalidConfig(format!(
                "output layer maps {} to {} but the model has {} units and {} classes",
                self.head.inputs(),
                self.head.outputs(),
                input_dim,
                config.num_classes
            )));
        }
        Ok(())
    }

    pub fn num_classes(&self) -> usize {
        self.config.num_classes
    }

    /// Packs sequences of band-power vectors into a `(batch, steps, features)`
    /// array, checking every sequence against the model's input shape.
    pub fn to_input(&self, sequences: &[Vec<BandPowers>]) -> ModelResult<Array3<f64>> {
        let expected = (self.config.sequence_length, self.config.num_features);
        if let Some(bad) = sequences.iter().find(|s| s.len() != expected.0) {
            return Err(ModelError::ShapeMismatch {
                expected,
                got: (bad.len(), NUM_BANDS),
            });
        }
        if expected.1 != NUM_BANDS {
            return Err(ModelError::ShapeMismatch {
                expected,
                got: (expected.0, NUM_BANDS),
            });
        }
        Ok(Array3::from_shape_fn(
            (sequences.len(), expected.0, expected.1),
            |(b, t, f)| sequences[b][t].0[f] as f64,
        ))
    }

    fn check_input(&self, x: &Array3<f64>) -> ModelResult<()> {
        let (_, steps, features) = x.dim();
        let expected = (self.config.sequence_length, self.config.num_features);
        if (steps, features) != expected {
            return Err(ModelError::ShapeMismatch {
                expected,
                got: (steps, features),
            });
        }
        Ok(())
    }

    pub(crate) fn forward_cached(&self, x: &Array3<f64>) -> ModelResult<(Array2<f64>, ForwardCache)> {
        self.check_input(x)?;
        let mut caches = Vec::with_capacity(self.recurrent.len());
        let mut current = x.clone();
        for layer in &self.recurrent {
            let (out, cache) = layer.forward(&current);
            caches.push(cache);
            current = out;
        }
        let last = current.dim().1 - 1;
        let last_hidden = current.index_axis(Axis(1), last).to_owned();
        let probs = self.head.forward(&last_hidden);
        Ok((
            probs,
            ForwardCache {
                caches,
                last_hidden,
            },
        ))
    }

    /// Class probabilities for a `(batch, steps, features)` array.
    pub fn forward(&self, x: &Array3<f64>) -> ModelResult<Array2<f64>> {
        Ok(self.forward_cached(x)?.0)
    }

    /// Class probabilities for one sequence, oldest vector first.
    pub fn predict(&self, sequence: &[BandPowers]) -> ModelResult<Vec<f64>> {
        let mut probs = self.predict_batch(&[sequence.to_vec()])?;
        Ok(probs.pop().unwrap_or_default())
    }

    pub fn predict_batch(&self, sequences: &[Vec<BandPowers>]) -> ModelResult<Vec<Vec<f64>>> {
        let probs = self.forward(&self.to_input(sequences)?)?;
        Ok(probs.rows().into_iter().map(|row| row.to_vec()).collect())
    }

    /// Most probable class for one sequence.
    pub fn classify(&self, sequence: &[BandPowers]) -> ModelResult<usize> {
        Ok(argmax(&self.predict(sequence)?))
    }

    /// Mean cross-entropy and parameter gradients, in [`Self::params_mut`] order.
    pub(crate) fn loss_and_gradients(
        &self,
        x: &Array3<f64>,
        labels: &[usize],
    ) -> ModelResult<(f64, Array2<f64>, Vec<ArrayD<f64>>)> {
        self.check_labels(labels)?;
        if labels.len() != x.dim().0 {
            return Err(ModelError::LabelCountMismatch {
                labels: labels.len(),
                sequences: x.dim().0,
            });
        }
        let (probs, cache) = self.forward_cached(x)?;
        let batch = labels.len() as f64;
        let loss = cross_entropy(&probs, labels);

        let mut d_logits = probs.clone();
        for (mut row, &label) in d_logits.rows_mut().into_iter().zip(labels) {
            row[label] -= 1.0;
        }
        d_logits /= batch;

        let (d_hidden, head_grads) = self.head.backward(&cache.last_hidden, &d_logits);

        // Only the final step of the top layer reaches the head
        let top = self.recurrent.len() - 1;
        let (b, steps, units) = (x.dim().0, x.dim().1, self.recurrent[top].units());
        let mut d_out = Array3::<f64>::zeros((b, steps, units));
        d_out.slice_mut(s![.., steps - 1, ..]).assign(&d_hidden);

        let mut layer_grads = Vec::with_capacity(self.recurrent.len());
        for (i, layer) in self.recurrent.iter().enumerate().rev() {
            let (d_in, grads) = layer.backward(&cache.caches[i], &d_out);
            layer_grads.push(grads);
            d_out = d_in;
        }
        layer_grads.reverse();

        let mut grads = Vec::with_capacity(4 * layer_grads.len() + 2);
        for g in layer_grads {
            grads.push(g.kernel.into_dyn());
            grads.push(g.recurrent.into_dyn());
            grads.push(g.bias_in.into_dyn());
            grads.push(g.bias_rec.into_dyn());
        }
        grads.push(head_grads.weight.into_dyn());
        grads.push(head_grads.bias.into_dyn());

        Ok((loss, probs, grads))
    }

    fn check_labels(&self, labels: &[usize]) -> ModelResult<()> {
        match labels.iter().find(|&&l| l >= self.config.num_classes) {
            Some(&label) => Err(ModelError::InvalidLabel {
                label,
                classes: self.config.num_classes,
            }),
            None => Ok(()),
        }
    }

    pub(crate) fn params_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        let mut params = Vec::with_capacity(4 * self.recurrent.len() + 2);
        for layer in self.recurrent.iter_mut() {
            params.extend(layer.params_mut());
        }
        params.extend(self.head.params_mut());
        params
    }

    /// Writes the model as versioned JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> ModelResult<()> {
        let path = path.as_ref();
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(
            writer,
            &ArtifactRef {
                format_version: MODEL_FORMAT_VERSION,
                model: self,
            },
        )?;
        info!("Saved model to {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let artifact: Artifact = serde_json::from_reader(reader)?;
        if artifact.format_version != MODEL_FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion {
                found: artifact.format_version,
                expected: MODEL_FORMAT_VERSION,
            });
        }
        artifact.model.config.validate()?;
        artifact.model.check_layers()?;
        info!(
            "Loaded model from {} ({} classes)",
            path.display(),
            artifact.model.num_classes()
        );
        Ok(artifact.model)
    }
}

/// Mean sparse categorical cross-entropy.
pub(crate) fn cross_entropy(probs: &Array2<f64>, labels: &[usize]) -> f64 {
    let total: f64 = probs
        .rows()
        .into_iter()
        .zip(labels)
        .map(|(row, &label)| -row[label].clamp(PROB_EPSILON, 1.0 - PROB_EPSILON).ln())
        .sum();
    total / labels.len().max(1) as f64
}

/// Index of the largest value; the first one wins ties.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}
