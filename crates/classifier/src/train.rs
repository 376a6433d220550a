//! Mini-batch training loop

use eeg_types::NUM_BANDS;
use ndarray::{Array3, Axis};
use pipeline::TrainingSet;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ModelError, ModelResult};
use crate::model::{argmax, cross_entropy, ModelConfig, SequenceClassifier};
use crate::optimizer::Adam;
use crate::split::stratified_split;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Fraction of each class held out for validation
    pub test_size: f64,
    pub hidden_sizes: Vec<usize>,
    /// Seeds weight init, the split and shuffling. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 10,
            learning_rate: 1e-3,
            test_size: 0.2,
            hidden_sizes: vec![32, 64, 128],
            seed: None,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> ModelResult<()> {
        if self.epochs == 0 || self.batch_size == 0 {
            return Err(ModelError::InvalidConfig(
                "epochs and batch size must be positive".into(),
            ));
        }
        if !(self.learning_rate > 0.0) {
            return Err(ModelError::InvalidConfig(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(0.0..1.0).contains(&self.test_size) {
            return Err(ModelError::InvalidConfig(format!(
                "test size must lie in [0, 1), got {}",
                self.test_size
            )));
        }
        Ok(())
    }
}

/// Per-epoch metrics. Validation series stay empty when nothing was held out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub loss: Vec<f64>,
    pub accuracy: Vec<f64>,
    pub val_loss: Vec<f64>,
    pub val_accuracy: Vec<f64>,
}

impl TrainingHistory {
    pub fn final_val_accuracy(&self) -> Option<f64> {
        self.val_accuracy.last().copied()
    }
}

pub struct TrainedModel {
    pub model: SequenceClassifier,
    pub history: TrainingHistory,
}

/// Loss and accuracy of `model` on a labeled array.
pub fn evaluate(
    model: &SequenceClassifier,
    x: &Array3<f64>,
    labels: &[usize],
) -> ModelResult<(f64, f64)> {
    if labels.is_empty() {
        return Err(ModelError::EmptyDataset);
    }
    let probs = model.forward(x)?;
    let correct = probs
        .rows()
        .into_iter()
        .zip(labels)
        .filter(|(row, &label)| argmax(&row.to_vec()) == label)
        .count();
    Ok((cross_entropy(&probs, labels), correct as f64 / labels.len() as f64))
}

/// Builds a fresh classifier shaped for `set` and fits it.
pub fn train(set: &TrainingSet, config: &TrainingConfig) -> ModelResult<TrainedModel> {
    config.validate()?;
    if set.is_empty() {
        return Err(ModelError::EmptyDataset);
    }
    let sequence_length = set.windows[0].len();
    let model_config = ModelConfig {
        sequence_length,
        num_features: NUM_BANDS,
        hidden_sizes: config.hidden_sizes.clone(),
        num_classes: set.num_classes,
    };
    let mut model = SequenceClassifier::new(model_config, config.seed)?;
    model.set_recording(set.recording.clone());

    let x = model.to_input(&set.windows)?;
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_entropy(),
    };
    let (mut train_idx, val_idx) = stratified_split(&set.labels, config.test_size, &mut rng);
    let validation = if val_idx.is_empty() {
        None
    } else {
        let y_val: Vec<usize> = val_idx.iter().map(|&i| set.labels[i]).collect();
        Some((x.select(Axis(0), &val_idx), y_val))
    };

    info!(
        train = train_idx.len(),
        validation = val_idx.len(),
        classes = set.num_classes,
        sequence_length,
        "starting training"
    );

    let mut optimizer = Adam::new(config.learning_rate);
    let mut history = TrainingHistory::default();

    for epoch in 1..=config.epochs {
        train_idx.shuffle(&mut rng);
        let mut total_loss = 0.0;
        let mut correct = 0;

        for batch in train_idx.chunks(config.batch_size) {
            let xb = x.select(Axis(0), batch);
            let yb: Vec<usize> = batch.iter().map(|&i| set.labels[i]).collect();
            let (loss, probs, grads) = model.loss_and_gradients(&xb, &yb)?;
            optimizer.update(model.params_mut(), &grads);

            total_loss += loss * batch.len() as f64;
            correct += probs
                .rows()
                .into_iter()
                .zip(&yb)
                .filter(|(row, &label)| argmax(&row.to_vec()) == label)
                .count();
        }

        let seen = train_idx.len() as f64;
        history.loss.push(total_loss / seen);
        history.accuracy.push(correct as f64 / seen);

        if let Some((x_val, y_val)) = &validation {
            let (val_loss, val_accuracy) = evaluate(&model, x_val, y_val)?;
            history.val_loss.push(val_loss);
            history.val_accuracy.push(val_accuracy);
            info!(
                epoch,
                loss = total_loss / seen,
                accuracy = correct as f64 / seen,
                val_loss,
                val_accuracy,
                "epoch {}/{}",
                epoch,
                config.epochs
            );
        } else {
            info!(
                epoch,
                loss = total_loss / seen,
                accuracy = correct as f64 / seen,
                "epoch {}/{}",
                epoch,
                config.epochs
            );
        }
    }

    Ok(TrainedModel { model, history })
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeg_types::BandPowers;
    use rand::Rng;

    fn separable_set(per_class: usize, seed: u64) -> TrainingSet {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut set = TrainingSet {
            num_classes: 2,
            ..TrainingSet::default()
        };
        for label in 0..2 {
            for _ in 0..per_class {
                let window = (0..10)
                    .map(|_| {
                        let mut v = [0.0f32; NUM_BANDS];
                        v[if label == 0 { 0 } else { 4 }] = 1.0;
                        for x in v.iter_mut() {
                            *x += rng.gen_range(-0.1..0.1);
                        }
                        BandPowers(v)
                    })
                    .collect();
                set.windows.push(window);
                set.labels.push(label);
            }
        }
        set
    }

    fn quick_config() -> TrainingConfig {
        TrainingConfig {
            epochs: 40,
            batch_size: 10,
            learning_rate: 1e-2,
            test_size: 0.2,
            hidden_sizes: vec![8],
            seed: Some(3),
        }
    }

    #[test]
    fn learns_separable_classes() {
        let set = separable_set(20, 0);
        let trained = train(&set, &quick_config()).unwrap();
        let history = &trained.history;

        assert_eq!(history.loss.len(), 40);
        assert_eq!(history.val_accuracy.len(), 40);
        assert!(history.loss.last().unwrap() < &history.loss[0]);
        assert!(*history.accuracy.last().unwrap() >= 0.9);
        assert_eq!(trained.model.num_classes(), 2);
    }

    #[test]
    fn output_dimension_follows_action_count() {
        let mut set = separable_set(4, 1);
        set.num_classes = 4;
        let config = TrainingConfig {
            epochs: 1,
            ..quick_config()
        };
        let trained = train(&set, &config).unwrap();
        let probs = trained.model.predict(&set.windows[0]).unwrap();
        assert_eq!(probs.len(), 4);
    }

    #[test]
    fn model_remembers_recording_settings() {
        let mut set = separable_set(4, 1);
        let settings = eeg_types::RecordingSettings {
            features: eeg_types::FeatureConfig::default(),
            sample_rate: 256.0,
        };
        set.recording = Some(settings.clone());
        let config = TrainingConfig {
            epochs: 1,
            ..quick_config()
        };
        let trained = train(&set, &config).unwrap();
        assert_eq!(trained.model.recording(), Some(&settings));
    }

    #[test]
    fn seeded_training_is_reproducible() {
        let set = separable_set(6, 2);
        let config = TrainingConfig {
            epochs: 3,
            ..quick_config()
        };
        let a = train(&set, &config).unwrap();
        let b = train(&set, &config).unwrap();
        assert_eq!(a.history, b.history);
    }

    #[test]
    fn empty_set_is_an_error() {
        let set = TrainingSet {
            num_classes: 2,
            ..TrainingSet::default()
        };
        assert!(matches!(
            train(&set, &quick_config()),
            Err(ModelError::EmptyDataset)
        ));
    }

    #[test]
    fn bad_config_is_rejected() {
        let config = TrainingConfig {
            test_size: 1.0,
            ..quick_config()
        };
        assert!(train(&separable_set(3, 0), &config).is_err());
    }
}
