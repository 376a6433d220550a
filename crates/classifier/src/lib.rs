//! Recurrent classifier mapping band-power sequences to action classes.
//!
//! A stack of GRU layers reads a window of smoothed band-power vectors and a
//! softmax head scores each recorded action. Training uses back-propagation
//! through time with Adam; models are stored as versioned JSON.

pub mod error;
pub mod layers;
pub mod model;
pub mod optimizer;
pub mod split;
pub mod train;

pub use error::{ModelError, ModelResult};
pub use model::{argmax, ModelConfig, SequenceClassifier, MODEL_FORMAT_VERSION};
pub use split::stratified_split;
pub use train::{evaluate, train, TrainedModel, TrainingConfig, TrainingHistory};
