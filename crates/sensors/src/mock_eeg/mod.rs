pub mod driver;
pub mod mock_data_generator;

pub use driver::{MockConfig, MockSource};
pub use mock_data_generator::EegGenerator;
