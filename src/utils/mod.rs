pub mod constants;
pub mod filename;
pub mod lenient;
pub mod progress;

pub use constants::*;
pub use filename::{find_latest_csv, timestamped_csv_path};
pub use progress::ProgressReporter;
