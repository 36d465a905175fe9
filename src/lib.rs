// Library surface shared by the `cetlog` binary and the integration tests.
pub mod app_dirs;
pub mod config;
pub mod export;
pub mod record;
pub mod scorer;
pub mod section;
pub mod stats;
pub mod stopwatch;
pub mod store;
pub mod time_series;
pub mod util;

pub use record::SessionRecord;
pub use scorer::{Confirmation, RawInput, ScoreError, Scorer};
pub use section::{Domain, ScoringGroup, ScoringTable, SubSection};
