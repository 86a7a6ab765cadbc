pub mod align;
pub mod cancel;
pub mod config;
pub mod error;
pub mod partial;
pub mod pipeline;
pub mod refresh;
pub mod stats;

pub use align::{AsOfRows, Aligner, DailyMatch, FrameHistory};
pub use cancel::CancelFlag;
pub use config::{EngineConfig, ScannerSettings, DEFAULT_LOOKBACK};
pub use error::EngineError;
pub use partial::{refresh_partial_bars, refresh_partial_indicators, PartialStamp};
pub use pipeline::{compute_indicator_rows, OutputMode};
pub use refresh::{refresh_indicators, refresh_series, RefreshConfig, RefreshMode, RefreshReport};
pub use stats::refresh_week52_stats;
