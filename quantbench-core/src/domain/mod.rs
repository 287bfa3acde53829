//! Domain types shared by data providers, strategies and the engine.

pub mod bar;
pub mod signal;
pub mod timeframe;
pub mod trade;

pub use bar::Bar;
pub use signal::{Action, Recommendation, Side, Signal};
pub use timeframe::{TimeUnit, Timeframe, TimeframeError};
pub use trade::{round_trips, RoundTrip, Trade};
