//! Market data: providers, validation and the preprocessed table.

pub mod csv_file;
pub mod market_data;
pub mod memory;
pub mod provider;
pub mod synthetic;
pub mod validate;

pub use csv_file::CsvProvider;
pub use market_data::{preprocess, MarketData};
pub use memory::InMemoryProvider;
pub use provider::{DataError, HistoricalDataProvider};
pub use validate::{check_columns, validate_bars, DataFormatError, REQUIRED_COLUMNS};
