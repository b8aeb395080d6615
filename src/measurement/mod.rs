mod filter;

pub use filter::{MeasurementFilter, MeasurementWindow, WindowStatistics, WINDOW_CAPACITY};
