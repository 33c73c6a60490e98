pub mod column_mapping;
pub mod config;
pub mod explore;
pub mod fake_population;
pub mod ingest;
pub mod logging;
pub mod metric;
pub mod percentile;
pub mod pizza;
pub mod population;
pub mod position;
pub mod sample_export;
pub mod sample_filter;
pub mod state;
pub mod template;
