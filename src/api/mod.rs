// Machine-readable reports for `--json`.

pub mod dto;

pub use dto::{RunReport, StatsDto};
