//! Turns uploaded spreadsheets into tables and tables into line charts.

pub mod chart;
pub mod decode;
pub mod parse;
pub mod preview;
mod svg;

pub use chart::{render, render_spec, ChartError};
pub use decode::{decode, type_tag, DecodeError};
pub use parse::{parse, FileKind, ParseError};
pub use preview::{paginate, page_count, PREVIEW_PAGE_SIZE};
