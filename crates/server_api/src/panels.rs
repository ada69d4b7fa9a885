use chrono::DateTime;
use shared::{
    domain::{Table, TableGeneration},
    error::{ApiError, FILE_PROCESSING_MESSAGE},
    protocol::{ErrorPanel, PickerOption, TablePanel, UploadPanel},
};
use tabular::paginate;

/// Characters of the transport payload echoed back under "Raw Content".
pub const RAW_EXCERPT_CHARS: usize = 200;

/// The parts of an upload that survive into its panel once the payload has
/// been decoded.
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub filename: String,
    pub last_modified: Option<String>,
    pub raw_excerpt: String,
}

impl FileHeader {
    pub fn new(contents: &str, filename: &str, last_modified: Option<i64>) -> Self {
        Self {
            filename: filename.to_string(),
            last_modified: last_modified.and_then(format_last_modified),
            raw_excerpt: raw_excerpt(contents),
        }
    }
}

pub fn table_panel(
    header: FileHeader,
    table: &Table,
    generation: TableGeneration,
    page_size: usize,
) -> UploadPanel {
    let options: Vec<PickerOption> = table
        .columns()
        .iter()
        .map(|column| PickerOption {
            label: column.clone(),
            value: column.clone(),
        })
        .collect();
    UploadPanel::Table(TablePanel {
        filename: header.filename,
        last_modified: header.last_modified,
        generation,
        x_options: options.clone(),
        y_options: options,
        preview: paginate(table, 0, page_size),
        raw_excerpt: header.raw_excerpt,
    })
}

pub fn error_panel(header: FileHeader, error: ApiError) -> UploadPanel {
    UploadPanel::Error(ErrorPanel {
        filename: header.filename,
        message: FILE_PROCESSING_MESSAGE.to_string(),
        error,
    })
}

fn format_last_modified(millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(millis).map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

fn raw_excerpt(contents: &str) -> String {
    let mut excerpt: String = contents.chars().take(RAW_EXCERPT_CHARS).collect();
    excerpt.push_str("...");
    excerpt
}
