use serde::{Deserialize, Serialize};

use crate::{
    domain::{CellValue, ChartKind, TableGeneration, UploadedFile},
    error::ApiError,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRequest {
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// `None` until the button has been clicked at least once.
    #[serde(default)]
    pub n_clicks: Option<u64>,
    #[serde(default)]
    pub x: Option<String>,
    #[serde(default)]
    pub y: Option<String>,
    /// Generation of the table the pickers were populated from.
    #[serde(default)]
    pub generation: Option<TableGeneration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickerOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewPage {
    pub page: usize,
    pub page_size: usize,
    pub page_count: usize,
    pub total_rows: usize,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablePanel {
    pub filename: String,
    pub last_modified: Option<String>,
    pub generation: TableGeneration,
    pub x_options: Vec<PickerOption>,
    pub y_options: Vec<PickerOption>,
    pub preview: PreviewPage,
    pub raw_excerpt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPanel {
    pub filename: String,
    pub message: String,
    pub error: ApiError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum UploadPanel {
    Table(TablePanel),
    Error(ErrorPanel),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub x: CellValue,
    pub y: CellValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartArtifact {
    pub kind: ChartKind,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<ChartPoint>,
    pub svg: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ChartPanel {
    Figure(ChartArtifact),
    Error(ApiError),
}

/// What the page should change in response to one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum RenderInstruction {
    NoUpdate,
    ReplaceUploadPanels { panels: Vec<UploadPanel> },
    ReplaceChart { chart: ChartPanel },
}
