use shared::{
    domain::{ChartKind, ChartSpec, Table},
    error::ErrorCode,
    protocol::{ChartArtifact, ChartPoint},
};
use thiserror::Error;

use crate::svg;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChartError {
    #[error("column '{0}' is not in the table")]
    UnknownColumn(String),
}

impl ChartError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ChartError::UnknownColumn(_) => ErrorCode::UnknownColumn,
        }
    }
}

/// Line chart of `table[y]` against `table[x]`, one point per row, in row order.
pub fn render(table: &Table, x: &str, y: &str) -> Result<ChartArtifact, ChartError> {
    render_spec(&ChartSpec::line(table, x, y))
}

pub fn render_spec(spec: &ChartSpec<'_>) -> Result<ChartArtifact, ChartError> {
    let x_values = spec
        .table
        .column(spec.x)
        .ok_or_else(|| ChartError::UnknownColumn(spec.x.to_string()))?;
    let y_values = spec
        .table
        .column(spec.y)
        .ok_or_else(|| ChartError::UnknownColumn(spec.y.to_string()))?;

    let points: Vec<ChartPoint> = x_values
        .zip(y_values)
        .map(|(x, y)| ChartPoint {
            x: x.clone(),
            y: y.clone(),
        })
        .collect();

    let svg = match spec.kind {
        ChartKind::Line => svg::line_chart(&points, spec.x, spec.y),
    };

    Ok(ChartArtifact {
        kind: spec.kind,
        x_label: spec.x.to_string(),
        y_label: spec.y.to_string(),
        points,
        svg,
    })
}

#[cfg(test)]
#[path = "tests/chart_tests.rs"]
mod tests;
