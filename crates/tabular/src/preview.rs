use shared::{domain::Table, protocol::PreviewPage};

/// Rows shown per page of the upload preview.
pub const PREVIEW_PAGE_SIZE: usize = 15;

pub fn page_count(total_rows: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    total_rows.div_ceil(page_size).max(1)
}

/// Zero-based page of `table`. Pages past the end come back empty.
pub fn paginate(table: &Table, page: usize, page_size: usize) -> PreviewPage {
    let page_size = page_size.max(1);
    let total_rows = table.row_count();
    let start = page.saturating_mul(page_size).min(total_rows);
    let end = start.saturating_add(page_size).min(total_rows);

    PreviewPage {
        page,
        page_size,
        page_count: page_count(total_rows, page_size),
        total_rows,
        columns: table.columns().to_vec(),
        rows: table.rows()[start..end].to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use shared::domain::CellValue;

    use super::*;

    fn numbered(rows: i64) -> Table {
        Table::new(
            vec!["n".into()],
            (0..rows).map(|n| vec![CellValue::Int(n)]).collect(),
        )
        .expect("table")
    }

    #[test]
    fn splits_rows_into_fixed_pages() {
        let table = numbered(32);
        let first = paginate(&table, 0, PREVIEW_PAGE_SIZE);
        assert_eq!(first.rows.len(), 15);
        assert_eq!(first.page_count, 3);
        assert_eq!(first.total_rows, 32);

        let last = paginate(&table, 2, PREVIEW_PAGE_SIZE);
        assert_eq!(last.rows, vec![vec![CellValue::Int(30)], vec![CellValue::Int(31)]]);
    }

    #[test]
    fn out_of_range_page_is_empty() {
        let page = paginate(&numbered(3), 9, PREVIEW_PAGE_SIZE);
        assert!(page.rows.is_empty());
        assert_eq!(page.page_count, 1);
    }

    #[test]
    fn empty_table_still_has_one_page() {
        assert_eq!(page_count(0, PREVIEW_PAGE_SIZE), 1);
    }
}
