//! 報表輸出：列印為分隔文字或寫入 Excel 檔案

use anyhow::{Context, Result};
use log::info;
use rust_xlsxwriter::Workbook;
use std::io::Write;
use std::path::Path;

/// 每列以 `separator` 連接後輸出
pub fn print_table<W: Write>(rows: &[Vec<String>], separator: &str, out: &mut W) -> Result<()> {
    for row in rows {
        writeln!(out, "{}", row.join(separator)).context("failed to write report")?;
    }
    out.flush().context("failed to write report")?;
    Ok(())
}

/// 寫入 Excel 檔案，既有檔案會被覆寫
pub fn write_spreadsheet(rows: &[Vec<String>], path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (i, row) in rows.iter().enumerate() {
        let row_index = u32::try_from(i).context("too many rows for a worksheet")?;
        for (j, value) in row.iter().enumerate() {
            let column_index = u16::try_from(j).context("too many columns for a worksheet")?;
            worksheet
                .write_string(row_index, column_index, value)
                .with_context(|| format!("could not write cell ({i}, {j})"))?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("could not save {}", path.display()))?;
    info!("report written to {}", path.display());
    Ok(())
}
