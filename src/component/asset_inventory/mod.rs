//! 素材清單元件
//!
//! 四階段流程：
//! A. 掃描目錄（單執行緒），影像檔合併為序列
//! B. 以 ffprobe 建立影片資訊
//! C. 平行計算每個儲存格的欄位樣板
//! D. 列印或寫入 Excel

mod field_evaluator;
mod field_template;
mod main;
mod mov_builder;
mod report_writer;
mod sequence_grouper;
mod table_assembler;

pub use field_evaluator::{Entity, EvalError, FieldEvaluator, FieldFuncs};
pub use field_template::{Arity, FieldTemplate, TemplateError};
pub use main::{AssetInventory, InventoryOptions, ScannedAssets, scan_assets};
pub use mov_builder::{FieldError, FrameRate, Mov, MovBuilder, render_field};
pub use report_writer::{print_table, write_spreadsheet};
pub use sequence_grouper::{FRAME_TOKEN, FrameNumber, Sequence, SequenceGrouper, group_sequences};
pub use table_assembler::{AssemblyState, Table, TableAssembler};
