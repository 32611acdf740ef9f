//! Output Module
//!
//! グリッドをCSVとして書き出す処理を提供するモジュール。

mod csv_sink;

pub(crate) use csv_sink::CsvSink;
