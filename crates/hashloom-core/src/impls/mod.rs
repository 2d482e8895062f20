//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **FileSink**: タイムスタンプ付きテキストファイルへの永続化（本番用）
//! - **MemorySink**: 開発・テスト用のインメモリ実装
//!
//! 他の出力先（オブジェクトストレージ、メッセージキューなど）は別クレートに
//! 配置する想定です。

pub mod file_sink;
pub mod memory_sink;

pub use self::file_sink::FileSink;
pub use self::memory_sink::MemorySink;
