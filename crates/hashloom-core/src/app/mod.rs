//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてワークフローを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **Orchestrator**: ワークフロー本体（validate → fan-out → join → persist）
//! - **RunStore**: 実行状態の正本（再実行の冪等性を保証）
//! - **RequestGateway**: 受付境界（submit / status / cancel）

pub mod builder;
pub mod gateway;
pub mod orchestrator;
pub mod run_store;

pub use self::builder::{AppBuilder, BuildError};
pub use self::gateway::RequestGateway;
pub use self::orchestrator::Orchestrator;
pub use self::run_store::RunStore;
