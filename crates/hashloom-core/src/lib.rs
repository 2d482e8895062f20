//! hashloom-core
//!
//! Core building blocks for the Hashloom runtime: fan a range of integers
//! out to parallel hashing units and fan the results back in, in order.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, request, result, run, errors）
//! - **hasher**: ハッシュユニット（Hasher trait, Md5Hasher）
//! - **validator**: 範囲検証（RangeValidator）
//! - **ports**: 抽象化レイヤー（ResultSink, Clock, IdGenerator）
//! - **impls**: 実装（FileSink, MemorySink）
//! - **app**: アプリケーションロジック（Orchestrator, RunStore, RequestGateway, AppBuilder）

pub mod app;
pub mod domain;
pub mod hasher;
pub mod impls;
pub mod ports;
pub mod validator;
