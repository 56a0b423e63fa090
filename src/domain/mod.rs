//! Core domain types and logic: events, replay, contract resolution,
//! portfolio and the engine that ties them together.

pub mod backtest;
pub mod config_validation;
pub mod contract;
pub mod engine;
pub mod error;
pub mod event;
pub mod fill;
pub mod ids;
pub mod indicator;
pub mod instrument;
pub mod ma_cross;
pub mod market;
pub mod portfolio;
pub mod position;
pub mod queue;
pub mod replay;
pub mod strategy;
