//! Explicit lifecycle state for screens that render engine output.

use serde::Serialize;

use crate::rebalancing::RebalancingResult;

/// What a consuming screen should show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum ViewState<T> {
    Loading,
    Ready(T),
    Empty,
    Failed(String),
}

impl<T> ViewState<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ViewState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            ViewState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ViewState<U> {
        match self {
            ViewState::Loading => ViewState::Loading,
            ViewState::Ready(data) => ViewState::Ready(f(data)),
            ViewState::Empty => ViewState::Empty,
            ViewState::Failed(message) => ViewState::Failed(message),
        }
    }
}

impl ViewState<RebalancingResult> {
    /// A balanced portfolio renders as `Empty` ("no action needed"); any
    /// failure degrades to `Failed` instead of propagating.
    pub fn from_rebalancing<E: std::fmt::Display>(result: Result<RebalancingResult, E>) -> Self {
        match result {
            Ok(result) if result.is_balanced() => ViewState::Empty,
            Ok(result) => ViewState::Ready(result),
            Err(err) => ViewState::Failed(err.to_string()),
        }
    }
}
