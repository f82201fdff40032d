//! Merge policy and service composing configuration sources.

mod merge_policy;
pub mod service;
