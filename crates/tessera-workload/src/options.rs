//! String-keyed workload options with typed getters.
//!
//! Options arrive as `key=value` strings from configuration or the command
//! line. Names are case-insensitive. Each getter records the key as consumed
//! so that options no workload asked for can be reported after construction.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use crate::error::WorkloadError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkloadOptions {
    values: BTreeMap<String, String>,
    consumed: BTreeSet<String>,
}

impl WorkloadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(key.into().to_ascii_lowercase(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Parses a single `key=value` argument.
    pub fn parse_pair(pair: &str) -> Result<(String, String), WorkloadError> {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(WorkloadError::InvalidOption {
                key: pair.to_string(),
                value: String::new(),
                reason: "expected key=value".to_string(),
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(WorkloadError::InvalidOption {
                key: String::new(),
                value: value.to_string(),
                reason: "empty option name".to_string(),
            });
        }
        Ok((key.to_string(), value.trim().to_string()))
    }

    pub fn get_usize(&mut self, key: &str, default: usize) -> Result<usize, WorkloadError> {
        self.parse(key, default)
    }

    /// Reads a non-negative, finite floating point option.
    pub fn get_f64(&mut self, key: &str, default: f64) -> Result<f64, WorkloadError> {
        let value: f64 = self.parse(key, default)?;
        if value.is_finite() && value >= 0.0 {
            Ok(value)
        } else {
            Err(self.invalid(key, "must be a finite, non-negative number"))
        }
    }

    pub fn get_bool(&mut self, key: &str, default: bool) -> Result<bool, WorkloadError> {
        let Some(raw) = self.take(key) else {
            return Ok(default);
        };
        match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(self.invalid(key, "expected a boolean")),
        }
    }

    /// Keys that were supplied but never read.
    pub fn unused(&self) -> Vec<&str> {
        self.values
            .keys()
            .filter(|key| !self.consumed.contains(*key))
            .map(String::as_str)
            .collect()
    }

    fn take(&mut self, key: &str) -> Option<String> {
        let key = key.to_ascii_lowercase();
        let raw = self.values.get(&key)?.clone();
        self.consumed.insert(key);
        Some(raw)
    }

    fn parse<T: FromStr>(&mut self, key: &str, default: T) -> Result<T, WorkloadError>
    where
        T::Err: std::fmt::Display,
    {
        let Some(raw) = self.take(key) else {
            return Ok(default);
        };
        raw.parse()
            .map_err(|e: T::Err| self.invalid(key, &e.to_string()))
    }

    fn invalid(&self, key: &str, reason: &str) -> WorkloadError {
        WorkloadError::InvalidOption {
            key: key.to_string(),
            value: self
                .values
                .get(&key.to_ascii_lowercase())
                .cloned()
                .unwrap_or_default(),
            reason: reason.to_string(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for WorkloadOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = Self::new();
        for (key, value) in iter {
            options.insert(key, value);
        }
        options
    }
}
