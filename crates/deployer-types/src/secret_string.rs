//! Secure string type for handling sensitive data such as private keys.
//!
//! The value is never exposed through `Debug` or `Display`, and access to
//! the underlying string is funneled through a closure so call sites are
//! explicit about where the secret leaks into.

use serde::{Deserialize, Deserializer};
use std::fmt;

/// A string whose contents are redacted in all formatting output.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
	/// Wraps a sensitive string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Runs a closure with the exposed secret.
	pub fn with_exposed<T>(&self, f: impl FnOnce(&str) -> T) -> T {
		f(&self.0)
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("SecretString([REDACTED])")
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("[REDACTED]")
	}
}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self(value)
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		Ok(Self(String::deserialize(deserializer)?))
	}
}
