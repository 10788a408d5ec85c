//! Configuration spec strings.
//!
//! A spec has the form `<provider>://<field1>:<field2>:...`. The provider is
//! required; fields are split on `:` with empty fields kept verbatim. An
//! empty remainder means "no fields". Field count is validated by the
//! backend that consumes the spec, not here.

use std::str::FromStr;

use crate::error::{KmsError, SpecError};

const SEPARATOR: &str = "://";

/// A parsed `<provider>://<fields>` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSpec {
    /// Provider name (text before `://`).
    pub provider: String,
    /// Ordered fields (text after `://`, split on `:`).
    pub fields: Vec<String>,
}

impl ConfigSpec {
    /// Parses a spec string.
    ///
    /// ```
    /// use egide_kms::ConfigSpec;
    ///
    /// let spec = ConfigSpec::parse("gkms://a:b:c").unwrap();
    /// assert_eq!(spec.provider, "gkms");
    /// assert_eq!(spec.fields, vec!["a", "b", "c"]);
    /// ```
    pub fn parse(spec: &str) -> Result<Self, SpecError> {
        if spec.is_empty() {
            return Err(SpecError::EmptySpec);
        }

        let (provider, rest) = spec
            .split_once(SEPARATOR)
            .ok_or(SpecError::MissingProvider)?;

        if provider.is_empty() {
            return Err(SpecError::MissingProvider);
        }

        let fields = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(':').map(str::to_string).collect()
        };

        Ok(Self {
            provider: provider.to_string(),
            fields,
        })
    }

    /// Returns the first `n` fields, or an error naming the expected layout.
    pub fn require_fields(&self, n: usize, usage: &'static str) -> Result<&[String], KmsError> {
        if self.fields.len() < n {
            return Err(KmsError::InsufficientFields {
                provider: self.provider.clone(),
                usage,
                got: self.fields.len(),
            });
        }
        Ok(&self.fields[..n])
    }

    /// Rejoins the fields with `:`, for providers taking a single value
    /// that may itself contain colons (e.g. a file path).
    pub fn joined_fields(&self) -> String {
        self.fields.join(":")
    }
}

impl FromStr for ConfigSpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
