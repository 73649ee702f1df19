#![forbid(unsafe_code)]

//! Container construction options.

use serde::{Deserialize, Serialize};

/// Declaration field read when no other is configured.
pub const DEFAULT_DECLARATION_FIELD: &str = "wiring";

/// Options fixed at container construction.
///
/// Every field has a default, so partial documents deserialize:
///
/// ```
/// use wirekit::ContainerOptions;
///
/// let opts = ContainerOptions::from_json(r#"{ "verbose": true }"#).unwrap();
/// assert!(opts.verbose);
/// assert_eq!(opts.declaration_field, "wiring");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerOptions {
    /// Name of the declaration each object's slot is read from.
    pub declaration_field: String,
    /// Emit a `tracing` debug event for every wiring decision.
    pub verbose: bool,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            declaration_field: DEFAULT_DECLARATION_FIELD.to_owned(),
            verbose: false,
        }
    }
}

impl ContainerOptions {
    /// Default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read declarations from `field` instead of the default.
    #[must_use]
    pub fn with_declaration_field(mut self, field: impl Into<String>) -> Self {
        self.declaration_field = field.into();
        self
    }

    /// Enable or disable tracing of wiring decisions.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Parse options from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = ContainerOptions::default();
        assert_eq!(opts.declaration_field, DEFAULT_DECLARATION_FIELD);
        assert!(!opts.verbose);
    }

    #[test]
    fn builder_sets_fields() {
        let opts = ContainerOptions::new()
            .with_declaration_field("deps")
            .with_verbose(true);
        assert_eq!(opts.declaration_field, "deps");
        assert!(opts.verbose);
    }

    #[test]
    fn json_round_trip_and_unknown_fields() {
        let opts = ContainerOptions::new().with_declaration_field("deps");
        let json = serde_json::to_string(&opts).unwrap();
        assert_eq!(ContainerOptions::from_json(&json).unwrap(), opts);
        assert!(ContainerOptions::from_json(r#"{"cfg": "x"}"#).is_err());
        assert_eq!(ContainerOptions::from_json("{}").unwrap(), ContainerOptions::default());
    }
}
