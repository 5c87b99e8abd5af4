use serde::Deserialize;

/// Configuration file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InjectorConfig {
    /// `label` or `annotation`. Validated when the mode is resolved so the
    /// error names the offending value.
    #[serde(default)]
    pub mode: Option<String>,
}
