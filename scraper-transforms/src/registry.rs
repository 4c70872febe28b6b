//! Transform registry
//!
//! Maps the `kind` strings of the configuration document to transform
//! builders. Unknown kinds and malformed stage configs are configuration
//! errors raised before any document is processed.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use crate::error::ConfigError;
use crate::extract::{ExtractJson, ExtractSpec};
use crate::matching::MatchCriteria;
use crate::passes::{
    DropElements, MergeByTag, MergeByTagConfig, NestBullets, NestSections, RegexReplace,
    RegexReplaceConfig, SplitText, SplitTextConfig, StripElements, StripElementsConfig,
    TagMatching, TagMatchingConfig,
};
use crate::Transform;

type BuilderFn = Box<dyn Fn(serde_yaml::Value) -> Result<Box<dyn Transform>, ConfigError>>;

pub struct TransformRegistry {
    builders: BTreeMap<String, BuilderFn>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    /// Registry with all built-in transformation kinds.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("drop_elements", |value| {
            let criteria: MatchCriteria = bind("drop_elements", value)?;
            Ok(Box::new(DropElements::new(criteria)))
        });
        registry.register("merge_by_tag", |value| {
            let config: MergeByTagConfig = bind("merge_by_tag", value)?;
            Ok(Box::new(MergeByTag::from_config(config)))
        });
        registry.register("nest_bullets", |value| {
            bind_empty("nest_bullets", value)?;
            Ok(Box::new(NestBullets))
        });
        registry.register("nest_sections", |value| {
            bind_empty("nest_sections", value)?;
            Ok(Box::new(NestSections))
        });
        registry.register("regex_replace", |value| {
            let config: RegexReplaceConfig = bind("regex_replace", value)?;
            Ok(Box::new(RegexReplace::from_config(config)))
        });
        registry.register("split_text", |value| {
            let config: SplitTextConfig = bind("split_text", value)?;
            Ok(Box::new(SplitText::from_config(config)))
        });
        registry.register("strip_elements", |value| {
            let config: StripElementsConfig = bind("strip_elements", value)?;
            StripElements::from_config(config)
                .map(|pass| Box::new(pass) as Box<dyn Transform>)
                .map_err(|reason| ConfigError::invalid("strip_elements", reason))
        });
        registry.register("tag_matching", |value| {
            let config: TagMatchingConfig = bind("tag_matching", value)?;
            TagMatching::from_config(config)
                .map(|pass| Box::new(pass) as Box<dyn Transform>)
                .map_err(|reason| ConfigError::invalid("tag_matching", reason))
        });
        registry.register("extract_json", |value| {
            let spec: ExtractSpec = bind("extract_json", value)?;
            ExtractJson::from_config(spec)
                .map(|pass| Box::new(pass) as Box<dyn Transform>)
                .map_err(|reason| ConfigError::invalid("extract_json", reason))
        });
        registry
    }

    pub fn register(
        &mut self,
        kind: &str,
        builder: impl Fn(serde_yaml::Value) -> Result<Box<dyn Transform>, ConfigError> + 'static,
    ) {
        self.builders.insert(kind.to_string(), Box::new(builder));
    }

    pub fn kinds(&self) -> Vec<String> {
        self.builders.keys().cloned().collect()
    }

    pub fn build(
        &self,
        kind: &str,
        config: serde_yaml::Value,
    ) -> Result<Box<dyn Transform>, ConfigError> {
        let builder = self.builders.get(kind).ok_or_else(|| ConfigError::UnknownKind {
            kind: kind.to_string(),
            available: self.kinds(),
        })?;
        builder(config)
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Deserialize a stage config; a missing config reads as an empty mapping.
fn bind<C: DeserializeOwned>(kind: &str, value: serde_yaml::Value) -> Result<C, ConfigError> {
    let value = if value.is_null() {
        serde_yaml::Value::Mapping(Default::default())
    } else {
        value
    };
    serde_yaml::from_value(value).map_err(|err| ConfigError::invalid(kind, err.to_string()))
}

/// Kinds without configuration reject anything but an empty/missing config.
fn bind_empty(kind: &str, value: serde_yaml::Value) -> Result<(), ConfigError> {
    match &value {
        serde_yaml::Value::Null => Ok(()),
        serde_yaml::Value::Mapping(mapping) if mapping.is_empty() => Ok(()),
        _ => Err(ConfigError::invalid(kind, "takes no configuration")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_knows_all_kinds() {
        let registry = TransformRegistry::with_defaults();
        let kinds = registry.kinds();
        for kind in [
            "drop_elements",
            "merge_by_tag",
            "nest_bullets",
            "nest_sections",
            "regex_replace",
            "split_text",
            "strip_elements",
            "tag_matching",
            "extract_json",
        ] {
            assert!(kinds.iter().any(|k| k == kind), "missing {}", kind);
        }
    }

    #[test]
    fn unknown_kind_is_a_config_error() {
        let registry = TransformRegistry::with_defaults();
        let result = registry.build("shuffle_elements", serde_yaml::Value::Null);
        assert!(matches!(result, Err(ConfigError::UnknownKind { .. })));
    }

    #[test]
    fn malformed_config_is_a_config_error() {
        let registry = TransformRegistry::with_defaults();
        let config = serde_yaml::from_str("substitutions: 17").expect("yaml parses");
        let result = registry.build("regex_replace", config);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn config_free_kinds_build_from_null() {
        let registry = TransformRegistry::with_defaults();
        assert!(registry.build("nest_bullets", serde_yaml::Value::Null).is_ok());
        let config = serde_yaml::from_str("unexpected: true").expect("yaml parses");
        assert!(registry.build("nest_sections", config).is_err());
    }
}
