//! Converter registry.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::converter::Converter;

/// Registry key for a conversion pair.
pub fn converter_key(input: &str, output: &str) -> String {
    format!("{input}_to_{output}")
}

/// Holds the registered converters, keyed by `"{input}_to_{output}"`.
///
/// Registration is last-wins: a later registration for the same pair
/// replaces the earlier one, logged at warn so a misconfigured table is
/// visible without being fatal.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: HashMap<String, Arc<dyn Converter>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, converter: Arc<dyn Converter>) {
        let key = converter_key(converter.input_format(), converter.output_format());
        if self.converters.contains_key(&key) {
            tracing::warn!(key = %key, "Replacing previously registered converter");
        }
        self.converters.insert(key, converter);
    }

    /// Converter for the exact pair, if registered.
    pub fn get(&self, input: &str, output: &str) -> Option<&Arc<dyn Converter>> {
        self.converters.get(&converter_key(input, output))
    }

    /// All formats that appear on either side of a registered pair, sorted.
    pub fn all_formats(&self) -> Vec<String> {
        let mut formats = BTreeSet::new();
        for conv in self.converters.values() {
            formats.insert(conv.input_format().to_string());
            formats.insert(conv.output_format().to_string());
        }
        formats.into_iter().collect()
    }

    /// All registered (input, output) pairs, sorted.
    pub fn all_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<_> = self
            .converters
            .values()
            .map(|c| (c.input_format().to_string(), c.output_format().to_string()))
            .collect();
        pairs.sort();
        pairs
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.converters.keys().collect();
        keys.sort();
        f.debug_struct("ConverterRegistry")
            .field("converters", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::CopyConverter;

    #[test]
    fn key_format() {
        assert_eq!(converter_key("step", "stl"), "step_to_stl");
    }

    #[test]
    fn register_and_get() {
        let mut registry = ConverterRegistry::new();
        registry.register(Arc::new(CopyConverter::new("step", "stp")));

        assert!(registry.get("step", "stp").is_some());
        assert!(registry.get("stp", "step").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = ConverterRegistry::new();
        registry.register(Arc::new(CopyConverter::new("step", "stp")));
        registry.register(Arc::new(CopyConverter::new("step", "stp")));

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn formats_and_pairs_sorted() {
        let mut registry = ConverterRegistry::new();
        registry.register(Arc::new(CopyConverter::new("step", "stp")));
        registry.register(Arc::new(CopyConverter::new("iges", "igs")));

        assert_eq!(registry.all_formats(), vec!["iges", "igs", "step", "stp"]);
        assert_eq!(
            registry.all_pairs(),
            vec![
                ("iges".to_string(), "igs".to_string()),
                ("step".to_string(), "stp".to_string()),
            ]
        );
    }
}
