//! Model-type registry: configuration string → generator constructor.
//!
//! Lookups are case-insensitive. A model type that is not registered but
//! has the form `provider:model` is built directly through
//! [`ProviderFactory::create_llm_provider`], so any edgequake-llm provider is
//! reachable without registering it first.

use crate::config::ConversionConfig;
use crate::error::SnapTexError;
use crate::generator::{LatexGenerator, VisionLatexGenerator};
use edgequake_llm::ProviderFactory;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Builds a generator from the conversion config.
pub type GeneratorConstructor =
    Arc<dyn Fn(&ConversionConfig) -> Result<Arc<dyn LatexGenerator>, SnapTexError> + Send + Sync>;

const GEMINI_FLASH_ALIASES: &[&str] = &[
    "gemini-flash",
    "gemini-1.5-flash",
    "gemini-2.5-flash",
    "gemini-flash-latest",
];

const GEMINI_PRO_ALIASES: &[&str] = &[
    "gemini-pro",
    "gemini-1.5-pro",
    "gemini-2.5-pro",
    "gemini-pro-latest",
];

/// Map from model-type strings to generator constructors.
#[derive(Clone, Default)]
pub struct GeneratorRegistry {
    constructors: HashMap<String, GeneratorConstructor>,
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("model_types", &self.model_types())
            .finish()
    }
}

impl GeneratorRegistry {
    /// An empty registry; only `provider:model` strings resolve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in Gemini aliases.
    ///
    /// Older and generic names map to the current 2.5 models.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for alias in GEMINI_FLASH_ALIASES {
            registry.register(alias, vision_constructor("gemini", "gemini-2.5-flash"));
        }
        for alias in GEMINI_PRO_ALIASES {
            registry.register(alias, vision_constructor("gemini", "gemini-2.5-pro"));
        }
        registry
    }

    /// Register (or replace) a constructor under `model_type`.
    pub fn register(&mut self, model_type: &str, constructor: GeneratorConstructor) {
        self.constructors
            .insert(model_type.trim().to_lowercase(), constructor);
    }

    /// Registered model types, sorted.
    pub fn model_types(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.constructors.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Build the generator for `model_type`.
    ///
    /// # Errors
    /// [`SnapTexError::UnsupportedModel`] when the string is neither
    /// registered nor `provider:model`; [`SnapTexError::ProviderNotConfigured`]
    /// when the provider cannot be created (missing API key etc.).
    pub fn create(
        &self,
        model_type: &str,
        config: &ConversionConfig,
    ) -> Result<Arc<dyn LatexGenerator>, SnapTexError> {
        let key = model_type.trim().to_lowercase();

        if let Some(constructor) = self.constructors.get(&key) {
            return constructor(config);
        }

        if let Some((provider, model)) = split_provider_model(model_type) {
            return create_vision_generator(provider, model, config);
        }

        Err(SnapTexError::UnsupportedModel {
            model_type: model_type.to_string(),
            known: self.model_types().join(", "),
        })
    }
}

/// Split `provider:model`; both halves must be non-empty.
fn split_provider_model(model_type: &str) -> Option<(&str, &str)> {
    let (provider, model) = model_type.trim().split_once(':')?;
    let (provider, model) = (provider.trim(), model.trim());
    if provider.is_empty() || model.is_empty() {
        None
    } else {
        Some((provider, model))
    }
}

fn vision_constructor(provider: &'static str, model: &'static str) -> GeneratorConstructor {
    Arc::new(move |config: &ConversionConfig| create_vision_generator(provider, model, config))
}

/// Instantiate an edgequake-llm provider and wrap it as a generator.
fn create_vision_generator(
    provider_name: &str,
    model: &str,
    config: &ConversionConfig,
) -> Result<Arc<dyn LatexGenerator>, SnapTexError> {
    let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        SnapTexError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    info!("Using vision model {}/{}", provider_name, model);

    Ok(Arc::new(VisionLatexGenerator::new(
        provider,
        format!("{provider_name}/{model}"),
        config,
    )))
}
