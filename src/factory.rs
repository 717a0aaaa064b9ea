//! Provider factory and registration system.

use crate::{AccountError, Config, Provider, Result};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

/// Factory function type for creating providers.
pub type ProviderFactory = fn(Config) -> Result<Box<dyn Provider>>;

static PROVIDER_REGISTRY: OnceLock<RwLock<HashMap<String, ProviderFactory>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<String, ProviderFactory>> {
    PROVIDER_REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers a provider factory function.
///
/// This is typically called from provider modules' `register()` functions
/// during library initialization.
///
/// # Example
///
/// ```no_run
/// use localacct::factory::register_provider;
/// use localacct::{Config, Provider, Result};
///
/// fn my_provider_factory(config: Config) -> Result<Box<dyn Provider>> {
///     // Create and return provider instance
///     # unimplemented!()
/// }
///
/// pub fn register() {
///     register_provider("myprovider", my_provider_factory);
/// }
/// ```
pub fn register_provider(provider_type: &str, factory: ProviderFactory) {
    let mut reg = registry().write().unwrap_or_else(|e| e.into_inner());
    reg.insert(provider_type.to_string(), factory);
}

/// Creates a new provider from configuration.
///
/// The provider factory is looked up based on `config.provider`. If it is
/// not registered, an error is returned with a hint to check feature flags.
///
/// # Errors
///
/// Returns an error if:
/// - Provider type is not registered (missing feature flag or `init()` call)
/// - Provider factory returns an error during construction
///
/// # Example
///
/// ```
/// use localacct::{factory, Config, ProviderType};
///
/// localacct::init();
/// let provider = factory::new_provider(Config::new(ProviderType::Mock)).unwrap();
/// assert_eq!(provider.name(), "mock");
/// ```
pub fn new_provider(config: Config) -> Result<Box<dyn Provider>> {
    let provider_name = config.provider.to_string();

    let factory = {
        let reg = registry().read().unwrap_or_else(|e| e.into_inner());
        reg.get(&provider_name).copied()
    };
    let factory = factory.ok_or_else(|| {
        AccountError::Other(anyhow::anyhow!(
            "unknown provider: {} (did you enable the '{}' feature flag?)",
            provider_name,
            feature_for(&provider_name)
        ))
    })?;

    factory(config)
}

fn feature_for(provider_name: &str) -> &str {
    match provider_name {
        "windows" => "windows-provider",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing_factory(_cfg: Config) -> Result<Box<dyn Provider>> {
        Err(AccountError::ProviderUnavailable("test factory".to_string()))
    }

    #[test]
    fn test_provider_registration() {
        register_provider("test-provider", failing_factory);

        let reg = registry().read().unwrap();
        assert!(reg.contains_key("test-provider"));
    }

    #[test]
    #[cfg(feature = "mock")]
    fn test_new_mock_provider() {
        crate::init();
        let provider = new_provider(Config::new(crate::ProviderType::Mock)).unwrap();
        assert_eq!(provider.name(), "mock");
    }

    #[test]
    fn test_feature_hint() {
        assert_eq!(feature_for("windows"), "windows-provider");
        assert_eq!(feature_for("mock"), "mock");
    }
}
