use crate::{
    config::Config,
    error::{ErrorKind, Result},
    models::{GenerationFailure, GenerationRequest, GenerationResult, ProviderKind},
    providers::{ImageProvider, OpenAiProvider, StabilityProvider},
};
use std::sync::Arc;

/// Routes every request to the single provider chosen at startup.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn ImageProvider>,
}

impl Dispatcher {
    pub fn new(config: &Config) -> Result<Self> {
        let backend: Arc<dyn ImageProvider> = match config.provider {
            ProviderKind::Stability => Arc::new(StabilityProvider::new(
                config.stability.clone(),
                config.timeout,
            )?),
            ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(
                config.openai.clone(),
                config.timeout,
            )?),
        };

        if !backend.has_credentials() {
            log::warn!(
                "No API key configured for {}; every request will fail with {}",
                backend.name(),
                ErrorKind::MissingCredential
            );
        }

        Ok(Self { backend })
    }

    pub fn with_backend(backend: Arc<dyn ImageProvider>) -> Self {
        Self { backend }
    }

    pub fn provider(&self) -> &Arc<dyn ImageProvider> {
        &self.backend
    }

    pub fn provider_kind(&self) -> ProviderKind {
        self.backend.kind()
    }

    /// Fails fast when the configured provider has no API key.
    pub fn check_credentials(&self) -> std::result::Result<(), GenerationFailure> {
        if self.backend.has_credentials() {
            Ok(())
        } else {
            Err(GenerationFailure::new(
                ErrorKind::MissingCredential,
                format!("No API key configured for provider '{}'", self.backend.kind()),
            ))
        }
    }

    /// Invokes the configured adapter once and hands its result back unchanged.
    pub async fn dispatch(&self, request: &GenerationRequest) -> GenerationResult {
        if let Err(failure) = self.check_credentials() {
            return GenerationResult::Failure(failure);
        }

        log::info!("Dispatching redesign to {}", self.backend.name());
        let result = self.backend.adapt(request).await;

        match &result {
            GenerationResult::Success(image) => log::info!(
                "{} produced {} bytes of {} via {}",
                self.backend.name(),
                image.bytes.len(),
                image.mime_type,
                image.mode.as_str()
            ),
            GenerationResult::Failure(failure) => {
                log::warn!("{} failed with {}", self.backend.name(), failure.kind)
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenAiConfig;
    use crate::models::{GenerationMode, StyleParameters, UploadedImage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
        result: GenerationResult,
        credentials: bool,
    }

    #[async_trait]
    impl ImageProvider for CountingProvider {
        async fn adapt(&self, _request: &GenerationRequest) -> GenerationResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }

        fn kind(&self) -> ProviderKind {
            ProviderKind::Stability
        }

        fn has_credentials(&self) -> bool {
            self.credentials
        }
    }

    fn request() -> GenerationRequest {
        let image = UploadedImage::new(vec![1], None, None).unwrap();
        GenerationRequest::new(image, StyleParameters::new())
    }

    #[tokio::test]
    async fn test_dispatch_propagates_result_unchanged() {
        let expected = GenerationResult::failure(ErrorKind::ProviderRejected, "nope");
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            result: expected.clone(),
            credentials: true,
        });
        let dispatcher = Dispatcher::with_backend(provider.clone());

        assert_eq!(dispatcher.dispatch(&request()).await, expected);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_without_credentials_skips_adapter() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            result: GenerationResult::success(vec![1], "image/png", GenerationMode::Edit),
            credentials: false,
        });
        let dispatcher = Dispatcher::with_backend(provider.clone());

        let result = dispatcher.dispatch(&request()).await;
        assert_eq!(result.failure_kind(), Some(ErrorKind::MissingCredential));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert!(dispatcher.check_credentials().is_err());
    }

    #[test]
    fn test_new_selects_configured_provider() {
        let config = Config::new().with_openai(OpenAiConfig::new().with_api_key("sk"));
        let dispatcher = Dispatcher::new(&config).unwrap();
        assert_eq!(dispatcher.provider_kind(), ProviderKind::OpenAi);
        assert!(dispatcher.check_credentials().is_ok());

        let dispatcher = Dispatcher::new(&Config::new()).unwrap();
        assert_eq!(dispatcher.provider_kind(), ProviderKind::Stability);
    }
}
