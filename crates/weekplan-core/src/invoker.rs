//! Single-shot backend invocation.
//!
//! [`GenerationInvoker`] resolves the credential, issues exactly one call to
//! the configured [`GenerativeBackend`], and maps every failure onto the
//! [`PlanError`] taxonomy. It never retries and never touches session state.

use std::sync::Arc;
use std::time::Instant;

use crate::backend::{BackendError, GenerationRequest, GenerativeBackend};
use crate::credential::{CredentialResolver, RUNTIME_KEY_VARS};
use crate::error::PlanError;

/// Issues generation requests against one backend.
#[derive(Clone)]
pub struct GenerationInvoker {
    backend: Arc<dyn GenerativeBackend>,
    credentials: CredentialResolver,
}

impl GenerationInvoker {
    pub fn new(backend: Arc<dyn GenerativeBackend>, credentials: CredentialResolver) -> Self {
        Self {
            backend,
            credentials,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Whether a credential is currently resolvable.
    pub fn has_credential(&self) -> bool {
        self.credentials.resolve().is_some()
    }

    /// Invoke the backend once and return the raw payload text.
    ///
    /// A missing credential fails with [`PlanError::Configuration`] before
    /// the backend is contacted. An absent or blank payload is
    /// [`PlanError::EmptyResponse`].
    pub async fn invoke(&self, request: &GenerationRequest) -> Result<String, PlanError> {
        let Some(api_key) = self.credentials.resolve() else {
            let names = match self.credentials.env_names() {
                [] => RUNTIME_KEY_VARS.join(", "),
                names => names.join(", "),
            };
            return Err(PlanError::Configuration(format!(
                "no API key found; set one of {names}"
            )));
        };

        let started = Instant::now();
        tracing::info!(
            backend = self.backend.name(),
            mode = %request.mode,
            document = request.document.display_name(),
            "invoking generative backend"
        );

        let outcome = self.backend.generate(&api_key, request).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Some(text)) if !text.trim().is_empty() => {
                tracing::info!(
                    mode = %request.mode,
                    elapsed_ms,
                    response_chars = text.chars().count(),
                    "backend call completed"
                );
                Ok(text)
            }
            Ok(_) => {
                tracing::warn!(mode = %request.mode, elapsed_ms, "backend returned no content");
                Err(PlanError::EmptyResponse)
            }
            Err(e) => {
                tracing::warn!(mode = %request.mode, elapsed_ms, error = %e, "backend call failed");
                Err(map_backend_error(e))
            }
        }
    }
}

fn map_backend_error(err: BackendError) -> PlanError {
    PlanError::Backend(err.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::document::SourceDocument;
    use crate::prompt::RuleSet;

    struct OneShot {
        reply: Mutex<Option<Result<Option<String>, BackendError>>>,
        calls: AtomicUsize,
        seen_key: Mutex<Option<String>>,
    }

    impl OneShot {
        fn new(reply: Result<Option<String>, BackendError>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                calls: AtomicUsize::new(0),
                seen_key: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl GenerativeBackend for OneShot {
        fn name(&self) -> &str {
            "one-shot"
        }

        async fn generate(
            &self,
            api_key: &str,
            _request: &GenerationRequest,
        ) -> Result<Option<String>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_key.lock().unwrap() = Some(api_key.to_string());
            self.reply.lock().unwrap().take().unwrap_or(Ok(None))
        }
    }

    fn request() -> GenerationRequest {
        let doc = SourceDocument::from_bytes(b"png", "image/png", "w.png").unwrap();
        GenerationRequest::initial(doc, &RuleSet::default())
    }

    #[tokio::test]
    async fn returns_payload_and_passes_key() {
        let backend = OneShot::new(Ok(Some("{}".to_string())));
        let invoker = GenerationInvoker::new(backend.clone(), CredentialResolver::fixed("k-1"));
        assert_eq!(invoker.invoke(&request()).await.unwrap(), "{}");
        assert_eq!(backend.seen_key.lock().unwrap().as_deref(), Some("k-1"));
    }

    #[tokio::test]
    async fn missing_credential_never_calls_backend() {
        let backend = OneShot::new(Ok(Some("{}".to_string())));
        let invoker = GenerationInvoker::new(backend.clone(), CredentialResolver::none());
        let err = invoker.invoke(&request()).await.unwrap_err();
        assert!(matches!(err, PlanError::Configuration(_)));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_credential_names_the_variables() {
        let invoker = GenerationInvoker::new(
            OneShot::new(Ok(Some("{}".to_string()))),
            CredentialResolver::none(),
        );
        let err = invoker.invoke(&request()).await.unwrap_err();
        assert_eq!(
            err,
            PlanError::Configuration(
                "no API key found; set one of WEEKPLAN_API_KEY, GEMINI_API_KEY, GOOGLE_API_KEY, API_KEY"
                    .to_string()
            )
        );
    }

    #[tokio::test]
    async fn blank_payload_is_empty_response() {
        for reply in [Ok(None), Ok(Some("   \n".to_string()))] {
            let invoker = GenerationInvoker::new(OneShot::new(reply), CredentialResolver::fixed("k"));
            assert_eq!(invoker.invoke(&request()).await.unwrap_err(), PlanError::EmptyResponse);
        }
    }

    #[tokio::test]
    async fn backend_failure_is_not_retried() {
        let backend = OneShot::new(Err(BackendError::Status {
            status: 503,
            message: "overloaded".to_string(),
        }));
        let invoker = GenerationInvoker::new(backend.clone(), CredentialResolver::fixed("k"));
        let err = invoker.invoke(&request()).await.unwrap_err();
        assert_eq!(err, PlanError::Backend("HTTP 503: overloaded".to_string()));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }
}
