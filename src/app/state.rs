use anyhow::{Context, Result as AnyResult};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::config::{get_data_dir, Config};
use crate::catalog::{Catalog, JsonCatalogSource, ProductId};
use crate::models::{CompletionService, GenerationParams, ServiceFactory};
use crate::selection::{SelectionStore, Toggled};
use crate::session::{ConversationHistory, ConversationManager, ConversationSettings};
use crate::storage::FileStore;
use crate::utils::{log_warn, Result, RoutineError};

/// Everything one user session owns: the catalog, the selection and the
/// conversation. Selection changes always go through here so the
/// conversation is reset whenever its product context changes.
pub struct Session {
    catalog: Catalog,
    selection: SelectionStore,
    conversation: ConversationManager,
}

impl Session {
    pub fn new(catalog: Catalog, selection: SelectionStore, conversation: ConversationManager) -> Self {
        Self {
            catalog,
            selection,
            conversation,
        }
    }

    /// Build a session from configuration: load the catalog, restore the
    /// saved selection and set up the completion service
    pub fn from_config(config: &Config) -> AnyResult<Self> {
        let catalog = Catalog::load(
            &JsonCatalogSource::new(&config.catalog.path),
            config.features.search,
        )
        .with_context(|| format!("Failed to load catalog from {}", config.catalog.path.display()))?;

        let selection = if config.features.persistence {
            let dir = get_data_dir(config)?;
            match FileStore::new(&dir) {
                Ok(store) => SelectionStore::hydrate(Box::new(store)),
                Err(e) => {
                    log_warn("💾", format!("Saved selection unavailable ({}), starting fresh", e));
                    SelectionStore::in_memory()
                }
            }
        } else {
            SelectionStore::in_memory()
        };

        let service = ServiceFactory::create_or_unconfigured(&config.completion);

        info!(
            "Session ready: {} products, {} selected",
            catalog.items().len(),
            selection.len()
        );
        Ok(Self::with_service(config, catalog, selection, service))
    }

    /// Same as `from_config` but with an injected completion service
    pub fn with_service(
        config: &Config,
        catalog: Catalog,
        selection: SelectionStore,
        service: Box<dyn CompletionService>,
    ) -> Self {
        Self::new(
            catalog,
            selection,
            ConversationManager::new(service, settings_from(config)),
        )
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    pub fn history(&self) -> &ConversationHistory {
        self.conversation.history()
    }

    /// Map typed input to a product id. An id in the catalog or the selection
    /// spelled exactly like the input wins, so a catalog id "007" stays text.
    pub fn resolve_id(&self, input: &str) -> ProductId {
        self.catalog
            .items()
            .iter()
            .chain(self.selection.all())
            .map(|item| &item.id)
            .find(|id| id.is_spelled(input))
            .cloned()
            .unwrap_or_else(|| ProductId::from(input))
    }

    /// Toggle a product by id
    pub fn toggle(&mut self, id: &ProductId) -> Result<Toggled> {
        let toggled = self.selection.toggle(id, &self.catalog)?;
        self.conversation.invalidate();
        Ok(toggled)
    }

    /// Add a product by id, false if it was already selected
    pub fn add(&mut self, id: &ProductId) -> Result<bool> {
        let item = self
            .catalog
            .find(id)
            .cloned()
            .ok_or_else(|| RoutineError::UnknownProduct(id.to_string()))?;
        let added = self.selection.add(item);
        if added {
            self.conversation.invalidate();
        }
        Ok(added)
    }

    /// Remove a product by id, false if it was not selected
    pub fn remove(&mut self, id: &ProductId) -> bool {
        let removed = self.selection.remove(id);
        if removed {
            self.conversation.invalidate();
        }
        removed
    }

    /// Clear the selection once `confirm` (given the number of selected
    /// products) agrees. Returns whether anything was cleared.
    pub fn clear(&mut self, confirm: impl FnOnce(usize) -> bool) -> bool {
        if !confirm(self.selection.len()) {
            return false;
        }
        self.selection.clear();
        self.conversation.invalidate();
        true
    }

    /// Chat with the assistant about the current selection
    pub async fn send_message(&mut self, text: &str) -> Result<String> {
        self.conversation
            .send_message(text, self.selection.all())
            .await
    }

    /// Generate a routine for the current selection
    pub async fn generate_routine(&mut self) -> Result<String> {
        self.conversation
            .send_routine_request(self.selection.all())
            .await
    }
}

fn settings_from(config: &Config) -> ConversationSettings {
    ConversationSettings {
        model: config.completion.model.clone(),
        params: GenerationParams {
            temperature: config.completion.temperature,
            max_tokens: config.completion.max_tokens,
        },
        system_prompt: config.conversation.system_prompt.clone(),
        max_turns: config.conversation.max_turns,
    }
}

/// Cloneable handle for front ends that keep reading input while a reply is
/// on its way.
///
/// At most one assistant request runs at a time. A send issued while another
/// is in flight is rejected with `Busy` instead of queueing behind it, and
/// selection changes wait for the in-flight exchange to finish.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<Session>>,
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Claim the session for a message. Fails with `Busy` right away when a
    /// request is already in flight; otherwise the returned future owns the
    /// session until the reply arrives.
    pub fn begin_message(
        &self,
        text: &str,
    ) -> Result<impl Future<Output = Result<String>> + Send + 'static> {
        let mut session = self.inner.clone().try_lock_owned().map_err(|_| RoutineError::Busy)?;
        let text = text.to_string();
        Ok(async move { session.send_message(&text).await })
    }

    /// Claim the session for a routine request, see `begin_message`
    pub fn begin_routine(&self) -> Result<impl Future<Output = Result<String>> + Send + 'static> {
        let mut session = self.inner.clone().try_lock_owned().map_err(|_| RoutineError::Busy)?;
        Ok(async move { session.generate_routine().await })
    }

    /// Run a mutation once no request is in flight
    pub async fn update<T>(&self, f: impl FnOnce(&mut Session) -> T) -> T {
        f(&mut *self.inner.lock().await)
    }

    /// Run a read-only closure against the session
    pub async fn inspect<T>(&self, f: impl FnOnce(&Session) -> T) -> T {
        f(&*self.inner.lock().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogItem;
    use crate::models::{CompletionRequest, MockCompletionService};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    fn item(id: u64, name: &str) -> CatalogItem {
        CatalogItem {
            id: ProductId::Number(id),
            name: name.into(),
            brand: "CeraVe".into(),
            category: "skincare".into(),
            description: format!("{} description", name),
            image: String::new(),
        }
    }

    fn catalog() -> Catalog {
        Catalog::from_items(
            vec![item(1, "Hydrating Cleanser"), item(2, "Toner"), item(3, "Serum")],
            true,
        )
    }

    fn answering_service() -> Box<MockCompletionService> {
        let mut service = MockCompletionService::new();
        service
            .expect_complete()
            .returning(|_| Ok("Sure!".to_string()));
        Box::new(service)
    }

    fn session(service: Box<dyn CompletionService>) -> Session {
        Session::with_service(
            &Config::default(),
            catalog(),
            SelectionStore::in_memory(),
            service,
        )
    }

    #[tokio::test]
    async fn test_every_selection_mutation_resets_history() {
        let mut session = session(answering_service());
        let id = ProductId::Number(1);

        session.send_message("hi").await.unwrap();
        assert_eq!(session.history().len(), 2);
        session.toggle(&id).unwrap();
        assert!(session.history().is_empty());

        session.send_message("hi").await.unwrap();
        session.remove(&id);
        assert!(session.history().is_empty());

        session.send_message("hi").await.unwrap();
        session.add(&ProductId::Number(2)).unwrap();
        assert!(session.history().is_empty());

        session.send_message("hi").await.unwrap();
        assert!(session.clear(|_| true));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_noop_mutations_keep_history() {
        let mut session = session(answering_service());
        session.add(&ProductId::Number(1)).unwrap();
        session.send_message("hi").await.unwrap();

        assert!(!session.add(&ProductId::Number(1)).unwrap());
        assert!(!session.remove(&ProductId::Number(3)));
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn test_clear_requires_confirmation() {
        let mut session = session(answering_service());
        session.toggle(&ProductId::Number(1)).unwrap();
        session.toggle(&ProductId::Number(2)).unwrap();

        let mut asked_about = 0;
        assert!(!session.clear(|count| {
            asked_about = count;
            false
        }));
        assert_eq!(asked_about, 2);
        assert_eq!(session.selection().all().len(), 2);

        assert!(session.clear(|_| true));
        assert!(session.selection().all().is_empty());
    }

    #[tokio::test]
    async fn test_generate_routine_with_empty_selection() {
        let mut service = MockCompletionService::new();
        service.expect_complete().times(0);
        let mut session = session(Box::new(service));

        let err = session.generate_routine().await.unwrap_err();
        assert!(matches!(err, RoutineError::EmptySelection));
    }

    #[tokio::test]
    async fn test_generate_routine_uses_selection() {
        let mut service = MockCompletionService::new();
        service
            .expect_complete()
            .withf(|request| {
                request
                    .last_user_content()
                    .map_or(false, |p| p.contains("Hydrating Cleanser"))
            })
            .times(1)
            .returning(|_| Ok("AM: cleanse".to_string()));
        let mut session = session(Box::new(service));

        session.toggle(&ProductId::Number(1)).unwrap();
        assert_eq!(session.generate_routine().await.unwrap(), "AM: cleanse");
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_resolve_id_prefers_exact_spelling() {
        let mut text_item = item(0, "Eye Cream");
        text_item.id = ProductId::Text("007".into());
        let catalog = Catalog::from_items(vec![item(1, "Cleanser"), text_item], true);
        let mut session = Session::with_service(
            &Config::default(),
            catalog,
            SelectionStore::in_memory(),
            answering_service(),
        );

        let id = session.resolve_id("007");
        assert_eq!(id, ProductId::Text("007".into()));
        assert_eq!(session.toggle(&id).unwrap(), Toggled::Added);
        assert!(session.remove(&session.resolve_id(" 007 ")));

        assert_eq!(session.resolve_id("1"), ProductId::Number(1));
        assert_eq!(session.resolve_id("42"), ProductId::Number(42));
        assert_eq!(session.resolve_id("sku-9"), ProductId::Text("sku-9".into()));
    }

    /// Holds each request open until released
    struct GatedService {
        release: Arc<Notify>,
    }

    #[async_trait]
    impl CompletionService for GatedService {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            self.release.notified().await;
            Ok("done".to_string())
        }
    }

    #[tokio::test]
    async fn test_shared_session_rejects_overlapping_sends() {
        let release = Arc::new(Notify::new());
        let shared = SharedSession::new(session(Box::new(GatedService {
            release: release.clone(),
        })));

        let first = tokio::spawn(shared.begin_message("first").unwrap());
        assert!(matches!(shared.begin_message("second"), Err(RoutineError::Busy)));
        assert!(matches!(shared.begin_routine(), Err(RoutineError::Busy)));

        release.notify_one();
        assert_eq!(first.await.unwrap().unwrap(), "done");
        assert_eq!(shared.inspect(|s| s.history().len()).await, 2);

        // Once the reply is in, the session is free again
        let added = shared.update(|s| s.toggle(&ProductId::Number(1))).await.unwrap();
        assert_eq!(added, Toggled::Added);
        assert!(shared.inspect(|s| s.history().is_empty()).await);
    }
}
