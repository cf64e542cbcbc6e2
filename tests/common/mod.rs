//! Shared fixtures: the blog schema, its data, and a scripted store wrapper.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use deep_populate::storage::MemBatch;
use deep_populate::{
    DeepPopulator, Document, FetchError, FetchOptions, FieldMeta, MemStore, PopulateOptions, PopulateStore,
    SchemaRegistry, TypeSchema, Value,
};

/// User, Comment and Post schemas. Post carries a single reference, two
/// reference arrays, an array of embedded likes and a flattened subdocument.
pub fn blog_registry() -> SchemaRegistry {
    let like = TypeSchema::new().field("user", FieldMeta::reference("User"));
    SchemaRegistry::new()
        .with("User", TypeSchema::new()
            .field("loaded", FieldMeta::scalar())
            .field("manager", FieldMeta::reference("User"))
            .field("mainPage", FieldMeta::reference("Post")))
        .with("Comment", TypeSchema::new()
            .field("loaded", FieldMeta::scalar())
            .field("user", FieldMeta::reference("User")))
        .with("Post", TypeSchema::new()
            .field("loaded", FieldMeta::scalar())
            .field("user", FieldMeta::reference("User"))
            .field("reviewers", FieldMeta::reference("User").many())
            .field("comments", FieldMeta::reference("Comment").many())
            .field("likes", FieldMeta::nested(like).many())
            .field("approved.status", FieldMeta::scalar())
            .field("approved.user", FieldMeta::reference("User")))
}

fn like(user: i64) -> Value {
    Value::object([("user", Value::reference(user))])
}

/// Two users, three comments and two posts, all with `loaded = true`.
pub fn blog_data() -> Vec<Document> {
    vec![
        Document::new("User", 1).with("loaded", true).with("manager", Value::reference(2)).with("mainPage", Value::reference(1)),
        Document::new("User", 2).with("loaded", true).with("mainPage", Value::reference(2)),
        Document::new("Comment", 1).with("loaded", true).with("user", Value::reference(1)),
        Document::new("Comment", 2).with("loaded", true).with("user", Value::reference(1)),
        Document::new("Comment", 3).with("loaded", true).with("user", Value::reference(1)),
        Document::new("Post", 1)
            .with("loaded", true)
            .with("user", Value::reference(1))
            .with("reviewers", Value::references([1, 2]))
            .with("comments", Value::references([1, 2]))
            .with("likes", Value::Array(vec![like(1)]))
            .with("approved", Value::object([("user", Value::reference(1))])),
        Document::new("Post", 2)
            .with("loaded", true)
            .with("user", Value::reference(1))
            .with("reviewers", Value::references([1, 2]))
            .with("comments", Value::references([3]))
            .with("likes", Value::Array(vec![like(1)]))
            .with("approved", Value::object([("user", Value::reference(1))])),
    ]
}

/// Blog store with deep population enabled on Post using `defaults`
pub fn blog_store(defaults: PopulateOptions) -> MemStore {
    let registry = blog_registry();
    registry.enable_deep_populate("Post", defaults).expect("Post is registered");
    let store = MemStore::new(registry);
    store.insert_all(blog_data());
    store
}

/// Populator over a fresh blog store
pub fn blog_populator(defaults: PopulateOptions) -> (Arc<MemStore>, DeepPopulator<MemStore>) {
    let store = Arc::new(blog_store(defaults));
    let populator = DeepPopulator::new(Arc::clone(&store), "Post").expect("Post is enabled");
    (store, populator)
}

/// `loaded` flag of a populated value; `None` when the value is absent,
/// still a reference, or had the field projected away.
pub fn loaded(value: Option<&Value>) -> Option<bool> {
    value.and_then(|v| v.field("loaded")).and_then(Value::as_bool)
}

/// Items of an array field
pub fn items<'a>(document: &'a Document, field: &str) -> &'a [Value] {
    document.get(field).and_then(Value::as_array).unwrap_or(&[])
}

/// Every path populated by the "multiple paths" cases is loaded.
pub fn check_post(post: &Document) {
    assert_eq!(loaded(post.lookup("user")), Some(true));
    assert_eq!(loaded(post.lookup("user.manager")), Some(true));
    assert_eq!(loaded(post.lookup("approved.user")), Some(true));
    assert_eq!(loaded(post.lookup("approved.user.manager")), Some(true));
    for comment in items(post, "comments") {
        assert_eq!(loaded(Some(comment)), Some(true));
        assert_eq!(loaded(comment.lookup("user")), Some(true));
        assert_eq!(loaded(comment.lookup("user.manager")), Some(true));
    }
    for like in items(post, "likes") {
        assert_eq!(loaded(like.lookup("user")), Some(true));
        assert_eq!(loaded(like.lookup("user.manager")), Some(true));
    }
}

/// Store wrapper that records calls, injects failures and delays, and
/// tracks how many fetches were in flight at once.
pub struct ScriptedStore {
    inner: MemStore,
    failures: HashSet<String>,
    delays: HashMap<String, Duration>,
    default_delay: Option<Duration>,
    events: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedStore {
    pub fn new(inner: MemStore) -> Self {
        Self {
            inner,
            failures: HashSet::new(),
            delays: HashMap::new(),
            default_delay: None,
            events: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn fail_on(mut self, path: &str) -> Self {
        self.failures.insert(path.to_string());
        self
    }

    pub fn delay(mut self, path: &str, delay: Duration) -> Self {
        self.delays.insert(path.to_string(), delay);
        self
    }

    pub fn delay_all(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    /// `"fetch <path>"` / `"attach <path>"` in call order
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Paths fetched, in call order
    pub fn fetched(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_prefix("fetch ").map(str::to_string))
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemStore {
        &self.inner
    }
}

#[async_trait]
impl PopulateStore for ScriptedStore {
    type Document = Document;
    type Batch = MemBatch;

    fn schemas(&self) -> &SchemaRegistry {
        self.inner.schemas()
    }

    async fn fetch(&self, documents: &[Document], options: &FetchOptions) -> Result<MemBatch, FetchError> {
        self.events.lock().push(format!("fetch {}", options.path));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(&options.path).copied().or(self.default_delay) {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failures.contains(&options.path) {
            return Err(FetchError::backend(options.path.clone(), "injected failure"));
        }
        self.inner.fetch(documents, options).await
    }

    fn attach(&self, documents: &mut [Document], batch: MemBatch) -> Result<(), FetchError> {
        self.events.lock().push(format!("attach {}", batch.path));
        self.inner.attach(documents, batch)
    }
}

/// Populator over a scripted blog store
pub fn scripted_populator(
    defaults: PopulateOptions,
    script: impl FnOnce(ScriptedStore) -> ScriptedStore,
) -> (Arc<ScriptedStore>, DeepPopulator<ScriptedStore>) {
    let store = Arc::new(script(ScriptedStore::new(blog_store(defaults))));
    let populator = DeepPopulator::new(Arc::clone(&store), "Post").expect("Post is enabled");
    (store, populator)
}
