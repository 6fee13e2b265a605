use mockapi::{ListQuery, MockApiError, Record, Result, Store};
use serde_json::Value;
use std::collections::HashMap;

/// One of the five generated CRUD endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::List,
        Capability::Get,
        Capability::Create,
        Capability::Update,
        Capability::Delete,
    ];

    pub fn method(&self) -> &'static str {
        match self {
            Capability::List | Capability::Get => "GET",
            Capability::Create => "POST",
            Capability::Update => "PUT",
            Capability::Delete => "DELETE",
        }
    }

    pub fn path(&self, collection: &str) -> String {
        match self {
            Capability::List | Capability::Create => format!("/{collection}"),
            Capability::Get | Capability::Update | Capability::Delete => {
                format!("/{collection}/{{id}}")
            }
        }
    }
}

/// The handler set bound to a single collection.
#[derive(Debug, Clone)]
pub struct CollectionRoutes {
    collection: String,
    capabilities: Vec<Capability>,
}

impl CollectionRoutes {
    fn new(collection: &str) -> Self {
        CollectionRoutes {
            collection: collection.to_string(),
            capabilities: Capability::ALL.to_vec(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn list(&self, store: &Store, query: &ListQuery) -> Result<Vec<Record>> {
        store.query(&self.collection, query)
    }

    pub fn get(&self, store: &Store, id: &str) -> Result<Record> {
        store.get(&self.collection, id)
    }

    pub fn create(&self, store: &Store, body: Value) -> Result<Record> {
        store.create(&self.collection, body)
    }

    pub fn update(&self, store: &Store, id: &str, body: Value) -> Result<Record> {
        store.update(&self.collection, id, body)
    }

    pub fn delete(&self, store: &Store, id: &str) -> Result<()> {
        store.delete(&self.collection, id)
    }
}

/// Collection name -> bound handler set, derived from a loaded document.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<CollectionRoutes>,
    index: HashMap<String, usize>,
}

impl RouteTable {
    /// Register the CRUD handler set for every collection name.
    pub fn generate<I, S>(collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = RouteTable::default();
        for name in collections {
            let name = name.as_ref();
            if table.index.contains_key(name) {
                continue;
            }
            table.index.insert(name.to_string(), table.routes.len());
            table.routes.push(CollectionRoutes::new(name));
        }
        table
    }

    pub fn from_store(store: &Store) -> Self {
        RouteTable::generate(store.collection_names())
    }

    pub fn resolve(&self, collection: &str) -> Result<&CollectionRoutes> {
        self.index
            .get(collection)
            .map(|&i| &self.routes[i])
            .ok_or_else(|| MockApiError::collection_not_found(collection))
    }

    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.collection())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Every registered endpoint as `(method, path)`.
    pub fn endpoints(&self) -> Vec<(&'static str, String)> {
        self.routes
            .iter()
            .flat_map(|routes| {
                routes
                    .capabilities()
                    .iter()
                    .map(|cap| (cap.method(), cap.path(routes.collection())))
            })
            .collect()
    }
}
