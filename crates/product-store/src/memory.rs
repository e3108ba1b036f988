use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use common::{BatchRef, Sku, Version};
use domain::{Event, Product};

use crate::error::{Result, StoreError};
use crate::unit_of_work::{UnitOfWork, UnitOfWorkFactory};

/// In-memory product store.
///
/// Rows are shared behind an `RwLock`; every unit of work snapshots the
/// version of each row it loads and re-checks it under the write lock at
/// commit, simulating the write-write conflict detection a relational store
/// provides under repeatable-read isolation.
#[derive(Clone, Default)]
pub struct InMemoryProductStore {
    rows: Arc<RwLock<HashMap<Sku, Product>>>,
}

impl InMemoryProductStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored products.
    pub async fn product_count(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Returns the stored product for a sku, outside any transaction.
    pub async fn snapshot(&self, sku: &Sku) -> Option<Product> {
        self.rows.read().await.get(sku).cloned()
    }

    /// Clears all rows.
    pub async fn clear(&self) {
        self.rows.write().await.clear();
    }
}

#[async_trait]
impl UnitOfWorkFactory for InMemoryProductStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(InMemoryUnitOfWork {
            rows: Arc::clone(&self.rows),
            base_versions: HashMap::new(),
            staged: HashMap::new(),
            events: Vec::new(),
            state: TransactionState::Active,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

/// One transactional scope over the shared row map.
pub struct InMemoryUnitOfWork {
    rows: Arc<RwLock<HashMap<Sku, Product>>>,
    /// Version observed at first load per sku; `None` means the row was
    /// absent, i.e. the commit expects to create it.
    base_versions: HashMap<Sku, Option<Version>>,
    staged: HashMap<Sku, Product>,
    events: Vec<Event>,
    state: TransactionState,
}

impl InMemoryUnitOfWork {
    fn record_base(&mut self, sku: &Sku, version: Option<Version>) {
        self.base_versions.entry(sku.clone()).or_insert(version);
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn find(&mut self, sku: &Sku) -> Result<Option<Product>> {
        let product = self.rows.read().await.get(sku).cloned();
        self.record_base(sku, product.as_ref().map(Product::version));
        Ok(product)
    }

    async fn get(&mut self, sku: &Sku) -> Result<Product> {
        self.find(sku)
            .await?
            .ok_or_else(|| StoreError::ProductNotFound { sku: sku.clone() })
    }

    async fn get_by_batch_reference(&mut self, reference: &BatchRef) -> Result<Product> {
        let product = self
            .rows
            .read()
            .await
            .values()
            .find(|product| product.batch(reference).is_some())
            .cloned();

        match product {
            Some(product) => {
                self.record_base(product.sku(), Some(product.version()));
                Ok(product)
            }
            None => Err(StoreError::BatchNotFound {
                reference: reference.clone(),
            }),
        }
    }

    async fn save(&mut self, mut product: Product) -> Result<()> {
        self.events.extend(product.take_events());
        self.record_base(product.sku(), None);
        self.staged.insert(product.sku().clone(), product);
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        if self.state != TransactionState::Active {
            return Ok(());
        }

        let mut rows = self.rows.write().await;

        // Validate every staged row before touching any of them.
        for sku in self.staged.keys() {
            let base = self.base_versions.get(sku).copied().flatten();
            let current = rows.get(sku).map(Product::version);

            match (base, current) {
                (Some(expected), Some(actual)) if expected != actual => {
                    metrics::counter!("store_conflicts_total").increment(1);
                    return Err(StoreError::Conflict {
                        sku: sku.clone(),
                        expected,
                        actual,
                    });
                }
                (Some(expected), None) => {
                    // The row vanished; treat as a conflict against a
                    // concurrent writer.
                    metrics::counter!("store_conflicts_total").increment(1);
                    return Err(StoreError::Conflict {
                        sku: sku.clone(),
                        expected,
                        actual: Version::default(),
                    });
                }
                (None, Some(_)) => {
                    metrics::counter!("store_conflicts_total").increment(1);
                    return Err(StoreError::CreatedConcurrently { sku: sku.clone() });
                }
                _ => {}
            }
        }

        for (sku, product) in self.staged.drain() {
            rows.insert(sku, product);
        }

        self.state = TransactionState::Committed;
        tracing::debug!("unit of work committed");

        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if self.state != TransactionState::Active {
            return Ok(());
        }

        self.staged.clear();
        self.events.clear();
        self.state = TransactionState::RolledBack;
        tracing::debug!("unit of work rolled back");

        Ok(())
    }

    fn collect_new_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
