//! In-memory object store.
//!
//! Mirrors the observable S3 contract: per-object overwrite, conditional
//! create, tolerant delete, sorted prefix listing, monotonically changing
//! etags. A put-interceptor lets a test act as a rival writer in the window
//! between another party's write and its confirmation re-read.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sfb_store::{ObjectStore, RawObject, StoreError, StoreResult};

type PutInterceptor = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Clone, Default)]
pub struct MemoryStore {
    objects: Arc<Mutex<BTreeMap<String, (Vec<u8>, u64)>>>,
    version: Arc<AtomicU64>,
    interceptor: Arc<Mutex<Option<PutInterceptor>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a hook invoked with the key after every successful `put`.
    /// The hook runs outside the store lock, so it may write back through a
    /// cloned handle; that is how race tests inject a rival writer.
    pub fn set_put_interceptor(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *self.interceptor.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn clear_put_interceptor(&self) {
        *self.interceptor.lock().unwrap() = None;
    }

    /// Raw write bypassing the interceptor, for fixtures and rival writes.
    pub fn put_raw(&self, key: &str, bytes: Vec<u8>) {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (bytes, version));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().unwrap().is_empty()
    }

    fn fire_interceptor(&self, key: &str) {
        // Take the hook out while it runs so a hook writing through a clone
        // of this store does not recurse into itself.
        let hook = self.interceptor.lock().unwrap().take();
        if let Some(hook) = hook {
            hook(key);
            let mut slot = self.interceptor.lock().unwrap();
            if slot.is_none() {
                *slot = Some(hook);
            }
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<RawObject>> {
        let objects = self.objects.lock().unwrap();
        Ok(objects.get(key).map(|(bytes, version)| RawObject {
            bytes: bytes.clone(),
            etag: Some(format!("v{version}")),
        }))
    }

    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> StoreResult<()> {
        self.put_raw(key, body);
        self.fire_interceptor(key);
        Ok(())
    }

    async fn put_if_absent(
        &self,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> StoreResult<()> {
        {
            let mut objects = self.objects.lock().unwrap();
            if objects.contains_key(key) {
                return Err(StoreError::PreconditionFailed {
                    key: key.to_string(),
                });
            }
            let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
            objects.insert(key.to_string(), (body, version));
        }
        self.fire_interceptor(key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}
