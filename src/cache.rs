//! Scalar Cache
//!
//! Memoizes scalar instances by name. The type-schema layer treats two
//! same-named scalars as incompatible unless they are the *same instance*,
//! so every descriptor tree must obtain its scalars through one cache.
//!
//! The cache only grows. `clear` exists for test harnesses.

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::scalar::{builtin, ScalarDescriptor};

static GLOBAL: Lazy<ScalarCache> = Lazy::new(ScalarCache::new);

type Slot = Arc<OnceCell<Arc<ScalarDescriptor>>>;

/// Name -> scalar instance registry
#[derive(Debug, Default)]
pub struct ScalarCache {
    entries: Mutex<HashMap<String, Slot>>,
}

impl ScalarCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache
    pub fn global() -> &'static ScalarCache {
        &GLOBAL
    }

    /// Return the instance stored under `name`, building it with `factory` on first use.
    ///
    /// The map lock only covers finding the per-name slot. `factory` runs
    /// outside it, so a factory may take other scalars from this cache.
    /// Concurrent first calls for one name wait on that name's slot and
    /// exactly one factory runs. A factory must not ask for its own name.
    pub fn get<F>(&self, name: &str, factory: F) -> Arc<ScalarDescriptor>
    where
        F: FnOnce() -> ScalarDescriptor,
    {
        let slot = Arc::clone(self.entries.lock().entry(name.to_string()).or_default());
        if let Some(existing) = slot.get() {
            tracing::trace!(scalar = name, "scalar cache hit");
            return Arc::clone(existing);
        }

        let scalar = slot.get_or_init(|| {
            let scalar = Arc::new(factory());
            if scalar.name() != name {
                tracing::warn!(
                    key = name,
                    scalar = scalar.name(),
                    "scalar cached under a name different from its own"
                );
            }
            tracing::debug!(scalar = name, "scalar cache insert");
            scalar
        });
        Arc::clone(scalar)
    }

    /// Look up without inserting
    pub fn lookup(&self, name: &str) -> Option<Arc<ScalarDescriptor>> {
        let slot = self.entries.lock().get(name).cloned()?;
        slot.get().cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Number of built scalars
    pub fn len(&self) -> usize {
        self.entries.lock().values().filter(|slot| slot.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Test harnesses only.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    // -------------------------------------------------------------------------
    // Built-ins
    // -------------------------------------------------------------------------

    pub fn string(&self) -> Arc<ScalarDescriptor> {
        self.get(builtin::STRING, builtin::string)
    }

    pub fn int(&self) -> Arc<ScalarDescriptor> {
        self.get(builtin::INT, builtin::int)
    }

    pub fn float(&self) -> Arc<ScalarDescriptor> {
        self.get(builtin::FLOAT, builtin::float)
    }

    pub fn boolean(&self) -> Arc<ScalarDescriptor> {
        self.get(builtin::BOOLEAN, builtin::boolean)
    }

    pub fn id(&self) -> Arc<ScalarDescriptor> {
        self.get(builtin::ID, builtin::id)
    }

    pub fn non_empty_string(&self) -> Arc<ScalarDescriptor> {
        self.get(builtin::NON_EMPTY_STRING, builtin::non_empty_string)
    }

    pub fn email(&self) -> Arc<ScalarDescriptor> {
        self.get(builtin::EMAIL, builtin::email)
    }

    pub fn url(&self) -> Arc<ScalarDescriptor> {
        self.get(builtin::URL, builtin::url)
    }

    pub fn phone(&self) -> Arc<ScalarDescriptor> {
        self.get(builtin::PHONE, builtin::phone)
    }

    pub fn date(&self) -> Arc<ScalarDescriptor> {
        self.get(builtin::DATE, builtin::date)
    }

    pub fn date_time(&self) -> Arc<ScalarDescriptor> {
        self.get(builtin::DATE_TIME, builtin::date_time)
    }

    pub fn time(&self) -> Arc<ScalarDescriptor> {
        self.get(builtin::TIME, builtin::time)
    }

    pub fn locale(&self) -> Arc<ScalarDescriptor> {
        self.get(builtin::LOCALE, builtin::locale)
    }

    pub fn time_zone(&self) -> Arc<ScalarDescriptor> {
        self.get(builtin::TIME_ZONE, builtin::time_zone)
    }

    pub fn latitude(&self) -> Arc<ScalarDescriptor> {
        self.get(builtin::LATITUDE, builtin::latitude)
    }

    pub fn longitude(&self) -> Arc<ScalarDescriptor> {
        self.get(builtin::LONGITUDE, builtin::longitude)
    }

    pub fn currency(&self) -> Arc<ScalarDescriptor> {
        self.get(builtin::CURRENCY, builtin::currency)
    }

    pub fn country_code(&self) -> Arc<ScalarDescriptor> {
        self.get(builtin::COUNTRY_CODE, builtin::country_code)
    }

    pub fn json(&self) -> Arc<ScalarDescriptor> {
        self.get(builtin::JSON, builtin::json)
    }

    pub fn json_object(&self) -> Arc<ScalarDescriptor> {
        self.get(builtin::JSON_OBJECT, builtin::json_object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::ScalarKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_second_factory_never_runs() {
        let cache = ScalarCache::new();
        let first = cache.get("Slug", || ScalarDescriptor::builder("Slug", ScalarKind::String).build());
        let second = cache.get("Slug", || panic!("second factory must not execute"));
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_builtin_accessors_share_instances() {
        let cache = ScalarCache::new();
        assert!(Arc::ptr_eq(&cache.email(), &cache.email()));
        assert!(Arc::ptr_eq(&cache.email(), &cache.get(builtin::EMAIL, builtin::email)));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.lookup(builtin::EMAIL).is_none());
    }

    #[test]
    fn test_factory_may_use_other_cached_scalars() {
        let cache = ScalarCache::new();
        let slug = cache.get("Slug", || {
            let base = cache.non_empty_string();
            base.constraints()
                .iter()
                .cloned()
                .fold(ScalarDescriptor::builder("Slug", base.kind()), |b, c| b.constraint(c))
                .build()
        });

        assert_eq!(slug.constraints().len(), 1);
        assert!(cache.contains(builtin::NON_EMPTY_STRING));
        assert!(Arc::ptr_eq(&slug, &cache.get("Slug", || panic!("second factory must not execute"))));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_concurrent_first_use_runs_one_factory() {
        let cache = Arc::new(ScalarCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    cache.get("Shared", || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        ScalarDescriptor::builder("Shared", ScalarKind::String).build()
                    })
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
