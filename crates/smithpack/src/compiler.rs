//! Single-flight compiler cache.
//!
//! Building a compiler is expensive and it keeps module caches between runs,
//! so each plugin instance owns at most one. The first invocation creates it
//! and binds its output to the shared [`MemoryFs`]; every later invocation
//! reconfigures that same instance with normalized options. The output
//! binding is never redone.
//!
//! Callers receive the compiler behind an owned async lock. Holding the guard
//! from reconfiguration until the output has been read back keeps two
//! overlapping invocations from running against each other's options.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::Result;
use crate::bundler::{BundlerConfig, Compiler, CompilerFactory, OptionsNormalizer};
use crate::vfs::MemoryFs;

/// Shared handle to the cached compiler.
pub type CompilerHandle = Arc<Mutex<Box<dyn Compiler>>>;

/// Exclusive access to the cached compiler for one invocation.
pub type CompilerGuard = OwnedMutexGuard<Box<dyn Compiler>>;

pub struct CompilerCache {
    factory: Arc<dyn CompilerFactory>,
    normalizer: Box<dyn OptionsNormalizer>,
    output_fs: Arc<MemoryFs>,
    slot: Mutex<Option<CompilerHandle>>,
}

impl CompilerCache {
    pub fn new(factory: Arc<dyn CompilerFactory>, output_fs: Arc<MemoryFs>) -> Self {
        let normalizer = factory.options_normalizer();
        Self {
            factory,
            normalizer,
            output_fs,
            slot: Mutex::new(None),
        }
    }

    /// Get the compiler configured for `config`, creating it on first use.
    ///
    /// Creation failures are reported as [`Error::CompilerRun`](crate::Error::CompilerRun)
    /// and leave the cache empty, so the next call tries again.
    pub async fn get_compiler(&self, config: BundlerConfig) -> Result<CompilerGuard> {
        let mut slot = self.slot.lock().await;

        if let Some(handle) = slot.as_ref().map(Arc::clone) {
            // Waiting on a busy compiler must not keep the slot locked.
            drop(slot);
            let mut compiler = handle.lock_owned().await;
            compiler.set_options(self.normalizer.process(config));
            debug!(entries = compiler.options().entry.len(), "reconfigured cached compiler");
            return Ok(compiler);
        }

        let mut compiler = self.factory.create(config)?;
        compiler.set_output_file_system(Arc::clone(&self.output_fs));
        debug!(entries = compiler.options().entry.len(), "created compiler");

        let handle: CompilerHandle = Arc::new(Mutex::new(compiler));
        let guard = Arc::clone(&handle).lock_owned().await;
        *slot = Some(handle);
        Ok(guard)
    }

    /// The cached compiler, if one has been created.
    pub async fn handle(&self) -> Option<CompilerHandle> {
        self.slot.lock().await.clone()
    }

    pub async fn is_initialized(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}

impl std::fmt::Debug for CompilerCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilerCache")
            .field("factory", &self.factory)
            .field("normalizer", &self.normalizer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{BundlerError, OptionsDefaulter, Stats};
    use crate::entry::EntryMap;
    use async_trait::async_trait;
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct RecordingCompiler {
        options: BundlerConfig,
        fs_bindings: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Compiler for RecordingCompiler {
        fn options(&self) -> &BundlerConfig {
            &self.options
        }

        fn set_options(&mut self, options: BundlerConfig) {
            self.options = options;
        }

        fn set_output_file_system(&mut self, _fs: Arc<MemoryFs>) {
            self.fs_bindings.fetch_add(1, Ordering::SeqCst);
        }

        async fn run(&mut self) -> std::result::Result<Stats, BundlerError> {
            Ok(Stats::new())
        }
    }

    #[derive(Debug, Default)]
    struct RecordingFactory {
        created: AtomicUsize,
        fs_bindings: Arc<AtomicUsize>,
        reject: bool,
    }

    impl CompilerFactory for RecordingFactory {
        fn create(&self, config: BundlerConfig) -> std::result::Result<Box<dyn Compiler>, BundlerError> {
            if self.reject {
                return Err(BundlerError::InvalidConfig("unknown option 'modee'".into()));
            }
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(RecordingCompiler {
                options: config,
                fs_bindings: Arc::clone(&self.fs_bindings),
            }))
        }

        fn options_normalizer(&self) -> Box<dyn OptionsNormalizer> {
            Box::new(OptionsDefaulter::new().with_default("mode", "production"))
        }
    }

    fn config_with_entry(name: &str) -> BundlerConfig {
        let mut entry = EntryMap::new();
        entry.insert(name.to_string(), PathBuf::from(format!("/src/{name}.js")));
        BundlerConfig::new(Default::default(), entry)
    }

    #[tokio::test]
    async fn creates_once_then_reconfigures() {
        let factory = Arc::new(RecordingFactory::default());
        let cache = CompilerCache::new(factory.clone(), Arc::new(MemoryFs::new()));
        assert!(!cache.is_initialized().await);

        let first = cache.get_compiler(config_with_entry("a")).await.unwrap();
        assert!(first.options().entry.contains_key("a"));
        // The first config reaches the factory as given.
        assert!(first.options().setting("mode").is_none());
        drop(first);
        let handle = cache.handle().await.unwrap();

        let second = cache.get_compiler(config_with_entry("b")).await.unwrap();
        assert!(second.options().entry.contains_key("b"));
        assert!(!second.options().entry.contains_key("a"));
        assert_eq!(second.options().setting("mode"), Some(&json!("production")));
        drop(second);

        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        assert_eq!(factory.fs_bindings.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&handle, &cache.handle().await.unwrap()));
    }

    #[tokio::test]
    async fn creation_failure_leaves_cache_empty() {
        let factory = Arc::new(RecordingFactory {
            reject: true,
            ..Default::default()
        });
        let cache = CompilerCache::new(factory, Arc::new(MemoryFs::new()));

        let err = cache.get_compiler(config_with_entry("a")).await.unwrap_err();
        assert!(matches!(err, crate::Error::CompilerRun(BundlerError::InvalidConfig(_))));
        assert!(!cache.is_initialized().await);
    }

    #[tokio::test]
    async fn overlapping_callers_wait_for_the_guard() {
        let factory = Arc::new(RecordingFactory::default());
        let cache = Arc::new(CompilerCache::new(factory, Arc::new(MemoryFs::new())));

        let held = cache.get_compiler(config_with_entry("a")).await.unwrap();

        let waiting = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                let compiler = cache.get_compiler(config_with_entry("b")).await.unwrap();
                compiler.options().entry.keys().cloned().collect::<Vec<_>>()
            })
        };

        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        // Still configured for the holder until it lets go.
        assert!(held.options().entry.contains_key("a"));
        // The waiter must not keep the cache itself locked.
        assert!(cache.is_initialized().await);
        assert!(cache.handle().await.is_some());
        drop(held);

        assert_eq!(waiting.await.unwrap(), vec!["b".to_string()]);
    }
}
