use std::path::PathBuf;

use anyhow::Result;
use log::info;
use once_cell::unsync::OnceCell;

use crate::aligner::{CurveAligner, HorizontalAligner};
use crate::best_algorithm::BestAlgorithmMap;
use crate::dataset::{generate_from_provider, DatasetProvider};
use crate::datastructures::Algorithm;
use crate::export::read_snapshot;

enum Source {
    Snapshot(PathBuf),
    Provider {
        provider: Box<dyn DatasetProvider + Send + Sync>,
        algorithms: Vec<Algorithm>,
    },
}

/// Best algorithm data of every problem, loaded on first use.
///
/// The data comes either from a snapshot written by
/// [`write_snapshot`](crate::export::write_snapshot) or is generated from the
/// records of an ordered list of algorithms.
pub struct BestAlgorithmCache {
    source: Source,
    aligner: Box<dyn CurveAligner>,
    entries: OnceCell<BestAlgorithmMap>,
}

impl BestAlgorithmCache {
    pub fn from_snapshot(path: impl Into<PathBuf>) -> Self {
        Self::with_source(Source::Snapshot(path.into()))
    }

    pub fn from_provider<P>(provider: P, algorithms: Vec<Algorithm>) -> Self
    where
        P: DatasetProvider + Send + Sync + 'static,
    {
        Self::with_source(Source::Provider {
            provider: Box::new(provider),
            algorithms,
        })
    }

    fn with_source(source: Source) -> Self {
        Self {
            source,
            aligner: Box::new(HorizontalAligner),
            entries: OnceCell::new(),
        }
    }

    /// Replaces the aligner used to generate the data and drops loaded data.
    pub fn with_aligner(mut self, aligner: impl CurveAligner + 'static) -> Self {
        self.aligner = Box::new(aligner);
        self.entries = OnceCell::new();
        self
    }

    /// Returns the loaded data, loading it first if needed or if
    /// `force_reload` is set.
    pub fn get_or_load(&mut self, force_reload: bool) -> Result<&BestAlgorithmMap> {
        if force_reload {
            self.entries.take();
        }
        let Self {
            source,
            aligner,
            entries,
        } = self;
        entries.get_or_try_init(|| match &*source {
            Source::Snapshot(path) => {
                info!("Loading best algorithm data from {path:?}");
                read_snapshot(path)
            }
            Source::Provider {
                provider,
                algorithms,
            } => {
                info!("Generating best algorithm data from given algorithm list...");
                generate_from_provider(&**provider, algorithms, &**aligner)
            }
        })
    }

    pub fn invalidate(&mut self) {
        self.entries.take();
    }

    pub fn is_loaded(&self) -> bool {
        self.entries.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use ndarray::arr1;

    use super::*;
    use crate::datastructures::RunRecord;

    struct CountingProvider {
        loads: Arc<AtomicUsize>,
    }

    impl DatasetProvider for CountingProvider {
        fn load(&self, _algorithm: &str) -> Result<Vec<RunRecord>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(vec![RunRecord::new(1, 2, arr1(&[1e-1]), arr1(&[10.0]))])
        }
    }

    #[test]
    fn test_load_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let mut cache = BestAlgorithmCache::from_provider(
            CountingProvider {
                loads: loads.clone(),
            },
            vec!["A".to_string()],
        );
        assert!(!cache.is_loaded());
        assert_eq!(cache.get_or_load(false).unwrap().len(), 1);
        assert_eq!(cache.get_or_load(false).unwrap().len(), 1);
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        cache.get_or_load(true).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);

        cache.invalidate();
        assert!(!cache.is_loaded());
        cache.get_or_load(false).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_missing_snapshot() {
        let mut cache = BestAlgorithmCache::from_snapshot("does/not/exist.json");
        assert!(cache.get_or_load(false).is_err());
        assert!(!cache.is_loaded());
    }
}
