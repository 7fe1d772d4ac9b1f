//! Resolved document store
//!
//! A [`Snapshot`] is the immutable result of one load. A [`Registry`]
//! publishes the current snapshot through an [`ArcSwap`]: readers grab
//! the snapshot once per request, and a reload builds a complete new
//! snapshot before swapping it in with a single store. Readers always
//! receive deep copies, never references into the shared map.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use profile_inherit::Document;
use serde_json::Value;
use tracing::info;

use crate::kind::{
    AgentProfile, DocumentKind, LlmConfig, IS_ACTIVE_KEY, IS_DELETED_KEY, NAME_KEY, REV_KEY,
    TIMESTAMP_KEY,
};
use crate::loader::{load_and_resolve, LoadError, LoadOptions, LoadReport, SourceFile};
use crate::settings::RegistrySettings;

/// Immutable set of finalized documents of one kind, keyed by instance id
pub struct Snapshot<K: DocumentKind> {
    documents: BTreeMap<String, Document>,
    sources: BTreeMap<String, SourceFile>,
    report: LoadReport,
    loaded_at: DateTime<Utc>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: DocumentKind> Snapshot<K> {
    /// Build a snapshot from finalized documents.
    ///
    /// `sources` is keyed by logical name.
    pub fn new(
        documents: BTreeMap<String, Document>,
        sources: BTreeMap<String, SourceFile>,
        report: LoadReport,
        loaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            documents,
            sources,
            report,
            loaded_at,
            _kind: PhantomData,
        }
    }

    /// Snapshot with no documents
    pub fn empty() -> Self {
        Self::new(
            BTreeMap::new(),
            BTreeMap::new(),
            LoadReport::default(),
            Utc::now(),
        )
    }

    /// Deep copy of the document with instance id `id`
    pub fn get_copy_by_id(&self, id: &str) -> Option<Document> {
        self.documents.get(id).cloned()
    }

    /// Deep copy of the newest active, non-deleted document named `name`.
    ///
    /// Highest `rev` wins. Equal revisions prefer the newer `timestamp`,
    /// then the smallest instance id, so the choice never depends on map
    /// iteration order.
    pub fn latest_active_by_name(&self, name: &str) -> Option<Document> {
        self.documents
            .values()
            .filter(|doc| doc.get(NAME_KEY).and_then(Value::as_str) == Some(name))
            .filter(|doc| is_live(doc))
            .max_by(|a, b| compare_recency::<K>(a, b))
            .cloned()
    }

    /// Source file of the document with instance id `id`
    pub fn source_of(&self, id: &str) -> Option<&SourceFile> {
        let name = self.documents.get(id)?.get(NAME_KEY)?.as_str()?;
        self.sources.get(name)
    }

    /// Instance ids in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    /// Iterate over `(id, document)` pairs in id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Document)> {
        self.documents.iter().map(|(id, doc)| (id.as_str(), doc))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

impl<K: DocumentKind> fmt::Debug for Snapshot<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("kind", &K::LABEL)
            .field("documents", &self.documents.len())
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

fn is_live(doc: &Document) -> bool {
    doc.get(IS_ACTIVE_KEY).and_then(Value::as_bool) == Some(true)
        && doc.get(IS_DELETED_KEY).and_then(Value::as_bool) == Some(false)
}

/// Ordering where `Greater` means "more recent"
fn compare_recency<K: DocumentKind>(a: &Document, b: &Document) -> Ordering {
    rev(a)
        .cmp(&rev(b))
        .then_with(|| timestamp(a).cmp(&timestamp(b)))
        // Smaller id wins, so it must compare as greater
        .then_with(|| instance_id::<K>(b).cmp(instance_id::<K>(a)))
}

fn rev(doc: &Document) -> Option<i64> {
    doc.get(REV_KEY).and_then(Value::as_i64)
}

/// RFC 3339, or an offset-less ISO 8601 stamp read as UTC
fn timestamp(doc: &Document) -> Option<DateTime<FixedOffset>> {
    let raw = doc.get(TIMESTAMP_KEY).and_then(Value::as_str)?;
    DateTime::parse_from_rfc3339(raw).ok().or_else(|| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive).into())
    })
}

fn instance_id<K: DocumentKind>(doc: &Document) -> &str {
    doc.get(K::ID_KEY).and_then(Value::as_str).unwrap_or_default()
}

/// Published, reloadable store for one document kind
pub struct Registry<K: DocumentKind> {
    directory: PathBuf,
    options: LoadOptions,
    current: ArcSwap<Snapshot<K>>,
}

/// Agent profile store
pub type AgentProfiles = Registry<AgentProfile>;

/// Shared LLM config store
pub type LlmConfigs = Registry<LlmConfig>;

impl<K: DocumentKind> Registry<K> {
    /// Load `directory` and publish the result.
    ///
    /// Only fails on an unreadable directory, or on any problem in strict
    /// mode.
    pub fn open(directory: impl Into<PathBuf>, options: LoadOptions) -> Result<Self, LoadError> {
        let directory = directory.into();
        let snapshot = load_and_resolve::<K>(&directory, &options)?;
        Ok(Self::from_snapshot(directory, options, snapshot))
    }

    /// Publish an already built snapshot
    pub fn from_snapshot(
        directory: impl Into<PathBuf>,
        options: LoadOptions,
        snapshot: Snapshot<K>,
    ) -> Self {
        Self {
            directory: directory.into(),
            options,
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    /// The currently published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot<K>> {
        self.current.load_full()
    }

    /// Rebuild from disk and swap the new snapshot in.
    ///
    /// On error the previously published snapshot stays in place.
    pub fn reload(&self) -> Result<Arc<Snapshot<K>>, LoadError> {
        let fresh = Arc::new(load_and_resolve::<K>(&self.directory, &self.options)?);
        self.current.store(Arc::clone(&fresh));
        info!(
            kind = K::LABEL,
            path = %self.directory.display(),
            documents = fresh.len(),
            "registry reloaded"
        );
        Ok(fresh)
    }

    pub fn get_copy_by_id(&self, id: &str) -> Option<Document> {
        self.current.load().get_copy_by_id(id)
    }

    pub fn latest_active_by_name(&self, name: &str) -> Option<Document> {
        self.current.load().latest_active_by_name(name)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl<K: DocumentKind> fmt::Debug for Registry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &K::LABEL)
            .field("directory", &self.directory)
            .field("options", &self.options)
            .finish()
    }
}

/// The document stores of one host process
#[derive(Debug)]
pub struct Registries {
    pub agent_profiles: AgentProfiles,
    pub llm_configs: LlmConfigs,
}

impl Registries {
    /// Open both stores from the configured directories
    pub fn open(settings: &RegistrySettings) -> Result<Self, LoadError> {
        let options = settings.load_options();
        Ok(Self {
            agent_profiles: Registry::open(
                settings.directories.agent_profiles.clone(),
                options.clone(),
            )?,
            llm_configs: Registry::open(settings.directories.llm_configs.clone(), options)?,
        })
    }

    /// Reload both stores, returning the first error.
    ///
    /// Both reloads are always attempted; a store whose reload fails keeps
    /// its previous snapshot.
    pub fn reload(&self) -> Result<(), LoadError> {
        let profiles = self.agent_profiles.reload();
        let llm_configs = self.llm_configs.reload();
        profiles?;
        llm_configs?;
        Ok(())
    }
}
