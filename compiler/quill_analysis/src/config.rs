//! Project configuration: path chains, extensions, and validity stamps.
//!
//! Configuration comes from two provenance layers. The *declared* layer is
//! whatever the project's persisted configuration said; the *user* layer is
//! interactive overrides from the editor session. Neither clobbers the
//! other: each keeps its own paths, packages, and extension toggles, and
//! queries see one effective ordered chain (user first, then declared, then
//! the open buffer's own directory, then the standard library) with
//! duplicates removed, first occurrence wins.
//!
//! Everything derived from configuration is guarded by a [`Stamp`]:
//! replacing the stamp invalidates every holder at once, with no ambient
//! global cache to forget to flush.

use quill_ir::{Name, StringInterner};
use quill_lexer::{Extension, KeywordTable};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Extension of compiled module interface files.
pub const INTERFACE_EXTENSION: &str = "qmi";

static NEXT_STAMP: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct StampCell {
    id: u64,
}

/// An identity-compared invalidation token.
///
/// Holders capture the stamp current at their creation and compare by
/// allocation identity later; a stale stamp means every piece of derived
/// state must be refreshed before it can be trusted.
#[derive(Debug, Clone)]
pub struct Stamp(Arc<StampCell>);

impl Stamp {
    fn fresh() -> Self {
        Stamp(Arc::new(StampCell {
            id: NEXT_STAMP.fetch_add(1, Ordering::Relaxed),
        }))
    }

    /// Identity comparison; value equality is deliberately not provided.
    #[inline]
    pub fn is_same(&self, other: &Stamp) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// A unique id usable in hash keys.
    #[inline]
    pub fn id(&self) -> u64 {
        self.0.id
    }
}

/// Why a package could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackageError {
    #[error("package not found")]
    NotFound,
    #[error("package is unreadable: {0}")]
    Unreadable(String),
}

/// One package that failed to resolve, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFailure {
    pub name: String,
    pub error: PackageError,
}

/// Paths contributed by one resolved package.
#[derive(Debug, Clone, Default)]
pub struct PackagePaths {
    pub source: Vec<PathBuf>,
    pub build: Vec<PathBuf>,
}

/// Resolves package names to include paths.
///
/// Resolution failure is per package and partial: callers proceed with
/// whatever resolved.
pub trait PackageResolver {
    fn resolve(&self, name: &str) -> Result<PackagePaths, PackageError>;
}

/// The persisted project-declared configuration layer.
#[derive(Debug, Clone, Default)]
pub struct DeclaredConfig {
    pub source_paths: Vec<PathBuf>,
    pub build_paths: Vec<PathBuf>,
    pub packages: Vec<String>,
    /// Extension names; unknown names are ignored with a warning.
    pub extensions: Vec<String>,
}

#[derive(Debug, Default)]
struct Layer {
    source_paths: Vec<PathBuf>,
    build_paths: Vec<PathBuf>,
    package_paths: PackagePaths,
}

impl Layer {
    fn load_packages(
        &mut self,
        names: &[String],
        resolver: &dyn PackageResolver,
    ) -> Vec<PackageFailure> {
        let mut failures = Vec::new();
        self.package_paths = PackagePaths::default();
        for name in names {
            match resolver.resolve(name) {
                Ok(paths) => {
                    self.package_paths.source.extend(paths.source);
                    self.package_paths.build.extend(paths.build);
                }
                Err(error) => failures.push(PackageFailure {
                    name: name.clone(),
                    error,
                }),
            }
        }
        failures
    }
}

/// Aggregated project configuration for one analysis session.
pub struct ProjectConfig {
    workdir: Option<PathBuf>,
    stdlib: PathBuf,
    declared: Layer,
    declared_extensions: FxHashSet<Extension>,
    user: Layer,
    /// Extensions the user toggled; membership flips the declared state.
    user_toggles: FxHashSet<Extension>,
    stamp: Stamp,
    modules_memo: Option<Arc<FxHashSet<Name>>>,
    keywords_memo: Option<(FxHashSet<Extension>, Arc<KeywordTable>)>,
}

impl ProjectConfig {
    pub fn new(workdir: Option<PathBuf>, stdlib: PathBuf) -> Self {
        ProjectConfig {
            workdir,
            stdlib,
            declared: Layer::default(),
            declared_extensions: FxHashSet::default(),
            user: Layer::default(),
            user_toggles: FxHashSet::default(),
            stamp: Stamp::fresh(),
            modules_memo: None,
            keywords_memo: None,
        }
    }

    /// The current validity stamp.
    pub fn stamp(&self) -> Stamp {
        self.stamp.clone()
    }

    /// Wholesale replace the declared layer.
    ///
    /// Returns the packages that failed to resolve; the rest of the layer
    /// is installed regardless. Derived module listings are flushed.
    pub fn set_declared_config(
        &mut self,
        config: Option<DeclaredConfig>,
        resolver: &dyn PackageResolver,
    ) -> Vec<PackageFailure> {
        let mut layer = Layer::default();
        let mut extensions = FxHashSet::default();
        let mut failures = Vec::new();
        if let Some(config) = config {
            layer.source_paths = self.canonicalize_all(&config.source_paths);
            layer.build_paths = self.canonicalize_all(&config.build_paths);
            failures = layer.load_packages(&config.packages, resolver);
            for name in &config.extensions {
                match Extension::from_name(name) {
                    Some(ext) => {
                        extensions.insert(ext);
                    }
                    None => tracing::warn!(extension = %name, "unknown extension in project config"),
                }
            }
        }
        self.declared = layer;
        self.declared_extensions = extensions;
        self.modules_memo = None;
        failures
    }

    /// Add a user-override source path.
    pub fn add_source_path(&mut self, path: &Path) {
        let path = self.canonicalize(path);
        if !self.user.source_paths.contains(&path) {
            self.user.source_paths.push(path);
            self.modules_memo = None;
        }
    }

    /// Remove a user-override source path.
    pub fn remove_source_path(&mut self, path: &Path) {
        let path = self.canonicalize(path);
        self.user.source_paths.retain(|p| *p != path);
        self.modules_memo = None;
    }

    /// Add a user-override build path.
    pub fn add_build_path(&mut self, path: &Path) {
        let path = self.canonicalize(path);
        if !self.user.build_paths.contains(&path) {
            self.user.build_paths.push(path);
            self.modules_memo = None;
        }
    }

    /// Remove a user-override build path.
    pub fn remove_build_path(&mut self, path: &Path) {
        let path = self.canonicalize(path);
        self.user.build_paths.retain(|p| *p != path);
        self.modules_memo = None;
    }

    /// Load user-layer packages, replacing any previously loaded set.
    pub fn load_packages(
        &mut self,
        names: &[String],
        resolver: &dyn PackageResolver,
    ) -> Vec<PackageFailure> {
        let failures = self.user.load_packages(names, resolver);
        self.modules_memo = None;
        failures
    }

    /// Toggle a named extension on or off.
    pub fn toggle_extension(&mut self, name: &str) -> Result<(), UnknownExtension> {
        let ext = Extension::from_name(name).ok_or_else(|| UnknownExtension(name.to_owned()))?;
        if !self.user_toggles.remove(&ext) {
            self.user_toggles.insert(ext);
        }
        Ok(())
    }

    /// The effective extension set: declared, with user toggles flipped.
    pub fn extensions(&self) -> FxHashSet<Extension> {
        let mut set = self.declared_extensions.clone();
        for ext in &self.user_toggles {
            if !set.remove(ext) {
                set.insert(*ext);
            }
        }
        set
    }

    /// The effective source path chain for a buffer.
    ///
    /// Order: user overrides, declared project paths, package paths, the
    /// buffer's own directory, then the standard library. First occurrence
    /// of a duplicate wins.
    pub fn source_path_chain(&self, buffer_dir: Option<&Path>) -> Vec<PathBuf> {
        self.chain(
            &self.user.source_paths,
            &self.user.package_paths.source,
            &self.declared.source_paths,
            &self.declared.package_paths.source,
            buffer_dir,
        )
    }

    /// The effective build path chain for a buffer. Same ordering rules as
    /// [`ProjectConfig::source_path_chain`].
    pub fn build_path_chain(&self, buffer_dir: Option<&Path>) -> Vec<PathBuf> {
        self.chain(
            &self.user.build_paths,
            &self.user.package_paths.build,
            &self.declared.build_paths,
            &self.declared.package_paths.build,
            buffer_dir,
        )
    }

    fn chain(
        &self,
        user: &[PathBuf],
        user_packages: &[PathBuf],
        declared: &[PathBuf],
        declared_packages: &[PathBuf],
        buffer_dir: Option<&Path>,
    ) -> Vec<PathBuf> {
        let mut seen: FxHashSet<&Path> = FxHashSet::default();
        let mut ordered: SmallVec<[&Path; 8]> = SmallVec::new();
        let groups = [user, user_packages, declared, declared_packages];
        for group in groups {
            for path in group {
                if seen.insert(path.as_path()) {
                    ordered.push(path.as_path());
                }
            }
        }
        if let Some(dir) = buffer_dir {
            if seen.insert(dir) {
                ordered.push(dir);
            }
        }
        if seen.insert(self.stdlib.as_path()) {
            ordered.push(self.stdlib.as_path());
        }
        ordered.into_iter().map(Path::to_path_buf).collect()
    }

    /// Top-level module names visible on the build path.
    ///
    /// Scans each build-path directory for compiled interface files and
    /// memoizes the result; any path-chain change drops the memo.
    pub fn global_modules(&mut self, interner: &StringInterner) -> Arc<FxHashSet<Name>> {
        if let Some(memo) = &self.modules_memo {
            return Arc::clone(memo);
        }
        let mut modules = FxHashSet::default();
        for dir in self.build_path_chain(None) {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                tracing::debug!(dir = %dir.display(), "skipping unreadable build path");
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some(INTERFACE_EXTENSION) {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        modules.insert(interner.intern(stem));
                    }
                }
            }
        }
        let modules = Arc::new(modules);
        self.modules_memo = Some(Arc::clone(&modules));
        modules
    }

    /// The lexer keyword table for the current extension set.
    ///
    /// Memoized on set equality, not identity: toggling an extension twice
    /// lands back on the memoized table, so dependent buffers see the same
    /// `Arc` and keep their token history.
    pub fn keywords(&mut self) -> Arc<KeywordTable> {
        let current = self.extensions();
        if let Some((memoized, table)) = &self.keywords_memo {
            if *memoized == current {
                return Arc::clone(table);
            }
        }
        let table = Arc::new(KeywordTable::for_extensions(&current));
        self.keywords_memo = Some((current, Arc::clone(&table)));
        table
    }

    /// Replace the validity stamp and flush derived caches.
    ///
    /// Every holder of the old stamp now compares unequal and must refresh.
    pub fn invalidate(&mut self) {
        self.stamp = Stamp::fresh();
        self.modules_memo = None;
    }

    /// Canonicalize a path lexically against the working directory.
    ///
    /// Purely lexical (`.` and `..` components are folded); no filesystem
    /// access, so nonexistent paths still normalize deterministically.
    fn canonicalize(&self, path: &Path) -> PathBuf {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            match &self.workdir {
                Some(workdir) => workdir.join(path),
                None => path.to_path_buf(),
            }
        };
        normalize(&absolute)
    }

    fn canonicalize_all(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::with_capacity(paths.len());
        for path in paths {
            let canonical = self.canonicalize(path);
            if seen.insert(canonical.clone()) {
                out.push(canonical);
            }
        }
        out
    }
}

/// Error for toggling an extension name the compiler does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown extension `{0}`")]
pub struct UnknownExtension(pub String);

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}
