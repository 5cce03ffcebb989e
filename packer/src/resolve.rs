//! Static dependency-closure resolution over scripts and installed packages.
//!
//! Scripts are scanned for literal `require` calls; packages are expanded from
//! their `package.json` dependency list. Every path is relative to an explicit
//! project root, and each distinct path is expanded at most once per closure,
//! so cyclic graphs terminate.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, trace};

use crate::core::path::{is_node_modules, normalize};
use crate::core::require_scan::extract_required_specifiers;
use crate::core::types::{DeployUnit, Module, ModuleKind, UnitClosure};
use crate::error::{PackError, PackResult};
use crate::io::manifest::{MANIFEST_FILE, read_dependency_names};

const NODE_MODULES: &str = "node_modules";

/// Resolves module closures below a fixed project root.
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    root: PathBuf,
    excludes: HashSet<PathBuf>,
}

impl ModuleResolver {
    /// `excludes` are root-relative module paths that are never part of a
    /// closure and never expanded.
    pub fn new(root: impl Into<PathBuf>, excludes: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            root: root.into(),
            excludes: excludes
                .into_iter()
                .filter_map(|path| normalize(&path))
                .collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a unit's entry script and its full dependency closure.
    #[instrument(skip_all, fields(unit = %unit.name))]
    pub fn resolve_unit(&self, unit: &DeployUnit) -> PackResult<UnitClosure> {
        let entry = normalize(&unit.entry_file()).ok_or_else(|| PackError::FileUnavailable {
            path: unit.entry_file(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "entry file escapes the project root",
            ),
        })?;
        let dependencies = self.closure_of(&Module::script(&entry))?;
        debug!(dependencies = dependencies.len(), "closure resolved");
        Ok(UnitClosure {
            entry,
            dependencies,
        })
    }

    /// Transitive dependencies of `module`, deduplicated by path.
    ///
    /// The module itself is not part of the result, even when a cycle leads
    /// back to it.
    pub fn closure_of(&self, module: &Module) -> PackResult<BTreeSet<Module>> {
        let mut visited = HashSet::from([module.path.clone()]);
        let mut closure = BTreeSet::new();
        let mut pending = vec![module.clone()];
        while let Some(current) = pending.pop() {
            for dep in self.direct_dependencies(&current)? {
                if visited.insert(dep.path.clone()) {
                    trace!(from = %current.path.display(), to = %dep.path.display(), "edge");
                    pending.push(dep.clone());
                    closure.insert(dep);
                }
            }
        }
        Ok(closure)
    }

    /// Immediate, non-excluded dependencies of one module.
    pub fn direct_dependencies(&self, module: &Module) -> PackResult<Vec<Module>> {
        let deps = match module.kind {
            ModuleKind::Script => self.script_dependencies(&module.path)?,
            ModuleKind::Package => self.package_dependencies(&module.path)?,
        };
        Ok(deps
            .into_iter()
            .filter(|dep| !self.excludes.contains(&dep.path))
            .collect())
    }

    fn script_dependencies(&self, script: &Path) -> PackResult<Vec<Module>> {
        let source = fs::read_to_string(self.root.join(script))
            .map_err(|err| PackError::file_unavailable(script, err))?;
        let specifiers =
            extract_required_specifiers(&source).map_err(|reason| PackError::MalformedRequire {
                file: script.to_path_buf(),
                reason,
            })?;
        let dir = script.parent().unwrap_or(Path::new(""));
        Ok(specifiers
            .iter()
            .filter_map(|specifier| self.resolve_specifier(dir, specifier))
            .collect())
    }

    /// Sibling script first, then a top-level installed package; anything
    /// else is provided by the runtime and yields no edge.
    fn resolve_specifier(&self, dir: &Path, specifier: &str) -> Option<Module> {
        let file_name = if specifier.ends_with(".js") {
            specifier.to_string()
        } else {
            format!("{specifier}.js")
        };
        if let Some(script) = normalize(&dir.join(file_name))
            && self.root.join(&script).is_file()
        {
            return Some(Module::script(script));
        }
        if let Some(package) = normalize(&Path::new(NODE_MODULES).join(specifier))
            && !package.as_os_str().is_empty()
            && self.root.join(&package).is_dir()
        {
            return Some(Module::package(package));
        }
        debug!(specifier, "treating as runtime-provided module");
        None
    }

    fn package_dependencies(&self, package: &Path) -> PackResult<Vec<Module>> {
        let manifest = self.root.join(package).join(MANIFEST_FILE);
        read_dependency_names(&manifest)?
            .iter()
            .map(|name| self.find_package(package, name).map(Module::package))
            .collect()
    }

    /// Look for `name` in the package's own `node_modules`, then in every
    /// enclosing `node_modules` up to the project root.
    fn find_package(&self, package: &Path, name: &str) -> PackResult<PathBuf> {
        let nested = package.join(NODE_MODULES);
        let enclosing = package.ancestors().filter(|dir| is_node_modules(dir));
        for base in std::iter::once(nested.as_path()).chain(enclosing) {
            let Some(candidate) = normalize(&base.join(name)) else {
                continue;
            };
            if self.root.join(&candidate).is_dir() {
                return Ok(candidate);
            }
        }
        Err(PackError::DependencyNotFound {
            name: name.to_string(),
            from: package.to_path_buf(),
        })
    }
}
