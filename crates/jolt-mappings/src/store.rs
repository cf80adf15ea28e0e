use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MappingsError, Result};
use crate::lock::StoreLock;
use crate::util::{atomic_write, bincode_deserialize, bincode_serialize};

/// File holding the serialized dependency graph inside the store root.
pub const MAPPINGS_FILENAME: &str = "mappings.bin";
const LOCK_FILENAME: &str = ".lock";

pub const MAPPINGS_SCHEMA_VERSION: u32 = 1;
const MAPPINGS_MAGIC: [u8; 4] = *b"JMAP";

/// What the store knows about one compiled unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub source: Option<PathBuf>,
    pub dependencies: BTreeSet<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedMappings {
    magic: [u8; 4],
    schema_version: u32,
    jolt_version: String,
    units: BTreeMap<String, UnitRecord>,
}

/// Persistent dependency graph between compiled units of one project.
///
/// A store is exclusively owned by the handle returned from [`Mappings::open`]
/// until [`Mappings::close`] (or drop). Changes are kept in memory and written
/// atomically by [`Mappings::flush`]/[`Mappings::close`]; dropping a handle
/// without closing it discards unflushed changes.
#[derive(Debug)]
pub struct Mappings {
    root: PathBuf,
    units: BTreeMap<String, UnitRecord>,
    dependents: BTreeMap<String, BTreeSet<String>>,
    fresh: bool,
    dirty: bool,
    _lock: StoreLock,
}

impl Mappings {
    /// Open the store rooted at `root`, creating it when it does not exist.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(MappingsError::io(root))?;
        let lock = StoreLock::try_acquire(&root.join(LOCK_FILENAME))?;

        let data_path = root.join(MAPPINGS_FILENAME);
        let (units, fresh) = match fs::read(&data_path) {
            Ok(bytes) => (decode(&data_path, &bytes)?, false),
            Err(err) if err.kind() == io::ErrorKind::NotFound => (BTreeMap::new(), true),
            Err(source) => {
                return Err(MappingsError::Io {
                    path: data_path,
                    source,
                })
            }
        };

        let mut mappings = Self {
            root: root.to_path_buf(),
            units,
            dependents: BTreeMap::new(),
            fresh,
            dirty: fresh,
            _lock: lock,
        };
        mappings.rebuild_dependents();

        tracing::debug!(
            target: "jolt.mappings",
            root = %mappings.root.display(),
            units = mappings.units.len(),
            fresh,
            "opened dependency mappings"
        );
        Ok(mappings)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `true` when the store was created by this handle and holds no prior
    /// dependency information.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn unit(&self, unit: &str) -> Option<&UnitRecord> {
        self.units.get(unit)
    }

    pub fn units(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    /// Record (or replace) the dependencies of `unit`.
    pub fn record_unit<I, S>(&mut self, unit: impl Into<String>, source: Option<PathBuf>, deps: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unit = unit.into();
        self.detach_outgoing(&unit);

        let dependencies: BTreeSet<String> = deps
            .into_iter()
            .map(Into::into)
            .filter(|dep| *dep != unit)
            .collect();
        for dep in &dependencies {
            self.dependents
                .entry(dep.clone())
                .or_default()
                .insert(unit.clone());
        }
        self.units.insert(
            unit,
            UnitRecord {
                source,
                dependencies,
            },
        );
        self.dirty = true;
    }

    /// Forget `unit` and its outgoing edges.
    ///
    /// Edges from other units to `unit` are kept so its dependents can still be
    /// found (and recompiled) after the unit disappears.
    pub fn remove_unit(&mut self, unit: &str) -> bool {
        if !self.units.contains_key(unit) {
            return false;
        }
        self.detach_outgoing(unit);
        self.units.remove(unit);
        self.dirty = true;
        true
    }

    pub fn dependencies(&self, unit: &str) -> impl Iterator<Item = &str> {
        self.units
            .get(unit)
            .into_iter()
            .flat_map(|record| record.dependencies.iter().map(String::as_str))
    }

    /// Units that directly depend on `unit`.
    pub fn dependents(&self, unit: &str) -> impl Iterator<Item = &str> {
        self.dependents
            .get(unit)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// `changed` plus every unit that transitively depends on one of them.
    pub fn affected_units<'a>(
        &self,
        changed: impl IntoIterator<Item = &'a str>,
    ) -> BTreeSet<String> {
        let mut affected = BTreeSet::new();
        let mut queue: VecDeque<String> = changed.into_iter().map(str::to_string).collect();
        while let Some(unit) = queue.pop_front() {
            if !affected.insert(unit.clone()) {
                continue;
            }
            for dependent in self.dependents(&unit) {
                if !affected.contains(dependent) {
                    queue.push_back(dependent.to_string());
                }
            }
        }
        affected
    }

    /// Units whose recorded source is `source`.
    pub fn units_for_source(&self, source: &Path) -> Vec<&str> {
        self.units
            .iter()
            .filter(|(_, record)| record.source.as_deref() == Some(source))
            .map(|(unit, _)| unit.as_str())
            .collect()
    }

    /// Drop all dependency information (used before a full rebuild).
    pub fn clear(&mut self) {
        if self.units.is_empty() && self.dependents.is_empty() {
            return;
        }
        self.units.clear();
        self.dependents.clear();
        self.dirty = true;
    }

    /// Persist in-memory changes.
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let persisted = PersistedMappings {
            magic: MAPPINGS_MAGIC,
            schema_version: MAPPINGS_SCHEMA_VERSION,
            jolt_version: jolt_core::JOLT_VERSION.to_string(),
            units: self.units.clone(),
        };
        let bytes = bincode_serialize(&persisted)?;
        atomic_write(&self.root.join(MAPPINGS_FILENAME), &bytes)?;
        self.dirty = false;
        Ok(())
    }

    /// Flush and release the store.
    pub fn close(mut self) -> Result<()> {
        let result = self.flush();
        tracing::debug!(
            target: "jolt.mappings",
            root = %self.root.display(),
            units = self.units.len(),
            ok = result.is_ok(),
            "closed dependency mappings"
        );
        // Clear so `Drop` does not report the (already attempted) changes as lost.
        self.dirty = false;
        result
    }

    fn detach_outgoing(&mut self, unit: &str) {
        let Some(previous) = self.units.get(unit) else {
            return;
        };
        for dep in &previous.dependencies {
            if let Some(set) = self.dependents.get_mut(dep) {
                set.remove(unit);
                if set.is_empty() {
                    self.dependents.remove(dep);
                }
            }
        }
    }

    fn rebuild_dependents(&mut self) {
        self.dependents.clear();
        for (unit, record) in &self.units {
            for dep in &record.dependencies {
                self.dependents
                    .entry(dep.clone())
                    .or_default()
                    .insert(unit.clone());
            }
        }
    }
}

impl Drop for Mappings {
    fn drop(&mut self) {
        if self.dirty {
            tracing::debug!(
                target: "jolt.mappings",
                root = %self.root.display(),
                "dependency mappings dropped without close; discarding unflushed changes"
            );
        }
    }
}

fn decode(path: &Path, bytes: &[u8]) -> Result<BTreeMap<String, UnitRecord>> {
    if bytes.len() < MAPPINGS_MAGIC.len() || bytes[..MAPPINGS_MAGIC.len()] != MAPPINGS_MAGIC {
        return Err(MappingsError::Corrupt {
            path: path.to_path_buf(),
            reason: "missing mappings header".to_string(),
        });
    }
    let persisted: PersistedMappings = bincode_deserialize(bytes)?;
    if persisted.schema_version != MAPPINGS_SCHEMA_VERSION {
        return Err(MappingsError::IncompatibleSchemaVersion {
            path: path.to_path_buf(),
            expected: MAPPINGS_SCHEMA_VERSION,
            found: persisted.schema_version,
        });
    }
    if persisted.jolt_version != jolt_core::JOLT_VERSION {
        return Err(MappingsError::IncompatibleJoltVersion {
            path: path.to_path_buf(),
            expected: jolt_core::JOLT_VERSION.to_string(),
            found: persisted.jolt_version,
        });
    }
    Ok(persisted.units)
}
