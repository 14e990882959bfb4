//! # Config Sets
//!
//! A config set is a directory holding `schemas/`, `models/` and
//! `instances/`. [`ConfigSet`] indexes the JSON files directly inside those
//! folders by resource identifier, and [`ConfigSetManager`] owns every set
//! discovered under a workspace root.
//!
//! ## File layout
//!
//! ```text
//! demo/
//!   schemas/base-schema.json          demo.schemas.base-schema
//!   models/base-model.json            demo.models.base-model
//!   models/base-model/base-model_1.json   demo.models.base-model.1
//!   instances/base-model.json         demo.instances.base-model
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use regex::Regex;
use serde_json::json;
use walkdir::WalkDir;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::filesystem::{join, join_contained, FileSystem};
use crate::identifier::{Category, ResourceId};

/// Whether `path` has all three category subdirectories.
pub fn is_config_set_dir(fs: &dyn FileSystem, path: &Path) -> bool {
    Category::ALL
        .iter()
        .all(|c| fs.is_dir(&path.join(c.as_str())))
}

/// One config set and its identifier → file maps.
#[derive(Debug, Clone)]
pub struct ConfigSet {
    name: String,
    path: PathBuf,
    files: BTreeMap<Category, BTreeMap<String, PathBuf>>,
}

impl ConfigSet {
    /// Load an existing config set and index its files.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        if !is_config_set_dir(fs, path) {
            return Err(Error::ConfigSet {
                message: format!(
                    "{} is not a config set (needs schemas/, models/ and instances/)",
                    path.display()
                ),
            });
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut set = Self {
            name,
            path: path.to_path_buf(),
            files: BTreeMap::new(),
        };
        set.rescan(fs)?;
        Ok(set)
    }

    /// Rebuild the identifier maps from disk.
    pub fn rescan(&mut self, fs: &dyn FileSystem) -> Result<()> {
        let id_pattern = Regex::new(r#""\$id"\s*:\s*"([^"]+)""#)?;

        self.files.clear();
        for category in Category::ALL {
            let dir = self.path.join(category.as_str());
            let mut map = BTreeMap::new();

            for entry in fs.list_dir(&dir)? {
                if fs.is_dir(&entry) || entry.extension().is_none_or(|ext| ext != "json") {
                    continue;
                }
                let stem = entry
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();

                let id = match fs.read_to_string(&entry) {
                    Ok(content) => id_pattern
                        .captures(&content)
                        .map(|c| c[1].to_string())
                        .unwrap_or_else(|| format!("{}.{}.{}", self.name, category, stem)),
                    Err(e) => {
                        warn!("Failed to read {}: {}", entry.display(), e);
                        continue;
                    }
                };

                debug!("Resolved {} -> {}", id, entry.display());
                map.insert(id, entry);
            }
            self.files.insert(category, map);
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identifier → path map for one category.
    pub fn files(&self, category: Category) -> impl Iterator<Item = (&str, &Path)> {
        self.files
            .get(&category)
            .into_iter()
            .flat_map(|m| m.iter().map(|(id, p)| (id.as_str(), p.as_path())))
    }

    pub fn schema_ids(&self) -> Vec<String> {
        self.ids(Category::Schemas)
    }

    pub fn model_ids(&self) -> Vec<String> {
        self.ids(Category::Models)
    }

    pub fn instance_ids(&self) -> Vec<String> {
        self.ids(Category::Instances)
    }

    fn ids(&self, category: Category) -> Vec<String> {
        self.files(category).map(|(id, _)| id.to_string()).collect()
    }

    /// Path of an indexed file, looked up by the category in `id`.
    pub fn file_path(&self, id: &str) -> Option<&Path> {
        let category = crate::identifier::category_of(id)?;
        self.files
            .get(&category)?
            .get(id)
            .map(PathBuf::as_path)
    }

    /// Path a resource with this identifier lives at, whether or not it
    /// exists yet.
    pub fn build_abs_file_path(&self, id: &str) -> Option<PathBuf> {
        let id = ResourceId::parse(id).ok()?;
        let dir = Path::new(id.category().as_str());
        let relative = match id.version() {
            None => dir.join(format!("{}.json", id.name())),
            Some(version) => dir
                .join(id.name())
                .join(format!("{}_{}.json", id.name(), version)),
        };
        Some(join_contained(&self.path, relative))
    }

    /// Identifier implied by a file's location inside this set, if it is
    /// laid out as `category/name.json` or `category/name/name_N.json`.
    pub fn expected_id_for_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.path).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        let stem = |file: &str| file.strip_suffix(".json").map(str::to_string);

        match parts.as_slice() {
            [category, file] => Some(format!("{}.{}.{}", self.name, category, stem(file)?)),
            [category, folder, file] => {
                let version = stem(file)?
                    .strip_prefix(&format!("{}_", folder))?
                    .parse::<u32>()
                    .ok()?;
                Some(format!("{}.{}.{}.{}", self.name, category, folder, version))
            }
            _ => None,
        }
    }

    /// Create `<category>/<name>.json` holding a minimal document.
    fn create_resource(&mut self, fs: &dyn FileSystem, category: Category, name: &str) -> Result<String> {
        let id = ResourceId::new(self.name.clone(), category, name).to_string();
        ResourceId::parse(&id)?;
        let document = json!({ "$id": id, "$version": 1 });
        self.create_resource_with(fs, category, name, &document)
    }

    /// Create `<category>/<name>.json` with `document` as content.
    pub fn create_resource_with(
        &mut self,
        fs: &dyn FileSystem,
        category: Category,
        name: &str,
        document: &serde_json::Value,
    ) -> Result<String> {
        let id = ResourceId::new(self.name.clone(), category, name).to_string();
        let path = join_contained(&self.path, Path::new(category.as_str()).join(format!("{}.json", name)));
        if fs.exists(&path) {
            return Err(Error::ConfigSet {
                message: format!("File already exists: {}", path.display()),
            });
        }

        fs.write(&path, &format!("{}\n", serde_json::to_string_pretty(document)?))?;
        self.files
            .entry(category)
            .or_default()
            .insert(id.clone(), path);
        info!("Created {}: {}", category, id);
        Ok(id)
    }

    /// Create an empty schema.
    pub fn create_schema(&mut self, fs: &dyn FileSystem, name: &str) -> Result<String> {
        self.create_resource(fs, Category::Schemas, name)
    }

    /// Create an empty model.
    pub fn create_model(&mut self, fs: &dyn FileSystem, name: &str) -> Result<String> {
        self.create_resource(fs, Category::Models, name)
    }
}

/// Owns every config set found under a workspace root.
#[derive(Debug, Default)]
pub struct ConfigSetManager {
    config_sets: Vec<ConfigSet>,
}

impl ConfigSetManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the known sets with every config set found under `root`.
    ///
    /// Directories named in [`Settings::is_excluded`] are not entered.
    pub fn discover(&mut self, fs: &dyn FileSystem, root: &Path, settings: &Settings) -> Result<&[ConfigSet]> {
        self.config_sets.clear();

        let walker = WalkDir::new(root).follow_links(false).into_iter();
        let mut roots = Vec::new();
        for entry in walker.filter_entry(|e| {
            e.depth() == 0 || !settings.is_excluded(&e.file_name().to_string_lossy())
        }) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable path during discovery: {}", e);
                    continue;
                }
            };
            if entry.file_type().is_dir() && is_config_set_dir(fs, entry.path()) {
                roots.push(entry.path().to_path_buf());
            }
        }

        roots.sort();
        roots.dedup();
        for path in roots {
            self.config_sets.push(ConfigSet::load(fs, &path)?);
        }

        debug!(
            "Discovered {} config sets: {}",
            self.config_sets.len(),
            self.config_sets
                .iter()
                .map(ConfigSet::name)
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(&self.config_sets)
    }

    pub fn config_sets(&self) -> &[ConfigSet] {
        &self.config_sets
    }

    /// Add a set, replacing a known set with the same name.
    pub fn insert(&mut self, config_set: ConfigSet) {
        match self
            .config_sets
            .iter_mut()
            .find(|s| s.name() == config_set.name())
        {
            Some(existing) => *existing = config_set,
            None => self.config_sets.push(config_set),
        }
    }

    pub fn get_by_name(&self, name: &str) -> Option<&ConfigSet> {
        self.config_sets.iter().find(|s| s.name() == name)
    }

    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut ConfigSet> {
        self.config_sets.iter_mut().find(|s| s.name() == name)
    }

    /// The set named by the first segment of `id`.
    pub fn get_config_set_by_resource_id(&self, id: &str) -> Option<&ConfigSet> {
        let name = id.split('.').next()?;
        let found = self.get_by_name(name);
        if found.is_none() {
            warn!("No config set found for resource id: {}", id);
        }
        found
    }

    /// Path for `id` inside the set its first segment names.
    pub fn build_abs_file_path(&self, id: &str) -> Option<PathBuf> {
        self.get_config_set_by_resource_id(id)?
            .build_abs_file_path(id)
    }

    /// Create `<root>/<name>` with its three category folders.
    pub fn create_config_set(&mut self, fs: &dyn FileSystem, root: &Path, name: &str) -> Result<&ConfigSet> {
        if name.is_empty() || name.contains('.') || name.contains(std::path::is_separator) {
            return Err(Error::ConfigSet {
                message: format!("Invalid config set name '{}': must be non-empty without dots or path separators", name),
            });
        }

        let path = join(root, name);
        if is_config_set_dir(fs, &path) {
            return Err(Error::ConfigSet {
                message: format!("Config set already exists: {}", path.display()),
            });
        }

        for category in Category::ALL {
            fs.create_dir_all(&path.join(category.as_str()))?;
        }
        let config_set = ConfigSet::load(fs, &path)?;
        info!("Created config set: {}", path.display());

        self.insert(config_set);
        self.get_by_name(name).ok_or_else(|| Error::ConfigSet {
            message: format!("Config set {} vanished after creation", name),
        })
    }
}
