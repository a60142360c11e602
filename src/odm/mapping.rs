//! Mapping drivers: read JSON class mappings from driver paths through a caching annotation reader.

use crate::config::{ClassMappingConfig, DriverClass, OdmConfig};
use crate::error::ConfigError;
use crate::odm::metadata::{ClassMetadata, MetadataRegistry};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

const MAX_DRIVER_DEPTH: usize = 8;

/// Metadata cache services known to the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheKind {
    /// Parsed mapping files are kept for the life of the process.
    Array,
    /// Every read goes to disk.
    Null,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MappingFile {
    One(ClassMappingConfig),
    Many(Vec<ClassMappingConfig>),
}

/// Reads class mappings and their field annotations from disk.
pub struct AnnotationReader {
    cache_kind: CacheKind,
    cache: RwLock<HashMap<PathBuf, Arc<Vec<ClassMappingConfig>>>>,
}

impl AnnotationReader {
    pub fn new(cache_kind: CacheKind) -> Self {
        AnnotationReader {
            cache_kind,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn cache_kind(&self) -> CacheKind {
        self.cache_kind
    }

    /// All mappings under a path: a single `.json` file, or every `.json` file in a directory (sorted by name).
    /// A missing path yields no mappings.
    pub fn read_path(&self, path: &Path) -> Result<Arc<Vec<ClassMappingConfig>>, ConfigError> {
        if self.cache_kind == CacheKind::Array {
            if let Some(hit) = self.cache.read().ok().and_then(|c| c.get(path).cloned()) {
                return Ok(hit);
            }
        }
        let mappings = Arc::new(read_mappings(path)?);
        if self.cache_kind == CacheKind::Array {
            if let Ok(mut c) = self.cache.write() {
                c.insert(path.to_path_buf(), mappings.clone());
            }
        }
        Ok(mappings)
    }

    /// Keep only annotations whose namespace is registered.
    pub fn filter_annotations(&self, annotations: &[String], namespaces: &BTreeMap<String, String>, class: &str) -> Vec<String> {
        annotations
            .iter()
            .filter(|a| {
                let ns = a.split(':').next().unwrap_or("");
                let known = namespaces.contains_key(ns);
                if !known {
                    tracing::warn!(class = %class, annotation = %a, "annotation namespace not registered, ignoring");
                }
                known
            })
            .cloned()
            .collect()
    }
}

fn read_mappings(path: &Path) -> Result<Vec<ClassMappingConfig>, ConfigError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "mapping path does not exist, skipping");
        return Ok(Vec::new());
    }
    let files = if path.is_dir() {
        let mut files: Vec<PathBuf> = std::fs::read_dir(path)
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|x| x == "json").unwrap_or(false))
            .collect();
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };
    let mut out = Vec::new();
    for file in files {
        let text = std::fs::read_to_string(&file)
            .map_err(|e| ConfigError::Load(format!("{}: {}", file.display(), e)))?;
        let parsed: MappingFile = serde_json::from_str(&text)
            .map_err(|e| ConfigError::Load(format!("{}: {}", file.display(), e)))?;
        match parsed {
            MappingFile::One(m) => out.push(m),
            MappingFile::Many(v) => out.extend(v),
        }
    }
    Ok(out)
}

/// Resolve every class reachable from the named configuration's driver.
pub fn load_metadata(odm: &OdmConfig, configuration: &str, reader: &AnnotationReader) -> Result<MetadataRegistry, ConfigError> {
    let conf = odm
        .configuration
        .get(configuration)
        .ok_or_else(|| ConfigError::MissingReference {
            kind: "configuration",
            name: configuration.to_string(),
        })?;
    let mut registry = MetadataRegistry::new();
    load_driver(odm, &conf.driver, None, reader, &conf.annotations, &mut registry, 0)?;
    tracing::info!(configuration = %configuration, classes = registry.len(), "metadata loaded");
    Ok(registry)
}

fn load_driver(
    odm: &OdmConfig,
    name: &str,
    namespace: Option<&str>,
    reader: &AnnotationReader,
    annotations: &BTreeMap<String, String>,
    registry: &mut MetadataRegistry,
    depth: usize,
) -> Result<(), ConfigError> {
    if depth > MAX_DRIVER_DEPTH {
        return Err(ConfigError::Validation(format!("driver chain through '{}' is too deep", name)));
    }
    let driver = odm.driver.get(name).ok_or_else(|| ConfigError::MissingReference {
        kind: "driver",
        name: name.to_string(),
    })?;
    match driver.class {
        DriverClass::Chain => {
            for (ns, sub) in &driver.drivers {
                load_driver(odm, sub, Some(ns), reader, annotations, registry, depth + 1)?;
            }
        }
        DriverClass::Annotation => {
            for path in &driver.paths {
                for mapping in reader.read_path(Path::new(path))?.iter() {
                    if let Some(ns) = namespace {
                        if !mapping.class.starts_with(ns) {
                            tracing::debug!(class = %mapping.class, namespace = %ns, "class outside driver namespace, skipping");
                            continue;
                        }
                    }
                    let mut mapping = mapping.clone();
                    for field in &mut mapping.fields {
                        field.annotations = reader.filter_annotations(&field.annotations, annotations, &mapping.class);
                    }
                    registry.register(ClassMetadata::from_mapping(mapping));
                }
            }
        }
    }
    Ok(())
}
