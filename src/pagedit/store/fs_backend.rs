use super::backend::StorageBackend;
use crate::error::{EditError, Result};
use crate::model::{Resource, ResourceHeader};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const CONTENT_DIR: &str = "content";
const META_DIR: &str = "meta";
const META_EXT: &str = "json";

/// Filesystem backend.
///
/// ```text
/// <root>/
/// ├── content/a/page.html      # raw resource bytes
/// └── meta/a/page.html.json    # ResourceHeader (project, lock, mode, properties)
/// ```
///
/// The metadata file is the source of truth for existence: content without
/// metadata is ignored.
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relative(path: &str) -> Result<PathBuf> {
        let trimmed = path
            .strip_prefix('/')
            .ok_or_else(|| EditError::Store(format!("Resource path must be absolute: {}", path)))?;
        let mut rel = PathBuf::new();
        for segment in trimmed.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(EditError::Store(format!("Invalid resource path: {}", path)));
            }
            rel.push(segment);
        }
        Ok(rel)
    }

    fn content_file(&self, path: &str) -> Result<PathBuf> {
        Ok(self.root.join(CONTENT_DIR).join(Self::relative(path)?))
    }

    fn meta_file(&self, path: &str) -> Result<PathBuf> {
        let mut meta = self.root.join(META_DIR).join(Self::relative(path)?);
        let name = meta
            .file_name()
            .map(|n| format!("{}.{}", n.to_string_lossy(), META_EXT))
            .ok_or_else(|| EditError::Store(format!("Invalid resource path: {}", path)))?;
        meta.set_file_name(name);
        Ok(meta)
    }

    fn ensure_parent(&self, file: &Path) -> Result<()> {
        if let Some(parent) = file.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(EditError::Io)?;
            }
        }
        Ok(())
    }

    fn write_atomic(&self, file: &Path, bytes: &[u8]) -> Result<()> {
        self.ensure_parent(file)?;
        let dir = file.parent().unwrap_or(&self.root);
        let tmp_file = dir.join(format!(".pagedit-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_file, bytes).map_err(EditError::Io)?;
        fs::rename(&tmp_file, file).map_err(EditError::Io)?;
        Ok(())
    }

    fn collect_paths(dir: &Path, prefix: &str, out: &mut Vec<String>) -> Result<()> {
        for entry in fs::read_dir(dir).map_err(EditError::Io)? {
            let entry = entry.map_err(EditError::Io)?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type().map_err(EditError::Io)?;
            if file_type.is_dir() {
                Self::collect_paths(&entry.path(), &format!("{}/{}", prefix, name), out)?;
            } else if let Some(stem) = name.strip_suffix(&format!(".{}", META_EXT)) {
                if !stem.starts_with('.') {
                    out.push(format!("{}/{}", prefix, stem));
                }
            }
        }
        Ok(())
    }
}

impl StorageBackend for FsBackend {
    fn load_header(&self, path: &str) -> Result<Option<ResourceHeader>> {
        let meta_file = self.meta_file(path)?;
        if !meta_file.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(meta_file).map_err(EditError::Io)?;
        let header: ResourceHeader = serde_json::from_str(&raw).map_err(EditError::Serialization)?;
        Ok(Some(header))
    }

    fn load(&self, path: &str) -> Result<Option<Resource>> {
        let Some(header) = self.load_header(path)? else {
            return Ok(None);
        };
        let content_file = self.content_file(path)?;
        let content = if content_file.exists() {
            fs::read(content_file).map_err(EditError::Io)?
        } else {
            Vec::new()
        };
        Ok(Some(Resource { header, content }))
    }

    fn save_header(&self, header: &ResourceHeader) -> Result<()> {
        let raw = serde_json::to_string_pretty(header).map_err(EditError::Serialization)?;
        self.write_atomic(&self.meta_file(&header.path)?, raw.as_bytes())
    }

    fn save(&self, resource: &Resource) -> Result<()> {
        // Content first: a crash in between leaves an ignored content file,
        // never metadata pointing at missing bytes.
        self.write_atomic(&self.content_file(resource.path())?, &resource.content)?;
        self.save_header(&resource.header)
    }

    fn remove(&self, path: &str) -> Result<()> {
        let meta_file = self.meta_file(path)?;
        if meta_file.exists() {
            fs::remove_file(meta_file).map_err(EditError::Io)?;
        }
        let content_file = self.content_file(path)?;
        if content_file.exists() {
            fs::remove_file(content_file).map_err(EditError::Io)?;
        }
        Ok(())
    }

    fn list_paths(&self) -> Result<Vec<String>> {
        let meta_root = self.root.join(META_DIR);
        let mut paths = Vec::new();
        if meta_root.exists() {
            Self::collect_paths(&meta_root, "", &mut paths)?;
        }
        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_relative_and_dotted_paths() {
        assert!(FsBackend::relative("a/b").is_err());
        assert!(FsBackend::relative("/a/../b").is_err());
        assert!(FsBackend::relative("/a//b").is_err());
        assert_eq!(
            FsBackend::relative("/a/b.html").unwrap(),
            PathBuf::from("a").join("b.html")
        );
    }
}
