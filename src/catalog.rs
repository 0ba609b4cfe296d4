use anyhow::{Context, Result};
use facematch_core::{Embedding, Reference};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CATALOG_FILE: &str = "references.bin";

/// One gallery entry: a named image and the embedding computed from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    pub name: String,
    pub url: String,
    pub embedding: Vec<f32>,
}

impl ImageRecord {
    pub fn to_reference(&self) -> Result<Reference> {
        let embedding = Embedding::new(self.embedding.clone())
            .with_context(|| format!("record {} ({})", self.id, self.name))?;
        Ok(Reference::new(&self.name, embedding, &self.url))
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        anyhow::bail!("name must not be empty");
    }
    Ok(())
}

/// Reference catalog stored as a single postcard file inside `dir`
#[derive(Debug, Clone)]
pub struct Catalog {
    dir: PathBuf,
}

impl Catalog {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file(&self) -> PathBuf {
        self.dir.join(CATALOG_FILE)
    }

    pub fn list(&self) -> Result<Vec<ImageRecord>> {
        let file = self.file();

        if !file.exists() {
            return Ok(vec![]);
        }

        let data =
            std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
        postcard::from_bytes(&data).with_context(|| format!("decoding {}", file.display()))
    }

    fn write(&self, records: &[ImageRecord]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let file = self.file();
        let data = postcard::to_allocvec(records)?;
        std::fs::write(&file, data).with_context(|| format!("writing {}", file.display()))?;
        Ok(())
    }

    pub fn add(&self, name: &str, url: &str, embedding: Vec<f32>) -> Result<ImageRecord> {
        check_name(name)?;
        if url.trim().is_empty() {
            anyhow::bail!("refusing to add {}: url is empty", name);
        }
        if embedding.is_empty() {
            anyhow::bail!("refusing to add {}: embedding is empty", name);
        }
        let record = ImageRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            url: url.to_string(),
            embedding,
        };
        let mut records = self.list()?;
        records.push(record.clone());
        self.write(&records)?;
        debug!("catalog now holds {} record(s)", records.len());
        Ok(record)
    }

    /// Change the name of a record. Returns `false` when `id` is not present.
    pub fn rename(&self, id: &str, name: &str) -> Result<bool> {
        check_name(name)?;
        let mut records = self.list()?;
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        record.name = name.to_string();
        self.write(&records)?;
        Ok(true)
    }

    /// Delete a record. Returns `false` when `id` is not present.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let mut records = self.list()?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.write(&records)?;
        Ok(true)
    }

    pub fn purge(&self) -> Result<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)
                .with_context(|| format!("removing {}", self.dir.display()))?;
        }
        Ok(())
    }

    /// Current records as matcher references, in insertion order
    pub fn references(&self) -> Result<Vec<Reference>> {
        self.list()?.iter().map(ImageRecord::to_reference).collect()
    }
}
