//! Seed the knowledge corpus from a TOML file.
//!
//! Each entry is embedded as `"{question}\n{answer}"` and upserted by
//! question. A provider failure aborts the run: a partially embedded
//! corpus is worse than a loud error during seeding.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::inference::TextEmbedder;
use crate::models::KnowledgeDocument;
use crate::store::KnowledgeStore;
use crate::RaglineError;
use crate::Result;

/// A seed corpus: `[[document]]` tables with question/answer/comment.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(rename = "document", default)]
    pub documents: Vec<SeedEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub comment: Option<String>,
}

impl SeedFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: SeedFile = toml::from_str(&content)?;
        Ok(file)
    }

    /// Load `seeds.toml`, falling back to `seeds.example.toml`.
    pub fn load() -> Result<Self> {
        if Path::new("seeds.toml").exists() {
            Self::from_file("seeds.toml")
        } else if Path::new("seeds.example.toml").exists() {
            info!("Using seeds.example.toml. Create seeds.toml for your own corpus.");
            Self::from_file("seeds.example.toml")
        } else {
            Err(RaglineError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No seed file found. Create seeds.toml or seeds.example.toml",
            )))
        }
    }
}

/// Counts from a completed seeding run.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeedReport {
    pub inserted: usize,
    pub updated: usize,
}

/// Embed and upsert every entry, reporting inserted vs updated counts.
pub async fn run_seed(
    store: &KnowledgeStore,
    embedder: &dyn TextEmbedder,
    seeds: &SeedFile,
) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for entry in &seeds.documents {
        let embedding = embedder
            .embed(&format!("{}\n{}", entry.question, entry.answer))
            .await?;

        let existing = store.find_by_question(&entry.question).await?;
        let doc = KnowledgeDocument {
            question: entry.question.clone(),
            answer: entry.answer.clone(),
            comment: entry.comment.clone(),
            embedding,
        };
        store.upsert(&doc).await?;

        if existing.is_some() {
            report.updated += 1;
            info!("Updated: {} (embeddingLen={})", doc.question, doc.embedding.len());
        } else {
            report.inserted += 1;
            info!("Inserted: {} (embeddingLen={})", doc.question, doc.embedding.len());
        }
    }

    info!(
        "Seeding complete - inserted {}, updated {} knowledge docs",
        report.inserted, report.updated
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed_file() {
        let toml_str = r#"
            [[document]]
            question = "Who are you?"
            answer = "A retrieval-augmented assistant."
            comment = "identity"

            [[document]]
            question = "What can you do?"
            answer = "Answer questions using a curated knowledge corpus."
        "#;

        let file: SeedFile = toml::from_str(toml_str).unwrap();
        assert_eq!(file.documents.len(), 2);
        assert_eq!(file.documents[0].comment.as_deref(), Some("identity"));
        assert!(file.documents[1].comment.is_none());
    }

    #[test]
    fn test_empty_seed_file_is_valid() {
        let file: SeedFile = toml::from_str("").unwrap();
        assert!(file.documents.is_empty());
    }

    #[test]
    fn test_from_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seeds.toml");
        std::fs::write(
            &path,
            "[[document]]\nquestion = \"q\"\nanswer = \"a\"\n",
        )
        .unwrap();

        let file = SeedFile::from_file(&path).unwrap();
        assert_eq!(file.documents.len(), 1);
        assert_eq!(file.documents[0].question, "q");
    }
}
