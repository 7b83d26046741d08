use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use crate::model::{Article, ArticleTable, Chapter, CrossReference, FileAttachment, Subtopic, Topic};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, PersistenceError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// The key already existed; the stored row was left untouched.
    Ignored,
}

impl UpsertOutcome {
    fn from_changed_rows(changed: usize) -> Self {
        if changed == 0 {
            Self::Ignored
        } else {
            Self::Inserted
        }
    }
}

/// Keyed, insert-or-ignore persistence for every entity the pipeline produces.
pub trait Store {
    fn upsert_topic(&self, topic: &Topic) -> StoreResult<UpsertOutcome>;
    fn upsert_subtopic(&self, subtopic: &Subtopic) -> StoreResult<UpsertOutcome>;
    fn upsert_chapter(&self, chapter: &Chapter) -> StoreResult<UpsertOutcome>;
    fn upsert_article(&self, article: &Article) -> StoreResult<UpsertOutcome>;
    fn upsert_table(&self, table: &ArticleTable) -> StoreResult<UpsertOutcome>;
    fn upsert_file(&self, file: &FileAttachment) -> StoreResult<UpsertOutcome>;
    fn upsert_cross_reference(&self, reference: &CrossReference) -> StoreResult<UpsertOutcome>;

    fn topic_exists(&self, id: &str) -> StoreResult<bool>;
    fn subtopic_exists(&self, id: &str) -> StoreResult<bool>;
    fn article_exists(&self, code: &str) -> StoreResult<bool>;
}

pub struct SqliteStore<'c> {
    connection: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(connection: &'c Connection) -> Self {
        Self { connection }
    }

    fn exists(&self, sql: &str, key: &str) -> StoreResult<bool> {
        let mut statement = self.connection.prepare_cached(sql)?;
        let found = statement
            .query_row([key], |row| row.get::<_, i64>(0))
            .optional()?;
        Ok(found.is_some())
    }
}

impl Store for SqliteStore<'_> {
    fn upsert_topic(&self, topic: &Topic) -> StoreResult<UpsertOutcome> {
        let mut statement = self.connection.prepare_cached(
            "
            INSERT INTO topics(id, name, ordinal)
            VALUES(?1, ?2, ?3)
            ON CONFLICT(id) DO NOTHING
            ",
        )?;
        let changed = statement.execute(params![&topic.id, &topic.name, topic.ordinal])?;
        Ok(UpsertOutcome::from_changed_rows(changed))
    }

    fn upsert_subtopic(&self, subtopic: &Subtopic) -> StoreResult<UpsertOutcome> {
        let mut statement = self.connection.prepare_cached(
            "
            INSERT INTO subtopics(id, name, ordinal, topic_id)
            VALUES(?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO NOTHING
            ",
        )?;
        let changed = statement.execute(params![
            &subtopic.id,
            &subtopic.name,
            subtopic.ordinal,
            subtopic.topic_id.as_deref()
        ])?;
        Ok(UpsertOutcome::from_changed_rows(changed))
    }

    fn upsert_chapter(&self, chapter: &Chapter) -> StoreResult<UpsertOutcome> {
        let mut statement = self.connection.prepare_cached(
            "
            INSERT INTO chapters(code, name, subtopic_id, index_label, ordinal, placeholder)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(code) DO NOTHING
            ",
        )?;
        let changed = statement.execute(params![
            &chapter.code,
            &chapter.name,
            &chapter.subtopic_id,
            &chapter.index_label,
            chapter.ordinal,
            chapter.placeholder
        ])?;
        Ok(UpsertOutcome::from_changed_rows(changed))
    }

    fn upsert_article(&self, article: &Article) -> StoreResult<UpsertOutcome> {
        let mut statement = self.connection.prepare_cached(
            "
            INSERT INTO articles(
              code, name, subtopic_id, chapter_id, topic_id, content, index_label,
              external_reference_text, external_reference_link, ordinal
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(code) DO NOTHING
            ",
        )?;
        let changed = statement.execute(params![
            &article.code,
            &article.name,
            &article.subtopic_id,
            &article.chapter_id,
            &article.topic_id,
            &article.content,
            article.index_label,
            &article.external_reference_text,
            article.external_reference_link.as_deref(),
            article.ordinal
        ])?;
        Ok(UpsertOutcome::from_changed_rows(changed))
    }

    fn upsert_table(&self, table: &ArticleTable) -> StoreResult<UpsertOutcome> {
        let mut statement = self.connection.prepare_cached(
            "
            INSERT INTO article_tables(article_code, ordinal, markup)
            VALUES(?1, ?2, ?3)
            ON CONFLICT(article_code, ordinal) DO NOTHING
            ",
        )?;
        let changed =
            statement.execute(params![&table.article_code, table.ordinal, &table.markup])?;
        Ok(UpsertOutcome::from_changed_rows(changed))
    }

    fn upsert_file(&self, file: &FileAttachment) -> StoreResult<UpsertOutcome> {
        let mut statement = self.connection.prepare_cached(
            "
            INSERT INTO article_files(article_code, link, local_path)
            VALUES(?1, ?2, ?3)
            ON CONFLICT(article_code, link) DO NOTHING
            ",
        )?;
        let changed = statement.execute(params![&file.article_code, &file.link, &file.local_path])?;
        Ok(UpsertOutcome::from_changed_rows(changed))
    }

    fn upsert_cross_reference(&self, reference: &CrossReference) -> StoreResult<UpsertOutcome> {
        let mut statement = self.connection.prepare_cached(
            "
            INSERT INTO cross_references(article_code_a, article_code_b)
            VALUES(?1, ?2)
            ON CONFLICT(article_code_a, article_code_b) DO NOTHING
            ",
        )?;
        let changed =
            statement.execute(params![&reference.article_code_a, &reference.article_code_b])?;
        Ok(UpsertOutcome::from_changed_rows(changed))
    }

    fn topic_exists(&self, id: &str) -> StoreResult<bool> {
        self.exists("SELECT 1 FROM topics WHERE id = ?1", id)
    }

    fn subtopic_exists(&self, id: &str) -> StoreResult<bool> {
        self.exists("SELECT 1 FROM subtopics WHERE id = ?1", id)
    }

    fn article_exists(&self, code: &str) -> StoreResult<bool> {
        self.exists("SELECT 1 FROM articles WHERE code = ?1", code)
    }
}
