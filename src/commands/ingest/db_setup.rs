use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::util::now_utc_string;

pub const DB_SCHEMA_VERSION: &str = "0.1.0";

pub fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign_keys")?;
    Ok(())
}

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS topics (
          id TEXT PRIMARY KEY,
          name TEXT NOT NULL,
          ordinal INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS subtopics (
          id TEXT PRIMARY KEY,
          name TEXT NOT NULL,
          ordinal INTEGER NOT NULL DEFAULT 0,
          topic_id TEXT,
          FOREIGN KEY(topic_id) REFERENCES topics(id)
        );

        CREATE TABLE IF NOT EXISTS chapters (
          code TEXT PRIMARY KEY,
          name TEXT NOT NULL,
          subtopic_id TEXT NOT NULL,
          index_label TEXT NOT NULL,
          ordinal INTEGER NOT NULL DEFAULT 0,
          placeholder INTEGER NOT NULL DEFAULT 0,
          FOREIGN KEY(subtopic_id) REFERENCES subtopics(id)
        );

        CREATE TABLE IF NOT EXISTS articles (
          code TEXT PRIMARY KEY,
          name TEXT NOT NULL,
          subtopic_id TEXT NOT NULL,
          chapter_id TEXT NOT NULL,
          topic_id TEXT NOT NULL,
          content TEXT NOT NULL,
          index_label INTEGER NOT NULL DEFAULT 0,
          external_reference_text TEXT NOT NULL,
          external_reference_link TEXT,
          ordinal INTEGER NOT NULL DEFAULT 0,
          FOREIGN KEY(subtopic_id) REFERENCES subtopics(id),
          FOREIGN KEY(chapter_id) REFERENCES chapters(code),
          FOREIGN KEY(topic_id) REFERENCES topics(id)
        );

        CREATE TABLE IF NOT EXISTS article_tables (
          article_code TEXT NOT NULL,
          ordinal INTEGER NOT NULL,
          markup TEXT NOT NULL,
          PRIMARY KEY (article_code, ordinal),
          FOREIGN KEY(article_code) REFERENCES articles(code)
        );

        CREATE TABLE IF NOT EXISTS article_files (
          article_code TEXT NOT NULL,
          link TEXT NOT NULL,
          local_path TEXT NOT NULL DEFAULT '',
          PRIMARY KEY (article_code, link),
          FOREIGN KEY(article_code) REFERENCES articles(code)
        );

        CREATE TABLE IF NOT EXISTS cross_references (
          article_code_a TEXT NOT NULL,
          article_code_b TEXT NOT NULL,
          PRIMARY KEY (article_code_a, article_code_b),
          FOREIGN KEY(article_code_a) REFERENCES articles(code),
          FOREIGN KEY(article_code_b) REFERENCES articles(code)
        );

        CREATE INDEX IF NOT EXISTS idx_subtopics_topic ON subtopics(topic_id);
        CREATE INDEX IF NOT EXISTS idx_chapters_subtopic ON chapters(subtopic_id);
        CREATE INDEX IF NOT EXISTS idx_articles_subtopic_ordinal ON articles(subtopic_id, ordinal);
        CREATE INDEX IF NOT EXISTS idx_articles_chapter ON articles(chapter_id);
        ",
        )
        .context("failed to create schema")?;

    let now = now_utc_string();
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now],
    )?;

    Ok(())
}

/// Drops every pipeline table, children first, so `ensure_schema` starts from nothing.
pub fn reset_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
        DROP TABLE IF EXISTS cross_references;
        DROP TABLE IF EXISTS article_tables;
        DROP TABLE IF EXISTS article_files;
        DROP TABLE IF EXISTS articles;
        DROP TABLE IF EXISTS chapters;
        DROP TABLE IF EXISTS subtopics;
        DROP TABLE IF EXISTS topics;
        ",
        )
        .context("failed to drop existing tables")?;
    Ok(())
}
