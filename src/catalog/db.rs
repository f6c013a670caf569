use std::str::FromStr;
use std::time::Duration;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use super::types::{ArticleRecord, CatalogError, NewArticle, NewPublication, PublicationRecord};

// ============================================================================
// Catalog
// ============================================================================

/// Durable index of everything the library holds. Backed by SQLite; open
/// with `":memory:"` for tests.
#[derive(Clone)]
pub struct Catalog {
    pool: SqlitePool,
}

impl Catalog {
    /// Open the catalog and bring the schema up to date.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Locked`] when another process holds the database,
    /// [`CatalogError::Migration`] when the schema cannot be created.
    pub async fn open(path: &str) -> Result<Self, CatalogError> {
        let url = format!("sqlite:{path}?mode=rwc");

        // busy_timeout=5000: wait up to 5s for a lock to clear before
        // reporting SQLITE_BUSY. Set via pragma so every pooled connection
        // inherits it.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(CatalogError::from_sqlx)?
            .pragma("busy_timeout", "5000");

        // SQLite is single-writer; ingestion is sequential, so 5 connections
        // comfortably covers the catalog plus any concurrent reader.
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(CatalogError::from_sqlx)?;

        let catalog = Self { pool };
        catalog.migrate().await.map_err(|e| match CatalogError::from_sqlx(e) {
            CatalogError::Locked => CatalogError::Locked,
            other => CatalogError::Migration(other.to_string()),
        })?;
        Ok(catalog)
    }

    /// Run schema migrations atomically within a transaction. Every step is
    /// `IF NOT EXISTS`, so re-running on an existing catalog is a no-op.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        // Per-connection setting, must run outside the transaction
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&self.pool)
            .await?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS publications (
                id INTEGER PRIMARY KEY,
                slug TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                feed_url TEXT NOT NULL,
                url TEXT,
                author TEXT,
                created_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY,
                publication_id INTEGER NOT NULL REFERENCES publications(id) ON DELETE CASCADE,
                slug TEXT NOT NULL,
                title TEXT NOT NULL,
                url TEXT UNIQUE NOT NULL,
                published INTEGER,
                author TEXT,
                word_count INTEGER NOT NULL,
                read_time_minutes INTEGER NOT NULL,
                stored_path TEXT NOT NULL,
                ingested_at INTEGER NOT NULL,
                UNIQUE(publication_id, slug)
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS article_links (
                id INTEGER PRIMARY KEY,
                article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
                url TEXT NOT NULL,
                UNIQUE(article_id, url)
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_articles_publication ON articles(publication_id)",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_articles_published ON articles(published DESC)",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_article_links_article ON article_links(article_id)",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    // ========================================================================
    // Publication Operations
    // ========================================================================

    /// Look up a publication by its slug.
    pub async fn publication_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<PublicationRecord>, CatalogError> {
        let record = sqlx::query_as::<_, PublicationRecord>(
            r#"
            SELECT id, slug, name, feed_url, url, author, created_at
            FROM publications
            WHERE slug = ?
        "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Insert a publication, refreshing its metadata if the slug is already
    /// cataloged. `created_at` is preserved on conflict.
    pub async fn create_publication(
        &self,
        publication: &NewPublication,
    ) -> Result<PublicationRecord, CatalogError> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO publications (slug, name, feed_url, url, author, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(slug) DO UPDATE SET
                name = excluded.name,
                feed_url = excluded.feed_url,
                url = excluded.url,
                author = excluded.author
        "#,
        )
        .bind(&publication.slug)
        .bind(&publication.name)
        .bind(&publication.feed_url)
        .bind(&publication.url)
        .bind(&publication.author)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let record = sqlx::query_as::<_, PublicationRecord>(
            r#"
            SELECT id, slug, name, feed_url, url, author, created_at
            FROM publications
            WHERE slug = ?
        "#,
        )
        .bind(&publication.slug)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    // ========================================================================
    // Article Operations
    // ========================================================================

    /// Look up an article by its canonical URL.
    pub async fn article_by_url(&self, url: &str) -> Result<Option<ArticleRecord>, CatalogError> {
        let record = sqlx::query_as::<_, ArticleRecord>(
            r#"
            SELECT id, publication_id, slug, title, url, published, author,
                   word_count, read_time_minutes, stored_path, ingested_at
            FROM articles
            WHERE url = ?
        "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Insert an article, refreshing its metadata if the URL is already
    /// cataloged. `ingested_at` tracks the most recent store.
    pub async fn create_article(
        &self,
        article: &NewArticle,
    ) -> Result<ArticleRecord, CatalogError> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO articles (publication_id, slug, title, url, published, author,
                                  word_count, read_time_minutes, stored_path, ingested_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                published = excluded.published,
                author = excluded.author,
                word_count = excluded.word_count,
                read_time_minutes = excluded.read_time_minutes,
                stored_path = excluded.stored_path,
                ingested_at = excluded.ingested_at
        "#,
        )
        .bind(article.publication_id)
        .bind(&article.slug)
        .bind(&article.title)
        .bind(&article.url)
        .bind(article.published)
        .bind(&article.author)
        .bind(article.word_count)
        .bind(article.read_time_minutes)
        .bind(&article.stored_path)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let record = sqlx::query_as::<_, ArticleRecord>(
            r#"
            SELECT id, publication_id, slug, title, url, published, author,
                   word_count, read_time_minutes, stored_path, ingested_at
            FROM articles
            WHERE url = ?
        "#,
        )
        .bind(&article.url)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    // ========================================================================
    // Link Operations
    // ========================================================================

    /// Record outbound links for an article, returning how many were new.
    /// Re-recording a known link is a no-op.
    pub async fn add_article_links(
        &self,
        article_id: i64,
        urls: &[String],
    ) -> Result<usize, CatalogError> {
        let mut added = 0;

        for url in urls {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO article_links (article_id, url) VALUES (?, ?)",
            )
            .bind(article_id)
            .bind(url)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() > 0 {
                added += 1;
            }
        }

        Ok(added)
    }

    /// All recorded links for an article, in insertion order.
    pub async fn article_links(&self, article_id: i64) -> Result<Vec<String>, CatalogError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT url FROM article_links WHERE article_id = ? ORDER BY id")
                .bind(article_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(url,)| url).collect())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_catalog() -> Catalog {
        Catalog::open(":memory:").await.unwrap()
    }

    fn test_publication(slug: &str) -> NewPublication {
        NewPublication {
            slug: slug.to_string(),
            name: "Example Letters".to_string(),
            feed_url: format!("https://{slug}.substack.com/feed"),
            url: Some(format!("https://{slug}.substack.com")),
            author: None,
        }
    }

    fn test_article(publication_id: i64, slug: &str, url: &str) -> NewArticle {
        NewArticle {
            publication_id,
            slug: slug.to_string(),
            title: slug.to_string(),
            url: url.to_string(),
            published: Some(1_709_640_000),
            author: Some("A. Writer".to_string()),
            word_count: 900,
            read_time_minutes: 5,
            stored_path: format!("library/pub/{slug}.md"),
        }
    }

    #[tokio::test]
    async fn test_publication_round_trip() {
        let catalog = test_catalog().await;

        assert!(catalog.publication_by_slug("letters").await.unwrap().is_none());

        let created = catalog
            .create_publication(&test_publication("letters"))
            .await
            .unwrap();
        assert_eq!(created.slug, "letters");
        assert!(created.created_at > 0);

        let found = catalog
            .publication_by_slug("letters")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.name, "Example Letters");
    }

    #[tokio::test]
    async fn test_recreating_publication_keeps_id_and_created_at() {
        let catalog = test_catalog().await;

        let first = catalog
            .create_publication(&test_publication("letters"))
            .await
            .unwrap();

        let mut updated = test_publication("letters");
        updated.name = "Renamed Letters".to_string();
        let second = catalog.create_publication(&updated).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.name, "Renamed Letters");
    }

    #[tokio::test]
    async fn test_article_round_trip() {
        let catalog = test_catalog().await;
        let publication = catalog
            .create_publication(&test_publication("letters"))
            .await
            .unwrap();

        let url = "https://letters.substack.com/p/first";
        assert!(catalog.article_by_url(url).await.unwrap().is_none());

        let created = catalog
            .create_article(&test_article(publication.id, "first", url))
            .await
            .unwrap();
        assert_eq!(created.publication_id, publication.id);
        assert_eq!(created.word_count, 900);

        let found = catalog.article_by_url(url).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.stored_path, "library/pub/first.md");
    }

    #[tokio::test]
    async fn test_article_url_is_deduplicated() {
        let catalog = test_catalog().await;
        let publication = catalog
            .create_publication(&test_publication("letters"))
            .await
            .unwrap();

        let url = "https://letters.substack.com/p/first";
        let first = catalog
            .create_article(&test_article(publication.id, "first", url))
            .await
            .unwrap();

        let mut revised = test_article(publication.id, "first", url);
        revised.word_count = 1200;
        let second = catalog.create_article(&revised).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.word_count, 1200);
    }

    #[tokio::test]
    async fn test_add_article_links_counts_new_only() {
        let catalog = test_catalog().await;
        let publication = catalog
            .create_publication(&test_publication("letters"))
            .await
            .unwrap();
        let article = catalog
            .create_article(&test_article(
                publication.id,
                "first",
                "https://letters.substack.com/p/first",
            ))
            .await
            .unwrap();

        let links = vec![
            "https://example.com/a".to_string(),
            "https://example.com/b".to_string(),
        ];
        assert_eq!(catalog.add_article_links(article.id, &links).await.unwrap(), 2);
        assert_eq!(catalog.add_article_links(article.id, &links).await.unwrap(), 0);

        let mut more = links.clone();
        more.push("https://example.com/c".to_string());
        assert_eq!(catalog.add_article_links(article.id, &more).await.unwrap(), 1);

        let recorded = catalog.article_links(article.id).await.unwrap();
        assert_eq!(recorded.len(), 3);
        assert_eq!(recorded[0], "https://example.com/a");
    }
}
