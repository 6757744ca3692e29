pub mod models;


use anyhow::{anyhow, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub use models::*;

/// Episode store. Rows are written only by the importer; every other caller
/// reads.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        // Enable WAL mode for concurrent reads
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA cache_size=10000;
            PRAGMA temp_store=MEMORY;
        ",
        )?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.init_schema()?;

        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS episodes (
                ep_id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                air_date INTEGER NOT NULL,
                episode TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS characters (
                ch_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );

            -- Many-to-many: which characters appear in which episode
            CREATE TABLE IF NOT EXISTS episode_characters (
                ep_id INTEGER NOT NULL,
                ch_id INTEGER NOT NULL,
                PRIMARY KEY (ep_id, ch_id)
            );

            CREATE INDEX IF NOT EXISTS idx_episode_characters_character
                ON episode_characters(ch_id);
        "#,
        )?;
        Ok(())
    }

    // =========================================================================
    // Import (write path)
    // =========================================================================

    /// Insert episodes, skipping ids already present. Returns how many rows
    /// were new.
    pub fn insert_episodes(&self, episodes: &[Episode]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO episodes (ep_id, title, air_date, episode) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for ep in episodes {
                inserted += stmt.execute(params![ep.id, ep.title, ep.air_date, ep.episode_code])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn insert_characters(&self, characters: &[Character]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt =
                tx.prepare("INSERT OR IGNORE INTO characters (ch_id, name) VALUES (?1, ?2)")?;
            for ch in characters {
                inserted += stmt.execute(params![ch.id, ch.name])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn insert_links(&self, links: &[EpisodeCharacterLink]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO episode_characters (ep_id, ch_id) VALUES (?1, ?2)",
            )?;
            for link in links {
                inserted += stmt.execute(params![link.episode_id, link.character_id])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Every episode in the requested order. Filtering happens in the query
    /// layer.
    pub fn get_all_episodes(&self, order: OrderSpec) -> Result<Vec<Episode>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT ep_id, title, air_date, episode FROM episodes ORDER BY {}",
            order.sql_order_by()
        );
        let mut stmt = conn.prepare(&sql)?;
        let episodes = stmt
            .query_map([], |row| {
                Ok(Episode {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    air_date: row.get(2)?,
                    episode_code: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(episodes)
    }

    /// Characters linked to one episode, ordered by character id. Unknown
    /// episode ids simply have no links.
    pub fn get_episode_characters(&self, episode_id: i64) -> Result<Vec<Character>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT c.ch_id, c.name
               FROM episode_characters ec
               JOIN characters c ON c.ch_id = ec.ch_id
               WHERE ec.ep_id = ?1
               ORDER BY c.ch_id"#,
        )?;
        let characters = stmt
            .query_map([episode_id], |row| {
                Ok(Character {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(characters)
    }

    pub fn get_stats(&self) -> Result<CatalogStats> {
        let conn = self.conn()?;
        let episodes: i64 = conn.query_row("SELECT COUNT(*) FROM episodes", [], |r| r.get(0))?;
        let characters: i64 =
            conn.query_row("SELECT COUNT(*) FROM characters", [], |r| r.get(0))?;
        let links: i64 =
            conn.query_row("SELECT COUNT(*) FROM episode_characters", [], |r| r.get(0))?;
        Ok(CatalogStats {
            episodes,
            characters,
            links,
        })
    }
}
