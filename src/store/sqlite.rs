//! SQLite 实现（sqlx 异步连接池）

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use crate::core::PipelineError;
use crate::prompts::Prompt;
use crate::store::{
    ApiCall, BestSelection, IterationRecord, IterationStatus, PipelineStore, PromptRunStatus,
    PromptStatusRecord, RefinedPromptRecord, VariantRecord, SCHEMA_VERSION,
};

const TABLES: [&str; 8] = [
    "version_info",
    "prompts",
    "iterations",
    "generated_images",
    "best_images",
    "refined_prompts",
    "prompt_status",
    "api_calls",
];

const SCHEMA: [&str; 12] = [
    "CREATE TABLE IF NOT EXISTS version_info (
        version TEXT PRIMARY KEY,
        applied_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS prompts (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        scene TEXT NOT NULL,
        mood TEXT NOT NULL,
        prompt TEXT NOT NULL,
        model TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS iterations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        prompt_id TEXT NOT NULL,
        iteration INTEGER NOT NULL,
        image_path TEXT,
        prompt_text TEXT NOT NULL,
        evaluation TEXT,
        score REAL,
        status TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE(prompt_id, iteration)
    )",
    "CREATE TABLE IF NOT EXISTS generated_images (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        prompt_id TEXT NOT NULL,
        iteration INTEGER NOT NULL,
        variant INTEGER NOT NULL,
        image_path TEXT NOT NULL,
        description TEXT,
        score REAL,
        passed INTEGER NOT NULL DEFAULT 0,
        needs_refinement INTEGER NOT NULL DEFAULT 1,
        feedback TEXT,
        created_at TEXT NOT NULL,
        UNIQUE(prompt_id, iteration, variant)
    )",
    "CREATE TABLE IF NOT EXISTS best_images (
        prompt_id TEXT NOT NULL,
        iteration INTEGER NOT NULL,
        image_id INTEGER NOT NULL,
        variant INTEGER NOT NULL,
        image_path TEXT NOT NULL,
        score REAL NOT NULL,
        selected_at TEXT NOT NULL,
        PRIMARY KEY (prompt_id, iteration)
    )",
    "CREATE TABLE IF NOT EXISTS refined_prompts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        original_prompt_id TEXT NOT NULL,
        iteration INTEGER NOT NULL,
        refined_text TEXT NOT NULL,
        evaluation_text TEXT NOT NULL,
        needs_refinement INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE(original_prompt_id, iteration)
    )",
    "CREATE TABLE IF NOT EXISTS prompt_status (
        prompt_id TEXT PRIMARY KEY,
        current_iteration INTEGER NOT NULL,
        status TEXT NOT NULL,
        last_updated TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS api_calls (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        api_name TEXT NOT NULL,
        endpoint TEXT NOT NULL,
        status TEXT NOT NULL,
        error TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_iterations_prompt ON iterations(prompt_id)",
    "CREATE INDEX IF NOT EXISTS idx_images_prompt_iter ON generated_images(prompt_id, iteration)",
    "CREATE INDEX IF NOT EXISTS idx_status_status ON prompt_status(status)",
    "CREATE INDEX IF NOT EXISTS idx_api_calls_name ON api_calls(api_name)",
];

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// sqlx 连接池上的 PipelineStore
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// 打开（不存在则创建）数据库文件并建表
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        let store = Self { pool };
        store.init_tables().await?;
        tracing::info!("Opened database {}", db_path.display());
        Ok(store)
    }

    /// 内存数据库（测试与 --dry-run）；单连接且不过期，否则连接回收后数据丢失
    pub async fn in_memory() -> Result<Self, PipelineError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.init_tables().await?;
        Ok(store)
    }

    async fn init_tables(&self) -> Result<(), PipelineError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        sqlx::query("INSERT OR IGNORE INTO version_info (version, applied_at) VALUES (?, ?)")
            .bind(SCHEMA_VERSION)
            .bind(now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn schema_version(&self) -> Result<Option<String>, PipelineError> {
        let row = sqlx::query("SELECT version FROM version_info ORDER BY applied_at DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("version")))
    }

    /// 返回缺失的表名（空表示结构完整）
    pub async fn verify(&self) -> Result<Vec<String>, PipelineError> {
        let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(&self.pool)
            .await?;
        let existing: Vec<String> = rows.iter().map(|r| r.get("name")).collect();
        let missing: Vec<String> = TABLES
            .iter()
            .filter(|t| !existing.iter().any(|e| e == *t))
            .map(|t| t.to_string())
            .collect();
        if !missing.is_empty() {
            tracing::warn!("Database is missing tables: {:?}", missing);
        }
        Ok(missing)
    }

    /// 关闭连接池，等待进行中的语句完成
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

fn prompt_from_row(row: &SqliteRow) -> Prompt {
    Prompt {
        id: row.get("id"),
        title: row.get("title"),
        scene: row.get("scene"),
        mood: row.get("mood"),
        prompt: row.get("prompt"),
        model: row.get("model"),
    }
}

fn iteration_from_row(row: &SqliteRow) -> IterationRecord {
    let status: String = row.get("status");
    let iteration: i64 = row.get("iteration");
    IterationRecord {
        prompt_id: row.get("prompt_id"),
        iteration: iteration as u32,
        image_path: row.get("image_path"),
        prompt_text: row.get("prompt_text"),
        evaluation: row.get("evaluation"),
        score: row.get("score"),
        status: IterationStatus::parse(&status).unwrap_or(IterationStatus::Pending),
    }
}

fn variant_from_row(row: &SqliteRow) -> VariantRecord {
    let iteration: i64 = row.get("iteration");
    let variant: i64 = row.get("variant");
    VariantRecord {
        id: row.get("id"),
        prompt_id: row.get("prompt_id"),
        iteration: iteration as u32,
        variant: variant as usize,
        image_path: row.get("image_path"),
        description: row.get("description"),
        score: row.get("score"),
        passed: row.get("passed"),
        needs_refinement: row.get("needs_refinement"),
        feedback: row.get("feedback"),
    }
}

fn status_from_row(row: &SqliteRow) -> PromptStatusRecord {
    let status: String = row.get("status");
    let current: i64 = row.get("current_iteration");
    PromptStatusRecord {
        prompt_id: row.get("prompt_id"),
        current_iteration: current as u32,
        status: PromptRunStatus::parse(&status).unwrap_or(PromptRunStatus::Pending),
        updated_at: row.get("last_updated"),
    }
}

#[async_trait]
impl PipelineStore for SqliteStore {
    async fn upsert_prompt(&self, prompt: &Prompt) -> Result<(), PipelineError> {
        sqlx::query(
            "INSERT INTO prompts (id, title, scene, mood, prompt, model, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                scene = excluded.scene,
                mood = excluded.mood,
                prompt = excluded.prompt,
                model = excluded.model",
        )
        .bind(&prompt.id)
        .bind(&prompt.title)
        .bind(&prompt.scene)
        .bind(&prompt.mood)
        .bind(&prompt.prompt)
        .bind(&prompt.model)
        .bind(now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_prompt(&self, prompt_id: &str) -> Result<Option<Prompt>, PipelineError> {
        let row = sqlx::query("SELECT id, title, scene, mood, prompt, model FROM prompts WHERE id = ?")
            .bind(prompt_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(prompt_from_row))
    }

    async fn list_prompts(&self) -> Result<Vec<Prompt>, PipelineError> {
        let rows = sqlx::query("SELECT id, title, scene, mood, prompt, model FROM prompts ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(prompt_from_row).collect())
    }

    async fn save_iteration(&self, record: &IterationRecord) -> Result<(), PipelineError> {
        sqlx::query(
            "INSERT INTO iterations
                (prompt_id, iteration, image_path, prompt_text, evaluation, score, status, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(prompt_id, iteration) DO UPDATE SET
                image_path = excluded.image_path,
                prompt_text = excluded.prompt_text,
                evaluation = excluded.evaluation,
                score = excluded.score,
                status = excluded.status,
                updated_at = excluded.updated_at",
        )
        .bind(&record.prompt_id)
        .bind(record.iteration as i64)
        .bind(&record.image_path)
        .bind(&record.prompt_text)
        .bind(&record.evaluation)
        .bind(record.score)
        .bind(record.status.as_str())
        .bind(now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_iteration(
        &self,
        prompt_id: &str,
        iteration: u32,
    ) -> Result<Option<IterationRecord>, PipelineError> {
        let row = sqlx::query(
            "SELECT prompt_id, iteration, image_path, prompt_text, evaluation, score, status
             FROM iterations WHERE prompt_id = ? AND iteration = ?",
        )
        .bind(prompt_id)
        .bind(iteration as i64)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(iteration_from_row))
    }

    async fn list_iterations(&self, prompt_id: &str) -> Result<Vec<IterationRecord>, PipelineError> {
        let rows = sqlx::query(
            "SELECT prompt_id, iteration, image_path, prompt_text, evaluation, score, status
             FROM iterations WHERE prompt_id = ? ORDER BY iteration",
        )
        .bind(prompt_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(iteration_from_row).collect())
    }

    async fn save_variant(&self, record: &VariantRecord) -> Result<i64, PipelineError> {
        let row = sqlx::query(
            "INSERT INTO generated_images
                (prompt_id, iteration, variant, image_path, description, score,
                 passed, needs_refinement, feedback, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(prompt_id, iteration, variant) DO UPDATE SET
                image_path = excluded.image_path,
                description = excluded.description,
                score = excluded.score,
                passed = excluded.passed,
                needs_refinement = excluded.needs_refinement,
                feedback = excluded.feedback,
                created_at = excluded.created_at
             RETURNING id",
        )
        .bind(&record.prompt_id)
        .bind(record.iteration as i64)
        .bind(record.variant as i64)
        .bind(&record.image_path)
        .bind(&record.description)
        .bind(record.score)
        .bind(record.passed)
        .bind(record.needs_refinement)
        .bind(&record.feedback)
        .bind(now())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("id"))
    }

    async fn update_variant_evaluation(&self, record: &VariantRecord) -> Result<(), PipelineError> {
        sqlx::query(
            "UPDATE generated_images
             SET description = ?, score = ?, passed = ?, needs_refinement = ?, feedback = ?
             WHERE prompt_id = ? AND iteration = ? AND variant = ?",
        )
        .bind(&record.description)
        .bind(record.score)
        .bind(record.passed)
        .bind(record.needs_refinement)
        .bind(&record.feedback)
        .bind(&record.prompt_id)
        .bind(record.iteration as i64)
        .bind(record.variant as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_variants(
        &self,
        prompt_id: &str,
        iteration: u32,
    ) -> Result<Vec<VariantRecord>, PipelineError> {
        let rows = sqlx::query(
            "SELECT id, prompt_id, iteration, variant, image_path, description, score,
                    passed, needs_refinement, feedback
             FROM generated_images WHERE prompt_id = ? AND iteration = ? ORDER BY variant",
        )
        .bind(prompt_id)
        .bind(iteration as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(variant_from_row).collect())
    }

    async fn reset_iteration(&self, prompt_id: &str, iteration: u32) -> Result<(), PipelineError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM best_images WHERE prompt_id = ? AND iteration = ?")
            .bind(prompt_id)
            .bind(iteration as i64)
            .execute(&mut *tx)
            .await?;
        let removed = sqlx::query("DELETE FROM generated_images WHERE prompt_id = ? AND iteration = ?")
            .bind(prompt_id)
            .bind(iteration as i64)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        if removed > 0 {
            tracing::debug!(prompt_id, iteration, "Cleared {} stale variants", removed);
        }
        Ok(())
    }

    async fn save_best_selection(&self, selection: &BestSelection) -> Result<(), PipelineError> {
        sqlx::query(
            "INSERT INTO best_images
                (prompt_id, iteration, image_id, variant, image_path, score, selected_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(prompt_id, iteration) DO UPDATE SET
                image_id = excluded.image_id,
                variant = excluded.variant,
                image_path = excluded.image_path,
                score = excluded.score,
                selected_at = excluded.selected_at",
        )
        .bind(&selection.prompt_id)
        .bind(selection.iteration as i64)
        .bind(selection.variant_id)
        .bind(selection.variant as i64)
        .bind(&selection.image_path)
        .bind(selection.score)
        .bind(now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_best_selection(
        &self,
        prompt_id: &str,
        iteration: u32,
    ) -> Result<Option<BestSelection>, PipelineError> {
        let row = sqlx::query(
            "SELECT prompt_id, iteration, image_id, variant, image_path, score
             FROM best_images WHERE prompt_id = ? AND iteration = ?",
        )
        .bind(prompt_id)
        .bind(iteration as i64)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| {
            let iteration: i64 = row.get("iteration");
            let variant: i64 = row.get("variant");
            BestSelection {
                prompt_id: row.get("prompt_id"),
                iteration: iteration as u32,
                variant_id: row.get("image_id"),
                variant: variant as usize,
                image_path: row.get("image_path"),
                score: row.get("score"),
            }
        }))
    }

    async fn save_refined_prompt(&self, record: &RefinedPromptRecord) -> Result<(), PipelineError> {
        sqlx::query(
            "INSERT INTO refined_prompts
                (original_prompt_id, iteration, refined_text, evaluation_text, needs_refinement, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(original_prompt_id, iteration) DO UPDATE SET
                refined_text = excluded.refined_text,
                evaluation_text = excluded.evaluation_text,
                needs_refinement = excluded.needs_refinement,
                created_at = excluded.created_at",
        )
        .bind(&record.prompt_id)
        .bind(record.iteration as i64)
        .bind(&record.refined_text)
        .bind(&record.evaluation_text)
        .bind(record.needs_refinement)
        .bind(now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_refined_prompt(
        &self,
        prompt_id: &str,
        iteration: u32,
    ) -> Result<Option<RefinedPromptRecord>, PipelineError> {
        let row = sqlx::query(
            "SELECT original_prompt_id, iteration, refined_text, evaluation_text, needs_refinement
             FROM refined_prompts WHERE original_prompt_id = ? AND iteration = ?",
        )
        .bind(prompt_id)
        .bind(iteration as i64)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| {
            let iteration: i64 = row.get("iteration");
            RefinedPromptRecord {
                prompt_id: row.get("original_prompt_id"),
                iteration: iteration as u32,
                refined_text: row.get("refined_text"),
                evaluation_text: row.get("evaluation_text"),
                needs_refinement: row.get("needs_refinement"),
            }
        }))
    }

    async fn set_prompt_status(
        &self,
        prompt_id: &str,
        current_iteration: u32,
        status: PromptRunStatus,
    ) -> Result<(), PipelineError> {
        sqlx::query(
            "INSERT INTO prompt_status (prompt_id, current_iteration, status, last_updated)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(prompt_id) DO UPDATE SET
                current_iteration = excluded.current_iteration,
                status = excluded.status,
                last_updated = excluded.last_updated",
        )
        .bind(prompt_id)
        .bind(current_iteration as i64)
        .bind(status.as_str())
        .bind(now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_prompt_status(
        &self,
        prompt_id: &str,
    ) -> Result<Option<PromptStatusRecord>, PipelineError> {
        let row = sqlx::query(
            "SELECT prompt_id, current_iteration, status, last_updated
             FROM prompt_status WHERE prompt_id = ?",
        )
        .bind(prompt_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(status_from_row))
    }

    async fn list_prompt_statuses(&self) -> Result<Vec<PromptStatusRecord>, PipelineError> {
        let rows = sqlx::query(
            "SELECT prompt_id, current_iteration, status, last_updated
             FROM prompt_status ORDER BY prompt_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(status_from_row).collect())
    }

    async fn record_api_call(&self, call: &ApiCall) -> Result<(), PipelineError> {
        sqlx::query(
            "INSERT INTO api_calls (api_name, endpoint, status, error, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&call.api_name)
        .bind(&call.endpoint)
        .bind(&call.status)
        .bind(&call.error)
        .bind(now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_api_calls(&self, api_name: Option<&str>) -> Result<u64, PipelineError> {
        let row = match api_name {
            Some(name) => {
                sqlx::query("SELECT COUNT(*) AS n FROM api_calls WHERE api_name = ?")
                    .bind(name)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT COUNT(*) AS n FROM api_calls")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        let n: i64 = row.get("n");
        Ok(n as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cabin() -> Prompt {
        Prompt {
            id: "cabin".into(),
            title: "Snowy cabin".into(),
            scene: "A cabin in the woods".into(),
            mood: "calm".into(),
            prompt: "cozy cabin in snowy forest".into(),
            model: "flux".into(),
        }
    }

    #[tokio::test]
    async fn test_schema_created_and_versioned() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert!(store.verify().await.unwrap().is_empty());
        assert_eq!(store.schema_version().await.unwrap().as_deref(), Some(SCHEMA_VERSION));
    }

    #[tokio::test]
    async fn test_open_creates_file_and_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db.sqlite");
        let store = SqliteStore::open(&path).await.unwrap();
        store.upsert_prompt(&cabin()).await.unwrap();
        store.close().await;
        assert!(path.exists());

        let reopened = SqliteStore::open(&path).await.unwrap();
        assert_eq!(reopened.get_prompt("cabin").await.unwrap(), Some(cabin()));
    }

    #[tokio::test]
    async fn test_iteration_upsert_is_idempotent() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut record = IterationRecord::pending("cabin", 1, "cozy cabin");
        store.save_iteration(&record).await.unwrap();
        record.status = IterationStatus::Evaluated;
        record.score = Some(0.8);
        store.save_iteration(&record).await.unwrap();
        store.save_iteration(&record).await.unwrap();

        let rows = store.list_iterations("cabin").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, IterationStatus::Evaluated);
        assert_eq!(rows[0].score, Some(0.8));
    }

    #[tokio::test]
    async fn test_variant_rewrite_keeps_id_and_clears_evaluation() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut v = VariantRecord::generated("cabin", 1, 0, "/out/a.png");
        let id = store.save_variant(&v).await.unwrap();

        v.description = Some("a cabin".into());
        v.score = Some(0.9);
        v.passed = true;
        store.update_variant_evaluation(&v).await.unwrap();
        let listed = store.list_variants("cabin", 1).await.unwrap();
        assert_eq!(listed[0].score, Some(0.9));
        assert!(listed[0].passed);

        let again = store
            .save_variant(&VariantRecord::generated("cabin", 1, 0, "/out/b.png"))
            .await
            .unwrap();
        assert_eq!(again, id);
        let listed = store.list_variants("cabin", 1).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].image_path, "/out/b.png");
        assert_eq!(listed[0].score, None);
    }

    #[tokio::test]
    async fn test_best_selection_replaced() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut sel = BestSelection {
            prompt_id: "cabin".into(),
            iteration: 1,
            variant_id: 1,
            variant: 0,
            image_path: "/a.png".into(),
            score: 0.75,
        };
        store.save_best_selection(&sel).await.unwrap();
        sel.variant = 2;
        sel.score = 0.9;
        store.save_best_selection(&sel).await.unwrap();
        let got = store.get_best_selection("cabin", 1).await.unwrap().unwrap();
        assert_eq!(got.variant, 2);
        assert_eq!(got.score, 0.9);
        assert!(store.get_best_selection("cabin", 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset_iteration_clears_only_that_iteration() {
        let store = SqliteStore::in_memory().await.unwrap();
        for (iteration, variant) in [(1, 0), (1, 1), (1, 2), (2, 0)] {
            store
                .save_variant(&VariantRecord::generated("cabin", iteration, variant, "/v.png"))
                .await
                .unwrap();
        }
        store
            .save_variant(&VariantRecord::generated("lake", 1, 0, "/l.png"))
            .await
            .unwrap();
        for (prompt_id, iteration) in [("cabin", 1), ("cabin", 2), ("lake", 1)] {
            store
                .save_best_selection(&BestSelection {
                    prompt_id: prompt_id.into(),
                    iteration,
                    variant_id: 1,
                    variant: 0,
                    image_path: "/v.png".into(),
                    score: 0.8,
                })
                .await
                .unwrap();
        }

        store.reset_iteration("cabin", 1).await.unwrap();

        assert!(store.list_variants("cabin", 1).await.unwrap().is_empty());
        assert!(store.get_best_selection("cabin", 1).await.unwrap().is_none());
        assert_eq!(store.list_variants("cabin", 2).await.unwrap().len(), 1);
        assert!(store.get_best_selection("cabin", 2).await.unwrap().is_some());
        assert_eq!(store.list_variants("lake", 1).await.unwrap().len(), 1);
        assert!(store.get_best_selection("lake", 1).await.unwrap().is_some());

        // 空轮次也可以重置
        store.reset_iteration("cabin", 9).await.unwrap();
    }

    #[tokio::test]
    async fn test_refined_prompt_and_status() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .save_refined_prompt(&RefinedPromptRecord {
                prompt_id: "cabin".into(),
                iteration: 1,
                refined_text: "a cozier cabin".into(),
                evaluation_text: "a cabin".into(),
                needs_refinement: true,
            })
            .await
            .unwrap();
        let refined = store.get_refined_prompt("cabin", 1).await.unwrap().unwrap();
        assert_eq!(refined.refined_text, "a cozier cabin");

        store
            .set_prompt_status("cabin", 1, PromptRunStatus::InProgress)
            .await
            .unwrap();
        store
            .set_prompt_status("cabin", 2, PromptRunStatus::Completed)
            .await
            .unwrap();
        let status = store.get_prompt_status("cabin").await.unwrap().unwrap();
        assert_eq!(status.current_iteration, 2);
        assert_eq!(status.status, PromptRunStatus::Completed);
        assert_eq!(store.list_prompt_statuses().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_api_calls_counted() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .record_api_call(&ApiCall::success("mock-image", "generate"))
            .await
            .unwrap();
        store
            .record_api_call(&ApiCall::failure(
                "mock-vision",
                "describe",
                &PipelineError::Timeout("slow".into()),
            ))
            .await
            .unwrap();
        assert_eq!(store.count_api_calls(None).await.unwrap(), 2);
        assert_eq!(store.count_api_calls(Some("mock-image")).await.unwrap(), 1);
    }
}
