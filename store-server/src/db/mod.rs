//! Database Module
//!
//! 嵌入式 SurrealDB (RocksDB 引擎) 的连接与初始化

pub mod models;
pub mod repository;

pub use repository::{RepoError, RepoResult};

use crate::utils::AppError;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, RocksDb};

/// Database service, owns the embedded SurrealDB handle
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// Open (or create) the embedded database and prepare the schema
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        let db = Surreal::new::<RocksDb>(db_path)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

        db.use_ns("store")
            .use_db("main")
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

        tracing::info!("Database connection established (SurrealDB RocksDB)");

        Self::define_indexes(&db).await?;

        Ok(Self { db })
    }

    /// 定义唯一索引
    ///
    /// DEFINE 语句是幂等的 (IF NOT EXISTS)，每次启动都会执行
    async fn define_indexes(db: &Surreal<Db>) -> Result<(), AppError> {
        db.query(
            r#"
            DEFINE INDEX IF NOT EXISTS idx_account_username ON TABLE account COLUMNS username UNIQUE;
            DEFINE INDEX IF NOT EXISTS idx_category_name ON TABLE category COLUMNS name UNIQUE;
            DEFINE INDEX IF NOT EXISTS idx_product_slug ON TABLE product COLUMNS slug UNIQUE;
            "#,
        )
        .await
        .map_err(|e| AppError::database(format!("Failed to define indexes: {e}")))?;

        tracing::info!("Database indexes defined");
        Ok(())
    }
}
