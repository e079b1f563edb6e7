use std::path::PathBuf;
use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::auth::JwtService;
use crate::core::Config;
use crate::db::DbService;

/// 服务器状态 - 持有所有服务的单例引用
///
/// ServerState 是商城服务端的核心数据结构，持有所有服务的共享引用。
/// 使用 Arc 实现浅拷贝，克隆成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | Surreal<Db> | 嵌入式数据库 |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
///
/// # 使用示例
///
/// ```ignore
/// let db = state.get_db();
/// let jwt = state.get_jwt_service();
/// ```
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 嵌入式数据库 (SurrealDB)
    pub db: Surreal<Db>,
    /// JWT 认证服务 (Arc 共享所有权)
    pub jwt_service: Arc<JwtService>,
}

impl ServerState {
    /// 创建服务器状态 (手动构造)
    ///
    /// 通常使用 [`ServerState::initialize`] 代替
    pub fn new(config: Config, db: Surreal<Db>, jwt_service: Arc<JwtService>) -> Self {
        Self {
            config,
            db,
            jwt_service,
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构 (确保 database/uploads/logs 目录存在)
    /// 2. 数据库 (work_dir/database/store.db)，建表和索引
    /// 3. JWT 认证服务
    /// 4. 默认管理员账号 (首次启动时创建)
    ///
    /// # Panics
    ///
    /// 工作目录或数据库初始化失败时 panic
    pub async fn initialize(config: &Config) -> Self {
        // 0. Ensure work_dir structure exists
        config
            .ensure_work_dir_structure()
            .expect("Failed to create work directory structure");

        // 1. Initialize DB at work_dir/database/store.db
        let db_path = config.database_dir().join("store.db");
        let db_path_str = db_path.to_string_lossy();

        let db_service = DbService::new(&db_path_str)
            .await
            .expect("Failed to initialize database");
        let db = db_service.db;

        // 2. JWT service from config
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));

        let state = Self::new(config.clone(), db, jwt_service);

        // 3. Seed default admin account (no-op when accounts already exist)
        state
            .seed_default_admin()
            .await
            .expect("Failed to seed default admin account");

        state
    }

    /// 首次启动时创建默认管理员
    ///
    /// 账号 `admin`，密码从 `ADMIN_INITIAL_PASSWORD` 读取，
    /// 未设置时使用 `admin123` 并打印警告。
    async fn seed_default_admin(&self) -> Result<(), crate::db::RepoError> {
        use crate::auth::Role;
        use crate::db::repository::AccountRepository;

        let repo = AccountRepository::new(self.db.clone());
        if repo.count().await? > 0 {
            return Ok(());
        }

        let password = std::env::var("ADMIN_INITIAL_PASSWORD").unwrap_or_else(|_| {
            tracing::warn!(
                "ADMIN_INITIAL_PASSWORD not set, using default password for initial admin account"
            );
            "admin123".to_string()
        });

        repo.create_account("admin", "Administrator", &password, Role::Admin)
            .await?;
        tracing::info!("Created default admin account 'admin'");

        Ok(())
    }

    /// 获取数据库实例
    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }

    /// 获取上传文件根目录
    pub fn uploads_dir(&self) -> PathBuf {
        self.config.uploads_dir()
    }

    /// 获取 JWT 服务
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }
}
