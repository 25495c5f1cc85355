use std::time::Duration;

use async_trait::async_trait;
use paymentjob_core::{
    config::DatabaseConfig, models::NewPaymentRecord, traits::RecordStore, Result,
};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    types::Json,
    PgPool, Row,
};
use tracing::{debug, info, instrument};

/// 建表与索引语句，均为幂等
const MIGRATIONS: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS payments (
        id SERIAL PRIMARY KEY,
        received_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        payload JSONB NOT NULL,
        message_id TEXT,
        source_queue TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_payments_received_at ON payments(received_at)",
    "CREATE INDEX IF NOT EXISTS idx_payments_message_id ON payments(message_id)",
];

/// PostgreSQL 支付记录存储
///
/// 连接池只有一个连接，由当前 worker 进程独占。
pub struct PostgresRecordStore {
    pool: PgPool,
    options: PgConnectOptions,
}

impl PostgresRecordStore {
    const ACQUIRE_TIMEOUT_SECONDS: u64 = 30;

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.username)
            .password(&config.password);

        info!(
            "连接PostgreSQL: {}:{}/{}",
            config.host, config.port, config.database
        );
        let pool = Self::open_pool(options.clone()).await?;
        Ok(Self { pool, options })
    }

    async fn open_pool(options: PgConnectOptions) -> Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(Self::ACQUIRE_TIMEOUT_SECONDS))
            .connect_with(options)
            .await?;
        Ok(pool)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn migrate(&mut self) -> Result<()> {
        info!("执行数据库迁移...");
        let mut tx = self.pool.begin().await?;
        for statement in MIGRATIONS {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        info!("数据库迁移完成");
        Ok(())
    }

    #[instrument(skip(self, record), fields(
        message_id = ?record.message_id,
        source_queue = %record.source_queue,
    ))]
    async fn insert(&mut self, record: &NewPaymentRecord) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO payments (received_at, payload, message_id, source_queue)
            VALUES ($1, $2, $3, $4)
            RETURNING id::BIGINT AS id
            "#,
        )
        .bind(record.received_at)
        .bind(Json(&record.payload))
        .bind(&record.message_id)
        .bind(&record.source_queue)
        .fetch_one(&mut *tx)
        .await?;

        let id: i64 = row.try_get("id")?;
        tx.commit().await?;

        debug!("支付记录已写入: id={}", id);
        Ok(id)
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.pool.close().await;
        self.pool = Self::open_pool(self.options.clone()).await?;
        info!("已重新连接PostgreSQL");
        Ok(())
    }

    async fn close(&mut self) {
        if !self.pool.is_closed() {
            self.pool.close().await;
            info!("PostgreSQL连接已关闭");
        }
    }
}
