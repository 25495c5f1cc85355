use async_trait::async_trait;

use crate::{models::NewPaymentRecord, Result};

/// 支付记录存储
#[async_trait]
pub trait RecordStore: Send {
    /// 幂等地创建表和索引
    async fn migrate(&mut self) -> Result<()>;

    /// 在一个已提交的事务内写入记录，返回存储分配的id
    async fn insert(&mut self, record: &NewPaymentRecord) -> Result<i64>;

    /// 存储故障后重新建立连接
    async fn reconnect(&mut self) -> Result<()>;

    async fn close(&mut self);
}
