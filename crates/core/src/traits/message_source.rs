use async_trait::async_trait;

use crate::{models::InboundMessage, Result};

/// 手动确认模式的队列消费端
///
/// 同一时刻只持有一条未确认消息。
#[async_trait]
pub trait MessageSource: Send {
    /// 等待下一条消息；消费端关闭时返回 `Ok(None)`
    async fn next_message(&mut self) -> Result<Option<InboundMessage>>;

    /// 确认消息处理完成
    async fn ack(&mut self, delivery_tag: u64) -> Result<()>;

    /// 拒绝消息，`requeue` 决定是否重新入队
    async fn nack(&mut self, delivery_tag: u64, requeue: bool) -> Result<()>;

    /// 关闭通道与连接
    async fn close(&mut self) -> Result<()>;
}
