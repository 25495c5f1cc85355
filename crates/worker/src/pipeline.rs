//! 消费 → 解析 → 写库（事务）→ 确认
//!
//! 一次只处理一条消息。只有在事务提交之后才确认消息，
//! 提交与确认之间崩溃会导致重复投递并产生重复记录。

use paymentjob_core::{
    models::{InboundMessage, NewPaymentRecord},
    traits::{MessageSource, RecordStore},
    Result,
};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

const PREVIEW_LEN: usize = 120;

/// 单条消息的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// 已写入并确认，附带记录id
    Acked(i64),
    /// 坏消息，拒绝且不重新入队
    Rejected,
    /// 处理失败，已重新入队
    Requeued,
}

/// 消费循环结束的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    CapReached,
    SourceClosed,
    Shutdown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub acked: u64,
    pub rejected: u64,
    pub requeued: u64,
}

pub struct DeliveryPipeline<S, R> {
    source: S,
    store: R,
    queue_name: String,
    max_messages: Option<u64>,
    stats: PipelineStats,
}

impl<S, R> DeliveryPipeline<S, R>
where
    S: MessageSource,
    R: RecordStore,
{
    pub fn new(source: S, store: R, queue_name: impl Into<String>, max_messages: Option<u64>) -> Self {
        Self {
            source,
            store,
            queue_name: queue_name.into(),
            max_messages: max_messages.filter(|n| *n > 0),
            stats: PipelineStats::default(),
        }
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    fn cap_reached(&self) -> bool {
        self.max_messages
            .is_some_and(|max| self.stats.acked >= max)
    }

    /// 处理一条消息，直到确认或拒绝为止
    pub async fn handle(&mut self, message: InboundMessage) -> Result<Disposition> {
        let tag = message.delivery_tag;

        let payload = match message.parse_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(
                    "拒绝无法解析的消息 (tag={}): {}; 内容: {}",
                    tag,
                    e,
                    message.preview(PREVIEW_LEN)
                );
                self.source.nack(tag, false).await?;
                self.stats.rejected += 1;
                return Ok(Disposition::Rejected);
            }
        };

        let record = NewPaymentRecord::new(payload, message.message_id.clone(), &self.queue_name);
        match self.store.insert(&record).await {
            Ok(id) => {
                self.source.ack(tag).await?;
                self.stats.acked += 1;
                debug!(
                    "消息 {:?} 已保存为记录 {} 并确认",
                    message.message_id, id
                );
                Ok(Disposition::Acked(id))
            }
            Err(e) if e.is_storage() => {
                error!("写入数据库失败，消息重新入队 (tag={}): {}", tag, e);
                self.source.nack(tag, true).await?;
                self.stats.requeued += 1;
                if let Err(e) = self.store.reconnect().await {
                    error!("重新连接数据库失败: {}", e);
                }
                Ok(Disposition::Requeued)
            }
            Err(e) => {
                error!("处理消息出错，消息重新入队 (tag={}): {}", tag, e);
                self.source.nack(tag, true).await?;
                self.stats.requeued += 1;
                Ok(Disposition::Requeued)
            }
        }
    }

    /// 消费直到达到上限、队列关闭或收到关闭信号
    ///
    /// 关闭信号只在两条消息之间生效，正在处理的消息总会被确认或拒绝。
    pub async fn run(&mut self, shutdown: &mut broadcast::Receiver<()>) -> Result<StopReason> {
        loop {
            if self.cap_reached() {
                info!("已处理 {} 条消息，达到上限", self.stats.acked);
                return Ok(StopReason::CapReached);
            }

            let next = tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    info!("收到关闭信号，停止消费");
                    return Ok(StopReason::Shutdown);
                }
                next = self.source.next_message() => next?,
            };

            match next {
                Some(message) => {
                    self.handle(message).await?;
                }
                None => {
                    warn!("消费者已关闭");
                    return Ok(StopReason::SourceClosed);
                }
            }
        }
    }

    /// 关闭队列连接与数据库连接
    pub async fn close(&mut self) {
        if let Err(e) = self.source.close().await {
            warn!("关闭RabbitMQ连接失败: {}", e);
        }
        self.store.close().await;
    }
}

/// 运行流水线，无论结果如何都会释放两个连接
pub async fn run_pipeline<S, R>(
    source: S,
    store: R,
    queue_name: &str,
    max_messages: Option<u64>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(StopReason, PipelineStats)>
where
    S: MessageSource,
    R: RecordStore,
{
    let mut pipeline = DeliveryPipeline::new(source, store, queue_name, max_messages);
    let result = pipeline.run(&mut shutdown).await;
    pipeline.close().await;

    let stats = pipeline.stats();
    info!(
        "worker 结束: 确认 {} 条，拒绝 {} 条，重新入队 {} 次",
        stats.acked, stats.rejected, stats.requeued
    );
    result.map(|reason| (reason, stats))
}
