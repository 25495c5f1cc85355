pub mod database;
pub mod kubernetes;
pub mod message_queue;

pub use database::PostgresRecordStore;
pub use kubernetes::{KubeEventPublisher, KubeStatusWriter, KubeWorkloadApi};
pub use message_queue::{amqp_url, RabbitMQConsumer, RabbitMQPublisher};
