use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use paymentjob::app::{AppMode, Application};
use paymentjob::crd::crd_yaml;
use paymentjob::publisher::{publish_test_messages, PublishOptions};
use paymentjob::shutdown::ShutdownManager;
use paymentjob_core::{init_logging, LogConfig};
use tracing::{error, info};

fn cli() -> Command {
    Command::new("paymentjob")
        .version("1.0.0")
        .about("PaymentJob operator 与支付消息 worker")
        .subcommand_required(true)
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别 (默认读取 LOG_LEVEL)")
                .global(true)
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式 (默认读取 LOG_FORMAT)")
                .global(true)
                .value_parser(["json", "pretty"]),
        )
        .subcommand(
            Command::new("operator").about("运行 PaymentJob operator").arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("TOML 配置文件路径"),
            ),
        )
        .subcommand(Command::new("worker").about("运行支付消息 worker (配置来自环境变量)"))
        .subcommand(Command::new("crd").about("输出 PaymentJob CRD 的 YAML"))
        .subcommand(
            Command::new("publish")
                .about("向队列发布测试支付消息")
                .arg(
                    Arg::new("count")
                        .short('n')
                        .long("count")
                        .value_name("N")
                        .help("消息数量")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    Arg::new("queue")
                        .short('q')
                        .long("queue")
                        .value_name("QUEUE")
                        .help("队列名称 (默认读取 QUEUE_NAME 或 payments)"),
                )
                .arg(
                    Arg::new("host")
                        .long("host")
                        .value_name("HOST")
                        .help("RabbitMQ 主机 (默认读取 RABBITMQ_HOST 或 localhost)"),
                )
                .arg(
                    Arg::new("port")
                        .long("port")
                        .value_name("PORT")
                        .help("RabbitMQ 端口 (默认读取 RABBITMQ_PORT 或 5672)")
                        .value_parser(clap::value_parser!(u16)),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    if let Some(("crd", _)) = matches.subcommand() {
        print!("{}", crd_yaml()?);
        return Ok(());
    }

    let log_config = LogConfig::from_env().with_overrides(
        matches.get_one::<String>("log-level").map(String::as_str),
        matches.get_one::<String>("log-format").map(String::as_str),
    )?;
    init_logging(&log_config)?;

    match matches.subcommand() {
        Some(("publish", args)) => publish(args).await,
        Some(("operator", args)) => {
            let config_path = args.get_one::<String>("config").cloned();
            run(AppMode::Operator { config_path }).await
        }
        Some(("worker", _)) => run(AppMode::Worker).await,
        _ => Err(anyhow::anyhow!("未知的子命令")),
    }
}

async fn run(mode: AppMode) -> Result<()> {
    info!("启动 paymentjob: {:?}", mode);

    let shutdown_manager = ShutdownManager::new();
    let shutdown_rx = shutdown_manager.subscribe().await;
    let signals = shutdown_manager.listen_for_signals();

    let result = Application::new(mode).run(shutdown_rx).await;
    signals.abort();

    if let Err(e) = &result {
        error!("运行失败: {e:#}");
    }
    result
}

async fn publish(args: &ArgMatches) -> Result<()> {
    let count = args.get_one::<u64>("count").copied().unwrap_or(10);
    let options = PublishOptions::resolve(
        count,
        args.get_one::<String>("queue").cloned(),
        args.get_one::<String>("host").cloned(),
        args.get_one::<u16>("port").copied(),
        |key| std::env::var(key).ok(),
    )?;

    let published = publish_test_messages(&options)
        .await
        .context("发布测试消息失败")?;
    if published < options.count {
        return Err(anyhow::anyhow!(
            "只发布了 {}/{} 条消息",
            published,
            options.count
        ));
    }
    Ok(())
}
