//! Dumbbell Vegas 场景
//!
//! left[1] -> right[1] 一条 TCP（默认 Vegas）流，left[0] -> right[0] 与
//! left[2] -> right[2] 两条 UDP On/Off 流共享 5 Mbps 瓶颈。运行 10 秒，
//! 写出动画事件与流监控 JSON。

use std::path::PathBuf;

use clap::Parser;
use dumbbell_sim::error::SimError;
use dumbbell_sim::net::DataRate;
use dumbbell_sim::proto::cc::TcpVariant;
use dumbbell_sim::scenario::{Scenario, ScenarioConfig};
use dumbbell_sim::sim::SimTime;

#[derive(Debug, Parser)]
#[command(name = "dumbbell-vegas", about = "Dumbbell 拓扑仿真：TCP Vegas 与两条 UDP On/Off 流")]
struct Args {
    /// JSON 场景配置；命令行参数覆盖其中的字段
    #[arg(long)]
    config: Option<PathBuf>,

    /// 仿真停止时间（例如 10s、2500ms）
    #[arg(long)]
    stop: Option<SimTime>,

    /// 动画事件输出文件
    #[arg(long)]
    anim_file: Option<PathBuf>,

    /// 流监控输出文件
    #[arg(long)]
    flow_file: Option<PathBuf>,

    /// TCP 拥塞控制算法
    #[arg(long, value_enum)]
    tcp_variant: Option<TcpVariant>,

    /// On/Off 发送速率（例如 5Mbps）
    #[arg(long)]
    data_rate: Option<DataRate>,

    /// On/Off 包长（字节）
    #[arg(long)]
    packet_size: Option<u32>,

    /// 不生成动画文件
    #[arg(long, default_value_t = false)]
    no_anim: bool,

    /// 不启用流监控
    #[arg(long, default_value_t = false)]
    no_flowmon: bool,

    /// 打印合并后的配置并退出
    #[arg(long, default_value_t = false)]
    dump_config: bool,

    /// 把结果摘要写成 JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<ScenarioConfig, SimError> {
    let mut cfg = match &args.config {
        Some(path) => ScenarioConfig::from_file(path)?,
        None => ScenarioConfig::default(),
    };
    if let Some(stop) = args.stop {
        cfg.stop = stop;
    }
    if let Some(path) = &args.anim_file {
        cfg.animation.file = path.clone();
    }
    if let Some(path) = &args.flow_file {
        cfg.flow_monitor.file = path.clone();
    }
    if let Some(variant) = args.tcp_variant {
        cfg.tcp.variant = variant;
    }
    if let Some(rate) = args.data_rate {
        cfg.onoff.data_rate = rate;
    }
    if let Some(size) = args.packet_size {
        cfg.onoff.packet_size = size;
    }
    if args.no_anim {
        cfg.animation.enabled = false;
    }
    if args.no_flowmon {
        cfg.flow_monitor.enabled = false;
    }
    Ok(cfg)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), SimError> {
    let cfg = load_config(args)?;
    if args.dump_config {
        println!("{}", cfg.to_json()?);
        return Ok(());
    }

    let scenario = Scenario::build(cfg)?;
    let report = scenario.run()?;

    if let Some(path) = &report.anim_file {
        println!("Animation Trace file created:{}", path.display());
    }
    if let Some(path) = &report.flow_file {
        println!("Flow monitor file created:{}", path.display());
    }

    println!("done @ {} ({} events)", report.end_time, report.events);
    for f in &report.flows {
        println!(
            "  flow {} ({} -> {}, proto {}): tx_pkts={} rx_pkts={} lost={} dropped={} throughput_kbps={:.1} mean_delay={}",
            f.flow_id,
            f.source,
            f.destination,
            f.protocol,
            f.tx_packets,
            f.rx_packets,
            f.lost_packets,
            f.dropped_packets,
            f.throughput_bps / 1000.0,
            f.mean_delay.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
        );
    }
    for (i, flow) in report.installed.iter().enumerate() {
        println!(
            "  app flow {i} ({:?} -> {}): sent_bytes={} sink_rx_bytes={}",
            flow.protocol,
            flow.remote,
            report.source_tx_bytes(i).unwrap_or(0),
            report.sink_rx_bytes(i).unwrap_or(0),
        );
    }
    for c in &report.tcp {
        println!(
            "  tcp conn {} {} -> {} [{}]: acked={} retx_bytes={} rtos={} fast_retx={} cwnd={}",
            c.conn_id,
            c.local,
            c.remote,
            c.congestion_control,
            c.stats.bytes_acked,
            c.stats.bytes_retransmitted,
            c.stats.rto_expirations,
            c.stats.fast_retransmits,
            c.cwnd,
        );
    }
    println!(
        "  net: delivered_pkts={}, delivered_bytes={}, dropped_pkts={}, dropped_bytes={}",
        report.net.delivered_pkts,
        report.net.delivered_bytes,
        report.net.dropped_pkts,
        report.net.dropped_bytes
    );

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).map_err(|e| SimError::io(path, e))?;
    }
    Ok(())
}
