//! Dumbbell 场景：拓扑 + 应用 + 流监控 + 动画
//!
//! `Scenario::build` 按配置搭好整个仿真世界，`Scenario::run` 运行到停止时间，
//! 写出动画与流监控文件，并返回结果摘要。

mod config;
mod report;

use std::net::SocketAddrV4;
use std::path::PathBuf;

use tracing::{info, instrument};

use crate::anim::AnimationInterface;
use crate::app::{AppId, OnOffApp, OnOffConfig, PacketSinkApp};
use crate::error::SimError;
use crate::flowmon::FlowMonitor;
use crate::net::NetWorld;
use crate::sim::Simulator;
use crate::topo::Dumbbell;

pub use config::{
    AnimationSettings, FlowMonitorSettings, FlowSpec, NodePosition, NodeRef, OnOffDefaults,
    ScenarioConfig,
};
pub use report::{FlowSummary, InstalledFlow, ScenarioReport, TcpConnReport};

pub struct Scenario {
    cfg: ScenarioConfig,
    sim: Simulator,
    world: NetWorld,
    topo: Dumbbell,
    flows: Vec<InstalledFlow>,
}

impl Scenario {
    #[instrument(skip(cfg))]
    pub fn build(cfg: ScenarioConfig) -> Result<Self, SimError> {
        cfg.validate()?;
        let mut sim = Simulator::default();
        let mut world = NetWorld::default();

        let topo = Dumbbell::build(&mut world.net, &cfg.topology)?;
        world.net.set_ecmp_mode(cfg.ecmp);

        let mut flows = Vec::with_capacity(cfg.flows.len());
        for (index, spec) in cfg.flows.iter().enumerate() {
            flows.push(Self::install_flow(&cfg, &topo, &mut world, &mut sim, index, spec)?);
        }

        world.net.mobility.install_all(topo.nodes());
        for pos in &cfg.positions {
            let node = pos.node.resolve(&topo)?;
            world.net.mobility.set_position(node, pos.vector());
        }

        if cfg.flow_monitor.enabled {
            world.net.flowmon = Some(FlowMonitor::new(cfg.flow_monitor.monitor.clone()));
        }

        world.net.populate_routing_tables();

        let anim_cfg = &cfg.animation;
        if anim_cfg.enabled {
            let mut anim = AnimationInterface::new(&anim_cfg.file);
            if anim_cfg.packet_metadata {
                anim.enable_packet_metadata();
            }
            if anim_cfg.ipv4_counters {
                // 采样窗口不超过仿真停止时间
                let stop = anim_cfg.counters_stop.min(cfg.stop);
                anim.enable_ipv4_l3_counters(anim_cfg.counters_start.min(stop), stop);
                anim.set_counter_poll_interval(anim_cfg.counters_poll_interval);
            }
            world.net.anim = Some(anim);
            world.net.start_animation(&mut sim);
        }

        sim.stop_at(cfg.stop);
        info!(flows = flows.len(), stop = %cfg.stop, "场景已构建");
        Ok(Self {
            cfg,
            sim,
            world,
            topo,
            flows,
        })
    }

    /// 接收端先于发送端安装：同一时刻的启动事件按安装顺序执行
    fn install_flow(
        cfg: &ScenarioConfig,
        topo: &Dumbbell,
        world: &mut NetWorld,
        sim: &mut Simulator,
        index: usize,
        spec: &FlowSpec,
    ) -> Result<InstalledFlow, SimError> {
        let src = topo.left(spec.src)?;
        let dst = topo.right(spec.dst)?;
        let remote = SocketAddrV4::new(topo.right_addr(spec.dst)?, spec.port);

        let sink = PacketSinkApp::new(dst, spec.port, spec.protocol).with_tcp_config(cfg.tcp.clone());
        let sink: AppId = world
            .apps
            .install(Box::new(sink), spec.start, spec.stop, sim);

        let onoff = OnOffConfig {
            remote,
            protocol: spec.protocol,
            rate: cfg.flow_rate(spec),
            packet_size: cfg.flow_packet_size(spec),
            on_time: cfg.onoff.on_time,
            off_time: cfg.onoff.off_time,
            max_bytes: spec.max_bytes,
            tcp: cfg.tcp.clone(),
        };
        let source = world.apps.install(
            Box::new(OnOffApp::new(src, onoff)),
            spec.start,
            spec.stop,
            sim,
        );

        info!(
            index,
            protocol = ?spec.protocol,
            %src,
            %dst,
            %remote,
            rate = %cfg.flow_rate(spec),
            "安装流"
        );
        Ok(InstalledFlow {
            index,
            protocol: spec.protocol,
            source,
            sink,
            remote,
        })
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.cfg
    }

    pub fn topology(&self) -> &Dumbbell {
        &self.topo
    }

    pub fn world(&self) -> &NetWorld {
        &self.world
    }

    pub fn simulator(&self) -> &Simulator {
        &self.sim
    }

    pub fn flows(&self) -> &[InstalledFlow] {
        &self.flows
    }

    pub fn sink(&self, flow: usize) -> Option<&PacketSinkApp> {
        let flow = self.flows.get(flow)?;
        self.world.apps.get_as::<PacketSinkApp>(flow.sink)
    }

    pub fn source(&self, flow: usize) -> Option<&OnOffApp> {
        let flow = self.flows.get(flow)?;
        self.world.apps.get_as::<OnOffApp>(flow.source)
    }

    /// 只运行仿真，不写文件
    pub fn simulate(&mut self) {
        self.sim.run(&mut self.world);
        let now = self.sim.now();
        if let Some(fm) = &mut self.world.net.flowmon {
            let max_delay = fm.config().max_per_hop_delay;
            fm.check_for_lost_packets(now, max_delay);
        }
    }

    /// 写出动画与流监控文件，返回实际写出的路径
    pub fn write_outputs(&mut self) -> Result<(Option<PathBuf>, Option<PathBuf>), SimError> {
        let now = self.sim.now();
        let mut anim_file = None;
        if let Some(anim) = &self.world.net.anim {
            anim.write()?;
            anim_file = Some(anim.path().to_path_buf());
        }

        let mut flow_file = None;
        let fm_cfg = &self.cfg.flow_monitor;
        if let Some(fm) = &mut self.world.net.flowmon {
            fm.serialize_to_file(&fm_cfg.file, now, fm_cfg.histograms, fm_cfg.probes)?;
            flow_file = Some(fm_cfg.file.clone());
        }
        Ok((anim_file, flow_file))
    }

    pub fn report(&self) -> ScenarioReport {
        ScenarioReport::collect(&self.sim, &self.world, &self.flows)
    }

    /// 运行到停止时间并写出输出文件
    #[instrument(skip(self))]
    pub fn run(mut self) -> Result<ScenarioReport, SimError> {
        self.simulate();
        let (anim_file, flow_file) = self.write_outputs()?;
        let mut report = self.report();
        report.anim_file = anim_file;
        report.flow_file = flow_file;
        Ok(report)
    }
}
