//! 五元组流分类器

use std::collections::HashMap;
use std::net::Ipv4Addr;

use serde::Serialize;

use crate::net::{FiveTuple, IpProtocol};

/// 流号，从 1 开始按首次出现顺序分配
pub type FlowId = u32;

#[derive(Debug, Default, Clone)]
pub struct FlowClassifier {
    by_tuple: HashMap<FiveTuple, FlowId>,
    tuples: Vec<FiveTuple>,
}

/// 分类器条目（序列化用）
#[derive(Debug, Clone, Serialize)]
pub struct ClassifierEntry {
    pub flow_id: FlowId,
    pub source_address: Ipv4Addr,
    pub destination_address: Ipv4Addr,
    pub protocol: u8,
    pub source_port: u16,
    pub destination_port: u16,
}

impl FlowClassifier {
    /// 返回五元组对应的流号；新五元组分配新号
    pub fn classify(&mut self, t: FiveTuple) -> FlowId {
        if let Some(&id) = self.by_tuple.get(&t) {
            return id;
        }
        self.tuples.push(t);
        let id = self.tuples.len() as FlowId;
        self.by_tuple.insert(t, id);
        id
    }

    pub fn lookup(&self, t: &FiveTuple) -> Option<FlowId> {
        self.by_tuple.get(t).copied()
    }

    pub fn find_flow(&self, id: FlowId) -> Option<FiveTuple> {
        let idx = (id as usize).checked_sub(1)?;
        self.tuples.get(idx).copied()
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn entries(&self) -> Vec<ClassifierEntry> {
        self.tuples
            .iter()
            .enumerate()
            .map(|(i, t)| ClassifierEntry {
                flow_id: (i + 1) as FlowId,
                source_address: t.src,
                destination_address: t.dst,
                protocol: t.protocol.number(),
                source_port: t.src_port,
                destination_port: t.dst_port,
            })
            .collect()
    }

    /// 按协议筛选流号
    pub fn flows_with_protocol(&self, proto: IpProtocol) -> Vec<FlowId> {
        self.tuples
            .iter()
            .enumerate()
            .filter(|(_, t)| t.protocol == proto)
            .map(|(i, _)| (i + 1) as FlowId)
            .collect()
    }
}
