//! # 设备注册表
//!
//! 进程内、易失的设备表：由上游事件驱动，纯状态迁移，不做任何 I/O。
//!
//! - 注册事件：首次注册生效，重复注册忽略
//! - 读数 / 颜色事件：设备可能在注册记录之前就上报数据，因此先 upsert 再更新
//! - 注销事件：移除记录
//!
//! 手动断开上游时整表清空，重新连接后由设备自注册重建。

use bridge_protocol::UpstreamEvent;
use domain::{DeviceAddress, DevicePatch, DeviceRecord, SignalColor};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// 读数 / 颜色事件补建设备时使用的上游粗分类。
pub const SYNTHESIZED_CATEGORY: &str = "MISTO";

/// 一次事件应用的结果。
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// 新设备注册
    Registered(DeviceRecord),
    /// 已知设备被注销
    Deregistered { id: String },
    /// 记录了一次采样；`created` 表示设备是本次补建的
    SampleRecorded { record: DeviceRecord, created: bool },
    /// 记录了一次颜色上报；`created` 同上
    ColorChanged { record: DeviceRecord, created: bool },
}

impl ApplyOutcome {
    /// 本次应用是否新建了设备。
    pub fn is_new_device(&self) -> bool {
        match self {
            Self::Registered(_) => true,
            Self::Deregistered { .. } => false,
            Self::SampleRecorded { created, .. } | Self::ColorChanged { created, .. } => *created,
        }
    }

    /// 应用后的设备记录（注销时为 None）。
    pub fn record(&self) -> Option<&DeviceRecord> {
        match self {
            Self::Registered(record)
            | Self::SampleRecorded { record, .. }
            | Self::ColorChanged { record, .. } => Some(record),
            Self::Deregistered { .. } => None,
        }
    }
}

/// 设备注册表。
#[derive(Debug)]
pub struct DeviceRegistry {
    devices: HashMap<String, DeviceRecord>,
    /// 首次出现顺序，用于稳定输出设备列表
    order: Vec<String>,
    /// 上游未提供时使用的地址（网关自身的 host/port）
    default_address: DeviceAddress,
}

impl DeviceRegistry {
    pub fn new(default_address: DeviceAddress) -> Self {
        Self {
            devices: HashMap::new(),
            order: Vec::new(),
            default_address,
        }
    }

    /// 应用一个上游事件。无状态变化（重复注册、注销未知设备）时返回 None。
    pub fn apply(&mut self, event: &UpstreamEvent, now_ms: i64) -> Option<ApplyOutcome> {
        match event {
            UpstreamEvent::Registered { id, category, port } => {
                if self.devices.contains_key(id) {
                    return None;
                }
                let (record, _) = self.upsert(id, category, Some(*port), now_ms);
                Some(ApplyOutcome::Registered(record.clone()))
            }
            UpstreamEvent::Deregistered { id } => {
                self.remove(id)?;
                Some(ApplyOutcome::Deregistered { id: id.clone() })
            }
            UpstreamEvent::SampleReceived { id, value, unit } => {
                let (record, created) = self.upsert(id, SYNTHESIZED_CATEGORY, None, now_ms);
                record.record_sample(*value, unit.as_str(), now_ms);
                Some(ApplyOutcome::SampleRecorded {
                    record: record.clone(),
                    created,
                })
            }
            UpstreamEvent::ColorChanged { id, color_word } => {
                let (record, created) = self.upsert(id, SYNTHESIZED_CATEGORY, None, now_ms);
                record.set_color(SignalColor::normalize(color_word), now_ms);
                Some(ApplyOutcome::ColorChanged {
                    record: record.clone(),
                    created,
                })
            }
        }
    }

    /// 取出已有记录，或按 ID / 分类新建一条。返回值第二项表示是否新建。
    pub fn upsert(
        &mut self,
        id: &str,
        category: &str,
        port: Option<u16>,
        now_ms: i64,
    ) -> (&mut DeviceRecord, bool) {
        let address = DeviceAddress {
            host: self.default_address.host.clone(),
            port: port.unwrap_or(self.default_address.port),
        };
        match self.devices.entry(id.to_string()) {
            Entry::Occupied(entry) => (entry.into_mut(), false),
            Entry::Vacant(entry) => {
                self.order.push(id.to_string());
                let record = DeviceRecord::new(id, category, address, now_ms);
                (entry.insert(record), true)
            }
        }
    }

    /// 对已有设备应用命令的乐观更新，设备不存在时返回 None。
    pub fn apply_patch(
        &mut self,
        id: &str,
        patch: &DevicePatch,
        now_ms: i64,
    ) -> Option<DeviceRecord> {
        let record = self.devices.get_mut(id)?;
        record.apply_patch(patch, now_ms);
        Some(record.clone())
    }

    pub fn get(&self, id: &str) -> Option<&DeviceRecord> {
        self.devices.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<DeviceRecord> {
        let record = self.devices.remove(id)?;
        self.order.retain(|known| known != id);
        Some(record)
    }

    /// 按首次出现顺序返回所有设备。
    pub fn snapshot(&self) -> Vec<DeviceRecord> {
        self.order
            .iter()
            .filter_map(|id| self.devices.get(id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn clear(&mut self) {
        self.devices.clear();
        self.order.clear();
    }
}
