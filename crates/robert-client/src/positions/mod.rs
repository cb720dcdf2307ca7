//! 位置记录与回放
//!
//! 每个位置以 `pos_<n>` 为键保存一份关节角度快照，值是从 0-based
//! 关节索引到角度（可为 `null`）的 JSON 对象：
//!
//! ```json
//! {"0": 12.5, "1": null, "2": 40.0, "3": 0.0, "4": null, "5": 90.0}
//! ```
//!
//! 存储失败不会中断调用方：`store`/`delete` 返回失败结果并记录日志。

mod storage;

pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};

use crate::error::ClientError;
use crate::gateway::{Ack, CommandGateway};
use crate::transport::Transport;
use parking_lot::Mutex;
use robert_protocol::{Joint, JointAngles, JointArray, JointTarget};
use std::collections::BTreeMap;
use std::sync::Arc;

/// 位置键前缀
pub const POSITION_PREFIX: &str = "pos_";

/// 解析 `pos_<n>` 中的序号
pub fn parse_position_id(key: &str) -> Option<u32> {
    key.strip_prefix(POSITION_PREFIX)?.parse().ok()
}

/// 生成位置键
pub fn position_id(n: u32) -> String {
    format!("{}{}", POSITION_PREFIX, n)
}

/// 位置存储
pub struct PositionStore {
    storage: Arc<dyn KeyValueStore>,
    // 串行化 "计数 + 写入"，避免两次 store 得到同一个键
    write: Mutex<()>,
}

impl PositionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            write: Mutex::new(()),
        }
    }

    /// 内存存储（进程退出即丢失）
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    fn position_keys(&self) -> Result<Vec<(u32, String)>, StoreError> {
        let mut keys: Vec<(u32, String)> = self
            .storage
            .keys()?
            .into_iter()
            .filter_map(|key| parse_position_id(&key).map(|n| (n, key)))
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// 所有位置键，按序号排序
    pub fn list(&self) -> Vec<String> {
        match self.position_keys() {
            Ok(keys) => keys.into_iter().map(|(_, key)| key).collect(),
            Err(err) => {
                tracing::warn!("failed to list positions: {}", err);
                Vec::new()
            },
        }
    }

    /// 保存一份快照，返回新键
    ///
    /// 序号取现有位置数；若该键已被占用（中间有删除），顺延到下一个空闲序号。
    pub fn store(&self, angles: &JointAngles) -> Option<String> {
        let _guard = self.write.lock();
        match self.try_store(angles) {
            Ok(id) => {
                tracing::info!("stored position {}", id);
                Some(id)
            },
            Err(err) => {
                tracing::warn!("failed to store position: {}", err);
                None
            },
        }
    }

    fn try_store(&self, angles: &JointAngles) -> Result<String, StoreError> {
        let existing = self.position_keys()?;
        let taken: Vec<u32> = existing.iter().map(|(n, _)| *n).collect();

        let mut n = existing.len() as u32;
        while taken.contains(&n) {
            n += 1;
        }
        let id = position_id(n);

        let snapshot: BTreeMap<usize, Option<f64>> = angles
            .iter_joints()
            .map(|(joint, angle)| (joint.index(), *angle))
            .collect();
        let value = serde_json::to_string(&snapshot).map_err(|source| StoreError::Encode {
            key: id.clone(),
            source,
        })?;

        self.storage.set(&id, value)?;
        Ok(id)
    }

    /// 删除位置；不存在或存储失败时返回 `false`
    pub fn delete(&self, id: &str) -> bool {
        if parse_position_id(id).is_none() {
            return false;
        }
        let _guard = self.write.lock();
        match self.storage.remove(id) {
            Ok(removed) => removed,
            Err(err) => {
                tracing::warn!("failed to delete position {}: {}", id, err);
                false
            },
        }
    }

    /// 读取快照
    pub fn load(&self, id: &str) -> Result<JointAngles, ClientError> {
        if parse_position_id(id).is_none() {
            return Err(ClientError::PositionNotFound(id.to_string()));
        }
        let raw = self
            .storage
            .get(id)?
            .ok_or_else(|| ClientError::PositionNotFound(id.to_string()))?;
        let snapshot: BTreeMap<usize, Option<f64>> =
            serde_json::from_str(&raw).map_err(|source| StoreError::Decode {
                key: id.to_string(),
                source,
            })?;

        let mut angles = JointArray::splat(None);
        for (index, angle) in snapshot {
            match Joint::from_index(index) {
                Some(joint) => angles[joint] = angle,
                None => tracing::warn!("{}: ignoring unknown joint index {}", id, index),
            }
        }
        Ok(angles)
    }

    /// 转换为驱动目标（1-based 编号，跳过未知角度）
    ///
    /// 与显示一致，角度取绝对值。
    pub fn drive_targets(&self, id: &str) -> Result<Vec<JointTarget>, ClientError> {
        let angles = self.load(id)?;
        angles
            .iter_joints()
            .filter_map(|(joint, angle)| angle.map(|angle| (joint, angle.abs())))
            .map(|(joint, angle)| JointTarget::new(joint, angle).map_err(ClientError::from))
            .collect()
    }

    /// 驱动机械臂到保存的位置
    pub async fn drive_to<T: Transport>(
        &self,
        gateway: &CommandGateway<T>,
        id: &str,
    ) -> Result<Ack, ClientError> {
        let targets = self.drive_targets(id)?;
        tracing::info!("driving to {} ({} joints)", id, targets.len());
        Ok(gateway.drive_steppers_to_angles(&targets).await?)
    }
}

impl Default for PositionStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angles(values: [Option<f64>; 6]) -> JointAngles {
        JointArray::new(values)
    }

    #[test]
    fn test_store_list_delete() {
        let store = PositionStore::in_memory();
        let id = store
            .store(&angles([Some(1.0), None, None, None, None, None]))
            .unwrap();
        assert_eq!(id, "pos_0");
        assert!(store.list().contains(&id));

        assert!(store.delete(&id));
        assert!(!store.list().contains(&id));
        assert!(!store.delete(&id));
    }

    #[test]
    fn test_ids_do_not_collide_after_delete() {
        let store = PositionStore::in_memory();
        let snapshot = angles([Some(0.0); 6]);
        store.store(&snapshot).unwrap();
        store.store(&snapshot).unwrap();
        assert!(store.delete("pos_0"));

        // 现有 1 个位置，但 pos_1 已被占用
        let id = store.store(&snapshot).unwrap();
        assert_eq!(id, "pos_2");
        assert_eq!(store.list(), vec!["pos_1", "pos_2"]);
    }

    #[test]
    fn test_snapshot_format() {
        let backing = Arc::new(MemoryStore::new());
        let store = PositionStore::new(backing.clone());
        store
            .store(&angles([Some(12.5), None, Some(40.0), None, None, Some(90.0)]))
            .unwrap();

        let raw = backing.get("pos_0").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"0": 12.5, "1": null, "2": 40.0, "3": null, "4": null, "5": 90.0})
        );
    }

    #[test]
    fn test_drive_targets_skip_unknown() {
        let store = PositionStore::in_memory();
        let id = store
            .store(&angles([Some(10.0), None, Some(20.5), None, None, None]))
            .unwrap();

        let targets = store.drive_targets(&id).unwrap();
        let pairs: Vec<(u8, f64)> = targets.into_iter().map(Into::into).collect();
        assert_eq!(pairs, vec![(1, 10.0), (3, 20.5)]);
    }

    #[test]
    fn test_drive_targets_use_displayed_magnitude() {
        let store = PositionStore::in_memory();
        let id = store
            .store(&angles([None, None, None, Some(-30.0), None, None]))
            .unwrap();

        let pairs: Vec<(u8, f64)> = store
            .drive_targets(&id)
            .unwrap()
            .into_iter()
            .map(Into::into)
            .collect();
        assert_eq!(pairs, vec![(4, 30.0)]);
    }

    #[test]
    fn test_load_missing() {
        let store = PositionStore::in_memory();
        assert!(matches!(
            store.load("pos_9"),
            Err(ClientError::PositionNotFound(_))
        ));
        assert!(store.load("other").is_err());
    }

    #[test]
    fn test_foreign_keys_are_not_positions() {
        let backing = Arc::new(MemoryStore::new());
        backing.set("theme", "dark".to_string()).unwrap();
        let store = PositionStore::new(backing);

        assert!(store.list().is_empty());
        assert_eq!(store.store(&angles([None; 6])).as_deref(), Some("pos_0"));
    }
}
