//! 仪表盘
//!
//! 进程内唯一的状态入口：一次性构造命令网关、关节状态、连接状态和位置存储，
//! 之后通过句柄共享。所有需要连接的操作都先检查连接状态。
//!
//! # 示例
//!
//! ```rust,no_run
//! use robert_client::{DashboardBuilder, SimulatedArm};
//! use robert_protocol::Joint;
//!
//! # async fn demo() -> Result<(), robert_client::ClientError> {
//! let dashboard = DashboardBuilder::new(SimulatedArm::new()).build()?;
//! dashboard.connection().connect_to_port("/dev/ttyACM0").await?;
//! dashboard.calibrate(Joint::J1).await?;
//! let id = dashboard.store_current_position()?;
//! dashboard.replay_position(&id).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::ClientConfig;
use crate::connection::ConnectionState;
use crate::error::{ClientError, Result};
use crate::gateway::CommandGateway;
use crate::notify::Notifier;
use crate::positions::{JsonFileStore, KeyValueStore, MemoryStore, PositionStore};
use crate::script::{ParsedInstruction, ScriptError, ScriptRunner};
use crate::stepper::{Direction, StepperSettings, StepperState};
use crate::transport::Transport;
use robert_protocol::{Joint, JointTarget};
use std::sync::Arc;
use std::time::Duration;

/// 仪表盘构造器
pub struct DashboardBuilder<T> {
    transport: T,
    config: ClientConfig,
    notifier: Notifier,
    storage: Option<Arc<dyn KeyValueStore>>,
    script_delay: Duration,
}

impl<T: Transport> DashboardBuilder<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            config: ClientConfig::default(),
            notifier: Notifier::silent(),
            storage: None,
            script_delay: Duration::ZERO,
        }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// 指定位置存储介质（覆盖配置中的 `storage.positions_file`）
    pub fn storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// 脚本指令之间的等待时间
    pub fn script_delay(mut self, delay: Duration) -> Self {
        self.script_delay = delay;
        self
    }

    pub fn build(self) -> Result<Dashboard<T>> {
        let settings = StepperSettings::try_from(&self.config)?;

        let positions_file = &self.config.storage.positions_file;
        let storage: Arc<dyn KeyValueStore> = match (self.storage, positions_file) {
            (Some(storage), _) => storage,
            (None, Some(path)) => {
                tracing::debug!("positions stored in {}", path.display());
                Arc::new(JsonFileStore::new(path))
            },
            (None, None) => Arc::new(MemoryStore::new()),
        };

        let gateway = Arc::new(CommandGateway::new(self.transport));
        let stepper = StepperState::new(Arc::clone(&gateway), self.notifier.clone(), settings);
        let connection =
            ConnectionState::new(Arc::clone(&gateway), stepper, self.notifier.clone());

        Ok(Dashboard {
            gateway,
            connection,
            positions: Arc::new(PositionStore::new(storage)),
            notifier: self.notifier,
            script_delay: self.script_delay,
        })
    }
}

/// 仪表盘句柄
pub struct Dashboard<T> {
    gateway: Arc<CommandGateway<T>>,
    connection: ConnectionState<T>,
    positions: Arc<PositionStore>,
    notifier: Notifier,
    script_delay: Duration,
}

impl<T> Clone for Dashboard<T> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            connection: self.connection.clone(),
            positions: Arc::clone(&self.positions),
            notifier: self.notifier.clone(),
            script_delay: self.script_delay,
        }
    }
}

impl<T: Transport> Dashboard<T> {
    pub fn connection(&self) -> &ConnectionState<T> {
        &self.connection
    }

    pub fn stepper(&self) -> &StepperState<T> {
        self.connection.stepper()
    }

    pub fn positions(&self) -> &PositionStore {
        &self.positions
    }

    pub fn gateway(&self) -> &CommandGateway<T> {
        &self.gateway
    }

    /// 重新查询使能状态、角度和运动参数
    pub async fn refresh(&self) -> Result<()> {
        self.connection.require_connected()?;
        self.stepper().initialize_steppers_info().await;
        Ok(())
    }

    pub async fn toggle_stepper(&self, joint: Joint) -> Result<bool> {
        self.connection.require_connected()?;
        Ok(self.stepper().toggle_stepper(joint).await?)
    }

    pub async fn calibrate(&self, joint: Joint) -> Result<()> {
        self.connection.require_connected()?;
        Ok(self.stepper().handle_calibrate(joint).await?)
    }

    pub async fn calibrate_all(&self) -> Result<()> {
        self.connection.require_connected()?;
        Ok(self.stepper().handle_calibrate_all().await?)
    }

    pub async fn set_velocity(&self, velocity: i64) -> Result<()> {
        self.connection.require_connected()?;
        Ok(self.stepper().set_velocity(velocity).await?)
    }

    pub async fn set_acceleration(&self, acceleration: i64) -> Result<()> {
        self.connection.require_connected()?;
        Ok(self.stepper().set_acceleration(acceleration).await?)
    }

    pub async fn nudge(&self, joint: Joint, direction: Direction) -> Result<()> {
        self.connection.require_connected()?;
        Ok(self.stepper().nudge(joint, direction).await?)
    }

    /// 驱动一组关节到绝对角度
    ///
    /// 所有目标先做限位检查，任何一个越界都不会发出命令。
    pub async fn drive_to_angles(&self, targets: &[(Joint, f64)]) -> Result<()> {
        self.connection.require_connected()?;
        let targets = targets
            .iter()
            .map(|&(joint, angle)| JointTarget::new(joint, angle))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        self.gateway
            .drive_steppers_to_angles(&targets)
            .await
            .inspect_err(|err| self.notifier.error(err.to_string()))?;
        Ok(())
    }

    /// 保存当前角度为新位置
    pub fn store_current_position(&self) -> Result<String> {
        self.connection.require_connected()?;
        match self.positions.store(&self.stepper().angles()) {
            Some(id) => {
                self.notifier.success(format!("Position saved as {}", id));
                Ok(id)
            },
            None => {
                self.notifier.error("Failed to save position");
                Err(ClientError::StoreFailed)
            },
        }
    }

    /// 回放保存的位置
    pub async fn replay_position(&self, id: &str) -> Result<()> {
        self.connection.require_connected()?;
        match self.positions.drive_to(&self.gateway, id).await {
            Ok(_) => {
                self.notifier.success(format!("Moving to {}", id));
                Ok(())
            },
            Err(ClientError::Gateway(err)) => {
                self.notifier.error(err.to_string());
                Err(err.into())
            },
            Err(err) => Err(err),
        }
    }

    /// 删除保存的位置
    pub fn delete_position(&self, id: &str) -> bool {
        let deleted = self.positions.delete(id);
        if deleted {
            self.notifier.success(format!("Position {} deleted", id));
        } else {
            self.notifier.error(format!("Failed to delete {}", id));
        }
        deleted
    }

    /// 执行脚本
    ///
    /// 参数错误时不执行任何指令。开始执行后，无论成功与否都会重新查询
    /// 使能状态和运动参数。
    pub async fn run_script(&self, instructions: &[ParsedInstruction]) -> Result<usize> {
        self.connection.require_connected()?;

        let runner = ScriptRunner::new(&self.gateway).with_delay(self.script_delay);
        match runner.run(instructions).await {
            Ok(count) => {
                self.resync().await;
                self.notifier
                    .success(format!("Script finished ({} instructions)", count));
                Ok(count)
            },
            Err(err @ ScriptError::Step { .. }) => {
                // 失败前已执行的指令可能改变了后端状态
                self.resync().await;
                self.notifier.error(err.to_string());
                Err(err.into())
            },
            Err(err) => Err(err.into()),
        }
    }

    async fn resync(&self) {
        if let Err(err) = self.stepper().refresh_states().await {
            self.notifier.error(err.to_string());
        }
        if let Err(err) = self.stepper().refresh_parameters().await {
            self.notifier.error(err.to_string());
        }
    }
}
