//! 运动脚本
//!
//! 按行解析的小型指令语言：
//!
//! ```text
//! // 注释和空行被忽略
//! CALIBRATE>J1;J2;J3;J4
//! TOGGLE>J1_ENABLED;J2_ENABLED
//! SETVEL>50
//! SETACC>30
//! MOVE>J1_10;J2_20
//! ```
//!
//! 参数以 `;` 分隔并去除首尾空白；`SETVEL`/`SETACC` 把 `>` 之后的全部内容
//! 作为一个参数。任何无法识别的行都会使整个解析失败。
//!
//! 执行时按顺序逐条调用命令网关，遇到第一个失败即停止。

use crate::gateway::{CommandGateway, GatewayError};
use crate::transport::Transport;
use robert_protocol::{Joint, JointTarget, ProtocolError, StepperToggle};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 脚本错误
#[derive(Error, Debug)]
pub enum ScriptError {
    /// 无法识别的行
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// 参数格式错误
    #[error("Instruction {index} ({command}): invalid parameter `{parameter}`")]
    InvalidParameter {
        index: usize,
        command: ScriptCommand,
        parameter: String,
    },

    /// 目标角度非法
    #[error("Instruction {index}: {source}")]
    Limit {
        index: usize,
        #[source]
        source: ProtocolError,
    },

    /// 执行失败
    #[error("Instruction {index}: {source}")]
    Step {
        index: usize,
        #[source]
        source: GatewayError,
    },

    #[error("Error reading the file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 脚本指令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptCommand {
    Move,
    Toggle,
    Calibrate,
    SetVel,
    SetAcc,
}

impl ScriptCommand {
    pub const ALL: [ScriptCommand; 5] = [
        ScriptCommand::Move,
        ScriptCommand::Toggle,
        ScriptCommand::Calibrate,
        ScriptCommand::SetVel,
        ScriptCommand::SetAcc,
    ];

    pub const fn keyword(self) -> &'static str {
        match self {
            ScriptCommand::Move => "MOVE",
            ScriptCommand::Toggle => "TOGGLE",
            ScriptCommand::Calibrate => "CALIBRATE",
            ScriptCommand::SetVel => "SETVEL",
            ScriptCommand::SetAcc => "SETACC",
        }
    }

    /// 整个剩余部分作为单个参数
    const fn takes_single_parameter(self) -> bool {
        matches!(self, ScriptCommand::SetVel | ScriptCommand::SetAcc)
    }
}

impl fmt::Display for ScriptCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// 解析后的一条指令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInstruction {
    pub command: ScriptCommand,
    pub params: Vec<String>,
}

impl ParsedInstruction {
    pub fn new<I, S>(command: ScriptCommand, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command,
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// 转换为可执行动作
    ///
    /// `index` 是指令序号（1-based），用于错误信息。空参数被忽略，
    /// 但 `MOVE`/`TOGGLE`/`CALIBRATE` 至少需要一个非空参数。
    pub fn to_action(&self, index: usize) -> Result<ScriptAction, ScriptError> {
        let invalid = |parameter: &str| ScriptError::InvalidParameter {
            index,
            command: self.command,
            parameter: parameter.to_string(),
        };
        let params = self.params.iter().map(String::as_str).filter(|p| !p.is_empty());
        if !self.command.takes_single_parameter() && params.clone().next().is_none() {
            return Err(invalid(&self.params.join(";")));
        }

        match self.command {
            ScriptCommand::Move => {
                let targets = params
                    .map(|param| {
                        let (joint, angle) = param.split_once('_').ok_or_else(|| invalid(param))?;
                        let joint: Joint = joint.parse().map_err(|_| invalid(param))?;
                        let angle: f64 = angle.trim().parse().map_err(|_| invalid(param))?;
                        JointTarget::new(joint, angle)
                            .map_err(|source| ScriptError::Limit { index, source })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ScriptAction::Drive(targets))
            },
            ScriptCommand::Toggle => {
                let toggles = params
                    .map(|param| {
                        let (joint, state) = param.split_once('_').ok_or_else(|| invalid(param))?;
                        let joint: Joint = joint.parse().map_err(|_| invalid(param))?;
                        let state: StepperToggle = state.parse().map_err(|_| invalid(param))?;
                        Ok((joint, state))
                    })
                    .collect::<Result<Vec<_>, ScriptError>>()?;
                Ok(ScriptAction::Toggle(toggles))
            },
            ScriptCommand::Calibrate => {
                let joints = params
                    .map(|param| param.parse::<Joint>().map_err(|_| invalid(param)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ScriptAction::Calibrate(joints))
            },
            ScriptCommand::SetVel | ScriptCommand::SetAcc => {
                let raw = self.params.first().map(String::as_str).unwrap_or_default();
                let value: f64 = raw.parse().map_err(|_| invalid(raw))?;
                if !value.is_finite() {
                    return Err(invalid(raw));
                }
                let value = value.round() as i64;
                Ok(if self.command == ScriptCommand::SetVel {
                    ScriptAction::SetVelocity(value)
                } else {
                    ScriptAction::SetAcceleration(value)
                })
            },
        }
    }
}

/// 可执行动作
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptAction {
    /// 一次驱动命令
    Drive(Vec<JointTarget>),
    /// 逐个切换使能
    Toggle(Vec<(Joint, StepperToggle)>),
    /// 一次校准命令
    Calibrate(Vec<Joint>),
    SetVelocity(i64),
    SetAcceleration(i64),
}

/// 解析脚本文本
pub fn parse_script(content: &str) -> Result<Vec<ParsedInstruction>, ScriptError> {
    let mut instructions = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        let parsed = ScriptCommand::ALL.iter().find_map(|&command| {
            line.strip_prefix(command.keyword())
                .and_then(|rest| rest.strip_prefix('>'))
                .map(|rest| (command, rest))
        });
        let (command, rest) = parsed.ok_or_else(|| ScriptError::InvalidCommand(line.to_string()))?;

        let instruction = if command.takes_single_parameter() {
            ParsedInstruction::new(command, [rest.trim()])
        } else {
            ParsedInstruction::new(command, rest.split(';').map(str::trim))
        };
        instructions.push(instruction);
    }

    Ok(instructions)
}

/// 读取并解析脚本文件
pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<ParsedInstruction>, ScriptError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ScriptError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_script(&content)
}

/// 脚本执行器
pub struct ScriptRunner<'a, T> {
    gateway: &'a CommandGateway<T>,
    delay: Duration,
}

impl<'a, T: Transport> ScriptRunner<'a, T> {
    pub fn new(gateway: &'a CommandGateway<T>) -> Self {
        Self {
            gateway,
            delay: Duration::ZERO,
        }
    }

    /// 指令之间的等待时间
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// 依次执行，返回执行成功的指令数
    ///
    /// 所有指令先转换为动作再开始执行，参数错误不会留下执行了一半的脚本。
    pub async fn run(&self, instructions: &[ParsedInstruction]) -> Result<usize, ScriptError> {
        let actions = instructions
            .iter()
            .enumerate()
            .map(|(i, instruction)| instruction.to_action(i + 1))
            .collect::<Result<Vec<_>, _>>()?;

        for (i, action) in actions.iter().enumerate() {
            let index = i + 1;
            tracing::info!("script {}/{}: {:?}", index, actions.len(), action);
            self.execute(action)
                .await
                .map_err(|source| ScriptError::Step { index, source })?;

            if !self.delay.is_zero() && index < actions.len() {
                tokio::time::sleep(self.delay).await;
            }
        }

        Ok(actions.len())
    }

    async fn execute(&self, action: &ScriptAction) -> Result<(), GatewayError> {
        match action {
            ScriptAction::Drive(targets) => {
                self.gateway.drive_steppers_to_angles(targets).await?;
            },
            ScriptAction::Toggle(toggles) => {
                for &(joint, state) in toggles {
                    self.gateway.toggle_stepper(joint, state).await?;
                }
            },
            ScriptAction::Calibrate(joints) => {
                self.gateway.calibrate_steppers(joints).await?;
            },
            ScriptAction::SetVelocity(value) => {
                self.gateway.set_velocity(*value).await?;
            },
            ScriptAction::SetAcceleration(value) => {
                self.gateway.set_acceleration(*value).await?;
            },
        }
        Ok(())
    }
}
