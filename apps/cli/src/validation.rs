//! 输入验证模块
//!
//! 解析 REPL 命令参数。角度限位由仪表盘在发送前检查，这里只负责格式。

use anyhow::{Context, Result};
use robert_client::Direction;
use robert_protocol::Joint;

/// 解析关节编号（`J1`、`j1` 或 `1`）
pub fn parse_joint(arg: Option<&str>) -> Result<Joint> {
    let arg = arg.ok_or_else(|| anyhow::anyhow!("缺少关节参数（J1-J6）"))?;
    Ok(arg.parse::<Joint>()?)
}

/// 解析微调方向（`+`/`-`，缺省为 `+`）
pub fn parse_direction(arg: Option<&str>) -> Result<Direction> {
    match arg.unwrap_or("+") {
        "+" | "fwd" | "forward" => Ok(Direction::Forward),
        "-" | "back" | "backward" => Ok(Direction::Backward),
        other => anyhow::bail!("无效的方向: {}（使用 + 或 -）", other),
    }
}

/// 解析百分比参数（超出 0-100 的值由仪表盘限幅）
pub fn parse_percent(arg: Option<&str>) -> Result<i64> {
    let arg = arg.ok_or_else(|| anyhow::anyhow!("缺少数值参数（0-100）"))?;
    arg.parse::<i64>()
        .with_context(|| format!("无效的数值: {}", arg))
}

/// 解析驱动目标列表：`J1=90 J2=45`（也接受脚本写法 `J1_90`）
pub fn parse_drive_targets(args: &[&str]) -> Result<Vec<(Joint, f64)>> {
    if args.is_empty() {
        anyhow::bail!("缺少目标角度（如 J1=90）");
    }

    args.iter()
        .map(|arg| {
            let (joint, angle) = arg
                .split_once('=')
                .or_else(|| arg.split_once('_'))
                .ok_or_else(|| anyhow::anyhow!("无效的目标: {}（使用 J1=90）", arg))?;
            let joint = joint.parse::<Joint>()?;
            let angle = angle
                .parse::<f64>()
                .with_context(|| format!("无效的角度: {}", angle))?;
            if !angle.is_finite() {
                anyhow::bail!("{} 角度无效: {}", joint, angle);
            }
            Ok((joint, angle))
        })
        .collect()
}
