//! REPL 模式（交互式 Shell）
//!
//! 专用输入线程 + crossbeam 通道，保留历史记录，不阻塞 tokio。
//! 会话期间仪表盘只构造一次，连接状态、关节状态和角度上报订阅都在
//! 多条命令之间保持。

use anyhow::Result;
use crossbeam_channel::{Receiver, bounded};
use robert_client::{Dashboard, Direction, Notification, SimulatedArm, parse_file};
use robert_protocol::Joint;
use rustyline::Editor;
use std::path::Path;
use std::thread;

use super::{build_dashboard, print_joint_table, print_notifications};
use crate::validation::{parse_direction, parse_drive_targets, parse_joint, parse_percent};

/// REPL 会话（保持连接）
pub struct ReplSession {
    dashboard: Dashboard<SimulatedArm>,
    notifications: Receiver<Notification>,
}

impl ReplSession {
    pub fn new(config_path: &Path) -> Result<Self> {
        let (dashboard, notifications) = build_dashboard(config_path)?;
        Ok(Self {
            dashboard,
            notifications,
        })
    }

    /// 状态描述
    pub fn status(&self) -> String {
        let connection = self.dashboard.connection();
        format!(
            "{} ({}) [{}]",
            connection.phase(),
            connection.selected_port_label(),
            connection.phase().indicator_color()
        )
    }

    fn flush(&self) {
        print_notifications(&self.notifications);
    }
}

/// REPL 输入（专用输入线程）
pub struct ReplInput {
    command_rx: Receiver<String>,
    _input_thread: thread::JoinHandle<Result<()>>,
}

impl ReplInput {
    /// 创建专用输入线程（保留历史记录）
    pub fn new() -> Self {
        let (command_tx, command_rx) = bounded::<String>(10);

        // Editor 在输入线程内创建，生命周期与 REPL 会话相同
        let input_thread = thread::spawn(move || {
            use rustyline::history::DefaultHistory;

            let mut rl = Editor::<(), DefaultHistory>::new()
                .map_err(|e| anyhow::anyhow!("Failed to initialize readline: {}", e))?;

            let history_path = ".robert_history";
            rl.load_history(history_path).ok(); // 首次运行时没有历史文件

            println!("ROBERT CLI v{} - 交互式 Shell", env!("CARGO_PKG_VERSION"));
            println!("输入 'help' 查看帮助，'exit' 退出");
            println!();

            loop {
                match rl.readline("robert> ") {
                    Ok(line) => {
                        let line = line.trim().to_string();

                        if line.is_empty() {
                            continue;
                        }

                        if line == "exit" || line == "quit" {
                            rl.save_history(history_path).ok();
                            let _ = command_tx.send(line);
                            break;
                        }

                        let _ = rl.add_history_entry(line.clone());

                        if command_tx.send(line).is_err() {
                            break; // 主线程已关闭
                        }
                    },

                    Err(rustyline::error::ReadlineError::Interrupted) => {
                        println!("^C");
                    },

                    Err(rustyline::error::ReadlineError::Eof) => {
                        rl.save_history(history_path).ok();
                        let _ = command_tx.send("exit".to_string());
                        break;
                    },

                    Err(err) => {
                        eprintln!("Error: {:?}", err);
                        break;
                    },
                }
            }

            Ok(())
        });

        Self {
            command_rx,
            _input_thread: input_thread,
        }
    }

    /// 等待用户输入（在 tokio 任务中使用）
    pub async fn recv_command(&self) -> Option<String> {
        let rx = self.command_rx.clone();
        tokio::task::spawn_blocking(move || rx.recv())
            .await
            .ok()
            .and_then(|result| result.ok())
    }
}

/// 运行 REPL 模式
pub async fn run_repl(config_path: &Path) -> Result<()> {
    let session = ReplSession::new(config_path)?;
    let input = ReplInput::new();

    println!();
    println!("💡 提示: 使用 'ports' 查看串口，'connect <port>' 连接");
    println!();

    loop {
        tokio::select! {
            line = input.recv_command() => {
                let Some(line) = line else {
                    break;
                };

                match line.as_str() {
                    "exit" | "quit" => {
                        // 退出前断开，释放订阅
                        if let Err(err) = session.dashboard.connection().disconnect_port().await {
                            tracing::debug!("disconnect on exit failed: {}", err);
                        }
                        session.flush();
                        println!("👋 再见！");
                        break;
                    }

                    "help" => print_help(),

                    _ => {
                        let result = handle_command(&line, &session).await;
                        session.flush();
                        if let Err(err) = result {
                            // 已通知的错误不重复打印
                            let notified = err
                                .downcast_ref::<robert_client::ClientError>()
                                .is_some_and(|e| e.is_notified());
                            if !notified {
                                eprintln!("❌ Error: {}", err);
                                print_help_hint(&line);
                            }
                        }
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n🛑 收到 Ctrl+C，断开连接...");
                let _ = session.dashboard.connection().disconnect_port().await;
                session.flush();
                break;
            }
        }
    }

    Ok(())
}

/// 处理命令
async fn handle_command(line: &str, session: &ReplSession) -> Result<()> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some((&command, args)) = parts.split_first() else {
        return Ok(());
    };
    let dashboard = &session.dashboard;
    let connection = dashboard.connection();

    match command {
        "ports" => {
            let ports = connection.refresh_ports().await?;
            for port in ports {
                println!("  {}", port);
            }
        },

        "port" => {
            let port = args.first().ok_or_else(|| anyhow::anyhow!("缺少串口参数"))?;
            connection.set_port(port);
            println!("📌 选中串口: {}", connection.selected_port_label());
        },

        "connect" => {
            let port = match args.first() {
                Some(port) => port.to_string(),
                None => connection.selected_port_label(),
            };
            connection.connect_to_port(&port).await?;
        },

        "disconnect" => {
            connection.disconnect_port().await?;
        },

        "status" => {
            println!("📊 连接: {}", session.status());
            if connection.is_connected() {
                print_joint_table(dashboard);
            }
        },

        "refresh" => {
            dashboard.refresh().await?;
            print_joint_table(dashboard);
        },

        "toggle" => {
            let joint = parse_joint(args.first().copied())?;
            let enabled = dashboard.toggle_stepper(joint).await?;
            println!("⚡ {} {}", joint, if enabled { "ENABLED" } else { "DISABLED" });
        },

        "calibrate" => match args.first().copied() {
            Some("all") | None => dashboard.calibrate_all().await?,
            Some(joint) => dashboard.calibrate(parse_joint(Some(joint))?).await?,
        },

        "vel" => dashboard.set_velocity(parse_percent(args.first().copied())?).await?,

        "acc" => {
            dashboard
                .set_acceleration(parse_percent(args.first().copied())?)
                .await?
        },

        "nudge" => {
            let joint = parse_joint(args.first().copied())?;
            let direction = parse_direction(args.get(1).copied())?;
            dashboard.nudge(joint, direction).await?;
            let sign = if direction == Direction::Forward { "+" } else { "-" };
            println!(
                "↔️  {} {}{} 步",
                joint,
                sign,
                dashboard.stepper().settings().increment_steps
            );
        },

        "move" => {
            let targets = parse_drive_targets(args)?;
            dashboard.drive_to_angles(&targets).await?;
            println!("✅ 驱动命令已发送");
        },

        "angles" => {
            for joint in Joint::ALL {
                println!("  {}: {}", joint, dashboard.stepper().display_angle(joint));
            }
        },

        "store" => {
            dashboard.store_current_position()?;
        },

        "positions" => {
            let ids = dashboard.positions().list();
            if ids.is_empty() {
                println!("(没有保存的位置)");
            }
            for id in ids {
                println!("  {}", id);
            }
        },

        "goto" => {
            let id = args.first().ok_or_else(|| anyhow::anyhow!("缺少位置编号"))?;
            dashboard.replay_position(id).await?;
        },

        "delete" => {
            let id = args.first().ok_or_else(|| anyhow::anyhow!("缺少位置编号"))?;
            dashboard.delete_position(id);
        },

        "run" => {
            let path = args.first().ok_or_else(|| anyhow::anyhow!("缺少脚本路径"))?;
            let instructions = parse_file(path)?;
            let count = dashboard.run_script(&instructions).await?;
            println!("📜 执行了 {} 条指令", count);
        },

        _ => {
            anyhow::bail!("未知命令: {}", command);
        },
    }

    Ok(())
}

/// 打印帮助信息
fn print_help() {
    println!("可用命令:");
    println!("  ports                         列出可用串口");
    println!("  port <name>                   选择串口（不连接）");
    println!("  connect [port]                连接（默认使用选中的串口）");
    println!("  disconnect                    断开连接");
    println!("  status                        显示连接和关节状态");
    println!("  refresh                       重新查询关节状态");
    println!("  toggle <J1-J6>                切换电机使能");
    println!("  calibrate [J1-J6|all]         校准关节");
    println!("  vel <0-100> / acc <0-100>     设置速度 / 加速度");
    println!("  nudge <J1-J6> <+|->           按配置步数微调");
    println!("  move J1=<deg> [J2=<deg> ...]  驱动到绝对角度");
    println!("  angles                        显示当前角度");
    println!("  store                         保存当前位置");
    println!("  positions                     列出保存的位置");
    println!("  goto <pos_n>                  回放位置");
    println!("  delete <pos_n>                删除位置");
    println!("  run <file>                    执行运动脚本");
    println!("  help                          显示帮助");
    println!("  exit / quit                   退出");
    println!();
    println!("快捷键:");
    println!("  Ctrl+C                        断开并退出");
    println!("  Ctrl+D                        退出");
    println!();
}

/// 提供基于错误的帮助提示
fn print_help_hint(command: &str) {
    if command.starts_with("move") {
        eprintln!("💡 提示: 使用 'move J1=90 J2=45' 驱动关节");
    } else if command.starts_with("connect") {
        eprintln!("💡 提示: 使用 'ports' 查看串口，然后 'connect /dev/ttyACM0'");
    } else if command.starts_with("nudge") {
        eprintln!("💡 提示: 使用 'nudge J1 +' 或 'nudge J1 -'");
    } else {
        eprintln!("💡 提示: 输入 'help' 查看所有命令");
    }
}
