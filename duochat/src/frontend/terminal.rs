use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use crate::commands;
use crate::infrastructure::{AppEvent, AppState};
use crate::modules::chat::{ChatDomainEvent, Message, TerminationReason};
use crate::modules::room::RoomEvent;
use crate::shared::{AppError, AppResult, LoginAs, SendResult, SessionSummary};

const HISTORY_LIMIT: usize = 50;

const HELP: &str = "\
/login <master|client|anon> [name]  sign in a new session
/use <name>                        switch the active session
/sessions                          list open sessions
/logout                            log out the active session
/force                             (master) force the client to log out
/press | /release                  hold control
/status                            active session status
/history                           stored messages of the default conversation
/room join|leave|show              open chat room
/room say <text>                   post to the open room
/config [reset]                    show or reset the saved configuration
/quit                              exit
anything else                      send as a message";

/// 终端输入解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCommand {
    Login { login_as: LoginAs, name: String },
    Use(String),
    Sessions,
    Logout,
    Force,
    Press,
    Release,
    Status,
    History,
    RoomJoin,
    RoomLeave,
    RoomShow,
    RoomSay(String),
    ShowConfig,
    ResetConfig,
    Help,
    Quit,
    Send(String),
    Empty,
}

/// 解析一行输入
pub fn parse_line(line: &str) -> Result<TerminalCommand, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(TerminalCommand::Empty);
    }
    if !line.starts_with('/') {
        return Ok(TerminalCommand::Send(line.to_string()));
    }

    let mut parts = line[1..].splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default().trim();

    match verb {
        "login" => {
            let mut args = rest.split_whitespace();
            let identity = args.next().ok_or("usage: /login <master|client|anon> [name]")?;
            let login_as = identity.parse::<LoginAs>()?;
            let name = args.next().unwrap_or(identity).to_string();
            Ok(TerminalCommand::Login { login_as, name })
        }
        "use" if !rest.is_empty() => Ok(TerminalCommand::Use(rest.to_string())),
        "use" => Err("usage: /use <name>".to_string()),
        "sessions" => Ok(TerminalCommand::Sessions),
        "logout" => Ok(TerminalCommand::Logout),
        "force" => Ok(TerminalCommand::Force),
        "press" => Ok(TerminalCommand::Press),
        "release" => Ok(TerminalCommand::Release),
        "status" => Ok(TerminalCommand::Status),
        "history" => Ok(TerminalCommand::History),
        "help" => Ok(TerminalCommand::Help),
        "config" => match rest {
            "" => Ok(TerminalCommand::ShowConfig),
            "reset" => Ok(TerminalCommand::ResetConfig),
            _ => Err("usage: /config [reset]".to_string()),
        },
        "quit" | "exit" => Ok(TerminalCommand::Quit),
        "room" => {
            let mut args = rest.splitn(2, char::is_whitespace);
            match (args.next().unwrap_or_default(), args.next().map(str::trim)) {
                ("join", _) => Ok(TerminalCommand::RoomJoin),
                ("leave", _) => Ok(TerminalCommand::RoomLeave),
                ("show", _) => Ok(TerminalCommand::RoomShow),
                ("say", Some(text)) if !text.is_empty() => {
                    Ok(TerminalCommand::RoomSay(text.to_string()))
                }
                _ => Err("usage: /room join|leave|show|say <text>".to_string()),
            }
        }
        other => Err(format!("unknown command '/{}', try /help", other)),
    }
}

fn format_message(message: &Message) -> String {
    let time = message.timestamp().format("%H:%M:%S");
    if message.is_system() {
        format!("{} * {}", time, message.text())
    } else {
        format!("{} <{}> {}", time, message.sender_id(), message.text())
    }
}

fn format_summary(summary: &SessionSummary) -> String {
    let mut line = format!("{} [{:?}]", summary.name, summary.state);
    if let (Some(uid), Some(role)) = (&summary.uid, summary.role) {
        line.push_str(&format!(" {} as {}", uid, role.as_str()));
    }
    if let Some(remaining) = summary.remaining {
        line.push_str(&format!(", {} message(s) left", remaining));
    }
    if summary.hold_armed {
        line.push_str(", hold timer armed");
    }
    line
}

/// 事件渲染，只显示新增的最后一条消息
fn render_event(event: &AppEvent) -> Option<String> {
    match event {
        AppEvent::ErrorDialog { message } => Some(format!("!! {}", message)),
        AppEvent::AuthChanged { session, uid } => Some(match uid {
            Some(uid) => format!("-- {} signed in as {}", session, uid),
            None => format!("-- {} signed out", session),
        }),
        AppEvent::Chat { session, event } => match event {
            ChatDomainEvent::MessagesUpdated(e) => e
                .messages
                .last()
                .map(|m| format!("[{}] {}", session, format_message(m))),
            ChatDomainEvent::SessionTerminated(e) => Some(format!(
                "-- {} ended ({}), {} message(s) deleted",
                session,
                match e.reason {
                    TerminationReason::UserLogout => "logout",
                    TerminationReason::ForcedLogout => "forced logout",
                    TerminationReason::HoldTimeout => "hold timeout",
                    TerminationReason::SignedOut => "signed out",
                },
                e.deleted_messages
            )),
            ChatDomainEvent::CounterReset(_) => Some(format!("-- {} counter reset", session)),
            _ => None,
        },
        AppEvent::Room { event } => match event {
            RoomEvent::MessagesUpdated { room_id, messages } => messages
                .last()
                .map(|m| format!("#{} {}", room_id, format_message(m))),
            RoomEvent::Joined { room_id, uid } => Some(format!("#{} joined as {}", room_id, uid)),
            RoomEvent::Left { room_id } => Some(format!("#{} left", room_id)),
        },
    }
}

async fn dispatch(state: &AppState, command: TerminalCommand) -> AppResult<Option<String>> {
    let output = match command {
        TerminalCommand::Empty => None,
        TerminalCommand::Help => Some(HELP.to_string()),
        TerminalCommand::Quit => None,
        TerminalCommand::Login { login_as, name } => {
            let summary = commands::session_login(state, &name, login_as).await?;
            Some(format_summary(&summary))
        }
        TerminalCommand::Use(name) => {
            let summary = commands::session_use(state, &name).await?;
            Some(format_summary(&summary))
        }
        TerminalCommand::Sessions => {
            let lines: Vec<String> = commands::session_list(state)
                .await
                .iter()
                .map(format_summary)
                .collect();
            Some(if lines.is_empty() {
                "no sessions".to_string()
            } else {
                lines.join("\n")
            })
        }
        TerminalCommand::Logout => {
            commands::session_logout(state).await?;
            None
        }
        TerminalCommand::Force => {
            commands::session_force_logout(state).await?;
            Some("force logout requested".to_string())
        }
        TerminalCommand::Press => {
            let armed = commands::session_press_hold(state).await?;
            Some(format!("hold {}", if armed { "armed" } else { "disarmed" }))
        }
        TerminalCommand::Release => {
            let armed = commands::session_release_hold(state).await?;
            Some(format!("hold {}", if armed { "armed" } else { "disarmed" }))
        }
        TerminalCommand::Status => {
            let summary = commands::session_status(state).await?;
            Some(format_summary(&summary))
        }
        TerminalCommand::History => {
            let messages = commands::chat_fetch_history(state, HISTORY_LIMIT).await?;
            Some(
                messages
                    .iter()
                    .map(|m| format!("{} <{}> {}", m.timestamp.format("%H:%M:%S"), m.sender_id, m.text))
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
        }
        TerminalCommand::RoomJoin => {
            commands::room_join(state).await?;
            None
        }
        TerminalCommand::RoomLeave => {
            commands::room_leave(state).await?;
            None
        }
        TerminalCommand::RoomShow => Some(
            commands::room_messages(state)
                .await
                .iter()
                .map(|m| format!("{} <{}> {}", m.timestamp.format("%H:%M:%S"), m.sender_id, m.text))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        TerminalCommand::RoomSay(text) => {
            commands::room_say(state, &text).await?;
            None
        }
        TerminalCommand::ShowConfig => {
            let config = commands::config_get_all(state).await?;
            Some(
                serde_json::to_string_pretty(&config)
                    .map_err(|e| AppError::Unknown(e.to_string()))?,
            )
        }
        TerminalCommand::ResetConfig => {
            commands::config_reset(state).await?;
            Some("configuration reset, restart to apply".to_string())
        }
        TerminalCommand::Send(text) => match commands::chat_send_message(state, &text).await? {
            SendResult::Delivered { .. } => None,
            SendResult::Unlocked { .. } => Some("message limit reset".to_string()),
        },
    };
    Ok(output)
}

fn spawn_renderer(mut events: broadcast::Receiver<AppEvent>) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(line) = render_event(&event) {
                        println!("{}", line);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("[Terminal] Renderer skipped {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// 运行终端前端，直到 `/quit` 或输入结束
pub async fn run_terminal(state: Arc<AppState>) -> AppResult<()> {
    spawn_renderer(state.event_bus.subscribe());
    println!("duochat ready, /help for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(usage) => {
                println!("{}", usage);
                continue;
            }
        };
        if command == TerminalCommand::Quit {
            break;
        }

        match dispatch(&state, command).await {
            Ok(Some(output)) if !output.is_empty() => println!("{}", output),
            Ok(_) => {}
            Err(e) if e.is_dialog_worthy() => {}
            Err(e) => println!("error: {}", e),
        }

        for name in commands::session_prune(&state).await {
            tracing::debug!("[Terminal] Pruned ended session '{}'", name);
        }
    }

    state.shutdown().await;
    Ok(())
}
