//! 通知模块
//!
//! 提供事件类型、消息模板、Discord/邮件发送器与通知分发器

pub mod discord;
pub mod dispatcher;
pub mod email;
pub mod event;
pub mod sender;
pub mod template;

// 重新导出主要类型
pub use discord::DiscordSender;
pub use dispatcher::Dispatcher;
pub use email::EmailSender;
pub use event::{Event, EventKind};
pub use sender::{NotificationSender, SenderRegistry};
pub use template::{HandlebarsTemplate, MessageTemplate};
