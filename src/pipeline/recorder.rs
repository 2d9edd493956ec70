//! 追加写入的 JSON Lines 记录器
//!
//! 每条记录序列化为一行并一次性写入，不会出现半条记录。

use crate::error::PersistenceError;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// 输出文件名前缀
pub const FILE_PREFIX: &str = "site-vitals";

/// 本次运行的输出文件路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFiles {
    /// 探测结果文件
    pub results: PathBuf,
    /// 事件文件
    pub events: PathBuf,
}

impl RunFiles {
    /// 根据运行开始时间生成两个输出文件路径
    pub fn new(output_dir: &Path, started_at: DateTime<Local>) -> Self {
        let stamp = started_at.format("%Y%m%d_%H%M%S");
        Self {
            results: output_dir.join(format!("{FILE_PREFIX}-{stamp}-results.jsonl")),
            events: output_dir.join(format!("{FILE_PREFIX}-{stamp}-events.jsonl")),
        }
    }
}

/// 只追加的 JSON Lines 写入器，由唯一的写入任务独占
#[derive(Debug)]
pub struct JsonLinesWriter {
    file: File,
    path: PathBuf,
    written: u64,
}

impl JsonLinesWriter {
    /// 以追加模式打开（或创建）文件
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| PersistenceError::Open {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            file,
            path,
            written: 0,
        })
    }

    /// 写入一条记录并刷新
    pub async fn append<T: Serialize>(&mut self, record: &T) -> Result<(), PersistenceError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        self.file
            .write_all(&line)
            .await
            .map_err(|source| PersistenceError::Write {
                path: self.path.clone(),
                source,
            })?;
        self.file
            .flush()
            .await
            .map_err(|source| PersistenceError::Write {
                path: self.path.clone(),
                source,
            })?;

        self.written += 1;
        Ok(())
    }

    /// 文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 已写入的记录数
    pub fn written(&self) -> u64 {
        self.written
    }
}
