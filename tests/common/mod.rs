#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use ean_report::error::{SessionError, SessionFailure};
use ean_report::models::{AcquiredFile, Batch};
use ean_report::orchestrator::{SessionLauncher, StopSignal};
use ean_report::workflow::{SessionCtx, SessionState};
use futures::future::BoxFuture;
use rust_xlsxwriter::Workbook;

/// 假会话的结果
#[derive(Clone)]
pub enum Scripted {
    /// 写出给定内容的文件
    Content(Vec<u8>),
    /// 复制已有的文件
    Copy(PathBuf),
    /// 下载超时
    Timeout,
    /// 返回一个磁盘上不存在的文件
    Vanished,
}

/// 不启动浏览器的会话启动器
pub struct FakeLauncher {
    dir: PathBuf,
    script: HashMap<usize, Scripted>,
    stop_at: Option<(usize, StopSignal)>,
    pub seen: Mutex<Vec<usize>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeLauncher {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            script: HashMap::new(),
            stop_at: None,
            seen: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, batch_index: usize, outcome: Scripted) -> Self {
        self.script.insert(batch_index, outcome);
        self
    }

    /// 运行到指定批次时触发停止信号
    pub fn stop_during(mut self, batch_index: usize, stop: StopSignal) -> Self {
        self.stop_at = Some((batch_index, stop));
        self
    }

    pub fn seen(&self) -> Vec<usize> {
        let mut seen = self.seen.lock().unwrap().clone();
        seen.sort_unstable();
        seen
    }

    /// 同时运行的会话数峰值
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn produce(&self, batch: &Batch) -> Result<AcquiredFile, SessionFailure> {
        let path = self.dir.join(format!("report_batch_{:03}.xlsx", batch.index));
        let outcome = self
            .script
            .get(&batch.index)
            .cloned()
            .unwrap_or_else(|| Scripted::Content(format!("batch {}: {}", batch.index, batch.codes.join(" ")).into_bytes()));

        match outcome {
            Scripted::Content(bytes) => {
                std::fs::write(&path, &bytes).unwrap();
                Ok(AcquiredFile::new(batch.index, path, bytes.len() as u64))
            }
            Scripted::Copy(source) => {
                let size = std::fs::copy(source, &path).unwrap();
                Ok(AcquiredFile::new(batch.index, path, size))
            }
            Scripted::Timeout => Err(SessionFailure {
                batch_index: batch.index,
                state: SessionState::ExportClicked,
                error: SessionError::DownloadTimeout { secs: 60 },
            }),
            Scripted::Vanished => Ok(AcquiredFile::new(batch.index, self.dir.join("gone.xlsx"), 10)),
        }
    }
}

impl SessionLauncher for FakeLauncher {
    fn run_batch(&self, batch: Batch, _ctx: SessionCtx) -> BoxFuture<'_, Result<AcquiredFile, SessionFailure>> {
        Box::pin(async move {
            self.seen.lock().unwrap().push(batch.index);
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(running, Ordering::SeqCst);
            // 让出一次，窗口内的其他会话在此期间启动
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if let Some((index, stop)) = &self.stop_at {
                if *index == batch.index {
                    stop.trigger();
                }
            }
            self.produce(&batch)
        })
    }
}

pub fn codes(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("{:013}", i)).collect()
}

/// 写一个只有值的 xlsx
pub fn write_xlsx(path: &Path, headers: &[&str], rows: &[Vec<Cell>]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (c, h) in headers.iter().enumerate() {
        sheet.write_string(0, c as u16, *h).unwrap();
    }
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let (r, c) = (r as u32 + 1, c as u16);
            match cell {
                Cell::Text(s) => {
                    sheet.write_string(r, c, *s).unwrap();
                }
                Cell::Num(n) => {
                    sheet.write_number(r, c, *n).unwrap();
                }
                Cell::Blank => {}
            }
        }
    }
    workbook.save(path).unwrap();
}

pub enum Cell {
    Text(&'static str),
    Num(f64),
    Blank,
}
