use std::sync::Mutex;
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

/// 單一 ETL 階段的耗時與記憶體
#[derive(Debug, Clone)]
pub struct PhaseStats {
    pub phase: String,
    pub elapsed: Duration,
    pub memory_mb: Option<u64>,
}

/// 記錄每個 ETL 階段 (extract / transform / load) 的耗時，
/// 啟用 `cli` feature 時另外透過 sysinfo 取得記憶體用量
pub struct SystemMonitor {
    enabled: bool,
    start_time: Instant,
    last_mark: Mutex<Instant>,
    phases: Mutex<Vec<PhaseStats>>,
    #[cfg(feature = "cli")]
    system: Mutex<System>,
    #[cfg(feature = "cli")]
    pid: Option<Pid>,
}

impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let now = Instant::now();
        Self {
            enabled,
            start_time: now,
            last_mark: Mutex::new(now),
            phases: Mutex::new(Vec::new()),
            #[cfg(feature = "cli")]
            system: Mutex::new(System::new_with_specifics(RefreshKind::everything())),
            #[cfg(feature = "cli")]
            pid: sysinfo::get_current_pid().ok(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[cfg(feature = "cli")]
    fn memory_mb(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        system.refresh_all();
        system.process(pid).map(|p| p.memory() / 1024 / 1024)
    }

    #[cfg(not(feature = "cli"))]
    fn memory_mb(&self) -> Option<u64> {
        None
    }

    /// 結束一個階段：記錄從上一個標記到現在的耗時
    pub fn mark(&self, phase: &str) {
        if !self.enabled {
            return;
        }

        let elapsed = match self.last_mark.lock() {
            Ok(mut last) => {
                let elapsed = last.elapsed();
                *last = Instant::now();
                elapsed
            }
            Err(_) => return,
        };

        let stats = PhaseStats {
            phase: phase.to_string(),
            elapsed,
            memory_mb: self.memory_mb(),
        };

        match stats.memory_mb {
            Some(mb) => tracing::info!("📊 {} - {:?}, Memory: {}MB", phase, elapsed, mb),
            None => tracing::info!("📊 {} - {:?}", phase, elapsed),
        }

        if let Ok(mut phases) = self.phases.lock() {
            phases.push(stats);
        }
    }

    pub fn phases(&self) -> Vec<PhaseStats> {
        self.phases.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn log_final_stats(&self) {
        if !self.enabled {
            return;
        }

        let peak = self.phases().iter().filter_map(|p| p.memory_mb).max();
        match peak {
            Some(peak) => tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
                self.start_time.elapsed(),
                peak
            ),
            None => tracing::info!("📊 Final Stats - Total Time: {:?}", self.start_time.elapsed()),
        }
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
