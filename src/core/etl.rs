use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub fn monitor(&self) -> &SystemMonitor {
        &self.monitor
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting ETL process...");

        // Extract
        let raw_data = self.pipeline.extract().await?;
        tracing::info!("📥 Extracted {} raw sheets", raw_data.len());
        self.monitor.mark("extract");

        // Transform
        let transformed = self.pipeline.transform(raw_data).await?;
        let records: usize = transformed.tables.iter().map(|t| t.records.len()).sum();
        tracing::info!(
            "🔄 Transformed {} months ({} records, {} skipped)",
            transformed.tables.len(),
            records,
            transformed.skipped.len()
        );
        self.monitor.mark("transform");

        // Load
        let output_path = self.pipeline.load(transformed).await?;
        tracing::info!("💾 Output saved to: {}", output_path);
        self.monitor.mark("load");

        self.monitor.log_final_stats();
        Ok(output_path)
    }
}
