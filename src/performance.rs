use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::AppConfig;
use crate::executor::CommandRunner;
use crate::system::{self, NetDevCounters};

/// Numeric host metrics for `/system/performance`.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct PerformanceReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_usage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_usage: Option<f64>,
    pub network: BTreeMap<String, NetDevCounters>,
}

#[derive(Error, Debug, PartialEq)]
pub enum PerformanceError {
    #[error("{metric} probe returned non-numeric output: {raw:?}")]
    NonNumeric { metric: &'static str, raw: String },
}

fn numeric(metric: &'static str, raw: Option<String>) -> Result<Option<f64>, PerformanceError> {
    raw.map(|raw| {
        raw.trim()
            .parse::<f64>()
            .map_err(|_| PerformanceError::NonNumeric { metric, raw })
    })
    .transpose()
}

/// Collect CPU, memory and disk usage plus per-interface byte counters.
///
/// A probe that fails is left out; a probe that succeeds with output that is
/// not a number fails the whole report.
pub async fn collect(
    runner: &dyn CommandRunner,
    config: &AppConfig,
) -> Result<PerformanceReport, PerformanceError> {
    let (cpu, memory, disk, net_dev) = tokio::join!(
        system::probe_cpu(runner),
        system::probe_memory(runner),
        system::probe_disk(runner),
        tokio::fs::read_to_string(&config.paths.proc_net_dev),
    );

    let network = match net_dev {
        Ok(text) => system::parse_net_dev(&text, &config.performance.interfaces),
        Err(e) => {
            debug!(
                path = %config.paths.proc_net_dev.display(),
                error = %e,
                "net dev stats unavailable"
            );
            BTreeMap::new()
        }
    };

    Ok(PerformanceReport {
        cpu_usage: numeric("cpu_usage", cpu)?,
        memory_usage: memory,
        disk_usage: numeric("disk_usage", disk)?,
        network,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_accepts_absent_and_numbers() {
        assert_eq!(numeric("cpu_usage", None), Ok(None));
        assert_eq!(numeric("cpu_usage", Some(" 12.5 ".into())), Ok(Some(12.5)));
    }

    #[test]
    fn numeric_rejects_text() {
        let err = numeric("disk_usage", Some("n/a".into())).unwrap_err();
        assert_eq!(err.to_string(), "disk_usage probe returned non-numeric output: \"n/a\"");
    }
}
