use crate::config::{AggregateConfig, CellMode, LabelsConfig};
use crate::models::{CellValue, PriceResult, ResultRow};
use crate::utils::error::{AppError, Result};

/// Turns per-task results into report cells and rows.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    mode: CellMode,
    separator: String,
    labels: LabelsConfig,
}

impl ResultAggregator {
    pub fn new(config: &AggregateConfig, labels: &LabelsConfig) -> Self {
        Self {
            mode: config.mode,
            separator: config.separator.clone(),
            labels: labels.clone(),
        }
    }

    /// Applies the cell mode: distinct prices in first-seen order, or only
    /// the first one.
    pub fn combine(&self, result: PriceResult) -> PriceResult {
        match result {
            PriceResult::Found(prices) => {
                let mut kept: Vec<String> = Vec::with_capacity(prices.len());
                for price in prices {
                    if !kept.contains(&price) {
                        kept.push(price);
                    }
                    if self.mode == CellMode::First {
                        break;
                    }
                }
                PriceResult::from_prices(kept)
            }
            other => other,
        }
    }

    /// Builds a row, refusing anything but exactly one result per site.
    pub fn row(
        &self,
        query: impl Into<String>,
        results: Vec<PriceResult>,
        site_count: usize,
    ) -> Result<ResultRow> {
        let query = query.into();
        if results.len() != site_count {
            return Err(AppError::Internal(format!(
                "Row for '{}' has {} results for {} sites",
                query,
                results.len(),
                site_count
            )));
        }

        Ok(ResultRow {
            query,
            results: results.into_iter().map(|r| self.combine(r)).collect(),
        })
    }

    pub fn render(&self, result: &PriceResult) -> String {
        match result {
            PriceResult::Found(prices) => prices
                .iter()
                .map(|p| p.trim_end())
                .collect::<Vec<_>>()
                .join(&self.separator),
            PriceResult::NotFound => self.labels.not_found.clone(),
            PriceResult::Error => self.labels.error.clone(),
        }
    }

    /// Structured form for JSON output: raw prices, or the sentinel label.
    pub fn value(&self, result: &PriceResult) -> CellValue {
        match result {
            PriceResult::Found(prices) => CellValue::Prices(prices.clone()),
            other => CellValue::Label(self.render(other)),
        }
    }

    pub fn render_row(&self, row: &ResultRow) -> Vec<String> {
        std::iter::once(row.query.clone())
            .chain(row.results.iter().map(|r| self.render(r)))
            .collect()
    }
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new(&AggregateConfig::default(), &LabelsConfig::default())
    }
}
