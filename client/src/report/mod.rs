mod layout;
mod pdf;

pub use layout::{Element, Page, ReportDocument, ReportInputs, plan_report, report_file_name};
pub use pdf::{ReportError, render_pdf};

use shared::{DetectionResult, MediaKind};

use crate::images::RemoteImageFetcher;

/// Turns a `DetectionResult` into a paginated PDF report. Referenced images
/// are fetched best-effort, strictly in order; a failed fetch degrades the
/// document instead of failing it.
pub struct ReportAssembler {
    fetcher: RemoteImageFetcher,
    logo_url: Option<String>,
}

impl ReportAssembler {
    pub fn new(fetcher: RemoteImageFetcher) -> Self {
        Self {
            fetcher,
            logo_url: None,
        }
    }

    pub fn with_logo_url(mut self, url: impl Into<String>) -> Self {
        self.logo_url = Some(url.into());
        self
    }

    pub async fn assemble(&self, result: &DetectionResult) -> ReportDocument {
        let inputs = self.gather(result).await;
        let generated_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        plan_report(result, &generated_at, inputs)
    }

    /// Assemble and render in one go, returning the deterministic file name
    /// alongside the bytes.
    pub async fn render(&self, result: &DetectionResult) -> Result<(String, Vec<u8>), ReportError> {
        let document = self.assemble(result).await;
        let bytes = render_pdf(&document)?;
        Ok((document.file_name, bytes))
    }

    async fn gather(&self, result: &DetectionResult) -> ReportInputs {
        let logo = match &self.logo_url {
            Some(url) => self.fetcher.fetch_optional(url).await,
            None => None,
        };

        let subject = match (result.kind, &result.image_url) {
            (MediaKind::Image, Some(url)) => self.fetcher.fetch_optional(url).await,
            _ => None,
        };

        let mut heatmaps = Vec::with_capacity(result.heatmap_urls.len());
        if result.kind == MediaKind::Video {
            for url in &result.heatmap_urls {
                heatmaps.push(self.fetcher.fetch_optional(url).await);
            }
        }

        let time_series = match (result.kind, &result.time_series_plot_url) {
            (MediaKind::Video, Some(url)) => self.fetcher.fetch_optional(url).await,
            _ => None,
        };

        ReportInputs {
            logo,
            subject,
            heatmaps,
            time_series,
        }
    }
}
