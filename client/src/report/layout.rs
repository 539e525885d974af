use shared::{DetectionResult, MediaKind};

use crate::images::EmbeddableImage;

// A4 geometry in millimeters, matching the original report layout.
pub const PAGE_WIDTH_MM: f64 = 210.0;
pub const PAGE_HEIGHT_MM: f64 = 297.0;
pub const MARGIN_MM: f64 = 15.0;
pub const CONTENT_WIDTH_MM: f64 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;

const LOGO_WIDTH_MM: f64 = 50.0;
const LOGO_HEIGHT_MM: f64 = 20.0;
const LOGO_ADVANCE_MM: f64 = 30.0;

const VISUAL_TOP_MM: f64 = 30.0;
const SUBJECT_HEIGHT_MM: f64 = 150.0;
const HEATMAP_HEIGHT_MM: f64 = 80.0;
const HEATMAP_ADVANCE_MM: f64 = 90.0;
const PAGE_BREAK_Y_MM: f64 = 250.0;
const TIME_SERIES_HEIGHT_MM: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        x: f64,
        y: f64,
        size: f64,
        bold: bool,
        align: Align,
        text: String,
    },
    /// `image_index` points into `ReportDocument::images`.
    Image {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        image_index: usize,
    },
}

#[derive(Debug, Default)]
pub struct Page {
    pub elements: Vec<Element>,
}

impl Page {
    fn text(&mut self, x: f64, y: f64, size: f64, bold: bool, align: Align, text: String) {
        self.elements.push(Element::Text {
            x,
            y,
            size,
            bold,
            align,
            text,
        });
    }

    fn heading(&mut self, text: &str) {
        self.text(MARGIN_MM, 20.0, 14.0, true, Align::Left, text.to_string());
    }
}

/// Fully planned report: deterministic element placement, ready to render.
#[derive(Debug, Default)]
pub struct ReportDocument {
    pub pages: Vec<Page>,
    pub images: Vec<EmbeddableImage>,
    pub file_name: String,
}

impl ReportDocument {
    fn add_image(&mut self, image: EmbeddableImage) -> usize {
        self.images.push(image);
        self.images.len() - 1
    }
}

/// Image fetch outcomes feeding the plan. Heatmap slots stay aligned with
/// `DetectionResult::heatmap_urls`; a `None` is a failed fetch and simply
/// takes no space.
#[derive(Debug, Default)]
pub struct ReportInputs {
    pub logo: Option<EmbeddableImage>,
    pub subject: Option<EmbeddableImage>,
    pub heatmaps: Vec<Option<EmbeddableImage>>,
    pub time_series: Option<EmbeddableImage>,
}

pub fn report_file_name(content_hash: &str) -> String {
    format!("Deepfake_Report_{content_hash}.pdf")
}

/// Lay the report out. Pure: same result + same fetch outcomes + same
/// timestamp string give the same document.
pub fn plan_report(
    result: &DetectionResult,
    generated_at: &str,
    inputs: ReportInputs,
) -> ReportDocument {
    let mut doc = ReportDocument {
        file_name: report_file_name(&result.content_hash),
        ..Default::default()
    };

    let summary = summary_page(result, generated_at, inputs.logo, &mut doc.images);
    doc.pages.push(summary);

    match result.kind {
        MediaKind::Image => {
            if result.image_url.is_some() {
                let mut page = Page::default();
                page.heading("Analyzed Image");
                if let Some(subject) = inputs.subject {
                    let index = doc.add_image(subject);
                    page.elements.push(Element::Image {
                        x: MARGIN_MM,
                        y: VISUAL_TOP_MM,
                        width: CONTENT_WIDTH_MM,
                        height: SUBJECT_HEIGHT_MM,
                        image_index: index,
                    });
                }
                doc.pages.push(page);
            }
        }
        MediaKind::Video => {
            if !inputs.heatmaps.is_empty() {
                heatmap_pages(&mut doc, inputs.heatmaps);
            }
            if result.time_series_plot_url.is_some() {
                let mut page = Page::default();
                page.heading("Time Series Plot");
                if let Some(plot) = inputs.time_series {
                    let index = doc.add_image(plot);
                    page.elements.push(Element::Image {
                        x: MARGIN_MM,
                        y: VISUAL_TOP_MM,
                        width: CONTENT_WIDTH_MM,
                        height: TIME_SERIES_HEIGHT_MM,
                        image_index: index,
                    });
                }
                doc.pages.push(page);
            }
        }
    }

    doc
}

fn summary_page(
    result: &DetectionResult,
    generated_at: &str,
    logo: Option<EmbeddableImage>,
    images: &mut Vec<EmbeddableImage>,
) -> Page {
    let mut page = Page::default();
    let mut y = 20.0;

    // A missing logo shifts everything up; no reserved gap is left behind.
    if let Some(logo) = logo {
        images.push(logo);
        page.elements.push(Element::Image {
            x: PAGE_WIDTH_MM / 2.0 - LOGO_WIDTH_MM / 2.0,
            y,
            width: LOGO_WIDTH_MM,
            height: LOGO_HEIGHT_MM,
            image_index: images.len() - 1,
        });
        y += LOGO_ADVANCE_MM;
    }

    page.text(
        PAGE_WIDTH_MM / 2.0,
        y,
        18.0,
        true,
        Align::Center,
        "Deepfake Detection Report".to_string(),
    );
    y += 12.0;

    page.text(
        MARGIN_MM,
        y,
        10.0,
        false,
        Align::Left,
        format!("Report Date: {generated_at}"),
    );
    page.text(
        PAGE_WIDTH_MM - MARGIN_MM,
        y,
        10.0,
        false,
        Align::Right,
        format!("Content Hash: {}", result.content_hash),
    );
    y += 10.0;

    page.text(
        MARGIN_MM,
        y,
        14.0,
        true,
        Align::Left,
        "Detection Result".to_string(),
    );
    y += 8.0;

    page.text(
        MARGIN_MM,
        y,
        12.0,
        false,
        Align::Left,
        format!("Prediction: {}", result.prediction),
    );
    // The zero sentinel renders as its own state, never as "0.0%".
    let confidence_text = if result.confidence.is_no_face() {
        "Confidence Score: No face detected".to_string()
    } else {
        format!(
            "Confidence Score: {:.1}%",
            result.confidence.score() * 100.0
        )
    };
    page.text(
        PAGE_WIDTH_MM / 2.0,
        y,
        12.0,
        false,
        Align::Left,
        confidence_text,
    );
    y += 8.0;

    page.text(
        MARGIN_MM,
        y,
        12.0,
        false,
        Align::Left,
        format!("Time Taken: {:.2} secs", result.inference_time_seconds),
    );
    page.text(
        PAGE_WIDTH_MM / 2.0,
        y,
        12.0,
        false,
        Align::Left,
        format!("Total Frames: {}", result.total_frames),
    );
    y += 12.0;

    page.text(
        MARGIN_MM,
        y,
        14.0,
        true,
        Align::Left,
        "Detailed Metrics".to_string(),
    );
    y += 8.0;

    let metrics = [
        ("Real Score", result.avg_real_confidence),
        ("DF(From original) Score", result.avg_deepfake_og_confidence),
        ("DF(Latest) Score", result.avg_deepfake_confidence),
    ];
    for (label, value) in metrics {
        // Absent aggregates are skipped outright, never printed as blanks.
        if let Some(value) = value {
            page.text(
                MARGIN_MM,
                y,
                12.0,
                false,
                Align::Left,
                format!("{label}: {value:.3}"),
            );
            y += 6.0;
        }
    }

    page
}

/// Sequential heatmap placement with strict look-ahead pagination: a page
/// break happens only when another fetched image is still waiting, so the
/// final image never produces a trailing blank page. Failed fetches take no
/// part in the arithmetic.
fn heatmap_pages(doc: &mut ReportDocument, heatmaps: Vec<Option<EmbeddableImage>>) {
    let fetched: Vec<EmbeddableImage> = heatmaps.into_iter().flatten().collect();
    let count = fetched.len();

    let mut page = Page::default();
    page.heading("Heatmaps");
    let mut y = VISUAL_TOP_MM;

    for (index, image) in fetched.into_iter().enumerate() {
        let image_index = doc.add_image(image);
        page.elements.push(Element::Image {
            x: MARGIN_MM,
            y,
            width: CONTENT_WIDTH_MM,
            height: HEATMAP_HEIGHT_MM,
            image_index,
        });
        y += HEATMAP_ADVANCE_MM;

        if y > PAGE_BREAK_Y_MM && index != count - 1 {
            doc.pages.push(std::mem::take(&mut page));
            y = VISUAL_TOP_MM;
        }
    }

    doc.pages.push(page);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::ImageData;
    use shared::{Confidence, Prediction};

    fn test_image() -> EmbeddableImage {
        EmbeddableImage {
            width: 4,
            height: 4,
            data: ImageData::Rgb8(vec![0; 4 * 4 * 3]),
        }
    }

    fn video_result() -> DetectionResult {
        DetectionResult {
            kind: MediaKind::Video,
            content_hash: "video_1700000000000".into(),
            prediction: Prediction::DeepfakeLatest,
            confidence: Confidence::Score(0.82),
            is_deepfake: true,
            total_frames: 30,
            frame_confidences: vec![0.82; 30],
            avg_real_confidence: Some(0.12),
            avg_deepfake_og_confidence: None,
            avg_deepfake_confidence: Some(0.88),
            heatmap_urls: Vec::new(),
            time_series_plot_url: None,
            image_url: None,
            video_url: None,
            inference_time_seconds: 1.23,
        }
    }

    fn page_texts(page: &Page) -> Vec<&str> {
        page.elements
            .iter()
            .filter_map(|element| match element {
                Element::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn image_count(page: &Page) -> usize {
        page.elements
            .iter()
            .filter(|element| matches!(element, Element::Image { .. }))
            .count()
    }

    fn doc_contains(doc: &ReportDocument, needle: &str) -> bool {
        doc.pages
            .iter()
            .any(|page| page_texts(page).iter().any(|text| text.contains(needle)))
    }

    #[test]
    fn file_name_derives_from_content_hash() {
        let doc = plan_report(&video_result(), "2026-08-30 10:00:00", ReportInputs::default());
        assert_eq!(doc.file_name, "Deepfake_Report_video_1700000000000.pdf");
    }

    #[test]
    fn missing_logo_shifts_title_up() {
        let with_logo = plan_report(
            &video_result(),
            "ts",
            ReportInputs {
                logo: Some(test_image()),
                ..Default::default()
            },
        );
        let without_logo = plan_report(&video_result(), "ts", ReportInputs::default());

        let title_y = |doc: &ReportDocument| {
            doc.pages[0]
                .elements
                .iter()
                .find_map(|element| match element {
                    Element::Text { y, text, .. } if text == "Deepfake Detection Report" => {
                        Some(*y)
                    }
                    _ => None,
                })
                .unwrap()
        };
        assert_eq!(title_y(&with_logo), 50.0);
        assert_eq!(title_y(&without_logo), 20.0);
    }

    #[test]
    fn absent_aggregates_are_skipped() {
        let doc = plan_report(&video_result(), "ts", ReportInputs::default());
        assert!(doc_contains(&doc, "Real Score: 0.120"));
        assert!(doc_contains(&doc, "DF(Latest) Score: 0.880"));
        assert!(!doc_contains(&doc, "DF(From original)"));
    }

    #[test]
    fn no_face_renders_distinct_from_low_real_score() {
        let mut no_face = video_result();
        no_face.prediction = Prediction::Real;
        no_face.confidence = Confidence::NoFace;
        let doc = plan_report(&no_face, "ts", ReportInputs::default());
        assert!(doc_contains(&doc, "Confidence Score: No face detected"));

        let mut barely_real = video_result();
        barely_real.prediction = Prediction::Real;
        barely_real.confidence = Confidence::Score(0.003);
        let doc = plan_report(&barely_real, "ts", ReportInputs::default());
        assert!(doc_contains(&doc, "Confidence Score: 0.3%"));
        assert!(!doc_contains(&doc, "No face detected"));
    }

    #[test]
    fn timeseries_without_heatmaps_gets_its_own_page_only() {
        let mut result = video_result();
        result.time_series_plot_url = Some("http://x/plot.png".into());
        let doc = plan_report(
            &result,
            "ts",
            ReportInputs {
                time_series: Some(test_image()),
                ..Default::default()
            },
        );
        assert_eq!(doc.pages.len(), 2);
        assert!(doc_contains(&doc, "Time Series Plot"));
        assert!(!doc_contains(&doc, "Heatmaps"));
    }

    #[test]
    fn three_heatmaps_fit_one_page_without_trailing_break() {
        let mut result = video_result();
        result.heatmap_urls = vec!["a".into(), "b".into(), "c".into()];
        let doc = plan_report(
            &result,
            "ts",
            ReportInputs {
                heatmaps: vec![Some(test_image()), Some(test_image()), Some(test_image())],
                ..Default::default()
            },
        );
        // summary + one heatmap page; the last image never forces a new page
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(image_count(&doc.pages[1]), 3);
    }

    #[test]
    fn fourth_heatmap_starts_a_second_page() {
        let mut result = video_result();
        result.heatmap_urls = (0..4).map(|i| format!("hm{i}")).collect();
        let doc = plan_report(
            &result,
            "ts",
            ReportInputs {
                heatmaps: (0..4).map(|_| Some(test_image())).collect(),
                ..Default::default()
            },
        );
        assert_eq!(doc.pages.len(), 3);
        assert_eq!(image_count(&doc.pages[1]), 3);
        assert_eq!(image_count(&doc.pages[2]), 1);
    }

    #[test]
    fn failed_fetches_take_no_space_in_pagination() {
        let mut result = video_result();
        result.heatmap_urls = (0..4).map(|i| format!("hm{i}")).collect();
        let doc = plan_report(
            &result,
            "ts",
            ReportInputs {
                heatmaps: vec![
                    Some(test_image()),
                    None,
                    Some(test_image()),
                    Some(test_image()),
                ],
                ..Default::default()
            },
        );
        // Three survivors fit one page; the failure neither advances the
        // cursor nor triggers the look-ahead break.
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(image_count(&doc.pages[1]), 3);
    }

    #[test]
    fn heatmap_page_appears_even_if_every_fetch_failed() {
        let mut result = video_result();
        result.heatmap_urls = vec!["hm0".into(), "hm1".into()];
        let doc = plan_report(
            &result,
            "ts",
            ReportInputs {
                heatmaps: vec![None, None],
                ..Default::default()
            },
        );
        assert_eq!(doc.pages.len(), 2);
        assert!(doc_contains(&doc, "Heatmaps"));
        assert_eq!(image_count(&doc.pages[1]), 0);
    }

    #[test]
    fn image_kind_embeds_subject_on_new_page() {
        let mut result = video_result();
        result.kind = MediaKind::Image;
        result.image_url = Some("http://x/face.png".into());
        let doc = plan_report(
            &result,
            "ts",
            ReportInputs {
                subject: Some(test_image()),
                ..Default::default()
            },
        );
        assert_eq!(doc.pages.len(), 2);
        assert!(doc_contains(&doc, "Analyzed Image"));
        assert_eq!(image_count(&doc.pages[1]), 1);
    }
}
