use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use crate::images::{EmbeddableImage, ImageData};

use super::layout::{Align, Element, Page, PAGE_HEIGHT_MM, PAGE_WIDTH_MM, ReportDocument};

const MM_TO_PT: f64 = 72.0 / 25.4;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("pdf assembly failed: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("report i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Render a planned document into PDF bytes. Any failure here is the single
/// "failed to generate report" error the caller surfaces; partial image
/// failures were already absorbed during planning.
pub fn render_pdf(document: &ReportDocument) -> Result<Vec<u8>, ReportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let font_bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });

    let image_ids: Vec<_> = document
        .images
        .iter()
        .map(|image| doc.add_object(image_xobject(image)))
        .collect();

    let mut kids: Vec<Object> = Vec::new();
    for page in &document.pages {
        let content = page_content(page);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let mut xobjects = lopdf::Dictionary::new();
        for (index, id) in image_ids.iter().enumerate() {
            xobjects.set(format!("Im{index}"), Object::Reference(*id));
        }
        let resources = dictionary! {
            "Font" => dictionary! {
                "F1" => Object::Reference(font_regular),
                "F2" => Object::Reference(font_bold),
            },
            "XObject" => Object::Dictionary(xobjects),
        };

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
            "Resources" => Object::Dictionary(resources),
            "MediaBox" => vec![
                0.into(),
                0.into(),
                ((PAGE_WIDTH_MM * MM_TO_PT) as f32).into(),
                ((PAGE_HEIGHT_MM * MM_TO_PT) as f32).into(),
            ],
        });
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

fn page_content(page: &Page) -> Content {
    let mut operations = Vec::new();
    for element in &page.elements {
        match element {
            Element::Text {
                x,
                y,
                size,
                bold,
                align,
                text,
            } => {
                let font = if *bold { "F2" } else { "F1" };
                let x_mm = match align {
                    Align::Left => *x,
                    Align::Center => *x - text_width_mm(text, *size) / 2.0,
                    Align::Right => *x - text_width_mm(text, *size),
                };
                let x_pt = (x_mm * MM_TO_PT) as f32;
                let y_pt = ((PAGE_HEIGHT_MM - *y) * MM_TO_PT) as f32;

                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec![font.into(), (*size as f32).into()]));
                operations.push(Operation::new("Td", vec![x_pt.into(), y_pt.into()]));
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(text.as_str())],
                ));
                operations.push(Operation::new("ET", vec![]));
            }
            Element::Image {
                x,
                y,
                width,
                height,
                image_index,
            } => {
                let w_pt = (*width * MM_TO_PT) as f32;
                let h_pt = (*height * MM_TO_PT) as f32;
                let x_pt = (*x * MM_TO_PT) as f32;
                // Layout y is the image top in top-left coordinates; the PDF
                // transform anchors at the bottom-left corner.
                let y_pt = ((PAGE_HEIGHT_MM - (*y + *height)) * MM_TO_PT) as f32;

                operations.push(Operation::new("q", vec![]));
                operations.push(Operation::new(
                    "cm",
                    vec![
                        w_pt.into(),
                        0.into(),
                        0.into(),
                        h_pt.into(),
                        x_pt.into(),
                        y_pt.into(),
                    ],
                ));
                operations.push(Operation::new(
                    "Do",
                    vec![format!("Im{image_index}").as_str().into()],
                ));
                operations.push(Operation::new("Q", vec![]));
            }
        }
    }
    Content { operations }
}

/// Rough Helvetica advance used only for right/center alignment; exact
/// metrics are not worth a font table here.
fn text_width_mm(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * 0.5 / MM_TO_PT
}

fn image_xobject(image: &EmbeddableImage) -> Stream {
    match &image.data {
        ImageData::Jpeg(bytes) => Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            bytes.clone(),
        ),
        ImageData::Rgb8(data) => Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            data.clone(),
        ),
    }
}
