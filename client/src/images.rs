use image::GenericImageView;
use log::warn;

#[derive(Debug, thiserror::Error)]
pub enum ImageFetchError {
    #[error("image fetch failed: {0}")]
    Fetch(String),
    #[error("image fetch returned status {0}")]
    Status(u16),
    #[error("image decode failed: {0}")]
    Decode(String),
}

/// Pixel payload ready for PDF embedding. JPEG bytes pass through untouched
/// (the PDF DCTDecode filter understands them); everything else is decoded
/// to raw RGB8.
#[derive(Debug, Clone)]
pub enum ImageData {
    Jpeg(Vec<u8>),
    Rgb8(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct EmbeddableImage {
    pub width: u32,
    pub height: u32,
    pub data: ImageData,
}

/// Best-effort remote raster fetcher. Every failure is a typed error the
/// caller can treat as "image absent"; nothing here panics or aborts the
/// surrounding document assembly.
pub struct RemoteImageFetcher {
    http: reqwest::Client,
}

impl RemoteImageFetcher {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    pub async fn fetch(&self, url: &str) -> Result<EmbeddableImage, ImageFetchError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| ImageFetchError::Fetch(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageFetchError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| ImageFetchError::Fetch(err.to_string()))?;
        decode(&bytes)
    }

    /// Fetch that degrades to `None`, logging the failure. Used where the
    /// document must keep assembling without the image.
    pub async fn fetch_optional(&self, url: &str) -> Option<EmbeddableImage> {
        match self.fetch(url).await {
            Ok(img) => Some(img),
            Err(err) => {
                warn!("Failed to fetch image {url}: {err}");
                None
            }
        }
    }
}

impl Default for RemoteImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

pub fn decode(bytes: &[u8]) -> Result<EmbeddableImage, ImageFetchError> {
    let format =
        image::guess_format(bytes).map_err(|err| ImageFetchError::Decode(err.to_string()))?;
    let decoded =
        image::load_from_memory(bytes).map_err(|err| ImageFetchError::Decode(err.to_string()))?;
    let (width, height) = decoded.dimensions();

    let data = if format == image::ImageFormat::Jpeg {
        ImageData::Jpeg(bytes.to_vec())
    } else {
        ImageData::Rgb8(decoded.to_rgb8().into_raw())
    };

    Ok(EmbeddableImage {
        width,
        height,
        data,
    })
}
