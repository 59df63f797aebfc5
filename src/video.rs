//! Video delivery helpers: stream and thumbnail URLs, quality selection and
//! lesson video metadata. No media is touched here.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{AcademyError, AcademyResult};
use crate::store::CatalogSource;

const STREAMING_BASE: &str = "https://streaming.apocalypseacademy.com";

// RFC 3986 unreserved characters stay literal
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Gcp,
    Azure,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Aws, Provider::Gcp, Provider::Azure];

    pub fn id(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Gcp => "gcp",
            Provider::Azure => "azure",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Aws => "Amazon AWS",
            Provider::Gcp => "Google Cloud Platform",
            Provider::Azure => "Microsoft Azure",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Provider {
    type Err = AcademyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.id() == s)
            .ok_or_else(|| AcademyError::not_found("video provider", s))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    #[serde(rename = "4k")]
    Uhd4k,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "auto")]
    Auto,
}

impl Quality {
    pub const ALL: [Quality; 6] = [
        Quality::Uhd4k,
        Quality::P1080,
        Quality::P720,
        Quality::P480,
        Quality::P360,
        Quality::Auto,
    ];

    pub fn value(&self) -> &'static str {
        match self {
            Quality::Uhd4k => "4k",
            Quality::P1080 => "1080p",
            Quality::P720 => "720p",
            Quality::P480 => "480p",
            Quality::P360 => "360p",
            Quality::Auto => "auto",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Quality::Uhd4k => "4K",
            Quality::Auto => "Auto",
            other => other.value(),
        }
    }

    /// Target bitrate in kbps; `None` for adaptive.
    pub fn bitrate_kbps(&self) -> Option<u32> {
        match self {
            Quality::Uhd4k => Some(15000),
            Quality::P1080 => Some(5000),
            Quality::P720 => Some(2500),
            Quality::P480 => Some(1000),
            Quality::P360 => Some(600),
            Quality::Auto => None,
        }
    }

    /// Highest fixed quality a connection of `kbps` sustains.
    pub fn for_connection(kbps: u32) -> Quality {
        match kbps {
            k if k > 20000 => Quality::Uhd4k,
            k if k > 8000 => Quality::P1080,
            k if k > 4000 => Quality::P720,
            k if k > 1500 => Quality::P480,
            _ => Quality::P360,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct QualityOption {
    pub label: &'static str,
    pub value: Quality,
    pub bitrate_kbps: Option<u32>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProviderInfo {
    pub id: Provider,
    pub name: &'static str,
    pub current: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Subtitle {
    pub language: String,
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub course_id: String,
    pub lesson_id: String,
    pub duration_secs: u32,
    pub thumbnail_url: String,
    pub subtitles: Vec<Subtitle>,
}

fn encode(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

pub struct VideoService {
    catalog: Arc<dyn CatalogSource>,
    provider: RwLock<Provider>,
}

impl VideoService {
    pub fn new(catalog: Arc<dyn CatalogSource>, provider: Provider) -> Self {
        Self { catalog, provider: RwLock::new(provider) }
    }

    pub async fn provider(&self) -> Provider {
        *self.provider.read().await
    }

    pub async fn providers(&self) -> Vec<ProviderInfo> {
        let current = self.provider().await;
        Provider::ALL
            .into_iter()
            .map(|p| ProviderInfo { id: p, name: p.name(), current: p == current })
            .collect()
    }

    pub async fn set_provider(&self, provider_id: &str) -> AcademyResult<Provider> {
        let provider: Provider = provider_id.parse()?;
        *self.provider.write().await = provider;
        tracing::info!(%provider, "video provider switched");
        Ok(provider)
    }

    pub fn quality_options(&self) -> Vec<QualityOption> {
        Quality::ALL
            .into_iter()
            .map(|q| QualityOption { label: q.label(), value: q, bitrate_kbps: q.bitrate_kbps() })
            .collect()
    }

    pub async fn stream_url(&self, video_id: &str, quality: Option<Quality>, provider: Option<Provider>) -> String {
        let provider = match provider {
            Some(p) => p,
            None => self.provider().await,
        };
        let quality = quality.unwrap_or(Quality::Auto);
        format!(
            "{STREAMING_BASE}/{}/{}/{}/stream.m3u8",
            provider.id(),
            encode(video_id),
            quality.value()
        )
    }

    pub fn thumbnail_url(&self, video_id: &str, at_secs: Option<u32>) -> String {
        match at_secs {
            Some(t) => format!("{STREAMING_BASE}/thumbnails/{}/time_{t}.jpg", encode(video_id)),
            None => format!("{STREAMING_BASE}/thumbnails/{}.jpg", encode(video_id)),
        }
    }

    /// Metadata for the lesson that plays `video_id`.
    pub async fn metadata(&self, video_id: &str) -> AcademyResult<VideoMetadata> {
        let courses = self.catalog.courses().await?;
        let (course, lesson) = courses
            .iter()
            .flat_map(|c| c.modules.iter().flat_map(move |m| m.lessons.iter().map(move |l| (c, l))))
            .find(|(_, l)| l.video_id == video_id)
            .ok_or_else(|| AcademyError::not_found("video", video_id))?;

        let id = encode(video_id);
        let subtitles = ["pt-BR", "en", "es"]
            .into_iter()
            .map(|lang| Subtitle {
                language: lang.into(),
                url: format!("{STREAMING_BASE}/subtitles/{id}/{lang}.vtt"),
            })
            .collect();
        Ok(VideoMetadata {
            id: video_id.to_string(),
            title: lesson.title.clone(),
            course_id: course.id.clone(),
            lesson_id: lesson.id.clone(),
            duration_secs: lesson.duration_secs,
            thumbnail_url: self.thumbnail_url(video_id, None),
            subtitles,
        })
    }
}
