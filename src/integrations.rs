//! Mocked third-party integrations (Spotify, Telegram, WhatsApp).
//!
//! Each platform carries an enabled/connected pair. Data operations refuse to
//! run until the platform has been connected.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AcademyError, AcademyResult};
use crate::store::Latency;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Spotify,
    Telegram,
    Whatsapp,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Spotify, Platform::Telegram, Platform::Whatsapp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Spotify => "spotify",
            Platform::Telegram => "telegram",
            Platform::Whatsapp => "whatsapp",
        }
    }

    fn default_credential(&self) -> &'static str {
        match self {
            Platform::Spotify => "mock_spotify_api_key",
            Platform::Telegram => "mock_telegram_bot_token",
            Platform::Whatsapp => "mock_whatsapp_api_key",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = AcademyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| AcademyError::not_found("platform", s))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrationStatus {
    pub enabled: bool,
    pub connected: bool,
}

#[derive(Debug, Clone)]
struct Connection {
    enabled: bool,
    connected: bool,
    credential: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ConnectReq {
    pub credential: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ConnectionReceipt {
    pub platform: Platform,
    pub message: String,
    pub account: String,
    pub connected_since: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cover_image: String,
    pub tracks: u32,
    pub duration: String,
    pub spotify_url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub duration: String,
    pub spotify_url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlaylistDetails {
    pub id: String,
    pub name: String,
    pub description: String,
    pub creator: String,
    pub tracks: Vec<Track>,
    pub spotify_url: String,
    pub embed_url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CommunityInfo {
    pub name: String,
    pub description: String,
    pub member_count: u32,
    pub invite_link: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MessageReq {
    pub text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MessageReceipt {
    pub platform: Platform,
    pub message_id: String,
    pub sent_at: DateTime<Utc>,
}

fn playlists() -> Vec<Playlist> {
    [
        ("playlist-001", "Devocionais Proféticos - Volume 1", "Meditações sobre profecias bíblicas com análises contemporâneas", 12, "45 minutos", "mock1"),
        ("playlist-002", "Apocalipse em Áudio - Capítulos 1-7", "Leitura dramatizada do livro de Apocalipse com comentários", 7, "90 minutos", "mock2"),
        ("playlist-003", "Meditações sobre o Arrebatamento", "Reflexões sobre a esperança do arrebatamento da igreja", 5, "30 minutos", "mock3"),
    ]
    .into_iter()
    .map(|(id, name, description, tracks, duration, slug)| Playlist {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        cover_image: format!("/assets/images/playlists/{id}.jpg"),
        tracks,
        duration: duration.into(),
        spotify_url: format!("https://open.spotify.com/playlist/{slug}"),
    })
    .collect()
}

fn playlist_tracks() -> Vec<Track> {
    [
        ("track-001", "Introdução aos Devocionais Proféticos", "3:45"),
        ("track-002", "Daniel 2 - O Sonho de Nabucodonosor", "5:20"),
        ("track-003", "Apocalipse 1 - A Revelação de Jesus Cristo", "4:15"),
        ("track-004", "Mateus 24 - Os Sinais dos Tempos", "6:10"),
        ("track-005", "Ezequiel 38 - A Guerra de Gogue e Magogue", "5:30"),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (id, title, duration))| Track {
        id: id.into(),
        title: title.into(),
        duration: duration.into(),
        spotify_url: format!("https://open.spotify.com/track/mock{}", i + 1),
    })
    .collect()
}

pub struct IntegrationService {
    connections: RwLock<BTreeMap<Platform, Connection>>,
    latency: Latency,
}

impl IntegrationService {
    pub fn new(latency: Latency) -> Self {
        let connections = Platform::ALL
            .into_iter()
            .map(|p| {
                let conn = Connection {
                    enabled: true,
                    connected: false,
                    credential: p.default_credential().to_string(),
                };
                (p, conn)
            })
            .collect();
        Self { connections: RwLock::new(connections), latency }
    }

    pub async fn status(&self) -> BTreeMap<Platform, IntegrationStatus> {
        self.connections
            .read()
            .await
            .iter()
            .map(|(p, c)| (*p, IntegrationStatus { enabled: c.enabled, connected: c.connected }))
            .collect()
    }

    async fn ensure_connected(&self, platform: Platform) -> AcademyResult<()> {
        let connections = self.connections.read().await;
        match connections.get(&platform) {
            Some(c) if c.connected => Ok(()),
            _ => Err(AcademyError::IntegrationNotConnected(platform)),
        }
    }

    pub async fn connect(&self, platform: Platform, credential: Option<String>) -> AcademyResult<ConnectionReceipt> {
        self.latency.simulate().await;
        let mut connections = self.connections.write().await;
        let conn = connections
            .get_mut(&platform)
            .ok_or_else(|| AcademyError::not_found("platform", platform.as_str()))?;
        if !conn.enabled {
            return Err(AcademyError::validation(format!("{platform} integration is disabled")));
        }
        if let Some(credential) = credential.filter(|c| !c.trim().is_empty()) {
            conn.credential = credential;
        }
        conn.connected = true;
        tracing::info!(%platform, credential_len = conn.credential.len(), "integration connected");

        let account = match platform {
            Platform::Spotify => "apocalypse_academy",
            Platform::Telegram => "ApocalypseAcademyBot",
            Platform::Whatsapp => "Apocalypse Academy",
        };
        Ok(ConnectionReceipt {
            platform,
            message: format!("{platform} connected successfully"),
            account: account.into(),
            connected_since: Utc::now(),
        })
    }

    pub async fn disconnect(&self, platform: Platform) -> AcademyResult<()> {
        self.latency.simulate().await;
        let mut connections = self.connections.write().await;
        let conn = connections
            .get_mut(&platform)
            .ok_or_else(|| AcademyError::not_found("platform", platform.as_str()))?;
        conn.connected = false;
        tracing::info!(%platform, "integration disconnected");
        Ok(())
    }

    pub async fn spotify_playlists(&self) -> AcademyResult<Vec<Playlist>> {
        self.ensure_connected(Platform::Spotify).await?;
        self.latency.simulate().await;
        Ok(playlists())
    }

    pub async fn spotify_playlist(&self, playlist_id: &str) -> AcademyResult<PlaylistDetails> {
        self.ensure_connected(Platform::Spotify).await?;
        self.latency.simulate().await;
        let playlist = playlists()
            .into_iter()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| AcademyError::not_found("playlist", playlist_id))?;
        let embed_url = playlist.spotify_url.replacen("/playlist/", "/embed/playlist/", 1);
        Ok(PlaylistDetails {
            id: playlist.id,
            name: playlist.name,
            description: playlist.description,
            creator: "Eric Alberto da Cruz".into(),
            tracks: playlist_tracks(),
            spotify_url: playlist.spotify_url,
            embed_url,
        })
    }

    pub async fn telegram_channel(&self) -> AcademyResult<CommunityInfo> {
        self.ensure_connected(Platform::Telegram).await?;
        self.latency.simulate().await;
        Ok(CommunityInfo {
            name: "Apocalypse Academy Community".into(),
            description: "Canal oficial da comunidade Apocalypse Academy.".into(),
            member_count: 5280,
            invite_link: "https://t.me/apocalypseacademy".into(),
            is_public: true,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap_or_default(),
        })
    }

    pub async fn whatsapp_group(&self) -> AcademyResult<CommunityInfo> {
        self.ensure_connected(Platform::Whatsapp).await?;
        self.latency.simulate().await;
        Ok(CommunityInfo {
            name: "Apocalypse Academy - Membros".into(),
            description: "Grupo oficial para membros da Apocalypse Academy.".into(),
            member_count: 1250,
            invite_link: "https://chat.whatsapp.com/mocklink".into(),
            is_public: false,
            created_at: Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).single().unwrap_or_default(),
        })
    }

    pub async fn send_message(&self, platform: Platform, text: &str) -> AcademyResult<MessageReceipt> {
        if platform == Platform::Spotify {
            return Err(AcademyError::validation("spotify does not accept messages"));
        }
        if text.trim().is_empty() {
            return Err(AcademyError::validation("message text is required"));
        }
        self.ensure_connected(platform).await?;
        self.latency.simulate().await;
        let receipt = MessageReceipt {
            platform,
            message_id: format!("msg_{}", Uuid::new_v4().simple()),
            sent_at: Utc::now(),
        };
        tracing::info!(%platform, message_id = %receipt.message_id, "message sent");
        Ok(receipt)
    }
}
