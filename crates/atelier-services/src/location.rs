//! Location sender — map pin plus a short entrance clip.

use std::sync::Arc;

use atelier_channels::telegram::Messenger;
use atelier_core::config::LocationConfig;

pub struct LocationService {
    messenger: Arc<dyn Messenger>,
    info: LocationConfig,
}

impl LocationService {
    pub fn new(messenger: Arc<dyn Messenger>, info: LocationConfig) -> Self {
        Self { messenger, info }
    }

    /// Send the map pin and the entrance video. Schedule and phone stay on
    /// their own menu buttons.
    pub async fn send_location_details(&self, chat_id: &str) {
        self.messenger
            .send_location(chat_id, self.info.latitude, self.info.longitude)
            .await;
        if !self.info.video_url.is_empty() {
            self.messenger
                .send_video(
                    chat_id,
                    &self.info.video_url,
                    Some("Ось наш вхід, щоб легше знайти!"),
                )
                .await;
        }
    }
}
