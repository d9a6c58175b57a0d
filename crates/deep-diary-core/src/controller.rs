use std::path::Path;

use crate::client::DiaryClient;
use crate::photo::UploadedImage;
use crate::session::{DiarySession, Notice};

/// Runs each diary operation start to finish: request, then reducer.
///
/// Front ends that need to keep drawing while a request is pending can use
/// [`DiaryClient`] and the [`DiarySession`] reducers directly instead.
pub struct DiaryController {
    client: DiaryClient,
    session: DiarySession,
}

impl DiaryController {
    pub fn new(client: DiaryClient) -> Self {
        Self {
            client,
            session: DiarySession::new(),
        }
    }

    pub fn session(&self) -> &DiarySession {
        &self.session
    }

    pub async fn upload_photo(&mut self, image: &UploadedImage) -> Option<Notice> {
        let prepared = match image.prepare() {
            Ok(prepared) => prepared,
            Err(err) => return Some(Notice::photo_rejected(&err)),
        };
        self.session.show_photo(prepared.preview);

        let result = self.client.generate_caption(prepared.png).await;
        self.session.apply_caption(result)
    }

    pub async fn upload_photo_file(&mut self, path: impl AsRef<Path>) -> Option<Notice> {
        match UploadedImage::from_path(path) {
            Ok(image) => self.upload_photo(&image).await,
            Err(err) => Some(Notice::photo_rejected(&err)),
        }
    }

    pub async fn start_diary(&mut self) -> Option<Notice> {
        let result = self.client.initial_question().await;
        self.session.apply_initial_question(result)
    }

    /// Never produces a notice: failures are written to the chat log.
    pub async fn submit_answer(&mut self, text: &str) {
        let Some(answer) = self.session.begin_answer(text) else {
            return;
        };
        let result = self.client.followup_question(&answer).await;
        self.session.apply_followup(result);
    }

    pub async fn finish_diary(&mut self) -> Option<Notice> {
        let result = self.client.summarize_conversation().await;
        self.session.apply_summary(result)
    }

    pub async fn recommend_song(&mut self) -> Option<Notice> {
        let result = self.client.recommend_song().await;
        self.session.apply_song(result)
    }
}
