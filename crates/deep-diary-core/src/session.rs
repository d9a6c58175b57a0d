//! Diary session state and the reducers that fold backend results into it.
//!
//! Every operation's failure goes through exactly one channel: either the
//! returned [`Notice`] (shown inline, never logged) or an assistant entry in
//! the chat log. Submitting an answer is the only operation that uses the log.

use tracing::{debug, info};

use crate::client::{DiarySummary, Followup, InitialQuestion, SongRecommendation};
use crate::error::{DiaryError, Result};
use crate::photo::PhotoPreview;
use crate::state::ChatLog;

pub const CAPTION_FAILED: &str = "이미지 캡션 생성 실패: ";
pub const INITIAL_QUESTION_FAILED: &str = "첫 번째 질문 가져오기 실패: ";
pub const FOLLOWUP_FAILED: &str = "오류가 발생했습니다: ";
pub const SUMMARY_FAILED: &str = "일기 요약 요청 실패: ";
pub const SONG_FAILED: &str = "트로트 추천 실패: ";

/// An ephemeral inline error. Never enters the chat log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice(pub String);

impl Notice {
    fn from_error(prefix: &str, err: &DiaryError) -> Self {
        Notice(format!("{}{}", prefix, err.detail()))
    }

    /// A photo that couldn't be read or decoded never reaches the backend.
    pub fn photo_rejected(err: &DiaryError) -> Self {
        Notice::from_error(CAPTION_FAILED, err)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn format_followup(followup: &Followup) -> String {
    format!("감정: {}\n\n{}", followup.emotion, followup.followup_question)
}

pub fn format_summary(summary: &DiarySummary) -> String {
    format!(
        "**일기 요약**: {}\n\n**최종 감정**: {}",
        summary.diary_summary, summary.final_emotion
    )
}

pub fn format_song(recommendation: &SongRecommendation) -> String {
    let song = recommendation.recommended_song.clone().unwrap_or_default();
    format!(
        "### 🎶 **추천 곡**: {}\n**가수**: {}\n\n**가사**:\n{}",
        song.title.unwrap_or_default(),
        song.artist.unwrap_or_default(),
        song.lyrics.unwrap_or_default(),
    )
}

/// Everything one diary session owns. Dropped when the session ends.
#[derive(Debug, Default)]
pub struct DiarySession {
    log: ChatLog,
    photo: Option<PhotoPreview>,
}

impl DiarySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> &ChatLog {
        &self.log
    }

    pub fn photo(&self) -> Option<&PhotoPreview> {
        self.photo.as_ref()
    }

    /// Show a photo. Happens before the upload and is kept whatever the outcome.
    pub fn show_photo(&mut self, preview: PhotoPreview) {
        self.photo = Some(preview);
    }

    pub fn apply_caption(&mut self, result: Result<Option<String>>) -> Option<Notice> {
        match result {
            Ok(caption) => {
                debug!(?caption, "caption generated (not shown)");
                None
            }
            Err(err) => Some(Notice::from_error(CAPTION_FAILED, &err)),
        }
    }

    pub fn apply_initial_question(&mut self, result: Result<InitialQuestion>) -> Option<Notice> {
        match result {
            Ok(q) => {
                info!("diary started");
                self.log.push_assistant(q.question.unwrap_or_default());
                None
            }
            Err(err) => Some(Notice::from_error(INITIAL_QUESTION_FAILED, &err)),
        }
    }

    /// Record the user's answer. Returns the text to send, or `None` for blank input.
    pub fn begin_answer(&mut self, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        self.log.push_user(text);
        Some(text.to_string())
    }

    pub fn apply_followup(&mut self, result: Result<Followup>) {
        let content = match result {
            Ok(followup) => format_followup(&followup),
            Err(err) => format!("{}{}", FOLLOWUP_FAILED, err.detail()),
        };
        self.log.push_assistant(content);
    }

    pub fn apply_summary(&mut self, result: Result<DiarySummary>) -> Option<Notice> {
        match result {
            Ok(summary) => {
                info!("diary finished");
                self.log.push_assistant(format_summary(&summary));
                None
            }
            Err(err) => Some(Notice::from_error(SUMMARY_FAILED, &err)),
        }
    }

    pub fn apply_song(&mut self, result: Result<SongRecommendation>) -> Option<Notice> {
        match result {
            Ok(rec) => {
                self.log.push_assistant(format_song(&rec));
                None
            }
            Err(err) => Some(Notice::from_error(SONG_FAILED, &err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Song;
    use crate::state::ChatRole;

    fn status(code: u16, body: &str) -> DiaryError {
        DiaryError::Status {
            status: code,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_initial_question_appends_one_assistant_message() {
        let mut session = DiarySession::new();
        let notice = session.apply_initial_question(Ok(InitialQuestion {
            question: Some("Q".to_string()),
        }));

        assert!(notice.is_none());
        assert_eq!(session.log().len(), 1);
        let last = session.log().last().unwrap();
        assert_eq!(last.role, ChatRole::Assistant);
        assert_eq!(last.content, "Q");
    }

    #[test]
    fn test_null_question_appends_empty_message() {
        let mut session = DiarySession::new();
        let notice = session.apply_initial_question(Ok(InitialQuestion { question: None }));

        assert!(notice.is_none());
        assert_eq!(session.log().len(), 1);
        assert_eq!(session.log().last().unwrap().content, "");
    }

    #[test]
    fn test_initial_question_failure_is_notice_only() {
        let mut session = DiarySession::new();
        let notice = session.apply_initial_question(Err(status(503, "down")));

        assert_eq!(notice, Some(Notice("첫 번째 질문 가져오기 실패: down".to_string())));
        assert!(session.log().is_empty());
    }

    #[test]
    fn test_followup_message_format() {
        let mut session = DiarySession::new();
        session.begin_answer("I felt happy");
        session.apply_followup(Ok(Followup {
            emotion: "joy".to_string(),
            followup_question: "Why?".to_string(),
        }));

        let messages = session.log().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[0].content, "I felt happy");
        assert_eq!(messages[1].content, "감정: joy\n\nWhy?");
    }

    #[test]
    fn test_followup_failure_is_logged() {
        let mut session = DiarySession::new();
        session.begin_answer("I felt happy");
        session.apply_followup(Err(status(500, "Internal Server Error")));

        assert_eq!(session.log().len(), 2);
        let last = session.log().last().unwrap();
        assert_eq!(last.role, ChatRole::Assistant);
        assert_eq!(last.content, "오류가 발생했습니다: Internal Server Error");
    }

    #[test]
    fn test_blank_answer_is_ignored() {
        let mut session = DiarySession::new();
        assert!(session.begin_answer("   ").is_none());
        assert!(session.begin_answer("").is_none());
        assert!(session.log().is_empty());
    }

    #[test]
    fn test_summary_format() {
        let summary = DiarySummary {
            diary_summary: "A calm day".to_string(),
            final_emotion: "peace".to_string(),
        };
        assert_eq!(
            format_summary(&summary),
            "**일기 요약**: A calm day\n\n**최종 감정**: peace"
        );
    }

    #[test]
    fn test_song_with_only_title() {
        let rec = SongRecommendation {
            recommended_song: Some(Song {
                title: Some("Only Title".to_string()),
                artist: None,
                lyrics: None,
            }),
        };
        assert_eq!(
            format_song(&rec),
            "### 🎶 **추천 곡**: Only Title\n**가수**: \n\n**가사**:\n"
        );
    }

    #[test]
    fn test_song_failure_leaves_log_unchanged() {
        let mut session = DiarySession::new();
        let notice = session.apply_song(Err(status(404, "no songs")));
        assert_eq!(notice.unwrap().as_str(), "트로트 추천 실패: no songs");
        assert!(session.log().is_empty());
    }

    #[test]
    fn test_caption_success_is_not_logged() {
        let mut session = DiarySession::new();
        let notice = session.apply_caption(Ok(Some("a dog on a beach".to_string())));
        assert!(notice.is_none());
        assert!(session.log().is_empty());
    }

    #[test]
    fn test_caption_failure_notice_has_raw_body() {
        let mut session = DiarySession::new();
        let notice = session.apply_caption(Err(status(400, "{\"detail\":\"bad image\"}")));
        assert_eq!(
            notice.unwrap().to_string(),
            "이미지 캡션 생성 실패: {\"detail\":\"bad image\"}"
        );
        assert!(session.log().is_empty());
    }
}
