use std::path::PathBuf;

use deep_diary_core::error::Result as DiaryResult;
use deep_diary_core::{
    DiaryClient, DiaryError, DiarySession, DiarySummary, Followup, InitialQuestion, Notice,
    PreparedPhoto, SongRecommendation, UploadedImage,
};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
    PhotoPath,
}

/// The single request in flight. While one exists, new actions are ignored.
pub enum Pending {
    Photo(JoinHandle<DiaryResult<PreparedPhoto>>),
    Caption(JoinHandle<DiaryResult<Option<String>>>),
    InitialQuestion(JoinHandle<DiaryResult<InitialQuestion>>),
    Followup(JoinHandle<DiaryResult<Followup>>),
    Summary(JoinHandle<DiaryResult<DiarySummary>>),
    Song(JoinHandle<DiaryResult<SongRecommendation>>),
}

impl Pending {
    fn is_finished(&self) -> bool {
        match self {
            Pending::Photo(h) => h.is_finished(),
            Pending::Caption(h) => h.is_finished(),
            Pending::InitialQuestion(h) => h.is_finished(),
            Pending::Followup(h) => h.is_finished(),
            Pending::Summary(h) => h.is_finished(),
            Pending::Song(h) => h.is_finished(),
        }
    }

    /// Only the song recommendation shows a loading indicator.
    pub fn shows_spinner(&self) -> bool {
        matches!(self, Pending::Song(_))
    }
}

async fn join<T>(handle: JoinHandle<DiaryResult<T>>) -> DiaryResult<T> {
    match handle.await {
        Ok(result) => result,
        Err(e) => Err(DiaryError::Interrupted(e.to_string())),
    }
}

/// Single-line text field with a char-indexed cursor.
#[derive(Debug, Default, Clone)]
pub struct TextInput {
    pub value: String,
    pub cursor: usize,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl TextInput {
    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.value)
    }
}

/// Rows a line takes when word-wrapped to `width` terminal columns.
///
/// Rounds up where the wrapping could go either way, so scrolling to the
/// bottom never leaves the last row hidden.
pub fn wrapped_height(line: &str, width: usize) -> u16 {
    if width == 0 {
        return 1;
    }

    let mut rows: u16 = 1;
    let mut used = 0usize;

    for word in line.split_inclusive(' ') {
        let word_width = word.width();
        if used + word_width <= width {
            used += word_width;
            continue;
        }

        // Only the trailing space overflows: the word stays, the next one wraps
        if used + word.trim_end_matches(' ').width() <= width {
            used = width;
            continue;
        }

        if used > 0 {
            rows += 1;
            used = 0;
        }

        // Words wider than a row are broken by character
        for c in word.chars() {
            let char_width = c.width().unwrap_or(0);
            if used + char_width > width {
                rows += 1;
                used = 0;
            }
            used += char_width;
        }
    }

    rows
}

/// Expand a leading `~` to the home directory.
pub fn expand_path(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(raw)
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Diary state
    pub session: DiarySession,
    pub client: DiaryClient,
    pub notice: Option<Notice>,
    pub pending: Option<Pending>,

    // Inputs
    pub answer_input: TextInput,
    pub photo_path_input: TextInput,

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(client: DiaryClient) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,

            session: DiarySession::new(),
            client,
            notice: None,
            pending: None,

            answer_input: TextInput::default(),
            photo_path_input: TextInput::default(),

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Common preamble for every action: refuse while busy, clear the last notice.
    fn begin_action(&mut self) -> bool {
        if self.is_busy() {
            debug!("action ignored while a request is pending");
            return false;
        }
        self.notice = None;
        true
    }

    pub fn upload_photo(&mut self, path: PathBuf) {
        if !self.begin_action() {
            return;
        }
        info!(path = %path.display(), "uploading photo");
        self.pending = Some(Pending::Photo(tokio::task::spawn_blocking(move || {
            UploadedImage::from_path(&path)?.prepare()
        })));
    }

    pub fn start_diary(&mut self) {
        if !self.begin_action() {
            return;
        }
        let client = self.client.clone();
        self.pending = Some(Pending::InitialQuestion(tokio::spawn(async move {
            client.initial_question().await
        })));
    }

    pub fn submit_answer(&mut self) {
        if self.is_busy() {
            return;
        }
        let text = self.answer_input.value.clone();
        let Some(answer) = self.session.begin_answer(&text) else {
            return;
        };
        self.notice = None;
        self.answer_input.take();
        self.scroll_chat_to_bottom();

        let client = self.client.clone();
        self.pending = Some(Pending::Followup(tokio::spawn(async move {
            client.followup_question(&answer).await
        })));
    }

    pub fn finish_diary(&mut self) {
        if !self.begin_action() {
            return;
        }
        let client = self.client.clone();
        self.pending = Some(Pending::Summary(tokio::spawn(async move {
            client.summarize_conversation().await
        })));
    }

    pub fn recommend_song(&mut self) {
        if !self.begin_action() {
            return;
        }
        self.animation_frame = 0;
        let client = self.client.clone();
        self.pending = Some(Pending::Song(tokio::spawn(async move {
            client.recommend_song().await
        })));
        self.scroll_chat_to_bottom();
    }

    /// Fold a finished request into the session. Called once per loop iteration.
    pub async fn poll_pending(&mut self) {
        if !self.pending.as_ref().is_some_and(Pending::is_finished) {
            return;
        }
        let Some(pending) = self.pending.take() else {
            return;
        };

        let len_before = self.session.log().len();
        match pending {
            Pending::Photo(handle) => match join(handle).await {
                Ok(prepared) => {
                    self.session.show_photo(prepared.preview);
                    let client = self.client.clone();
                    let png = prepared.png;
                    self.pending = Some(Pending::Caption(tokio::spawn(async move {
                        client.generate_caption(png).await
                    })));
                }
                Err(err) => self.notice = Some(Notice::photo_rejected(&err)),
            },
            Pending::Caption(handle) => {
                self.notice = self.session.apply_caption(join(handle).await);
            }
            Pending::InitialQuestion(handle) => {
                self.notice = self.session.apply_initial_question(join(handle).await);
            }
            Pending::Followup(handle) => {
                self.session.apply_followup(join(handle).await);
            }
            Pending::Summary(handle) => {
                self.notice = self.session.apply_summary(join(handle).await);
            }
            Pending::Song(handle) => {
                self.notice = self.session.apply_song(join(handle).await);
            }
        }

        if self.session.log().len() != len_before {
            self.scroll_chat_to_bottom();
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.pending.as_ref().is_some_and(Pending::shows_spinner) {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Approximate number of wrapped lines the chat pane needs.
    pub fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.session.log() {
            total_lines += 1; // Role line
            for line in msg.content.lines() {
                // Measured in display columns: Hangul takes two per character
                total_lines = total_lines.saturating_add(wrapped_height(line, wrap_width));
            }
            total_lines += 1; // Blank line after message
        }

        if self.pending.as_ref().is_some_and(Pending::shows_spinner) {
            total_lines += 2;
        }

        total_lines
    }

    pub fn scroll_chat_to_bottom(&mut self) {
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = self.chat_line_count().saturating_sub(visible_height);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.chat_line_count().saturating_sub(self.chat_height.max(1));
        self.chat_scroll = (self.chat_scroll + lines).min(max);
    }

    pub fn scroll_top(&mut self) {
        self.chat_scroll = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deep_diary_core::ChatRole;
    use std::time::Duration;

    fn unreachable_client() -> DiaryClient {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        DiaryClient::new(&format!("http://{}", addr))
    }

    async fn settle(app: &mut App) {
        for _ in 0..200 {
            app.poll_pending().await;
            if app.pending.is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("request never finished");
    }

    #[test]
    fn test_text_input_utf8_editing() {
        let mut input = TextInput::default();
        for c in "오늘은".chars() {
            input.insert(c);
        }
        input.left();
        input.backspace();
        assert_eq!(input.value, "오은");
        assert_eq!(input.cursor, 1);

        input.end();
        input.insert('!');
        input.home();
        input.delete();
        assert_eq!(input.value, "은!");

        assert_eq!(input.take(), "은!");
        assert!(input.value.is_empty());
        assert_eq!(input.cursor, 0);
    }

    #[test]
    fn test_wrapped_height_counts_columns() {
        assert_eq!(wrapped_height("", 10), 1);
        assert_eq!(wrapped_height("abcd efgh", 10), 1);
        // Five Hangul syllables are ten columns wide
        assert_eq!(wrapped_height("오늘은좋은", 10), 1);
        assert_eq!(wrapped_height("오늘은좋은날", 10), 2);
        assert_eq!(wrapped_height("오늘은 정말 좋은 날이었어요", 10), 3);
    }

    #[test]
    fn test_wrapped_height_breaks_long_words() {
        let long = "x".repeat(25);
        assert_eq!(wrapped_height(&long, 10), 3);
        assert_eq!(wrapped_height(&format!("ab {}", long), 10), 4);
    }

    #[test]
    fn test_expand_path_plain() {
        assert_eq!(expand_path(" /tmp/a.png "), PathBuf::from("/tmp/a.png"));
    }

    #[test]
    fn test_expand_path_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/pics/a.jpg"), home.join("pics/a.jpg"));
        }
    }

    #[tokio::test]
    async fn test_answer_logged_before_response_and_error_logged_after() {
        let mut app = App::new(unreachable_client());
        app.answer_input.value = "I felt happy".to_string();

        app.submit_answer();

        assert!(app.is_busy());
        assert_eq!(app.session.log().len(), 1);
        assert_eq!(app.session.log().last().unwrap().role, ChatRole::User);
        assert!(app.answer_input.value.is_empty());

        settle(&mut app).await;

        let log = app.session.log();
        assert_eq!(log.len(), 2);
        assert!(log.last().unwrap().content.starts_with("오류가 발생했습니다: "));
        assert!(app.notice.is_none());
    }

    #[tokio::test]
    async fn test_actions_ignored_while_busy() {
        let mut app = App::new(unreachable_client());

        app.start_diary();
        app.recommend_song();
        app.answer_input.value = "ignored".to_string();
        app.submit_answer();

        assert!(matches!(app.pending, Some(Pending::InitialQuestion(_))));
        assert!(app.session.log().is_empty());
        assert_eq!(app.answer_input.value, "ignored");

        settle(&mut app).await;
        assert!(app
            .notice
            .as_ref()
            .unwrap()
            .as_str()
            .starts_with("첫 번째 질문 가져오기 실패: "));
        assert!(app.session.log().is_empty());
    }

    #[tokio::test]
    async fn test_blank_answer_sends_nothing() {
        let mut app = App::new(unreachable_client());
        app.answer_input.value = "   ".to_string();

        app.submit_answer();

        assert!(!app.is_busy());
        assert!(app.session.log().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_photo_gives_notice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not a jpeg").unwrap();
        let mut app = App::new(unreachable_client());

        app.upload_photo(path);
        settle(&mut app).await;

        assert!(app
            .notice
            .as_ref()
            .unwrap()
            .as_str()
            .starts_with("이미지 캡션 생성 실패: "));
        assert!(app.session.photo().is_none());
        assert!(app.session.log().is_empty());
    }

    #[tokio::test]
    async fn test_spinner_only_for_song() {
        let mut app = App::new(unreachable_client());

        app.finish_diary();
        assert!(!app.pending.as_ref().unwrap().shows_spinner());
        settle(&mut app).await;

        app.recommend_song();
        assert!(app.pending.as_ref().unwrap().shows_spinner());
        settle(&mut app).await;
        assert!(app.notice.as_ref().unwrap().as_str().starts_with("트로트 추천 실패: "));
    }
}
