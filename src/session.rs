//! Interactive lookup session: three independent request lines (sentence,
//! word, translation) feeding one observable view.
//!
//! Every request takes a [`Ticket`] from its line. Issuing a new ticket
//! aborts the previous task and invalidates its ticket, and results are
//! only published while their ticket is current, so a superseded request
//! never changes what the user sees.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::analyzer::{AnalysisOutcome, AnalysisRequest, Analyzer};
use crate::error::LookupError;
use crate::languages::Language;
use crate::providers::Provider;
use crate::translate::{TranslationRequest, TranslationService};

pub const DEFAULT_EXPLAIN_TEXT: &str = "Ти кажеш, що написав щось дуже розумне (по-твоєму), але з іронією чи жартом. Тобто: «Я тут таке розумне написав» або «Я щось дуже мудре наговорив».";
pub const EXPLAIN_PENDING_TEXT: &str = "Пояснюємо речення…";
pub const EXPLAIN_FAILED_TEXT: &str = "Не вдалося пояснити речення. Спробуйте ще раз.";
pub const WORD_FAILED_TEXT: &str = "Не вдалося отримати пояснення. Спробуйте ще раз.";
pub const TRANSLATE_FAILED_TEXT: &str = "Не вдалося перекласти. Спробуйте ще раз.";

#[derive(Debug, Default)]
pub struct RequestLine {
    generation: Arc<AtomicU64>,
    task: Mutex<Option<AbortHandle>>,
}

/// Proof that a request is still the live one on its line.
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: Arc<AtomicU64>,
    issued: u64,
}

impl Ticket {
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.issued
    }

    pub fn check(&self) -> Result<(), LookupError> {
        if self.is_current() {
            Ok(())
        } else {
            Err(LookupError::Cancelled)
        }
    }
}

impl RequestLine {
    /// Invalidates the live ticket and aborts its task.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    pub fn issue(&self) -> Ticket {
        self.cancel();
        Ticket {
            generation: Arc::clone(&self.generation),
            issued: self.generation.load(Ordering::SeqCst),
        }
    }

    /// Runs `future` as the live task of `ticket`. A ticket superseded
    /// before its task is registered has the task aborted on the spot.
    pub fn spawn<Fut>(&self, ticket: Ticket, future: Fut)
    where
        Fut: Future<Output = Result<(), LookupError>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            if let Err(LookupError::Cancelled) = future.await {
                tracing::debug!("request superseded");
            }
        });
        let mut task = self.task.lock();
        if ticket.is_current() {
            *task = Some(handle.abort_handle());
        } else {
            handle.abort();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Translate,
    Explain,
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplainState {
    Idle,
    Requested,
    Resolved(String),
    Failed,
}

impl ExplainState {
    pub fn text(&self, sentence: &str) -> String {
        match self {
            ExplainState::Idle => DEFAULT_EXPLAIN_TEXT.to_string(),
            ExplainState::Requested => EXPLAIN_PENDING_TEXT.to_string(),
            ExplainState::Resolved(explanation) if explanation.is_empty() => {
                format!("Речення зафіксовано: {}", sentence)
            }
            ExplainState::Resolved(explanation) => explanation.clone(),
            ExplainState::Failed => EXPLAIN_FAILED_TEXT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordState {
    pub word: Option<String>,
    pub loading: bool,
    pub error: Option<&'static str>,
    pub outcome: Option<AnalysisOutcome>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationState {
    pub input: String,
    pub output: String,
    pub pending: bool,
    pub error: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub page: Page,
    pub from: Language,
    pub to: Language,
    pub sentence: String,
    pub locked: bool,
    pub explain: ExplainState,
    pub word: WordState,
    pub translation: TranslationState,
}

impl SessionView {
    fn new(from: Language, to: Language) -> Self {
        Self {
            page: Page::Translate,
            from,
            to,
            sentence: String::new(),
            locked: false,
            explain: ExplainState::Idle,
            word: WordState::default(),
            translation: TranslationState::default(),
        }
    }

    pub fn explain_text(&self) -> String {
        self.explain.text(&self.sentence)
    }

    /// Whitespace-separated words of the locked sentence.
    pub fn tokens(&self) -> Vec<&str> {
        self.sentence.split_whitespace().collect()
    }
}

pub struct Session<P: Provider, T: TranslationService> {
    analyzer: Arc<Analyzer<P>>,
    translator: T,
    debounce: Duration,
    view: Arc<watch::Sender<SessionView>>,
    sentence_line: RequestLine,
    word_line: RequestLine,
    /// Pending debounce timer; every keystroke supersedes it.
    debounce_line: RequestLine,
    /// In-flight translation; only a fired debounce supersedes it.
    translation_line: Arc<RequestLine>,
}

impl<P: Provider, T: TranslationService> Session<P, T> {
    pub fn new(
        analyzer: Analyzer<P>,
        translator: T,
        debounce: Duration,
        from: Language,
        to: Language,
    ) -> Self {
        let (view, _) = watch::channel(SessionView::new(from, to));
        Self {
            analyzer: Arc::new(analyzer),
            translator,
            debounce,
            view: Arc::new(view),
            sentence_line: RequestLine::default(),
            word_line: RequestLine::default(),
            debounce_line: RequestLine::default(),
            translation_line: Arc::new(RequestLine::default()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn set_page(&self, page: Page) {
        self.view.send_if_modified(|view| {
            if view.page == page {
                return false;
            }
            view.page = page;
            true
        });
    }

    /// Locks the sentence and requests its explanation. A blank sentence
    /// restores the default text without any request.
    pub fn submit_sentence(&self, sentence: &str) {
        let sentence = sentence.trim().to_string();
        if sentence.is_empty() {
            self.view.send_modify(|view| {
                self.sentence_line.cancel();
                view.sentence.clear();
                view.locked = false;
                view.explain = ExplainState::Idle;
            });
            return;
        }

        let Some(ticket) = supersede(&self.view, &self.sentence_line, None, |view| {
            view.page = Page::Explain;
            view.sentence = sentence.clone();
            view.locked = true;
            view.explain = ExplainState::Requested;
        }) else {
            return;
        };
        let analyzer = Arc::clone(&self.analyzer);
        let view = Arc::clone(&self.view);
        self.sentence_line.spawn(ticket.clone(), async move {
            let state = match analyzer.explain_sentence(&sentence).await {
                Ok(explanation) => ExplainState::Resolved(explanation),
                Err(err) => {
                    tracing::error!(error = %err, "sentence explanation failed");
                    ExplainState::Failed
                }
            };
            publish(&view, &ticket, |view| view.explain = state)
        });
    }

    /// Opens the word page and analyzes `word` in the locked sentence.
    pub fn select_word(&self, word: &str) {
        let sentence = self.view.borrow().sentence.clone();
        let Ok(request) = AnalysisRequest::new(Some(sentence), word) else {
            return;
        };
        let Some(ticket) = supersede(&self.view, &self.word_line, None, |view| {
            view.page = Page::Word;
            view.word = WordState {
                word: Some(request.word().to_string()),
                loading: true,
                error: None,
                outcome: None,
            };
        }) else {
            return;
        };
        let analyzer = Arc::clone(&self.analyzer);
        let view = Arc::clone(&self.view);
        self.word_line.spawn(ticket.clone(), async move {
            let result = analyzer.analyze_word(&request).await;
            publish(&view, &ticket, |view| {
                view.word.loading = false;
                match result {
                    Ok(outcome) => view.word.outcome = Some(outcome),
                    Err(err) => {
                        tracing::error!(error = %err, word = request.word(), "word analysis failed");
                        view.word.error = Some(WORD_FAILED_TEXT);
                    }
                }
            })
        });
    }

    /// Selects the token at `index` of the locked sentence.
    pub fn select_token(&self, index: usize) -> bool {
        let word = self
            .view
            .borrow()
            .tokens()
            .get(index)
            .map(|word| word.to_string());
        match word {
            Some(word) => {
                self.select_word(&word);
                true
            }
            None => false,
        }
    }

    /// Re-issues the identical request for the selected word.
    pub fn retry_word(&self) {
        let word = self.view.borrow().word.word.clone();
        if let Some(word) = word {
            self.select_word(&word);
        }
    }

    pub fn leave_word(&self) {
        self.view.send_modify(|view| {
            self.word_line.cancel();
            view.page = Page::Explain;
            view.word.loading = false;
        });
    }

    /// Releases the locked sentence and drops every pending lookup on it.
    pub fn unlock(&self) {
        self.view.send_modify(|view| {
            self.sentence_line.cancel();
            self.word_line.cancel();
            view.sentence.clear();
            view.locked = false;
            view.explain = ExplainState::Idle;
            view.word.loading = false;
        });
    }

    pub fn input_translation(&self, text: &str) {
        let text = text.to_string();
        self.view.send_modify(|view| view.translation.input = text);
        self.schedule_translation();
    }

    pub fn set_from(&self, code: &str) -> Result<(), LookupError> {
        let language = Language::from_code(code)?;
        self.view.send_modify(|view| view.from = language);
        self.schedule_translation();
        Ok(())
    }

    pub fn set_to(&self, code: &str) -> Result<(), LookupError> {
        let language = Language::from_code(code)?;
        self.view.send_modify(|view| view.to = language);
        self.schedule_translation();
        Ok(())
    }

    pub fn swap_languages(&self) {
        self.view
            .send_modify(|view| std::mem::swap(&mut view.from, &mut view.to));
        self.schedule_translation();
    }

    /// Restarts the debounce timer. The running translation keeps going
    /// until the timer fires and replaces it.
    fn schedule_translation(&self) {
        let (text, from, to) = {
            let view = self.view.borrow();
            (view.translation.input.clone(), view.from, view.to)
        };
        if text.trim().is_empty() {
            self.view.send_modify(|view| {
                self.debounce_line.cancel();
                self.translation_line.cancel();
                view.translation.output.clear();
                view.translation.pending = false;
                view.translation.error = None;
            });
            return;
        }

        let timer = self.debounce_line.issue();
        let translator = self.translator.clone();
        let view = Arc::clone(&self.view);
        let line = Arc::clone(&self.translation_line);
        let debounce = self.debounce;
        self.debounce_line.spawn(timer.clone(), async move {
            tokio::time::sleep(debounce).await;
            timer.check()?;
            let request = TranslationRequest::new(&text, from.code(), to.code())?;
            let ticket = supersede(&view, &line, Some(&timer), |view| {
                view.translation.pending = true;
                view.translation.error = None;
            })
            .ok_or(LookupError::Cancelled)?;
            line.spawn(ticket.clone(), async move {
                let result = translator.translate(request).await;
                publish(&view, &ticket, |view| {
                    view.translation.pending = false;
                    match result {
                        Ok(translation) => view.translation.output = translation,
                        Err(err) => {
                            tracing::error!(error = %err, "translation failed");
                            view.translation.error = Some(TRANSLATE_FAILED_TEXT);
                        }
                    }
                })
            });
            Ok(())
        });
    }
}

impl<P: Provider, T: TranslationService> Drop for Session<P, T> {
    fn drop(&mut self) {
        self.sentence_line.cancel();
        self.word_line.cancel();
        self.debounce_line.cancel();
        self.translation_line.cancel();
    }
}

/// Issues a new ticket on `line` within the view write that applies
/// `update`. A result of the request it replaces is checked in a view
/// write as well, so it lands either before `update` or not at all.
/// Returns `None` without touching the view once `guard` is stale.
fn supersede<F>(
    view: &watch::Sender<SessionView>,
    line: &RequestLine,
    guard: Option<&Ticket>,
    update: F,
) -> Option<Ticket>
where
    F: FnOnce(&mut SessionView),
{
    let mut ticket = None;
    view.send_if_modified(|state| {
        if guard.is_some_and(|guard| !guard.is_current()) {
            return false;
        }
        ticket = Some(line.issue());
        update(state);
        true
    });
    ticket
}

/// Applies `update` only while `ticket` is current. The check runs inside
/// the view write, and tickets are only superseded inside view writes.
fn publish<F>(
    view: &watch::Sender<SessionView>,
    ticket: &Ticket,
    update: F,
) -> Result<(), LookupError>
where
    F: FnOnce(&mut SessionView),
{
    let mut published = false;
    view.send_if_modified(|state| {
        if !ticket.is_current() {
            return false;
        }
        update(state);
        published = true;
        true
    });
    if published {
        Ok(())
    } else {
        Err(LookupError::Cancelled)
    }
}
